//! Connection state shared by all algorithms running on one connection.

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};
use crate::protocol::backend::OkPacket;
use crate::protocol::types::CharacterSet;
use crate::protocol::types::capabilities::CLIENT_DEPRECATE_EOF;
use crate::protocol::types::server_status::{
    SERVER_STATUS_IN_TRANS, SERVER_STATUS_NO_BACKSLASH_ESCAPES,
};

/// Protocol status of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// No session: never connected, closed, or failed to connect
    #[default]
    NotConnected,
    /// Session established and idle
    Connected,
    /// A multi-step operation (a partially read result set) is underway
    InProgress,
}

/// Mutable state of one logical connection.
///
/// Passed by reference into every resume call. Only the algorithm currently
/// in flight may touch it; drivers run one algorithm at a time per connection.
#[derive(Debug)]
pub struct ConnectionStateData {
    status: ConnectionStatus,
    /// Packet buffers and sequence number
    pub buffers: BufferSet,
    tls_supported: bool,
    tls_active: bool,
    capabilities: u32,
    server_version: String,
    connection_id: u32,
    server_status: u16,
    charset: Option<CharacterSet>,
    backslash_escapes: bool,
    pending_columns: usize,
}

impl ConnectionStateData {
    /// Create a new, not connected state.
    ///
    /// `tls_supported` tells the handshake whether the driver can perform
    /// [`NextAction::SslHandshake`](super::NextAction::SslHandshake).
    pub fn new(buffers: BufferSet, tls_supported: bool) -> Self {
        Self {
            status: ConnectionStatus::NotConnected,
            buffers,
            tls_supported,
            tls_active: false,
            capabilities: 0,
            server_version: String::new(),
            connection_id: 0,
            server_status: 0,
            charset: None,
            backslash_escapes: true,
            pending_columns: 0,
        }
    }

    /// Current protocol status.
    pub fn status(&self) -> ConnectionStatus {
        self.status
    }

    /// Override the protocol status.
    ///
    /// Intended for drivers that track the transport separately, and tests.
    pub fn set_status(&mut self, status: ConnectionStatus) {
        if self.status != status {
            tracing::debug!(from = ?self.status, to = ?status, "connection status changed");
        }
        self.status = status;
    }

    /// Returns true if a session is established (idle or mid-operation).
    pub fn is_connected(&self) -> bool {
        self.status != ConnectionStatus::NotConnected
    }

    /// Fail unless the session is idle and ready for a new command.
    pub fn check_ready(&self) -> Result<()> {
        match self.status {
            ConnectionStatus::Connected => Ok(()),
            ConnectionStatus::NotConnected => Err(Error::NotConnected),
            ConnectionStatus::InProgress => Err(Error::EngagedInMultiFunction),
        }
    }

    /// Returns true if the driver can perform TLS handshakes.
    pub fn tls_supported(&self) -> bool {
        self.tls_supported
    }

    /// Returns true if the transport is currently encrypted.
    pub fn tls_active(&self) -> bool {
        self.tls_active
    }

    /// Record whether the transport is encrypted.
    pub fn set_tls_active(&mut self, active: bool) {
        self.tls_active = active;
    }

    /// Capabilities negotiated during the handshake.
    pub fn capabilities(&self) -> u32 {
        self.capabilities
    }

    /// Returns true if result sets end with an OK packet instead of EOF.
    pub fn deprecate_eof(&self) -> bool {
        self.capabilities & CLIENT_DEPRECATE_EOF != 0
    }

    /// Server version string from the initial handshake.
    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Server-side connection (thread) id.
    pub fn connection_id(&self) -> u32 {
        self.connection_id
    }

    /// Status flags from the last OK or EOF packet.
    pub fn server_status(&self) -> u16 {
        self.server_status
    }

    /// Returns true if the server reported an open transaction.
    pub fn in_transaction(&self) -> bool {
        self.server_status & SERVER_STATUS_IN_TRANS != 0
    }

    /// Character set of the session, if known.
    pub fn charset(&self) -> Option<CharacterSet> {
        self.charset
    }

    pub(crate) fn set_charset(&mut self, charset: Option<CharacterSet>) {
        self.charset = charset;
    }

    /// Returns true if backslashes are escape characters in string literals.
    pub fn backslash_escapes(&self) -> bool {
        self.backslash_escapes
    }

    /// Number of columns of the result set being read.
    pub fn pending_columns(&self) -> usize {
        self.pending_columns
    }

    pub(crate) fn set_session(
        &mut self,
        server_version: String,
        connection_id: u32,
        capabilities: u32,
    ) {
        self.server_version = server_version;
        self.connection_id = connection_id;
        self.capabilities = capabilities;
    }

    /// Record the session updates carried by an OK/EOF packet.
    pub(crate) fn apply_ok(&mut self, ok: &OkPacket) {
        self.server_status = ok.status_flags;
        self.backslash_escapes = ok.status_flags & SERVER_STATUS_NO_BACKSLASH_ESCAPES == 0;
    }

    /// Enter the row-reading phase of a result set.
    pub(crate) fn begin_rows(&mut self, num_columns: usize) {
        self.pending_columns = num_columns;
        self.set_status(ConnectionStatus::InProgress);
    }

    /// Leave the row-reading phase.
    pub(crate) fn end_rows(&mut self) {
        self.pending_columns = 0;
        self.set_status(ConnectionStatus::Connected);
    }

    /// The server reverted the session to its defaults.
    pub(crate) fn reset_session(&mut self) {
        self.charset = None;
        self.backslash_escapes = true;
    }

    /// The transport is gone; forget everything tied to the session.
    pub(crate) fn mark_disconnected(&mut self) {
        self.set_status(ConnectionStatus::NotConnected);
        self.tls_active = false;
        self.pending_columns = 0;
        self.charset = None;
    }
}

impl Default for ConnectionStateData {
    fn default() -> Self {
        Self::new(BufferSet::new(), false)
    }
}
