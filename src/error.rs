//! Error types for zero-mysql.

use thiserror::Error;

/// Result type for zero-mysql operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error reported by the server in an ERR packet.
///
/// The human-readable message is not stored here; it is written to the
/// [`Diagnostics`](crate::diagnostics::Diagnostics) passed to the algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// MySQL error number (e.g. 1045 for access denied)
    pub code: u16,
    /// SQLSTATE (5 characters), empty if the server did not send one
    pub sql_state: String,
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "error {}", self.code)?;
        if !self.sql_state.is_empty() {
            write!(f, " (SQLSTATE {})", self.sql_state)?;
        }
        Ok(())
    }
}

/// Error type for zero-mysql.
#[derive(Debug, Error)]
pub enum Error {
    /// Server error response
    #[error("MySQL server {0}")]
    Server(ServerError),

    /// Protocol error (malformed packet, unexpected response, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// TLS error
    #[cfg(any(feature = "sync-tls", feature = "tokio-tls"))]
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),

    /// The operation requires an established session
    #[error("Connection is not connected")]
    NotConnected,

    /// Connect was called on a connection that is already established
    #[error("Connection is already connected")]
    AlreadyConnected,

    /// A multi-step operation (e.g. reading rows) is still in progress
    #[error("Connection is engaged in a multi-step operation")]
    EngagedInMultiFunction,

    /// Connection is broken and cannot be reused
    #[error("Connection is broken")]
    ConnectionBroken,

    /// Invalid usage (e.g., bad character set name)
    #[error("Invalid usage: {0}")]
    InvalidUsage(String),

    /// Unsupported feature
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

impl Error {
    /// Returns true if the error indicates the connection is broken and cannot be reused.
    pub fn is_connection_broken(&self) -> bool {
        match self {
            Error::Io(_) | Error::Protocol(_) | Error::ConnectionBroken => true,
            #[cfg(any(feature = "sync-tls", feature = "tokio-tls"))]
            Error::Tls(_) => true,
            _ => false,
        }
    }

    /// Get the MySQL error number if this is a server error.
    pub fn server_code(&self) -> Option<u16> {
        match self {
            Error::Server(err) => Some(err.code),
            _ => None,
        }
    }

    /// Get the SQLSTATE if this is a server error that carried one.
    pub fn sql_state(&self) -> Option<&str> {
        match self {
            Error::Server(err) if !err.sql_state.is_empty() => Some(&err.sql_state),
            _ => None,
        }
    }

    /// Returns true if this is an I/O error of the given kind.
    pub fn is_io_kind(&self, kind: std::io::ErrorKind) -> bool {
        matches!(self, Error::Io(e) if e.kind() == kind)
    }
}

impl From<std::convert::Infallible> for Error {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl<Src: std::fmt::Debug, Dst: std::fmt::Debug + ?Sized>
    From<zerocopy::error::CastError<Src, Dst>> for Error
{
    fn from(err: zerocopy::error::CastError<Src, Dst>) -> Self {
        Error::Protocol(format!("zerocopy cast error: {err:?}"))
    }
}
