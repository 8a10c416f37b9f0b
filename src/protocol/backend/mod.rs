//! MySQL backend (server → client) packets.

pub mod handshake;
pub mod response;
pub mod resultset;

pub use handshake::{AuthMoreData, AuthSwitchRequest, InitialHandshake};
pub use response::{ErrPacket, OkPacket, Response};
pub use resultset::{ColumnDefinition, TextRow};

/// First payload byte of the generic response packets.
pub mod header {
    /// OK packet
    pub const OK: u8 = 0x00;
    /// More authentication data (caching_sha2_password exchange)
    pub const AUTH_MORE_DATA: u8 = 0x01;
    /// NULL value in a text row
    pub const NULL_VALUE: u8 = 0xFB;
    /// EOF packet, OK packet terminating a result set, or auth switch request
    pub const EOF: u8 = 0xFE;
    /// ERR packet
    pub const ERR: u8 = 0xFF;
}

/// Returns true if a packet starting with 0xFE is a result set terminator
/// rather than a row whose first column has an 8-byte length prefix.
pub fn is_end_of_rows(payload: &[u8]) -> bool {
    payload.first() == Some(&header::EOF) && payload.len() < 9
}
