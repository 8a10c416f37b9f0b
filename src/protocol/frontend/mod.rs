//! MySQL frontend (client → server) packets.

pub mod auth;
pub mod command;
pub mod handshake;

pub use command::{write_ping, write_query, write_quit, write_reset_connection};
pub use handshake::{
    HandshakeResponse, write_auth_data, write_handshake_response, write_ssl_request,
};

/// Command bytes (first payload byte of a command packet).
pub mod command_byte {
    /// COM_QUIT
    pub const QUIT: u8 = 0x01;
    /// COM_QUERY
    pub const QUERY: u8 = 0x03;
    /// COM_PING
    pub const PING: u8 = 0x0E;
    /// COM_RESET_CONNECTION
    pub const RESET_CONNECTION: u8 = 0x1F;
}
