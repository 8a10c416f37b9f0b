//! Handshake packets sent by the client.

use crate::buffer_set::BufferSet;
use crate::protocol::codec::{write_bytes, write_cstr, write_lenenc_bytes, write_u8, write_u32};
use crate::protocol::packet::PacketBuilder;
use crate::protocol::types::capabilities::{
    CLIENT_CONNECT_WITH_DB, CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA,
};

/// Maximum packet size announced to the server.
pub const MAX_ALLOWED_PACKET: u32 = 0x0100_0000;

/// Fields of a HandshakeResponse41 packet.
#[derive(Debug)]
pub struct HandshakeResponse<'a> {
    pub capabilities: u32,
    pub collation_id: u8,
    pub user: &'a str,
    pub auth_response: &'a [u8],
    pub database: Option<&'a str>,
    pub auth_plugin: &'a str,
}

fn write_login_header(out: &mut Vec<u8>, capabilities: u32, collation_id: u8) {
    write_u32(out, capabilities);
    write_u32(out, MAX_ALLOWED_PACKET);
    write_u8(out, collation_id);
    write_bytes(out, &[0; 23]);
}

/// Write an SSLRequest packet (the login header without credentials).
///
/// Continues the handshake sequence; the server answers with a TLS handshake.
pub fn write_ssl_request(buffer_set: &mut BufferSet, capabilities: u32, collation_id: u8) {
    buffer_set.write_buffer.clear();
    let mut pkt = PacketBuilder::new(buffer_set);
    write_login_header(pkt.buf(), capabilities, collation_id);
    pkt.finish();
}

/// Write a HandshakeResponse41 packet.
pub fn write_handshake_response(buffer_set: &mut BufferSet, response: &HandshakeResponse<'_>) {
    buffer_set.write_buffer.clear();
    let mut pkt = PacketBuilder::new(buffer_set);
    let out = pkt.buf();
    write_login_header(out, response.capabilities, response.collation_id);
    write_cstr(out, response.user);

    if response.capabilities & CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA != 0 {
        write_lenenc_bytes(out, response.auth_response);
    } else {
        write_u8(out, response.auth_response.len() as u8);
        write_bytes(out, response.auth_response);
    }

    if response.capabilities & CLIENT_CONNECT_WITH_DB != 0 {
        write_cstr(out, response.database.unwrap_or_default());
    }

    write_cstr(out, response.auth_plugin);
    pkt.finish();
}

/// Write raw authentication data (auth switch response, caching_sha2 exchange).
pub fn write_auth_data(buffer_set: &mut BufferSet, data: &[u8]) {
    buffer_set.write_buffer.clear();
    let mut pkt = PacketBuilder::new(buffer_set);
    write_bytes(pkt.buf(), data);
    pkt.finish();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::capabilities::{CLIENT_PROTOCOL_41, CLIENT_SSL};

    #[test]
    fn ssl_request_is_32_bytes() {
        let mut bufs = BufferSet::new();
        bufs.sequence_id = 1;
        write_ssl_request(&mut bufs, CLIENT_PROTOCOL_41 | CLIENT_SSL, 45);
        assert_eq!(&bufs.write_buffer[..4], &[32, 0, 0, 1]);
        assert_eq!(bufs.write_buffer[12], 45);
        assert_eq!(bufs.sequence_id, 2);
    }

    #[test]
    fn handshake_response_layout() {
        let mut bufs = BufferSet::new();
        bufs.sequence_id = 1;
        let response = HandshakeResponse {
            capabilities: CLIENT_PROTOCOL_41
                | CLIENT_CONNECT_WITH_DB
                | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA,
            collation_id: 45,
            user: "root",
            auth_response: &[1, 2, 3],
            database: Some("app"),
            auth_plugin: "mysql_native_password",
        };
        write_handshake_response(&mut bufs, &response);

        let payload = &bufs.write_buffer[4..];
        assert_eq!(&payload[32..37], b"root\0");
        assert_eq!(&payload[37..41], &[3, 1, 2, 3]);
        assert_eq!(&payload[41..45], b"app\0");
        assert_eq!(&payload[45..], b"mysql_native_password\0");
    }

    #[test]
    fn database_omitted_without_capability() {
        let mut bufs = BufferSet::new();
        let response = HandshakeResponse {
            capabilities: CLIENT_PROTOCOL_41,
            collation_id: 45,
            user: "u",
            auth_response: &[],
            database: Some("ignored"),
            auth_plugin: "p",
        };
        write_handshake_response(&mut bufs, &response);
        assert_eq!(&bufs.write_buffer[4 + 32..], b"u\0\0p\0");
    }
}
