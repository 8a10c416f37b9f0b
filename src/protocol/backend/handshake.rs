//! Handshake packets sent by the server.

use crate::error::{Error, Result};
use crate::protocol::codec::{
    read_bytes, read_cstr, read_cstring, read_u8, read_u16, read_u32, to_str,
};
use crate::protocol::types::capabilities::{CLIENT_PLUGIN_AUTH, CLIENT_SECURE_CONNECTION};

use super::header;

/// Protocol version of the only supported initial handshake.
pub const PROTOCOL_VERSION_10: u8 = 10;

/// Initial handshake packet (protocol version 10).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitialHandshake {
    pub server_version: String,
    pub connection_id: u32,
    pub capabilities: u32,
    pub charset: u8,
    pub status_flags: u16,
    /// Scramble (auth plugin data), without the trailing NUL
    pub scramble: Vec<u8>,
    pub auth_plugin: String,
}

impl InitialHandshake {
    /// Parse an initial handshake payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (version, data) = read_u8(payload)?;
        if version != PROTOCOL_VERSION_10 {
            return Err(Error::Unsupported(format!(
                "Unsupported handshake protocol version: {version}"
            )));
        }

        let (server_version, data) = read_cstr(data)?;
        let (connection_id, data) = read_u32(data)?;
        let (scramble_1, data) = read_bytes(data, 8)?;
        let (_filler, data) = read_u8(data)?;
        let (caps_low, data) = read_u16(data)?;

        let mut hs = Self {
            server_version: server_version.to_string(),
            connection_id,
            capabilities: u32::from(caps_low),
            charset: 0,
            status_flags: 0,
            scramble: scramble_1.to_vec(),
            auth_plugin: String::new(),
        };

        // Very old servers end the packet here
        if data.is_empty() {
            return Ok(hs);
        }

        let (charset, data) = read_u8(data)?;
        let (status_flags, data) = read_u16(data)?;
        let (caps_high, data) = read_u16(data)?;
        let (scramble_len, data) = read_u8(data)?;
        let (_reserved, data) = read_bytes(data, 10)?;

        hs.charset = charset;
        hs.status_flags = status_flags;
        hs.capabilities |= u32::from(caps_high) << 16;

        let mut data = data;
        if hs.capabilities & CLIENT_SECURE_CONNECTION != 0 {
            let len = usize::from(scramble_len).saturating_sub(8).max(13);
            let (scramble_2, rest) = read_bytes(data, len)?;
            hs.scramble.extend_from_slice(scramble_2);
            data = rest;
        }
        if hs.scramble.last() == Some(&0) {
            hs.scramble.pop();
        }

        if hs.capabilities & CLIENT_PLUGIN_AUTH != 0 {
            // Some servers omit the terminating NUL
            let name = match read_cstring(data) {
                Ok((name, _)) => name,
                Err(_) => data,
            };
            hs.auth_plugin = to_str(name)?.to_string();
        }

        Ok(hs)
    }
}

/// Auth switch request (header 0xFE during authentication).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSwitchRequest {
    pub plugin: String,
    pub scramble: Vec<u8>,
}

impl AuthSwitchRequest {
    /// Parse an auth switch request (header byte included).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (hdr, data) = read_u8(payload)?;
        if hdr != header::EOF {
            return Err(Error::Protocol(format!(
                "Expected auth switch request, got header 0x{hdr:02X}"
            )));
        }
        let (plugin, data) = read_cstr(data)?;
        let scramble = data.strip_suffix(&[0]).unwrap_or(data);
        Ok(Self {
            plugin: plugin.to_string(),
            scramble: scramble.to_vec(),
        })
    }
}

/// Extra authentication data (header 0x01).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthMoreData<'a> {
    pub data: &'a [u8],
}

impl<'a> AuthMoreData<'a> {
    /// Parse an auth-more-data packet (header byte included).
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        let (hdr, data) = read_u8(payload)?;
        if hdr != header::AUTH_MORE_DATA {
            return Err(Error::Protocol(format!(
                "Expected auth more data, got header 0x{hdr:02X}"
            )));
        }
        Ok(Self { data })
    }
}
