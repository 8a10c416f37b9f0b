//! OK, ERR and EOF packets.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result, ServerError};
use crate::protocol::codec::{read_bytes, read_lenenc_int, read_u8, read_u16};

use super::header;

/// OK packet (also used for the terminator of a result set).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OkPacket {
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub status_flags: u16,
    pub warnings: u16,
}

impl OkPacket {
    /// Parse an OK packet (header byte 0x00 or 0xFE included).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (_header, data) = read_u8(payload)?;
        let (affected_rows, data) = read_lenenc_int(data)?;
        let (last_insert_id, data) = read_lenenc_int(data)?;
        let (status_flags, data) = read_u16(data)?;
        let (warnings, _info) = read_u16(data)?;
        Ok(Self {
            affected_rows,
            last_insert_id,
            status_flags,
            warnings,
        })
    }

    /// Parse the terminator of a result set.
    ///
    /// Without CLIENT_DEPRECATE_EOF the terminator is a legacy EOF packet
    /// carrying only warnings and status flags.
    pub fn parse_end_of_rows(payload: &[u8], deprecate_eof: bool) -> Result<Self> {
        if deprecate_eof {
            return Self::parse(payload);
        }
        let (_header, data) = read_u8(payload)?;
        let (warnings, data) = read_u16(data)?;
        let (status_flags, _) = read_u16(data)?;
        Ok(Self {
            status_flags,
            warnings,
            ..Self::default()
        })
    }
}

/// ERR packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    pub code: u16,
    pub sql_state: String,
    pub message: String,
}

impl ErrPacket {
    /// Parse an ERR packet (header byte 0xFF included).
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (_header, data) = read_u8(payload)?;
        let (code, data) = read_u16(data)?;
        let (sql_state, data) = if data.first() == Some(&b'#') {
            let (state, rest) = read_bytes(&data[1..], 5)?;
            (String::from_utf8_lossy(state).into_owned(), rest)
        } else {
            (String::new(), data)
        };
        Ok(Self {
            code,
            sql_state,
            message: String::from_utf8_lossy(data).into_owned(),
        })
    }

    /// Move the message into diagnostics and convert to an Error.
    pub fn into_error(self, diag: &mut Diagnostics) -> Error {
        diag.set_server_message(self.message);
        Error::Server(ServerError {
            code: self.code,
            sql_state: self.sql_state,
        })
    }
}

/// A generic response to a command.
#[derive(Debug)]
pub enum Response {
    Ok(OkPacket),
    Err(ErrPacket),
}

impl Response {
    /// Classify a packet that must be OK or ERR.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        match payload.first() {
            Some(&header::OK) | Some(&header::EOF) if payload.len() >= 7 => {
                OkPacket::parse(payload).map(Response::Ok)
            }
            Some(&header::ERR) => ErrPacket::parse(payload).map(Response::Err),
            Some(other) => Err(Error::Protocol(format!(
                "Expected OK or ERR packet, got header 0x{other:02X}"
            ))),
            None => Err(Error::Protocol("Expected OK or ERR packet, got empty packet".into())),
        }
    }
}

/// Parse an ERR packet and fill diagnostics, or report why it could not be parsed.
pub fn process_err(payload: &[u8], diag: &mut Diagnostics) -> Error {
    match ErrPacket::parse(payload) {
        Ok(err) => err.into_error(diag),
        Err(e) => e,
    }
}
