//! Packet framing.
//!
//! Every MySQL packet starts with a 4-byte header:
//! - payload length (3 bytes, little-endian)
//! - sequence number (1 byte)
//!
//! Payloads of 2^24 - 1 bytes or more are split into several frames; a frame
//! shorter than the maximum ends the packet (an empty frame if needed).

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::buffer_set::BufferSet;
use crate::error::{Error, Result};

/// Maximum payload size of a single frame.
pub const MAX_PACKET_SIZE: usize = 0xFF_FFFF;

/// Size of the frame header.
pub const HEADER_SIZE: usize = 4;

/// Frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct PacketHeader {
    length: [u8; 3],
    sequence_id: u8,
}

impl PacketHeader {
    /// Create a header for a payload of `length` bytes.
    pub fn new(length: usize, sequence_id: u8) -> Self {
        let le = (length as u32).to_le_bytes();
        Self {
            length: [le[0], le[1], le[2]],
            sequence_id,
        }
    }

    /// Parse a header from its wire representation.
    pub fn from_bytes(bytes: &[u8; HEADER_SIZE]) -> Self {
        Self::read_from_bytes(bytes).unwrap_or_default()
    }

    /// Payload length of this frame.
    pub fn length(&self) -> usize {
        let [a, b, c] = self.length;
        u32::from_le_bytes([a, b, c, 0]) as usize
    }

    /// Sequence number of this frame.
    pub fn sequence_id(&self) -> u8 {
        self.sequence_id
    }
}

/// Validate a received frame header against the expected sequence number.
///
/// Advances `buffer_set.sequence_id` and returns the frame payload length.
/// Drivers call this for every frame they read.
pub fn process_header(buffer_set: &mut BufferSet, header: &[u8; HEADER_SIZE]) -> Result<usize> {
    let header = PacketHeader::from_bytes(header);
    if header.sequence_id() != buffer_set.sequence_id {
        return Err(Error::Protocol(format!(
            "Packet out of order: expected sequence {}, got {}",
            buffer_set.sequence_id,
            header.sequence_id()
        )));
    }
    buffer_set.sequence_id = buffer_set.sequence_id.wrapping_add(1);
    Ok(header.length())
}

/// Packet builder helper that handles framing.
///
/// Payload bytes are appended to `write_buffer` after a header placeholder;
/// [`finish`](Self::finish) fills in the header (splitting into several
/// frames if the payload is too large) and consumes sequence numbers.
pub struct PacketBuilder<'a> {
    buffer_set: &'a mut BufferSet,
    start: usize,
}

impl<'a> PacketBuilder<'a> {
    /// Start a packet at the end of the write buffer.
    pub fn new(buffer_set: &'a mut BufferSet) -> Self {
        let start = buffer_set.write_buffer.len();
        buffer_set.write_buffer.extend_from_slice(&[0; HEADER_SIZE]);
        Self { buffer_set, start }
    }

    /// Get mutable access to the payload buffer.
    pub fn buf(&mut self) -> &mut Vec<u8> {
        &mut self.buffer_set.write_buffer
    }

    /// Finish building the packet.
    pub fn finish(self) {
        let payload_start = self.start + HEADER_SIZE;
        let buf = &mut self.buffer_set.write_buffer;
        let payload_len = buf.len() - payload_start;

        if payload_len < MAX_PACKET_SIZE {
            let seq = self.buffer_set.sequence_id;
            let header = PacketHeader::new(payload_len, seq);
            buf[self.start..payload_start].copy_from_slice(header.as_bytes());
            self.buffer_set.sequence_id = seq.wrapping_add(1);
            return;
        }

        let payload = buf.split_off(payload_start);
        buf.truncate(self.start);
        let mut seq = self.buffer_set.sequence_id;
        for chunk in payload.chunks(MAX_PACKET_SIZE) {
            buf.extend_from_slice(PacketHeader::new(chunk.len(), seq).as_bytes());
            buf.extend_from_slice(chunk);
            seq = seq.wrapping_add(1);
        }
        if payload.len() % MAX_PACKET_SIZE == 0 {
            buf.extend_from_slice(PacketHeader::new(0, seq).as_bytes());
            seq = seq.wrapping_add(1);
        }
        self.buffer_set.sequence_id = seq;
    }
}

/// Clear the write buffer and start a new command (sequence number 0).
pub fn start_command(buffer_set: &mut BufferSet) -> PacketBuilder<'_> {
    buffer_set.write_buffer.clear();
    buffer_set.sequence_id = 0;
    PacketBuilder::new(buffer_set)
}
