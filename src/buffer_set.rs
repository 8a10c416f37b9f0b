//! Buffer set shared by the algorithms operating on one connection.

/// Buffer set for state machine operations.
#[derive(Debug)]
pub struct BufferSet {
    /// Payload of the last packet read (frames already joined)
    pub read_buffer: Vec<u8>,
    /// Framed packets waiting to be written
    pub write_buffer: Vec<u8>,
    /// Sequence number of the next packet, in either direction
    pub sequence_id: u8,
}

impl BufferSet {
    /// Create a new buffer set.
    pub fn new() -> Self {
        Self {
            read_buffer: Vec::with_capacity(8192),
            write_buffer: Vec::with_capacity(8192),
            sequence_id: 0,
        }
    }

    /// Clear both buffers and reset the sequence number, keeping capacity.
    pub fn reset(&mut self) {
        self.read_buffer.clear();
        self.write_buffer.clear();
        self.sequence_id = 0;
    }
}

impl Default for BufferSet {
    fn default() -> Self {
        Self::new()
    }
}
