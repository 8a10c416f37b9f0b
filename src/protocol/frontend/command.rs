//! Text protocol command packets.
//!
//! Each command starts a new sequence: the write buffer is cleared and the
//! packet is framed with sequence number 0.

use crate::buffer_set::BufferSet;
use crate::protocol::packet::start_command;

use super::command_byte;

fn write_simple_command(buffer_set: &mut BufferSet, command: u8) {
    let mut pkt = start_command(buffer_set);
    pkt.buf().push(command);
    pkt.finish();
}

/// Write a COM_QUIT packet.
pub fn write_quit(buffer_set: &mut BufferSet) {
    write_simple_command(buffer_set, command_byte::QUIT);
}

/// Write a COM_PING packet.
pub fn write_ping(buffer_set: &mut BufferSet) {
    write_simple_command(buffer_set, command_byte::PING);
}

/// Write a COM_RESET_CONNECTION packet.
pub fn write_reset_connection(buffer_set: &mut BufferSet) {
    write_simple_command(buffer_set, command_byte::RESET_CONNECTION);
}

/// Write a COM_QUERY packet.
pub fn write_query(buffer_set: &mut BufferSet, sql: &str) {
    let mut pkt = start_command(buffer_set);
    pkt.buf().push(command_byte::QUERY);
    pkt.buf().extend_from_slice(sql.as_bytes());
    pkt.finish();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quit() {
        let mut bufs = BufferSet::new();
        bufs.sequence_id = 9;
        write_quit(&mut bufs);
        assert_eq!(bufs.write_buffer, [1, 0, 0, 0, 0x01]);
        assert_eq!(bufs.sequence_id, 1);
    }

    #[test]
    fn test_query() {
        let mut bufs = BufferSet::new();
        write_query(&mut bufs, "SELECT 1");

        // Length: command byte + 8 bytes of SQL
        assert_eq!(&bufs.write_buffer[..4], &[9, 0, 0, 0]);
        assert_eq!(bufs.write_buffer[4], 0x03);
        assert_eq!(&bufs.write_buffer[5..], b"SELECT 1");
    }

    #[test]
    fn commands_replace_previous_content() {
        let mut bufs = BufferSet::new();
        write_ping(&mut bufs);
        write_reset_connection(&mut bufs);
        assert_eq!(bufs.write_buffer, [1, 0, 0, 0, 0x1F]);
    }
}
