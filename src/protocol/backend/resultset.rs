//! Text protocol result set packets.

use crate::error::{Error, Result};
use crate::protocol::codec::{
    read_lenenc_bytes, read_lenenc_int, read_lenenc_str, read_u8, read_u16, read_u32,
};

use super::header;

/// Column definition (protocol 4.1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub schema: String,
    pub table: String,
    pub name: String,
    pub charset: u16,
    pub column_length: u32,
    pub column_type: u8,
    pub flags: u16,
    pub decimals: u8,
}

impl ColumnDefinition {
    /// Parse a column definition packet.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let (_catalog, data) = read_lenenc_bytes(payload)?;
        let (schema, data) = read_lenenc_str(data)?;
        let (table, data) = read_lenenc_str(data)?;
        let (_org_table, data) = read_lenenc_bytes(data)?;
        let (name, data) = read_lenenc_str(data)?;
        let (_org_name, data) = read_lenenc_bytes(data)?;
        let (_fixed_len, data) = read_lenenc_int(data)?;
        let (charset, data) = read_u16(data)?;
        let (column_length, data) = read_u32(data)?;
        let (column_type, data) = read_u8(data)?;
        let (flags, data) = read_u16(data)?;
        let (decimals, _) = read_u8(data)?;
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
            name: name.to_string(),
            charset,
            column_length,
            column_type,
            flags,
            decimals,
        })
    }
}

/// Largest number of columns a MySQL table or result set can have.
pub const MAX_COLUMNS: usize = 4096;

/// Read the column count that starts a result set.
pub fn read_column_count(payload: &[u8]) -> Result<usize> {
    let (count, rest) = read_lenenc_int(payload)?;
    if !rest.is_empty() {
        return Err(Error::Protocol(format!(
            "Trailing bytes after column count: {}",
            rest.len()
        )));
    }
    usize::try_from(count)
        .ok()
        .filter(|&n| n > 0 && n <= MAX_COLUMNS)
        .ok_or_else(|| Error::Protocol(format!("Invalid column count: {count}")))
}

/// Text protocol row: one optional byte string per column.
pub type TextRow = Vec<Option<Vec<u8>>>;

/// Parse a text protocol row with `num_columns` values.
pub fn parse_text_row(payload: &[u8], num_columns: usize) -> Result<TextRow> {
    let mut row = Vec::with_capacity(num_columns);
    let mut data = payload;
    for _ in 0..num_columns {
        if data.first() == Some(&header::NULL_VALUE) {
            row.push(None);
            data = &data[1..];
        } else {
            let (value, rest) = read_lenenc_bytes(data)?;
            row.push(Some(value.to_vec()));
            data = rest;
        }
    }
    if !data.is_empty() {
        return Err(Error::Protocol(format!(
            "Row has {} trailing bytes after {} columns",
            data.len(),
            num_columns
        )));
    }
    Ok(row)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::codec::{write_lenenc_bytes, write_u8, write_u16, write_u32};

    pub(crate) fn column_payload(name: &str) -> Vec<u8> {
        let mut p = Vec::new();
        write_lenenc_bytes(&mut p, b"def");
        write_lenenc_bytes(&mut p, b"db");
        write_lenenc_bytes(&mut p, b"t");
        write_lenenc_bytes(&mut p, b"t");
        write_lenenc_bytes(&mut p, name.as_bytes());
        write_lenenc_bytes(&mut p, name.as_bytes());
        write_u8(&mut p, 0x0C);
        write_u16(&mut p, 45);
        write_u32(&mut p, 11);
        write_u8(&mut p, 3);
        write_u16(&mut p, 0);
        write_u8(&mut p, 0);
        write_u16(&mut p, 0);
        p
    }

    #[test]
    fn parse_column() {
        let col = ColumnDefinition::parse(&column_payload("id")).unwrap();
        assert_eq!(col.schema, "db");
        assert_eq!(col.table, "t");
        assert_eq!(col.name, "id");
        assert_eq!(col.column_type, 3);
    }

    #[test]
    fn parse_row_with_null() {
        let row = parse_text_row(&[1, b'7', 0xFB, 0], 3).unwrap();
        assert_eq!(row, vec![Some(b"7".to_vec()), None, Some(Vec::new())]);
        assert!(parse_text_row(&[1, b'7', 0xFB], 1).is_err());
    }

    #[test]
    fn column_count() {
        assert_eq!(read_column_count(&[2]).unwrap(), 2);
        assert!(read_column_count(&[0]).is_err());
        assert!(read_column_count(&[2, 0]).is_err());
        assert_eq!(read_column_count(&[0xFC, 0x00, 0x10]).unwrap(), MAX_COLUMNS);
        assert!(read_column_count(&[0xFC, 0x01, 0x10]).is_err());
    }
}
