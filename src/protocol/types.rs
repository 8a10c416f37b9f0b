//! Common MySQL wire protocol types.

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// Capability flags exchanged during the handshake.
pub mod capabilities {
    pub const CLIENT_LONG_PASSWORD: u32 = 1;
    pub const CLIENT_FOUND_ROWS: u32 = 1 << 1;
    pub const CLIENT_LONG_FLAG: u32 = 1 << 2;
    pub const CLIENT_CONNECT_WITH_DB: u32 = 1 << 3;
    pub const CLIENT_PROTOCOL_41: u32 = 1 << 9;
    pub const CLIENT_SSL: u32 = 1 << 11;
    pub const CLIENT_TRANSACTIONS: u32 = 1 << 13;
    pub const CLIENT_SECURE_CONNECTION: u32 = 1 << 15;
    pub const CLIENT_MULTI_STATEMENTS: u32 = 1 << 16;
    pub const CLIENT_MULTI_RESULTS: u32 = 1 << 17;
    pub const CLIENT_PLUGIN_AUTH: u32 = 1 << 19;
    pub const CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA: u32 = 1 << 21;
    pub const CLIENT_DEPRECATE_EOF: u32 = 1 << 24;

    /// Capabilities the server must offer for the handshake to proceed.
    pub const MANDATORY: u32 = CLIENT_PROTOCOL_41 | CLIENT_PLUGIN_AUTH | CLIENT_SECURE_CONNECTION;

    /// Capabilities requested when the server offers them.
    pub const OPTIONAL: u32 = CLIENT_LONG_PASSWORD
        | CLIENT_LONG_FLAG
        | CLIENT_TRANSACTIONS
        | CLIENT_PLUGIN_AUTH_LENENC_CLIENT_DATA
        | CLIENT_DEPRECATE_EOF;
}

/// Server status flags carried by OK and EOF packets.
pub mod server_status {
    pub const SERVER_STATUS_IN_TRANS: u16 = 0x0001;
    pub const SERVER_STATUS_AUTOCOMMIT: u16 = 0x0002;
    pub const SERVER_MORE_RESULTS_EXISTS: u16 = 0x0008;
    pub const SERVER_STATUS_NO_BACKSLASH_ESCAPES: u16 = 0x0200;
}

/// A character set together with the collation sent during the handshake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterSet {
    /// Name as understood by `SET NAMES`
    pub name: &'static str,
    /// Default collation id for the handshake response
    pub collation_id: u8,
}

impl CharacterSet {
    /// `utf8mb4` with `utf8mb4_general_ci`.
    pub const UTF8MB4: CharacterSet = CharacterSet {
        name: "utf8mb4",
        collation_id: 45,
    };

    /// `latin1` with `latin1_swedish_ci`.
    pub const LATIN1: CharacterSet = CharacterSet {
        name: "latin1",
        collation_id: 8,
    };

    /// `ascii` with `ascii_general_ci`.
    pub const ASCII: CharacterSet = CharacterSet {
        name: "ascii",
        collation_id: 11,
    };

    /// `binary`.
    pub const BINARY: CharacterSet = CharacterSet {
        name: "binary",
        collation_id: 63,
    };

    /// Look up a known character set by name.
    pub fn from_name(name: &str) -> Option<Self> {
        [Self::UTF8MB4, Self::LATIN1, Self::ASCII, Self::BINARY]
            .into_iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Returns true if the name is safe to splice into `SET NAMES '...'`.
    pub fn has_valid_name(&self) -> bool {
        !self.name.is_empty()
            && self
                .name
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_')
    }
}

impl Default for CharacterSet {
    fn default() -> Self {
        Self::UTF8MB4
    }
}

/// Little-endian 16-bit unsigned integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct U16LE([u8; 2]);

impl U16LE {
    /// Create a new U16LE from a native u16.
    pub const fn new(value: u16) -> Self {
        Self(value.to_le_bytes())
    }

    /// Get the native u16 value.
    pub const fn get(self) -> u16 {
        u16::from_le_bytes(self.0)
    }
}

/// Little-endian 32-bit unsigned integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct U32LE([u8; 4]);

impl U32LE {
    /// Create a new U32LE from a native u32.
    pub const fn new(value: u32) -> Self {
        Self(value.to_le_bytes())
    }

    /// Get the native u32 value.
    pub const fn get(self) -> u32 {
        u32::from_le_bytes(self.0)
    }
}

/// Little-endian 64-bit unsigned integer for zerocopy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromBytes, IntoBytes, KnownLayout, Immutable)]
#[repr(C)]
pub struct U64LE([u8; 8]);

impl U64LE {
    /// Get the native u64 value.
    pub const fn get(self) -> u64 {
        u64::from_le_bytes(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_lookup_is_case_insensitive() {
        assert_eq!(CharacterSet::from_name("UTF8MB4"), Some(CharacterSet::UTF8MB4));
        assert_eq!(CharacterSet::from_name("koi8r"), None);
    }

    #[test]
    fn charset_name_validation() {
        assert!(CharacterSet::LATIN1.has_valid_name());
        let bad = CharacterSet {
            name: "utf8'; DROP TABLE t; --",
            collation_id: 45,
        };
        assert!(!bad.has_valid_name());
        let empty = CharacterSet {
            name: "",
            collation_id: 45,
        };
        assert!(!empty.has_valid_name());
    }
}
