//! MySQL wire protocol implementation.
//!
//! This module contains the low-level protocol encoding and decoding.
//!
//! # Structure
//!
//! - `backend`: Server → Client packets (parsing)
//! - `frontend`: Client → Server packets (encoding)
//! - `codec`: Low-level encoding/decoding primitives
//! - `packet`: Packet framing and sequence numbers
//! - `types`: Capability and status flags, character sets

pub mod backend;
pub mod codec;
pub mod frontend;
pub mod packet;
pub mod types;

pub use types::CharacterSet;
