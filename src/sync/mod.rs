//! Synchronous MySQL client.
//!
//! Drives the sans-I/O algorithms from [`crate::state`] over blocking
//! `std::net` / `std::os::unix::net` sockets.

mod conn;
mod stream;

pub use conn::Conn;
