//! Asynchronous MySQL client using Tokio.

mod conn;
mod stream;

pub use conn::Conn;
