//! Action types for algorithm I/O requests.

use crate::error::{Error, Result};

/// Action requested by an algorithm.
///
/// The driver should perform the requested I/O and then call
/// [`Algorithm::resume`](super::Algorithm::resume) again with the outcome
/// (`Ok(())` on success). Buffers live in the connection state's
/// [`BufferSet`](crate::buffer_set::BufferSet).
#[derive(Debug)]
#[must_use]
pub enum NextAction {
    /// Establish the transport connection (TCP or Unix socket).
    Connect,

    /// Read one MySQL packet.
    ///
    /// The driver should:
    /// 1. Read the 4-byte frame header and validate it with
    ///    [`process_header`](crate::protocol::packet::process_header)
    /// 2. Append the frame payload to `buffer_set.read_buffer` (cleared first)
    /// 3. Repeat while the frame payload has the maximum length
    Read,

    /// Write `buffer_set.write_buffer` to the server and flush.
    Write,

    /// Perform the client side of a TLS handshake.
    SslHandshake,

    /// Send a TLS close_notify.
    SslShutdown,

    /// Close the transport.
    Close,

    /// The algorithm has finished, successfully or not.
    ///
    /// No further resume calls are expected.
    Done(Result<()>),
}

impl NextAction {
    /// Successful completion.
    pub fn ok() -> Self {
        NextAction::Done(Ok(()))
    }

    /// Returns true if this is the terminal action.
    pub fn is_done(&self) -> bool {
        matches!(self, NextAction::Done(_))
    }

    /// Get the final result if this is the terminal action.
    pub fn into_result(self) -> Option<Result<()>> {
        match self {
            NextAction::Done(result) => Some(result),
            _ => None,
        }
    }

    /// Terminal action for an algorithm resumed after it already finished.
    pub(crate) fn resumed_after_done() -> Self {
        NextAction::Done(Err(Error::InvalidUsage(
            "algorithm resumed after completion".into(),
        )))
    }
}

impl From<Result<()>> for NextAction {
    fn from(result: Result<()>) -> Self {
        NextAction::Done(result)
    }
}

impl From<Error> for NextAction {
    fn from(err: Error) -> Self {
        NextAction::Done(Err(err))
    }
}
