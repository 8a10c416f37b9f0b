//! Sans-I/O algorithms for the MySQL protocol.
//!
//! An algorithm never performs I/O. Each call to [`Algorithm::resume`]
//! inspects the connection state and the outcome of the previously requested
//! action, then returns the next [`NextAction`]. The driver performs that
//! action and resumes again, until [`NextAction::Done`].
//!
//! Progress is kept in a private resume-point enum inside each algorithm, so
//! an instance can be stored, moved between threads, or parked for as long as
//! the driver likes between two calls. Composite algorithms own their
//! sub-algorithms by value and relay the sub-algorithm's actions unchanged
//! until it is done.

pub mod action;
pub mod close;
pub mod connect;
pub mod connection;
pub mod handshake;
pub mod ping;
pub mod query;
pub mod quit;
pub mod read_ok;
pub mod reset_connection;
pub mod set_character_set;

pub use action::NextAction;
pub use close::{CloseConnectionAlgo, CloseConnectionAlgoParams};
pub use connect::{ConnectAlgo, ConnectAlgoParams};
pub use connection::{ConnectionStateData, ConnectionStatus};
pub use handshake::{HandshakeAlgo, HandshakeAlgoParams};
pub use ping::{PingAlgo, PingAlgoParams};
pub use query::{
    QueryAlgo, QueryAlgoParams, QueryResult, ReadSomeRowsAlgo, ReadSomeRowsAlgoParams,
    ResultSetHead, StartQueryAlgo, StartQueryAlgoParams,
};
pub use quit::{QuitConnectionAlgo, QuitConnectionAlgoParams};
pub use read_ok::ReadOkResponseAlgo;
pub use reset_connection::{ResetConnectionAlgo, ResetConnectionAlgoParams};
pub use set_character_set::{SetCharacterSetAlgo, SetCharacterSetAlgoParams};

use crate::diagnostics::Diagnostics;
use crate::error::Result;

/// A resumable protocol operation.
///
/// Driver contract:
/// 1. Call `resume` with `Ok(())`.
/// 2. If the result is [`NextAction::Done`], stop.
/// 3. Otherwise perform exactly the requested action and call `resume` again
///    with its outcome (`Ok(())` on success).
///
/// Skipping, reordering or repeating resume calls is not supported.
pub trait Algorithm {
    /// Advance the algorithm.
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction;
}
