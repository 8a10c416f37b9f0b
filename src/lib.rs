//! A sans-I/O MySQL client protocol engine.
//!
//! # Features
//!
//! - **Sans-I/O algorithms**: every protocol operation is a resumable
//!   [`state::Algorithm`] that requests I/O through [`state::NextAction`]
//!   instead of performing it
//! - **Composable**: composite algorithms (close, connect, ping, query, ...)
//!   own their sub-algorithms and relay their requests
//! - **Sync and async APIs**: the same algorithms run under blocking I/O and tokio
//!
//! # Example
//!
//! ```no_run
//! use zero_mysql::sync::Conn;
//! use zero_mysql::Opts;
//!
//! fn main() -> zero_mysql::error::Result<()> {
//!     let opts = Opts {
//!         host: "localhost".into(),
//!         user: "root".into(),
//!         database: Some("mydb".into()),
//!         password: Some("secret".into()),
//!         ..Default::default()
//!     };
//!
//!     let mut conn = Conn::new(opts)?;
//!
//!     let result = conn.query("SELECT 1 AS num")?;
//!     println!("Rows: {:?}", result.rows);
//!
//!     conn.close()?;
//!     Ok(())
//! }
//! ```
//!
//! # Driving an algorithm by hand
//!
//! ```
//! use zero_mysql::state::{Algorithm, CloseConnectionAlgo, CloseConnectionAlgoParams};
//! use zero_mysql::state::{ConnectionStateData, NextAction};
//! use zero_mysql::Diagnostics;
//!
//! let mut st = ConnectionStateData::default();
//! let mut diag = Diagnostics::new();
//! let mut algo = CloseConnectionAlgo::new(CloseConnectionAlgoParams);
//!
//! // Closing a connection that was never opened completes without I/O
//! let action = algo.resume(&mut st, &mut diag, Ok(()));
//! assert!(matches!(action, NextAction::Done(Ok(()))));
//! ```

pub mod buffer_pool;
pub mod buffer_set;
pub mod diagnostics;
pub mod error;
pub mod opts;
pub mod protocol;
pub mod state;

#[cfg(feature = "sync")]
pub mod sync;

#[cfg(feature = "tokio")]
pub mod tokio;

pub use buffer_set::BufferSet;
pub use diagnostics::Diagnostics;
pub use error::{Error, Result, ServerError};
pub use opts::{Opts, SslMode};
pub use protocol::CharacterSet;
pub use protocol::backend::{ColumnDefinition, OkPacket, TextRow};
pub use state::{ConnectionStatus, QueryResult, ResultSetHead};
