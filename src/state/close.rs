//! Graceful close: COM_QUIT followed by a transport close.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

use super::quit::{QuitConnectionAlgo, QuitConnectionAlgoParams};
use super::{Algorithm, ConnectionStateData, ConnectionStatus, NextAction};

/// Parameters of [`CloseConnectionAlgo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CloseConnectionAlgoParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    Quitting,
    ClosingTransport,
    Finished,
}

/// Terminate a connection gracefully if possible, and always close the transport.
///
/// - Not connected: done immediately, no I/O.
/// - Otherwise (idle or mid-operation) runs [`QuitConnectionAlgo`], then
///   requests [`NextAction::Close`] whatever the quit outcome was.
/// - Result: the quit error if quitting failed, otherwise the close outcome.
#[derive(Debug)]
pub struct CloseConnectionAlgo {
    resume_point: ResumePoint,
    quit: QuitConnectionAlgo,
    stored_error: Option<Error>,
}

impl CloseConnectionAlgo {
    /// Create a new close algorithm.
    pub fn new(_params: CloseConnectionAlgoParams) -> Self {
        Self {
            resume_point: ResumePoint::Start,
            quit: QuitConnectionAlgo::new(QuitConnectionAlgoParams),
            stored_error: None,
        }
    }

    fn step_quit(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.quit.resume(st, diag, prev) {
            NextAction::Done(result) => {
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "quit failed, closing transport anyway");
                }
                self.stored_error = result.err();
                self.resume_point = ResumePoint::ClosingTransport;
                NextAction::Close
            }
            act => act,
        }
    }
}

impl Algorithm for CloseConnectionAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            ResumePoint::Start => {
                // A multi-step operation in progress does not prevent closing
                if st.status() == ConnectionStatus::NotConnected {
                    self.resume_point = ResumePoint::Finished;
                    return NextAction::ok();
                }
                self.resume_point = ResumePoint::Quitting;
                self.step_quit(st, diag, prev)
            }
            ResumePoint::Quitting => self.step_quit(st, diag, prev),
            ResumePoint::ClosingTransport => {
                self.resume_point = ResumePoint::Finished;
                st.mark_disconnected();
                match self.stored_error.take() {
                    Some(quit_error) => NextAction::Done(Err(quit_error)),
                    None => NextAction::Done(prev),
                }
            }
            ResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}
