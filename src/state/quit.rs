//! COM_QUIT.

use std::io::ErrorKind;

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::protocol::backend::header;
use crate::protocol::backend::response::process_err;
use crate::protocol::frontend::write_quit;

use super::{Algorithm, ConnectionStateData, ConnectionStatus, NextAction};

/// Parameters of [`QuitConnectionAlgo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct QuitConnectionAlgoParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    WritingQuit,
    ShuttingDownTls,
    AwaitingEof,
    Finished,
}

/// Send COM_QUIT and wait for the server to drop the session.
///
/// Over TLS the confirmation is a TLS shutdown, whose outcome is ignored
/// because servers usually close the socket without a close_notify. Over a
/// plain transport the confirmation is a read: end-of-stream (or a packet)
/// means the server processed the quit.
///
/// When the session was reading a result set, unread row packets still sit
/// in front of the server's reply. Whatever the read returns then (a stale
/// row, or a sequence mismatch reported by the driver) confirms the quit;
/// only transport errors are reported.
#[derive(Debug)]
pub struct QuitConnectionAlgo {
    resume_point: ResumePoint,
    rows_pending: bool,
}

impl QuitConnectionAlgo {
    /// Create a new quit algorithm.
    pub fn new(_params: QuitConnectionAlgoParams) -> Self {
        Self {
            resume_point: ResumePoint::Start,
            rows_pending: false,
        }
    }

    fn finish(&mut self, st: &mut ConnectionStateData, result: Result<()>) -> NextAction {
        self.resume_point = ResumePoint::Finished;
        st.mark_disconnected();
        NextAction::Done(result)
    }
}

impl Algorithm for QuitConnectionAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            ResumePoint::Start => {
                self.rows_pending = st.status() == ConnectionStatus::InProgress;
                write_quit(&mut st.buffers);
                self.resume_point = ResumePoint::WritingQuit;
                NextAction::Write
            }
            ResumePoint::WritingQuit => {
                if let Err(e) = prev {
                    return self.finish(st, Err(e));
                }
                if st.tls_active() {
                    self.resume_point = ResumePoint::ShuttingDownTls;
                    NextAction::SslShutdown
                } else {
                    self.resume_point = ResumePoint::AwaitingEof;
                    NextAction::Read
                }
            }
            ResumePoint::ShuttingDownTls => {
                if let Err(e) = prev {
                    tracing::debug!(error = %e, "ignoring TLS shutdown failure after COM_QUIT");
                }
                self.finish(st, Ok(()))
            }
            ResumePoint::AwaitingEof => {
                let result = match prev {
                    Ok(()) if self.rows_pending => Ok(()),
                    Err(Error::Protocol(e)) if self.rows_pending => {
                        tracing::debug!(error = %e, "discarding unread rows after COM_QUIT");
                        Ok(())
                    }
                    Ok(()) if st.buffers.read_buffer.first() == Some(&header::ERR) => {
                        Err(process_err(&st.buffers.read_buffer, diag))
                    }
                    Ok(()) => Ok(()),
                    Err(e) if e.is_io_kind(ErrorKind::UnexpectedEof) => Ok(()),
                    Err(e) => Err(e),
                };
                self.finish(st, result)
            }
            ResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}
