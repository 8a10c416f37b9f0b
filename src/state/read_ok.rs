//! Read a single OK/ERR response.

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::protocol::backend::Response;

use super::{Algorithm, ConnectionStateData, NextAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    Reading,
    Finished,
}

/// Read one packet that must be an OK or ERR packet.
///
/// Used as a sub-algorithm by commands whose only reply is OK/ERR.
#[derive(Debug)]
pub struct ReadOkResponseAlgo {
    resume_point: ResumePoint,
}

impl ReadOkResponseAlgo {
    /// Create a new read-OK algorithm.
    pub fn new() -> Self {
        Self {
            resume_point: ResumePoint::Start,
        }
    }
}

impl Default for ReadOkResponseAlgo {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for ReadOkResponseAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            ResumePoint::Start => {
                self.resume_point = ResumePoint::Reading;
                NextAction::Read
            }
            ResumePoint::Reading => {
                self.resume_point = ResumePoint::Finished;
                if let Err(e) = prev {
                    return NextAction::Done(Err(e));
                }
                match Response::parse(&st.buffers.read_buffer) {
                    Ok(Response::Ok(ok)) => {
                        st.apply_ok(&ok);
                        NextAction::ok()
                    }
                    Ok(Response::Err(err)) => NextAction::Done(Err(err.into_error(diag))),
                    Err(e) => NextAction::Done(Err(e)),
                }
            }
            ResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}
