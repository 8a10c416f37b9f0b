//! COM_RESET_CONNECTION.

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::protocol::frontend::write_reset_connection;

use super::read_ok::ReadOkResponseAlgo;
use super::{Algorithm, ConnectionStateData, NextAction};

/// Parameters of [`ResetConnectionAlgo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResetConnectionAlgoParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    WritingReset,
    ReadingResponse,
    Finished,
}

/// Reset the session (variables, temporary tables, transactions) without
/// re-authenticating.
///
/// The server reverts to its default character set, so the session
/// character set becomes unknown on success.
#[derive(Debug)]
pub struct ResetConnectionAlgo {
    resume_point: ResumePoint,
    read_response: ReadOkResponseAlgo,
}

impl ResetConnectionAlgo {
    /// Create a new reset algorithm.
    pub fn new(_params: ResetConnectionAlgoParams) -> Self {
        Self {
            resume_point: ResumePoint::Start,
            read_response: ReadOkResponseAlgo::new(),
        }
    }

    fn step_read(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.read_response.resume(st, diag, prev) {
            NextAction::Done(result) => {
                self.resume_point = ResumePoint::Finished;
                if result.is_ok() {
                    st.reset_session();
                }
                NextAction::Done(result)
            }
            act => act,
        }
    }
}

impl Algorithm for ResetConnectionAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            ResumePoint::Start => {
                if let Err(e) = st.check_ready() {
                    self.resume_point = ResumePoint::Finished;
                    return NextAction::Done(Err(e));
                }
                write_reset_connection(&mut st.buffers);
                self.resume_point = ResumePoint::WritingReset;
                NextAction::Write
            }
            ResumePoint::WritingReset => {
                if let Err(e) = prev {
                    self.resume_point = ResumePoint::Finished;
                    return NextAction::Done(Err(e));
                }
                self.resume_point = ResumePoint::ReadingResponse;
                self.step_read(st, diag, Ok(()))
            }
            ResumePoint::ReadingResponse => self.step_read(st, diag, prev),
            ResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::CharacterSet;
    use crate::state::test_util::{ERR_PACKET, OK_PACKET, connected_state, deliver};

    #[test]
    fn success_forgets_charset() {
        let mut st = connected_state();
        st.set_charset(Some(CharacterSet::LATIN1));
        let mut diag = Diagnostics::new();
        let mut algo = ResetConnectionAlgo::new(ResetConnectionAlgoParams);

        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Write));
        assert_eq!(st.buffers.write_buffer, [1, 0, 0, 0, 0x1F]);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, OK_PACKET);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Ok(()))));
        assert_eq!(st.charset(), None);
    }

    #[test]
    fn failure_keeps_charset() {
        let mut st = connected_state();
        st.set_charset(Some(CharacterSet::LATIN1));
        let mut diag = Diagnostics::new();
        let mut algo = ResetConnectionAlgo::new(ResetConnectionAlgoParams);

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, ERR_PACKET);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Err(_))));
        assert_eq!(st.charset(), Some(CharacterSet::LATIN1));
    }
}
