//! COM_PING.

use crate::diagnostics::Diagnostics;
use crate::error::Result;
use crate::protocol::frontend::write_ping;

use super::read_ok::ReadOkResponseAlgo;
use super::{Algorithm, ConnectionStateData, NextAction};

/// Parameters of [`PingAlgo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PingAlgoParams;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    WritingPing,
    ReadingResponse,
    Finished,
}

/// Check that the server is alive.
#[derive(Debug)]
pub struct PingAlgo {
    resume_point: ResumePoint,
    read_response: ReadOkResponseAlgo,
}

impl PingAlgo {
    /// Create a new ping algorithm.
    pub fn new(_params: PingAlgoParams) -> Self {
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
        let act = self.read_response.resume(st, diag, prev);
        if act.is_done() {
            self.resume_point = ResumePoint::Finished;
        }
        act
    }
}

impl Algorithm for PingAlgo {
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
                write_ping(&mut st.buffers);
                self.resume_point = ResumePoint::WritingPing;
                NextAction::Write
            }
            ResumePoint::WritingPing => {
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
    use crate::error::Error;
    use crate::state::ConnectionStatus;
    use crate::state::test_util::{OK_PACKET, connected_state, deliver};

    #[test]
    fn ping_round_trip() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let mut algo = PingAlgo::new(PingAlgoParams);

        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Write));
        assert_eq!(st.buffers.write_buffer, [1, 0, 0, 0, 0x0E]);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, OK_PACKET);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Ok(()))));
    }

    #[test]
    fn not_connected_fails_without_io() {
        let mut st = connected_state();
        st.set_status(ConnectionStatus::NotConnected);
        let mut diag = Diagnostics::new();
        let mut algo = PingAlgo::new(PingAlgoParams);

        let act = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::NotConnected))));
        assert!(st.buffers.write_buffer.is_empty());
    }

    #[test]
    fn in_progress_is_rejected() {
        let mut st = connected_state();
        st.set_status(ConnectionStatus::InProgress);
        let mut diag = Diagnostics::new();
        let mut algo = PingAlgo::new(PingAlgoParams);

        let act = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::EngagedInMultiFunction))));
    }
}
