//! `SET NAMES`.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::protocol::frontend::write_query;
use crate::protocol::types::CharacterSet;

use super::read_ok::ReadOkResponseAlgo;
use super::{Algorithm, ConnectionStateData, NextAction};

/// Parameters of [`SetCharacterSetAlgo`].
#[derive(Debug, Clone, Copy)]
pub struct SetCharacterSetAlgoParams {
    pub charset: CharacterSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    WritingQuery,
    ReadingResponse,
    Finished,
}

/// Change the session character set and record it in the connection state.
#[derive(Debug)]
pub struct SetCharacterSetAlgo {
    resume_point: ResumePoint,
    charset: CharacterSet,
    read_response: ReadOkResponseAlgo,
}

impl SetCharacterSetAlgo {
    /// Create a new set-character-set algorithm.
    pub fn new(params: SetCharacterSetAlgoParams) -> Self {
        Self {
            resume_point: ResumePoint::Start,
            charset: params.charset,
            read_response: ReadOkResponseAlgo::new(),
        }
    }

    fn fail(&mut self, err: Error) -> NextAction {
        self.resume_point = ResumePoint::Finished;
        NextAction::Done(Err(err))
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
                    st.set_charset(Some(self.charset));
                }
                NextAction::Done(result)
            }
            act => act,
        }
    }
}

impl Algorithm for SetCharacterSetAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            ResumePoint::Start => {
                if !self.charset.has_valid_name() {
                    diag.set_client_message(format!(
                        "invalid character set name: {:?}",
                        self.charset.name
                    ));
                    return self.fail(Error::InvalidUsage(format!(
                        "Invalid character set name: {}",
                        self.charset.name
                    )));
                }
                if let Err(e) = st.check_ready() {
                    return self.fail(e);
                }
                let sql = format!("SET NAMES '{}'", self.charset.name);
                write_query(&mut st.buffers, &sql);
                self.resume_point = ResumePoint::WritingQuery;
                NextAction::Write
            }
            ResumePoint::WritingQuery => {
                if let Err(e) = prev {
                    return self.fail(e);
                }
                self.resume_point = ResumePoint::ReadingResponse;
                self.step_read(st, diag, Ok(()))
            }
            ResumePoint::ReadingResponse => self.step_read(st, diag, prev),
            ResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}
