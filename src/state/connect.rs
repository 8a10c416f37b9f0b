//! Open the transport and run the handshake.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};

use super::handshake::{HandshakeAlgo, HandshakeAlgoParams};
use super::{Algorithm, ConnectionStateData, ConnectionStatus, NextAction};

/// Parameters of [`ConnectAlgo`].
#[derive(Debug, Clone)]
pub struct ConnectAlgoParams {
    pub handshake: HandshakeAlgoParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    Connecting,
    Handshaking,
    ClosingAfterFailure,
    Finished,
}

/// Connect the transport, then run [`HandshakeAlgo`].
///
/// If the handshake fails after the transport was opened, the transport is
/// closed before reporting the handshake error.
#[derive(Debug)]
pub struct ConnectAlgo {
    resume_point: ResumePoint,
    handshake: HandshakeAlgo,
    stored_error: Option<Error>,
}

impl ConnectAlgo {
    /// Create a new connect algorithm.
    pub fn new(params: ConnectAlgoParams) -> Self {
        Self {
            resume_point: ResumePoint::Start,
            handshake: HandshakeAlgo::new(params.handshake),
            stored_error: None,
        }
    }

    fn step_handshake(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.handshake.resume(st, diag, prev) {
            NextAction::Done(Ok(())) => {
                self.resume_point = ResumePoint::Finished;
                NextAction::ok()
            }
            NextAction::Done(Err(e)) => {
                tracing::debug!(error = %e, "handshake failed, closing transport");
                st.mark_disconnected();
                self.stored_error = Some(e);
                self.resume_point = ResumePoint::ClosingAfterFailure;
                NextAction::Close
            }
            act => act,
        }
    }
}

impl Algorithm for ConnectAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            ResumePoint::Start => {
                if st.status() != ConnectionStatus::NotConnected {
                    self.resume_point = ResumePoint::Finished;
                    return NextAction::Done(Err(Error::AlreadyConnected));
                }
                self.resume_point = ResumePoint::Connecting;
                NextAction::Connect
            }
            ResumePoint::Connecting => {
                if let Err(e) = prev {
                    self.resume_point = ResumePoint::Finished;
                    return NextAction::Done(Err(e));
                }
                self.resume_point = ResumePoint::Handshaking;
                self.step_handshake(st, diag, Ok(()))
            }
            ResumePoint::Handshaking => self.step_handshake(st, diag, prev),
            ResumePoint::ClosingAfterFailure => {
                if let Err(e) = prev {
                    tracing::debug!(error = %e, "ignoring close failure after handshake error");
                }
                self.resume_point = ResumePoint::Finished;
                NextAction::Done(Err(self.stored_error.take().unwrap_or(Error::ConnectionBroken)))
            }
            ResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opts::SslMode;
    use crate::protocol::types::CharacterSet;
    use crate::state::test_util::{connected_state, io_error};

    fn connect() -> ConnectAlgo {
        ConnectAlgo::new(ConnectAlgoParams {
            handshake: HandshakeAlgoParams {
                user: "root".into(),
                password: String::new(),
                database: None,
                ssl_mode: SslMode::Disable,
                charset: CharacterSet::UTF8MB4,
            },
        })
    }

    #[test]
    fn already_connected() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let act = connect().resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::AlreadyConnected))));
    }

    #[test]
    fn connect_failure_skips_close() {
        let mut st = ConnectionStateData::default();
        let mut diag = Diagnostics::new();
        let mut algo = connect();

        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Connect));
        let refused = io_error(std::io::ErrorKind::ConnectionRefused);
        let act = algo.resume(&mut st, &mut diag, Err(refused));
        assert!(matches!(
            act,
            NextAction::Done(Err(e)) if e.is_io_kind(std::io::ErrorKind::ConnectionRefused)
        ));
    }

    #[test]
    fn handshake_failure_closes_transport() {
        let mut st = ConnectionStateData::default();
        let mut diag = Diagnostics::new();
        let mut algo = connect();

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        st.buffers.read_buffer = b"\xFF\x10\x04Too many connections".to_vec();
        st.buffers.sequence_id = 1;
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Close));

        // The close outcome does not replace the handshake error
        let act = algo.resume(&mut st, &mut diag, Err(io_error(std::io::ErrorKind::BrokenPipe)));
        assert!(matches!(act, NextAction::Done(Err(e)) if e.server_code() == Some(1040)));
        assert_eq!(st.status(), ConnectionStatus::NotConnected);
    }
}
