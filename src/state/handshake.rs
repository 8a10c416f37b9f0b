//! Connection phase: greeting, optional TLS upgrade, authentication.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::opts::SslMode;
use crate::protocol::backend::response::process_err;
use crate::protocol::backend::{
    AuthMoreData, AuthSwitchRequest, InitialHandshake, OkPacket, header,
};
use crate::protocol::frontend::auth::{
    caching_sha2, cleartext_password, compute_auth_response, plugin,
};
use crate::protocol::frontend::{
    HandshakeResponse, write_auth_data, write_handshake_response, write_ssl_request,
};
use crate::protocol::types::CharacterSet;
use crate::protocol::types::capabilities::{
    CLIENT_CONNECT_WITH_DB, CLIENT_SSL, MANDATORY, OPTIONAL,
};

use super::{Algorithm, ConnectionStateData, ConnectionStatus, NextAction};

/// Parameters of [`HandshakeAlgo`].
#[derive(Clone)]
pub struct HandshakeAlgoParams {
    pub user: String,
    pub password: String,
    pub database: Option<String>,
    pub ssl_mode: SslMode,
    pub charset: CharacterSet,
}

impl std::fmt::Debug for HandshakeAlgoParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandshakeAlgoParams")
            .field("user", &self.user)
            .field("database", &self.database)
            .field("ssl_mode", &self.ssl_mode)
            .field("charset", &self.charset)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Start,
    ReadingGreeting,
    WritingSslRequest,
    TlsHandshake,
    WritingLogin,
    ReadingAuthResult,
    WritingAuthData,
    Finished,
}

/// Run the connection phase on a freshly opened transport.
///
/// Supports `mysql_native_password` and `caching_sha2_password`, one auth
/// switch, and full `caching_sha2_password` authentication over TLS only.
/// On success the connection is `Connected` with the requested character set.
#[derive(Debug)]
pub struct HandshakeAlgo {
    resume_point: ResumePoint,
    params: HandshakeAlgoParams,
    auth_plugin: String,
    scramble: Vec<u8>,
    switched: bool,
}

impl HandshakeAlgo {
    /// Create a new handshake algorithm.
    pub fn new(params: HandshakeAlgoParams) -> Self {
        Self {
            resume_point: ResumePoint::Start,
            params,
            auth_plugin: String::new(),
            scramble: Vec::new(),
            switched: false,
        }
    }

    fn fail(&mut self, err: Error) -> NextAction {
        self.resume_point = ResumePoint::Finished;
        NextAction::Done(Err(err))
    }

    fn use_tls(&self, st: &ConnectionStateData, server_caps: u32) -> Result<bool> {
        let server_ssl = server_caps & CLIENT_SSL != 0;
        match self.params.ssl_mode {
            SslMode::Disable => Ok(false),
            SslMode::Prefer => Ok(server_ssl && st.tls_supported()),
            SslMode::Require if !server_ssl => Err(Error::Unsupported(
                "SSL is required but the server does not support it".into(),
            )),
            SslMode::Require if !st.tls_supported() => Err(Error::Unsupported(
                "SSL is required but this connection cannot use TLS".into(),
            )),
            SslMode::Require => Ok(true),
        }
    }

    fn on_greeting(&mut self, st: &mut ConnectionStateData, diag: &mut Diagnostics) -> NextAction {
        if st.buffers.read_buffer.first() == Some(&header::ERR) {
            let err = process_err(&st.buffers.read_buffer, diag);
            return self.fail(err);
        }
        let greeting = match InitialHandshake::parse(&st.buffers.read_buffer) {
            Ok(greeting) => greeting,
            Err(e) => return self.fail(e),
        };
        if greeting.capabilities & MANDATORY != MANDATORY {
            return self.fail(Error::Unsupported(format!(
                "Server {} lacks required capabilities (0x{:08X})",
                greeting.server_version,
                MANDATORY & !greeting.capabilities
            )));
        }
        let tls = match self.use_tls(st, greeting.capabilities) {
            Ok(tls) => tls,
            Err(e) => return self.fail(e),
        };

        let mut capabilities = MANDATORY | (OPTIONAL & greeting.capabilities);
        if self.params.database.is_some() {
            capabilities |= CLIENT_CONNECT_WITH_DB;
        }
        if tls {
            capabilities |= CLIENT_SSL;
        }
        tracing::debug!(
            server_version = %greeting.server_version,
            connection_id = greeting.connection_id,
            auth_plugin = %greeting.auth_plugin,
            tls,
            "server greeting"
        );

        self.auth_plugin = if greeting.auth_plugin.is_empty() {
            plugin::MYSQL_NATIVE_PASSWORD.to_string()
        } else {
            greeting.auth_plugin
        };
        self.scramble = greeting.scramble;
        st.set_session(greeting.server_version, greeting.connection_id, capabilities);

        if tls {
            write_ssl_request(&mut st.buffers, capabilities, self.params.charset.collation_id);
            self.resume_point = ResumePoint::WritingSslRequest;
            NextAction::Write
        } else {
            self.write_login(st)
        }
    }

    fn write_login(&mut self, st: &mut ConnectionStateData) -> NextAction {
        let auth_response =
            match compute_auth_response(&self.auth_plugin, &self.params.password, &self.scramble) {
                Ok(data) => data,
                Err(e) => return self.fail(e),
            };
        let response = HandshakeResponse {
            capabilities: st.capabilities(),
            collation_id: self.params.charset.collation_id,
            user: &self.params.user,
            auth_response: &auth_response,
            database: self.params.database.as_deref(),
            auth_plugin: &self.auth_plugin,
        };
        write_handshake_response(&mut st.buffers, &response);
        self.resume_point = ResumePoint::WritingLogin;
        NextAction::Write
    }

    fn write_auth(&mut self, st: &mut ConnectionStateData, data: &[u8]) -> NextAction {
        write_auth_data(&mut st.buffers, data);
        self.resume_point = ResumePoint::WritingAuthData;
        NextAction::Write
    }

    fn on_auth_result(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
    ) -> NextAction {
        let payload = &st.buffers.read_buffer;
        match payload.first() {
            Some(&header::OK) => match OkPacket::parse(payload) {
                Ok(ok) => {
                    st.apply_ok(&ok);
                    st.set_charset(Some(self.params.charset));
                    st.set_status(ConnectionStatus::Connected);
                    self.resume_point = ResumePoint::Finished;
                    tracing::debug!(connection_id = st.connection_id(), "authenticated");
                    NextAction::ok()
                }
                Err(e) => self.fail(e),
            },
            Some(&header::ERR) => {
                let err = process_err(payload, diag);
                self.fail(err)
            }
            Some(&header::EOF) => {
                if self.switched {
                    return self.fail(Error::Protocol("Repeated auth switch request".into()));
                }
                let request = match AuthSwitchRequest::parse(payload) {
                    Ok(request) => request,
                    Err(e) => return self.fail(e),
                };
                tracing::debug!(plugin = %request.plugin, "auth switch");
                let password = &self.params.password;
                let auth = compute_auth_response(&request.plugin, password, &request.scramble);
                let data = match auth {
                    Ok(data) => data,
                    Err(e) => return self.fail(e),
                };
                self.switched = true;
                self.auth_plugin = request.plugin;
                self.scramble = request.scramble;
                self.write_auth(st, &data)
            }
            Some(&header::AUTH_MORE_DATA) => {
                let more = match AuthMoreData::parse(payload) {
                    Ok(more) => more,
                    Err(e) => return self.fail(e),
                };
                match more.data {
                    [caching_sha2::FAST_AUTH_SUCCESS] => {
                        // The OK packet follows
                        NextAction::Read
                    }
                    [caching_sha2::PERFORM_FULL_AUTH] => {
                        if !st.tls_active() {
                            return self.fail(Error::Auth(
                                "caching_sha2_password full authentication requires TLS".into(),
                            ));
                        }
                        let data = cleartext_password(&self.params.password);
                        self.write_auth(st, &data)
                    }
                    _ => self.fail(Error::Protocol(format!(
                        "Unexpected auth data from server: {:02X?}",
                        more.data
                    ))),
                }
            }
            Some(other) => self.fail(Error::Protocol(format!(
                "Unexpected packet during authentication: header 0x{other:02X}"
            ))),
            None => self.fail(Error::Protocol("Empty packet during authentication".into())),
        }
    }
}

impl Algorithm for HandshakeAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        if self.resume_point == ResumePoint::Finished {
            return NextAction::resumed_after_done();
        }
        if self.resume_point != ResumePoint::Start {
            if let Err(e) = prev {
                return self.fail(e);
            }
        }

        match self.resume_point {
            ResumePoint::Start => {
                st.buffers.reset();
                self.resume_point = ResumePoint::ReadingGreeting;
                NextAction::Read
            }
            ResumePoint::ReadingGreeting => self.on_greeting(st, diag),
            ResumePoint::WritingSslRequest => {
                self.resume_point = ResumePoint::TlsHandshake;
                NextAction::SslHandshake
            }
            ResumePoint::TlsHandshake => {
                st.set_tls_active(true);
                self.write_login(st)
            }
            ResumePoint::WritingLogin | ResumePoint::WritingAuthData => {
                self.resume_point = ResumePoint::ReadingAuthResult;
                NextAction::Read
            }
            ResumePoint::ReadingAuthResult => self.on_auth_result(st, diag),
            ResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}
