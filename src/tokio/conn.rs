//! Asynchronous MySQL connection.

use crate::buffer_pool::GLOBAL_BUFFER_POOL;
use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::opts::Opts;
use crate::protocol::backend::TextRow;
use crate::protocol::types::CharacterSet;
use crate::state::{
    Algorithm, CloseConnectionAlgo, CloseConnectionAlgoParams, ConnectAlgo, ConnectAlgoParams,
    ConnectionStateData, ConnectionStatus, HandshakeAlgoParams, NextAction, PingAlgo,
    PingAlgoParams, QueryAlgo, QueryAlgoParams, QueryResult, ReadSomeRowsAlgo,
    ReadSomeRowsAlgoParams, ResetConnectionAlgo, ResetConnectionAlgoParams, ResultSetHead,
    SetCharacterSetAlgo, SetCharacterSetAlgoParams, StartQueryAlgo, StartQueryAlgoParams,
};

use super::stream::Stream;

/// Asynchronous MySQL connection.
///
/// Dropping a connection cannot run the quit exchange; call
/// [`close`](Self::close) to end the session gracefully.
pub struct Conn {
    stream: Option<Stream>,
    opts: Opts,
    state: ConnectionStateData,
    diag: Diagnostics,
    is_broken: bool,
}

impl Conn {
    /// Connect to a MySQL server.
    pub async fn new<O: TryInto<Opts>>(opts: O) -> Result<Self>
    where
        Error: From<O::Error>,
    {
        let opts: Opts = opts.try_into()?;
        let tls_supported = cfg!(feature = "tokio-tls") && opts.socket.is_none();
        let mut conn = Self {
            stream: None,
            state: ConnectionStateData::new(GLOBAL_BUFFER_POOL.get_buffer_set(), tls_supported),
            diag: Diagnostics::new(),
            is_broken: false,
            opts,
        };

        let mut algo = ConnectAlgo::new(ConnectAlgoParams {
            handshake: HandshakeAlgoParams {
                user: conn.opts.user.clone(),
                password: conn.opts.password.clone().unwrap_or_default(),
                database: conn.opts.database.clone(),
                ssl_mode: conn.opts.ssl_mode,
                charset: conn.opts.charset,
            },
        });
        conn.run(&mut algo).await?;
        Ok(conn)
    }

    /// Protocol status of the connection.
    pub fn status(&self) -> ConnectionStatus {
        self.state.status()
    }

    /// Details about the last failed operation.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diag
    }

    /// Server version string.
    pub fn server_version(&self) -> &str {
        self.state.server_version()
    }

    /// Server-side connection id.
    pub fn connection_id(&self) -> u32 {
        self.state.connection_id()
    }

    /// Character set of the session, if known.
    pub fn charset(&self) -> Option<CharacterSet> {
        self.state.charset()
    }

    /// Check if currently in a transaction.
    pub fn in_transaction(&self) -> bool {
        self.state.in_transaction()
    }

    /// Check if the connection is broken.
    pub fn is_broken(&self) -> bool {
        self.is_broken
    }

    /// Check that the server is alive.
    pub async fn ping(&mut self) -> Result<()> {
        self.run(&mut PingAlgo::new(PingAlgoParams)).await
    }

    /// Reset session state without re-authenticating.
    pub async fn reset_connection(&mut self) -> Result<()> {
        self.run(&mut ResetConnectionAlgo::new(ResetConnectionAlgoParams))
            .await
    }

    /// Change the session character set with `SET NAMES`.
    pub async fn set_character_set(&mut self, charset: CharacterSet) -> Result<()> {
        self.run(&mut SetCharacterSetAlgo::new(SetCharacterSetAlgoParams { charset }))
            .await
    }

    /// Execute a text query and collect all rows.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        let mut algo = QueryAlgo::new(QueryAlgoParams { sql: sql.to_string() });
        self.run(&mut algo).await?;
        Ok(algo.take_output().unwrap_or_default())
    }

    /// Execute a text query, discard rows and return the affected row count.
    pub async fn query_drop(&mut self, sql: &str) -> Result<u64> {
        self.query(sql).await.map(|result| result.affected_rows)
    }

    /// Send a text query and read its column definitions.
    pub async fn start_query(&mut self, sql: &str) -> Result<ResultSetHead> {
        let mut algo = StartQueryAlgo::new(StartQueryAlgoParams { sql: sql.to_string() });
        self.run(&mut algo).await?;
        Ok(algo.take_output().unwrap_or_default())
    }

    /// Read up to `max_rows` rows of the pending result set (0 reads all of them).
    pub async fn read_some_rows(&mut self, max_rows: usize) -> Result<Vec<TextRow>> {
        let mut algo = ReadSomeRowsAlgo::new(ReadSomeRowsAlgoParams { max_rows });
        self.run(&mut algo).await?;
        Ok(algo.take_rows())
    }

    /// Close the connection gracefully.
    pub async fn close(mut self) -> Result<()> {
        self.run(&mut CloseConnectionAlgo::new(CloseConnectionAlgoParams))
            .await
    }

    /// Drive `algo` to completion.
    async fn run<A: Algorithm>(&mut self, algo: &mut A) -> Result<()> {
        self.diag.clear();
        let mut prev = Ok(());
        loop {
            let action = algo.resume(&mut self.state, &mut self.diag, prev);
            tracing::trace!(?action, "next action");
            prev = match action {
                NextAction::Done(result) => {
                    if let Err(e) = &result {
                        if e.is_connection_broken() {
                            self.is_broken = true;
                        }
                    }
                    return result;
                }
                NextAction::Connect => self.connect_transport().await,
                NextAction::Read => match &mut self.stream {
                    Some(stream) => stream.read_packet(&mut self.state.buffers).await,
                    None => Err(Error::ConnectionBroken),
                },
                NextAction::Write => match &mut self.stream {
                    Some(stream) => stream.write_packets(&self.state.buffers).await,
                    None => Err(Error::ConnectionBroken),
                },
                NextAction::SslHandshake => self.upgrade_tls().await,
                NextAction::SslShutdown => match &mut self.stream {
                    Some(stream) => stream.shutdown_tls().await,
                    None => Ok(()),
                },
                NextAction::Close => match self.stream.take() {
                    Some(stream) => stream.close().await,
                    None => Ok(()),
                },
            };
        }
    }

    async fn connect_transport(&mut self) -> Result<()> {
        self.stream = Some(Stream::connect(&self.opts).await?);
        self.is_broken = false;
        Ok(())
    }

    #[cfg(feature = "tokio-tls")]
    async fn upgrade_tls(&mut self) -> Result<()> {
        let stream = self.stream.take().ok_or(Error::ConnectionBroken)?;
        self.stream = Some(stream.upgrade_tls(&self.opts.host).await?);
        Ok(())
    }

    #[cfg(not(feature = "tokio-tls"))]
    async fn upgrade_tls(&mut self) -> Result<()> {
        Err(Error::Unsupported(
            "TLS requested but tokio-tls feature not enabled".into(),
        ))
    }
}

impl Drop for Conn {
    fn drop(&mut self) {
        if self.state.is_connected() && !self.is_broken {
            tracing::debug!(
                connection_id = self.state.connection_id(),
                "connection dropped without close"
            );
        }
        let buffers = std::mem::take(&mut self.state.buffers);
        GLOBAL_BUFFER_POOL.return_buffer_set(buffers);
    }
}
