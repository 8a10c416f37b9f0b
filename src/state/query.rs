//! COM_QUERY with text protocol result sets.
//!
//! A query is split into two algorithms so that large result sets can be
//! streamed:
//! - [`StartQueryAlgo`] sends the query and reads the column definitions,
//!   leaving the connection [`InProgress`](super::ConnectionStatus::InProgress)
//!   if rows follow.
//! - [`ReadSomeRowsAlgo`] reads rows until a batch is full or the result set
//!   ends, which returns the connection to `Connected`.
//!
//! [`QueryAlgo`] composes both and buffers the whole result.

use crate::diagnostics::Diagnostics;
use crate::error::{Error, Result};
use crate::protocol::backend::resultset::{parse_text_row, read_column_count};
use crate::protocol::backend::response::process_err;
use crate::protocol::backend::{ColumnDefinition, OkPacket, TextRow, header, is_end_of_rows};
use crate::protocol::frontend::write_query;

use super::{Algorithm, ConnectionStateData, ConnectionStatus, NextAction};

/// Head of a query response: column definitions, or the OK packet of a
/// statement that returns no rows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSetHead {
    pub columns: Vec<ColumnDefinition>,
    /// Set when the statement produced no result set
    pub ok: Option<OkPacket>,
}

impl ResultSetHead {
    /// Returns true if rows follow.
    pub fn has_rows(&self) -> bool {
        self.ok.is_none()
    }
}

/// Parameters of [`StartQueryAlgo`].
#[derive(Debug, Clone)]
pub struct StartQueryAlgoParams {
    pub sql: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartResumePoint {
    Start,
    WritingQuery,
    ReadingResponse,
    ReadingColumns,
    ReadingColumnsEof,
    Finished,
}

/// Send a text query and read the result set head.
#[derive(Debug)]
pub struct StartQueryAlgo {
    resume_point: StartResumePoint,
    sql: String,
    num_columns: usize,
    head: ResultSetHead,
    output: Option<ResultSetHead>,
}

impl StartQueryAlgo {
    /// Create a new start-query algorithm.
    pub fn new(params: StartQueryAlgoParams) -> Self {
        Self {
            resume_point: StartResumePoint::Start,
            sql: params.sql,
            num_columns: 0,
            head: ResultSetHead::default(),
            output: None,
        }
    }

    /// Take the result set head after the algorithm finished successfully.
    pub fn take_output(&mut self) -> Option<ResultSetHead> {
        self.output.take()
    }

    fn fail(&mut self, err: Error) -> NextAction {
        self.resume_point = StartResumePoint::Finished;
        NextAction::Done(Err(err))
    }

    fn finish(&mut self) -> NextAction {
        self.resume_point = StartResumePoint::Finished;
        self.output = Some(std::mem::take(&mut self.head));
        NextAction::ok()
    }

    fn on_first_response(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
    ) -> NextAction {
        let payload = &st.buffers.read_buffer;
        match payload.first() {
            Some(&header::OK) => match OkPacket::parse(payload) {
                Ok(ok) => {
                    st.apply_ok(&ok);
                    self.head.ok = Some(ok);
                    self.finish()
                }
                Err(e) => self.fail(e),
            },
            Some(&header::ERR) => {
                let err = process_err(payload, diag);
                self.fail(err)
            }
            Some(&header::NULL_VALUE) => {
                self.fail(Error::Unsupported("LOAD DATA LOCAL INFILE is not supported".into()))
            }
            _ => match read_column_count(payload) {
                Ok(n) => {
                    tracing::trace!(columns = n, "result set");
                    self.num_columns = n;
                    self.head.columns = Vec::with_capacity(n);
                    self.resume_point = StartResumePoint::ReadingColumns;
                    NextAction::Read
                }
                Err(e) => self.fail(e),
            },
        }
    }

    fn columns_done(&mut self, st: &mut ConnectionStateData) -> NextAction {
        st.begin_rows(self.num_columns);
        self.finish()
    }
}

impl Algorithm for StartQueryAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        if self.resume_point == StartResumePoint::Finished {
            return NextAction::resumed_after_done();
        }
        if self.resume_point != StartResumePoint::Start {
            if let Err(e) = prev {
                return self.fail(e);
            }
        }

        match self.resume_point {
            StartResumePoint::Start => {
                if let Err(e) = st.check_ready() {
                    return self.fail(e);
                }
                tracing::debug!(sql = %self.sql, "query");
                write_query(&mut st.buffers, &self.sql);
                self.resume_point = StartResumePoint::WritingQuery;
                NextAction::Write
            }
            StartResumePoint::WritingQuery => {
                self.resume_point = StartResumePoint::ReadingResponse;
                NextAction::Read
            }
            StartResumePoint::ReadingResponse => self.on_first_response(st, diag),
            StartResumePoint::ReadingColumns => {
                match ColumnDefinition::parse(&st.buffers.read_buffer) {
                    Ok(column) => self.head.columns.push(column),
                    Err(e) => return self.fail(e),
                }
                if self.head.columns.len() < self.num_columns {
                    return NextAction::Read;
                }
                if st.deprecate_eof() {
                    self.columns_done(st)
                } else {
                    self.resume_point = StartResumePoint::ReadingColumnsEof;
                    NextAction::Read
                }
            }
            StartResumePoint::ReadingColumnsEof => {
                if !is_end_of_rows(&st.buffers.read_buffer) {
                    return self.fail(Error::Protocol(
                        "Expected EOF packet after column definitions".into(),
                    ));
                }
                self.columns_done(st)
            }
            StartResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}

/// Parameters of [`ReadSomeRowsAlgo`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadSomeRowsAlgoParams {
    /// Maximum number of rows to read; 0 reads until the end of the result set
    pub max_rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RowsResumePoint {
    Start,
    ReadingRows,
    Finished,
}

/// Read rows of the pending result set.
///
/// Finishes after `max_rows` rows, or at the end of the result set. In the
/// latter case [`take_end`](Self::take_end) returns the terminating packet.
#[derive(Debug)]
pub struct ReadSomeRowsAlgo {
    resume_point: RowsResumePoint,
    max_rows: usize,
    rows: Vec<TextRow>,
    end: Option<OkPacket>,
}

impl ReadSomeRowsAlgo {
    /// Create a new row reading algorithm.
    pub fn new(params: ReadSomeRowsAlgoParams) -> Self {
        Self {
            resume_point: RowsResumePoint::Start,
            max_rows: params.max_rows,
            rows: Vec::new(),
            end: None,
        }
    }

    /// Take the rows read so far.
    pub fn take_rows(&mut self) -> Vec<TextRow> {
        std::mem::take(&mut self.rows)
    }

    /// Take the packet that ended the result set, if the end was reached.
    pub fn take_end(&mut self) -> Option<OkPacket> {
        self.end.take()
    }

    fn done(&mut self, result: Result<()>) -> NextAction {
        self.resume_point = RowsResumePoint::Finished;
        NextAction::Done(result)
    }
}

impl Algorithm for ReadSomeRowsAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            RowsResumePoint::Start => match st.status() {
                ConnectionStatus::InProgress => {
                    self.resume_point = RowsResumePoint::ReadingRows;
                    NextAction::Read
                }
                ConnectionStatus::NotConnected => self.done(Err(Error::NotConnected)),
                ConnectionStatus::Connected => {
                    self.done(Err(Error::InvalidUsage("no result set is pending".into())))
                }
            },
            RowsResumePoint::ReadingRows => {
                if let Err(e) = prev {
                    return self.done(Err(e));
                }
                let payload = &st.buffers.read_buffer;
                if payload.first() == Some(&header::ERR) {
                    let err = process_err(payload, diag);
                    st.end_rows();
                    return self.done(Err(err));
                }
                if is_end_of_rows(payload) {
                    return match OkPacket::parse_end_of_rows(payload, st.deprecate_eof()) {
                        Ok(ok) => {
                            st.apply_ok(&ok);
                            st.end_rows();
                            self.end = Some(ok);
                            self.done(Ok(()))
                        }
                        Err(e) => self.done(Err(e)),
                    };
                }
                match parse_text_row(payload, st.pending_columns()) {
                    Ok(row) => self.rows.push(row),
                    Err(e) => return self.done(Err(e)),
                }
                if self.max_rows != 0 && self.rows.len() >= self.max_rows {
                    self.done(Ok(()))
                } else {
                    NextAction::Read
                }
            }
            RowsResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}

/// Fully buffered result of [`QueryAlgo`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryResult {
    pub columns: Vec<ColumnDefinition>,
    pub rows: Vec<TextRow>,
    pub affected_rows: u64,
    pub last_insert_id: u64,
    pub warnings: u16,
}

impl QueryResult {
    fn from_parts(columns: Vec<ColumnDefinition>, rows: Vec<TextRow>, ok: OkPacket) -> Self {
        Self {
            columns,
            rows,
            affected_rows: ok.affected_rows,
            last_insert_id: ok.last_insert_id,
            warnings: ok.warnings,
        }
    }
}

/// Parameters of [`QueryAlgo`].
#[derive(Debug, Clone)]
pub struct QueryAlgoParams {
    pub sql: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryResumePoint {
    Starting,
    ReadingRows,
    Finished,
}

/// Run a text query and collect every row.
#[derive(Debug)]
pub struct QueryAlgo {
    resume_point: QueryResumePoint,
    start: StartQueryAlgo,
    read_rows: ReadSomeRowsAlgo,
    columns: Vec<ColumnDefinition>,
    output: Option<QueryResult>,
}

impl QueryAlgo {
    /// Create a new query algorithm.
    pub fn new(params: QueryAlgoParams) -> Self {
        Self {
            resume_point: QueryResumePoint::Starting,
            start: StartQueryAlgo::new(StartQueryAlgoParams { sql: params.sql }),
            read_rows: ReadSomeRowsAlgo::new(ReadSomeRowsAlgoParams { max_rows: 0 }),
            columns: Vec::new(),
            output: None,
        }
    }

    /// Take the result after the algorithm finished successfully.
    pub fn take_output(&mut self) -> Option<QueryResult> {
        self.output.take()
    }

    fn step_start(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.start.resume(st, diag, prev) {
            NextAction::Done(Ok(())) => {
                let head = self.start.take_output().unwrap_or_default();
                match head.ok {
                    Some(ok) => {
                        self.resume_point = QueryResumePoint::Finished;
                        self.output = Some(QueryResult::from_parts(Vec::new(), Vec::new(), ok));
                        NextAction::ok()
                    }
                    None => {
                        self.columns = head.columns;
                        self.resume_point = QueryResumePoint::ReadingRows;
                        self.step_rows(st, diag, Ok(()))
                    }
                }
            }
            NextAction::Done(Err(e)) => {
                self.resume_point = QueryResumePoint::Finished;
                NextAction::Done(Err(e))
            }
            act => act,
        }
    }

    fn step_rows(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.read_rows.resume(st, diag, prev) {
            NextAction::Done(result) => {
                self.resume_point = QueryResumePoint::Finished;
                if result.is_ok() {
                    let ok = self.read_rows.take_end().unwrap_or_default();
                    let rows = self.read_rows.take_rows();
                    let columns = std::mem::take(&mut self.columns);
                    self.output = Some(QueryResult::from_parts(columns, rows, ok));
                }
                NextAction::Done(result)
            }
            act => act,
        }
    }
}

impl Algorithm for QueryAlgo {
    fn resume(
        &mut self,
        st: &mut ConnectionStateData,
        diag: &mut Diagnostics,
        prev: Result<()>,
    ) -> NextAction {
        match self.resume_point {
            QueryResumePoint::Starting => self.step_start(st, diag, prev),
            QueryResumePoint::ReadingRows => self.step_rows(st, diag, prev),
            QueryResumePoint::Finished => NextAction::resumed_after_done(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::backend::resultset::tests::column_payload;
    use crate::protocol::types::capabilities::CLIENT_PROTOCOL_41;
    use crate::state::test_util::{ERR_PACKET, connected_state, deliver, io_error};

    const END_OF_ROWS: &[u8] = &[0xFE, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00];

    fn start(sql: &str) -> StartQueryAlgo {
        StartQueryAlgo::new(StartQueryAlgoParams { sql: sql.into() })
    }

    fn rows(max_rows: usize) -> ReadSomeRowsAlgo {
        ReadSomeRowsAlgo::new(ReadSomeRowsAlgoParams { max_rows })
    }

    /// Drive `start` up to the result set head with two columns.
    fn start_two_columns(st: &mut ConnectionStateData, diag: &mut Diagnostics) -> ResultSetHead {
        let mut algo = start("SELECT id, name FROM t");
        assert!(matches!(algo.resume(st, diag, Ok(())), NextAction::Write));
        assert!(matches!(algo.resume(st, diag, Ok(())), NextAction::Read));
        deliver(st, &[2]);
        assert!(matches!(algo.resume(st, diag, Ok(())), NextAction::Read));
        deliver(st, &column_payload("id"));
        assert!(matches!(algo.resume(st, diag, Ok(())), NextAction::Read));
        deliver(st, &column_payload("name"));
        assert!(matches!(algo.resume(st, diag, Ok(())), NextAction::Done(Ok(()))));
        algo.take_output().unwrap()
    }

    #[test]
    fn start_reads_columns() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let head = start_two_columns(&mut st, &mut diag);

        assert!(head.has_rows());
        assert_eq!(head.columns.len(), 2);
        assert_eq!(head.columns[1].name, "name");
        assert_eq!(st.status(), ConnectionStatus::InProgress);
        assert_eq!(st.pending_columns(), 2);
    }

    #[test]
    fn start_with_legacy_eof() {
        let mut st = connected_state();
        st.set_session("5.7.44".into(), 1, CLIENT_PROTOCOL_41);
        let mut diag = Diagnostics::new();
        let mut algo = start("SELECT 1");

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, &[1]);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, &column_payload("1"));
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, &[0xFE, 0x00, 0x00, 0x02, 0x00]);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Ok(()))));
        assert_eq!(st.status(), ConnectionStatus::InProgress);
    }

    #[test]
    fn start_without_rows() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let mut algo = start("UPDATE t SET x = 1");

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, &[0x00, 0x03, 0x00, 0x02, 0x00, 0x00, 0x00]);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Ok(()))));

        let head = algo.take_output().unwrap();
        assert!(!head.has_rows());
        assert_eq!(head.ok.map(|ok| ok.affected_rows), Some(3));
        assert_eq!(st.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn start_server_error() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let mut algo = start("SELEC 1");

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, ERR_PACKET);
        let act = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(e)) if e.server_code() == Some(1096)));
        assert_eq!(st.status(), ConnectionStatus::Connected);
        assert!(algo.take_output().is_none());
    }

    #[test]
    fn start_rejects_local_infile() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let mut algo = start("LOAD DATA LOCAL INFILE 'x' INTO TABLE t");

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, b"\xFBx");
        let act = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::Unsupported(_)))));
    }

    #[test]
    fn start_rejects_huge_column_count() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let mut algo = start("SELECT *");

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        // 8-byte length-encoded count far beyond any real result set
        deliver(&mut st, &[0xFE, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        let act = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::Protocol(_)))));
        assert_eq!(st.status(), ConnectionStatus::Connected);
        assert_eq!(st.pending_columns(), 0);
    }

    #[test]
    fn start_while_reading_rows_is_rejected() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let _ = start_two_columns(&mut st, &mut diag);

        let mut algo = start("SELECT 2");
        let act = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::EngagedInMultiFunction))));
    }

    #[test]
    fn read_rows_in_batches() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let _ = start_two_columns(&mut st, &mut diag);

        let mut batch = rows(2);
        assert!(matches!(batch.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, &[1, b'1', 1, b'a']);
        assert!(matches!(batch.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, &[1, b'2', 0xFB]);
        assert!(matches!(batch.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Ok(()))));
        assert_eq!(batch.take_rows().len(), 2);
        assert!(batch.take_end().is_none());
        assert_eq!(st.status(), ConnectionStatus::InProgress);

        let mut rest = rows(2);
        let _ = rest.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, END_OF_ROWS);
        assert!(matches!(rest.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Ok(()))));
        assert!(rest.take_rows().is_empty());
        assert!(rest.take_end().is_some());
        assert_eq!(st.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn read_rows_without_pending_result() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let act = rows(0).resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::InvalidUsage(_)))));
    }

    #[test]
    fn error_mid_result_set() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let _ = start_two_columns(&mut st, &mut diag);

        let mut algo = rows(0);
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, ERR_PACKET);
        let act = algo.resume(&mut st, &mut diag, Ok(()));
        assert!(matches!(act, NextAction::Done(Err(Error::Server(_)))));
        assert_eq!(st.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn query_collects_everything() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let mut algo = QueryAlgo::new(QueryAlgoParams {
            sql: "SELECT id FROM t".into(),
        });

        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Write));
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, &[1]);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        deliver(&mut st, &column_payload("id"));
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        for value in [b'1', b'2', b'3'] {
            deliver(&mut st, &[1, value]);
            assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Read));
        }
        deliver(&mut st, END_OF_ROWS);
        assert!(matches!(algo.resume(&mut st, &mut diag, Ok(())), NextAction::Done(Ok(()))));

        let result = algo.take_output().unwrap();
        assert_eq!(result.columns.len(), 1);
        assert_eq!(result.rows.len(), 3);
        assert_eq!(result.rows[2], vec![Some(b"3".to_vec())]);
        assert_eq!(st.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn query_io_error_while_reading_rows() {
        let mut st = connected_state();
        let mut diag = Diagnostics::new();
        let mut algo = QueryAlgo::new(QueryAlgoParams {
            sql: "SELECT id FROM t".into(),
        });

        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, &[1]);
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        deliver(&mut st, &column_payload("id"));
        let _ = algo.resume(&mut st, &mut diag, Ok(()));
        let reset = io_error(std::io::ErrorKind::ConnectionReset);
        let act = algo.resume(&mut st, &mut diag, Err(reset));
        assert!(matches!(act, NextAction::Done(Err(Error::Io(_)))));
        assert!(algo.take_output().is_none());
    }
}
