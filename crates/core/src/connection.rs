use crate::error::ExecutionError;

const BEGIN_SQL: &str = "BEGIN";
const COMMIT_SQL: &str = "COMMIT";
const ROLLBACK_SQL: &str = "ROLLBACK";

/// What the server reported for one executed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecOutcome {
    /// A command tag with its affected-row count.
    Command { affected: u64 },
    /// A result set; only the row count is surfaced here.
    Rows { count: u64 },
    /// The statement opened a bulk-data transfer; the caller must feed
    /// raw lines via `copy_line` and finish with `copy_end`.
    CopyIn,
}

/// Boundary to the lower-level driver that owns the wire protocol.
///
/// One session owns exactly one connection and issues one statement at
/// a time; implementations do not need to be re-entrant.
pub trait Connection {
    fn execute(&mut self, sql: &str) -> Result<ExecOutcome, ExecutionError>;

    /// First column of the first row, if any. Used by the version probe.
    fn query_scalar(&mut self, sql: &str) -> Result<Option<String>, ExecutionError>;

    /// Forward one raw line of bulk-copy data. Only valid after
    /// `execute` returned [`ExecOutcome::CopyIn`].
    fn copy_line(&mut self, line: &str) -> Result<(), ExecutionError>;

    /// Terminate the bulk-copy transfer.
    fn copy_end(&mut self) -> Result<(), ExecutionError>;

    /// Server-side process id of this session, when known.
    fn backend_pid(&self) -> Option<i32>;

    /// Ask the server to cancel whatever this connection is currently
    /// running, out of band over a second connection. Fire-and-forget.
    fn request_cancel(&self) -> bool;
}

/// RAII transaction guard: BEGIN on creation, explicit `commit`,
/// ROLLBACK on drop. Holding the guard holds the exclusive borrow of
/// the connection, so a second transaction cannot be started while one
/// is open.
pub struct Transaction<'a> {
    conn: &'a mut dyn Connection,
    done: bool,
}

impl<'a> Transaction<'a> {
    pub fn begin(conn: &'a mut dyn Connection) -> Result<Self, ExecutionError> {
        conn.execute(BEGIN_SQL)?;
        Ok(Self { conn, done: false })
    }

    pub fn execute(&mut self, sql: &str) -> Result<ExecOutcome, ExecutionError> {
        self.conn.execute(sql)
    }

    pub fn commit(mut self) -> Result<(), ExecutionError> {
        self.done = true;
        self.conn.execute(COMMIT_SQL)?;
        Ok(())
    }
}

impl Drop for Transaction<'_> {
    fn drop(&mut self) {
        if !self.done {
            // The rollback result cannot be reported from drop; a broken
            // connection surfaces on the next statement anyway.
            let _ = self.conn.execute(ROLLBACK_SQL);
        }
    }
}
