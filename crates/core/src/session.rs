use std::io::BufRead;

use crate::connection::{Connection, ExecOutcome};
use crate::dialect::{Capability, DialectConfig, Template};
use crate::error::{Error, ExecutionError};
use crate::escape::quote_identifier;
use crate::script::{self, ScriptSummary, StatementResult};
use crate::version::{self, ServerVersion};

const DEFAULT_SCHEMA: &str = "public";

/// One administrative session: exactly one underlying connection, the
/// dialect selected for the connected server, and the session-scoped
/// current-schema value. The schema lives here rather than in any
/// shared state so concurrent sessions in one process cannot interfere.
pub struct Session {
    pub(crate) conn: Box<dyn Connection>,
    dialect: DialectConfig,
    server: ServerVersion,
    current_schema: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("dialect", &self.dialect)
            .field("server", &self.server)
            .field("current_schema", &self.current_schema)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Probe the server's version and select the matching dialect.
    /// Probe failures and unsupported versions surface as the two
    /// distinct [`crate::VersionError`] variants.
    pub fn open(mut conn: Box<dyn Connection>) -> Result<Self, Error> {
        let server = version::probe(conn.as_mut())?;
        let dialect = DialectConfig::select(server.tag)?;
        Ok(Self {
            conn,
            dialect,
            server,
            current_schema: DEFAULT_SCHEMA.to_string(),
        })
    }

    #[must_use]
    pub fn dialect(&self) -> DialectConfig {
        self.dialect
    }

    #[must_use]
    pub fn server_description(&self) -> &str {
        &self.server.description
    }

    #[must_use]
    pub fn server_version(&self) -> &ServerVersion {
        &self.server
    }

    #[must_use]
    pub fn current_schema(&self) -> &str {
        &self.current_schema
    }

    /// Switch the session's working schema. Recorded on the session
    /// only after the server accepted the change.
    pub fn set_schema(&mut self, schema: &str) -> Result<(), ExecutionError> {
        let sql = format!("SET search_path TO {}", quote_identifier(schema));
        self.conn.execute(&sql)?;
        self.current_schema = schema.to_string();
        Ok(())
    }

    pub fn execute(&mut self, sql: &str) -> Result<ExecOutcome, ExecutionError> {
        self.conn.execute(sql)
    }

    /// Run one of the dialect's introspection queries (backends, locks,
    /// tablespaces) in its version-correct form.
    pub fn run_template(&mut self, template: Template) -> Result<ExecOutcome, ExecutionError> {
        let sql = self.dialect.template(template);
        self.conn.execute(sql)
    }

    /// Stream a script through the lexer/executor. Statement failures
    /// are reported through the callback; the returned error means the
    /// script text itself was truncated.
    pub fn run_script<R, F>(
        &mut self,
        input: R,
        on_statement: F,
    ) -> Result<ScriptSummary, crate::ScriptError>
    where
        R: BufRead,
        F: FnMut(&str, &StatementResult, u64),
    {
        script::run_script(self.conn.as_mut(), input, on_statement)
    }

    /// Ask the server to cancel this session's running statement, out
    /// of band. Fire-and-forget.
    #[must_use]
    pub fn cancel(&self) -> bool {
        self.conn.request_cancel()
    }

    /// Cancel another backend's running query by process id. Returns
    /// false without touching the server when the dialect lacks the
    /// call.
    pub fn cancel_backend(&mut self, pid: i32) -> Result<bool, ExecutionError> {
        if !self.dialect.has(Capability::QueryCancel) {
            return Ok(false);
        }
        self.conn
            .execute(&format!("SELECT pg_catalog.pg_cancel_backend({pid})"))?;
        Ok(true)
    }

    /// Terminate another backend by process id; 8.4+ only.
    pub fn terminate_backend(&mut self, pid: i32) -> Result<bool, ExecutionError> {
        if !self.dialect.has(Capability::QueryKill) {
            return Ok(false);
        }
        self.conn
            .execute(&format!("SELECT pg_catalog.pg_terminate_backend({pid})"))?;
        Ok(true)
    }
}
