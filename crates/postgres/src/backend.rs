use std::io::Write as _;

use postgres::{CancelToken, Client, NoTls, SimpleQueryMessage};
use pgsteward_core::{ConnectConfig, ConnectError, Connection, ExecOutcome, ExecutionError};

const DEFAULT_HOST: &str = "127.0.0.1";
const BACKEND_PID_SQL: &str = "SELECT pg_catalog.pg_backend_pid()";

/// Live connection over the `postgres` client. The cancel token rides
/// along so [`Connection::request_cancel`] can open its own second
/// connection to the server.
pub struct PostgresBackend {
    client: Client,
    cancel: CancelToken,
    backend_pid: Option<i32>,
    pending_copy: Option<PendingCopy>,
}

/// The copy writer borrows the client, so bulk lines are buffered here
/// and written in one piece when the transfer ends. One transfer is
/// held at a time.
struct PendingCopy {
    sql: String,
    data: String,
}

pub fn connect(config: &ConnectConfig) -> Result<PostgresBackend, ConnectError> {
    let mut pg_config = postgres::Config::new();

    if let Some(socket_path) = &config.socket {
        pg_config.host_path(socket_path);
    } else if let Some(host) = &config.host {
        pg_config.host(host);
    } else {
        pg_config.host(DEFAULT_HOST);
    }
    if let Some(port) = config.port {
        pg_config.port(port);
    }
    if let Some(user) = &config.user {
        pg_config.user(user);
    }
    if let Some(password) = &config.password {
        pg_config.password(password);
    }
    pg_config.dbname(&config.database);

    let mut client = pg_config.connect(NoTls).map_err(|source| {
        let source: Box<dyn std::error::Error + Send + Sync> = Box::new(source);
        ConnectError::new(source.to_string(), Some(source))
    })?;
    let cancel = client.cancel_token();
    let backend_pid = fetch_backend_pid(&mut client);

    Ok(PostgresBackend {
        client,
        cancel,
        backend_pid,
        pending_copy: None,
    })
}

fn fetch_backend_pid(client: &mut Client) -> Option<i32> {
    client
        .query_one(BACKEND_PID_SQL, &[])
        .ok()
        .and_then(|row| row.try_get::<_, i32>(0).ok())
}

impl Connection for PostgresBackend {
    fn execute(&mut self, sql: &str) -> Result<ExecOutcome, ExecutionError> {
        // The simple-query path reports COPY FROM STDIN as an error
        // instead of a copy-in response, so the transfer start has to be
        // recognized up front.
        if is_copy_from_stdin(sql) {
            self.pending_copy = Some(PendingCopy {
                sql: sql.to_string(),
                data: String::new(),
            });
            return Ok(ExecOutcome::CopyIn);
        }

        let messages = self
            .client
            .simple_query(sql)
            .map_err(|source| map_error(sql, &source))?;
        Ok(summarize(&messages))
    }

    fn query_scalar(&mut self, sql: &str) -> Result<Option<String>, ExecutionError> {
        let messages = self
            .client
            .simple_query(sql)
            .map_err(|source| map_error(sql, &source))?;
        for message in &messages {
            if let SimpleQueryMessage::Row(row) = message {
                let value = row
                    .try_get(0)
                    .map_err(|source| map_error(sql, &source))?
                    .map(str::to_string);
                return Ok(value);
            }
        }
        Ok(None)
    }

    fn copy_line(&mut self, line: &str) -> Result<(), ExecutionError> {
        match self.pending_copy.as_mut() {
            Some(pending) => {
                pending.data.push_str(line);
                pending.data.push('\n');
                Ok(())
            }
            None => Err(ExecutionError::NotInCopyMode),
        }
    }

    fn copy_end(&mut self) -> Result<(), ExecutionError> {
        let pending = self
            .pending_copy
            .take()
            .ok_or(ExecutionError::NotInCopyMode)?;
        let mut writer = self
            .client
            .copy_in(pending.sql.as_str())
            .map_err(|source| map_error(&pending.sql, &source))?;
        writer
            .write_all(pending.data.as_bytes())
            .map_err(|source| {
                ExecutionError::statement_failed(&pending.sql, source.to_string(), None)
            })?;
        writer
            .finish()
            .map_err(|source| map_error(&pending.sql, &source))?;
        Ok(())
    }

    fn backend_pid(&self) -> Option<i32> {
        self.backend_pid
    }

    fn request_cancel(&self) -> bool {
        self.cancel.cancel_query(NoTls).is_ok()
    }
}

fn summarize(messages: &[SimpleQueryMessage]) -> ExecOutcome {
    let mut rows: u64 = 0;
    let mut affected: u64 = 0;
    for message in messages {
        match message {
            SimpleQueryMessage::Row(_) => rows += 1,
            SimpleQueryMessage::CommandComplete(count) => affected = *count,
            _ => {}
        }
    }
    if rows > 0 {
        ExecOutcome::Rows { count: rows }
    } else {
        ExecOutcome::Command { affected }
    }
}

/// SQLSTATE first, server message second; the generic driver rendering
/// only when the failure never reached the server.
fn map_error(sql: &str, source: &postgres::Error) -> ExecutionError {
    let code = source.code().map(|state| state.code().to_string());
    let message = source
        .as_db_error()
        .map_or_else(|| source.to_string(), |db| db.message().to_string());
    ExecutionError::statement_failed(sql, message, code)
}

/// Recognize `COPY ... FROM STDIN`, the statement that switches the
/// stream into the bulk-data sub-protocol.
fn is_copy_from_stdin(sql: &str) -> bool {
    let mut words = sql
        .split(|ch: char| ch.is_whitespace() || ch == ';')
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase);

    if words.next().as_deref() != Some("copy") {
        return false;
    }
    let mut saw_from = false;
    for word in words {
        if saw_from {
            return word == "stdin";
        }
        if word == "from" {
            saw_from = true;
        }
    }
    false
}
