use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use pgsteward_core::{Connection, ExecOutcome, ExecutionError};

pub const BEGIN_SQL: &str = "BEGIN";
pub const COMMIT_SQL: &str = "COMMIT";
pub const ROLLBACK_SQL: &str = "ROLLBACK";

#[derive(Debug)]
struct FailureRule {
    sql: String,
    message: String,
    code: Option<String>,
}

/// Scripted stand-in for a live connection: records every statement,
/// counts transaction control, and fails or yields copy-in on demand.
/// Clones share state, so a test can keep a handle for assertions after
/// moving the connection into a session.
#[derive(Debug, Default, Clone)]
pub struct FakeConnection {
    state: Rc<RefCell<State>>,
}

#[derive(Debug, Default)]
struct State {
    executed_sql: Vec<String>,
    scalar_results: HashMap<String, Option<String>>,
    fail_on_sql: Vec<FailureRule>,
    copy_in_sql: Vec<String>,
    copy_active: bool,
    copy_lines: Vec<String>,
    copy_ends: usize,
    begin_count: usize,
    commit_count: usize,
    rollback_count: usize,
    cancel_requests: usize,
}

#[allow(dead_code)]
impl FakeConnection {
    /// Scripted response for `query_scalar` on exactly this SQL.
    pub fn set_scalar(&self, sql: impl Into<String>, value: Option<&str>) {
        self.state
            .borrow_mut()
            .scalar_results
            .insert(sql.into(), value.map(str::to_string));
    }

    pub fn set_fail_on(&self, sql: impl Into<String>, message: impl Into<String>) {
        self.set_fail_on_with_code(sql, message, None);
    }

    pub fn set_fail_on_with_code(
        &self,
        sql: impl Into<String>,
        message: impl Into<String>,
        code: Option<&str>,
    ) {
        self.state.borrow_mut().fail_on_sql.push(FailureRule {
            sql: sql.into(),
            message: message.into(),
            code: code.map(str::to_string),
        });
    }

    /// Statements that answer with a bulk-copy start.
    pub fn mark_copy_in(&self, sql: impl Into<String>) {
        self.state.borrow_mut().copy_in_sql.push(sql.into());
    }

    pub fn executed_sql(&self) -> Vec<String> {
        self.state.borrow().executed_sql.clone()
    }

    pub fn copy_lines(&self) -> Vec<String> {
        self.state.borrow().copy_lines.clone()
    }

    pub fn copy_ends(&self) -> usize {
        self.state.borrow().copy_ends
    }

    pub fn begin_count(&self) -> usize {
        self.state.borrow().begin_count
    }

    pub fn commit_count(&self) -> usize {
        self.state.borrow().commit_count
    }

    pub fn rollback_count(&self) -> usize {
        self.state.borrow().rollback_count
    }

    pub fn cancel_requests(&self) -> usize {
        self.state.borrow().cancel_requests
    }

    fn failure_for(state: &State, sql: &str) -> Option<ExecutionError> {
        state
            .fail_on_sql
            .iter()
            .find(|rule| rule.sql == sql)
            .map(|rule| {
                ExecutionError::statement_failed(sql, rule.message.clone(), rule.code.clone())
            })
    }
}

impl Connection for FakeConnection {
    fn execute(&mut self, sql: &str) -> Result<ExecOutcome, ExecutionError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = Self::failure_for(&state, sql) {
            return Err(error);
        }

        state.executed_sql.push(sql.to_string());
        match sql {
            BEGIN_SQL => state.begin_count += 1,
            COMMIT_SQL => state.commit_count += 1,
            ROLLBACK_SQL => state.rollback_count += 1,
            _ => {}
        }

        if state.copy_in_sql.iter().any(|copy_sql| copy_sql == sql) {
            state.copy_active = true;
            return Ok(ExecOutcome::CopyIn);
        }
        Ok(ExecOutcome::Command { affected: 0 })
    }

    fn query_scalar(&mut self, sql: &str) -> Result<Option<String>, ExecutionError> {
        let mut state = self.state.borrow_mut();
        if let Some(error) = Self::failure_for(&state, sql) {
            return Err(error);
        }
        state.executed_sql.push(sql.to_string());
        Ok(state.scalar_results.get(sql).cloned().flatten())
    }

    fn copy_line(&mut self, line: &str) -> Result<(), ExecutionError> {
        let mut state = self.state.borrow_mut();
        if !state.copy_active {
            return Err(ExecutionError::NotInCopyMode);
        }
        if let Some(error) = Self::failure_for(&state, line) {
            return Err(error);
        }
        state.copy_lines.push(line.to_string());
        Ok(())
    }

    fn copy_end(&mut self) -> Result<(), ExecutionError> {
        let mut state = self.state.borrow_mut();
        if !state.copy_active {
            return Err(ExecutionError::NotInCopyMode);
        }
        state.copy_active = false;
        state.copy_ends += 1;
        Ok(())
    }

    fn backend_pid(&self) -> Option<i32> {
        Some(4242)
    }

    fn request_cancel(&self) -> bool {
        self.state.borrow_mut().cancel_requests += 1;
        true
    }
}
