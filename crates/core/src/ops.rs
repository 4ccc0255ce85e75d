//! Composite administrative changes: each alters several facets of one
//! object in a single all-or-nothing transaction, and names the facet
//! that failed. Facets the connected dialect cannot express fail the
//! operation up front instead of being silently skipped.

use crate::dialect::Capability;
use crate::error::OperationError;
use crate::escape::{qualified, quote_identifier, quote_literal};
use crate::operation::run_steps;
use crate::session::Session;

/// A requested multi-facet table change; `None` facets are untouched.
/// `comment: Some("")` clears the comment.
#[derive(Debug, Default, Clone)]
pub struct AlterTable<'a> {
    pub schema: &'a str,
    pub name: &'a str,
    pub new_name: Option<&'a str>,
    pub new_owner: Option<&'a str>,
    pub new_schema: Option<&'a str>,
    pub comment: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterTableStep {
    Owner,
    Rename,
    Comment,
    Schema,
}

#[derive(Debug, Default, Clone)]
pub struct AlterSequence<'a> {
    pub schema: &'a str,
    pub name: &'a str,
    pub new_name: Option<&'a str>,
    pub new_owner: Option<&'a str>,
    pub new_schema: Option<&'a str>,
    pub restart_with: Option<i64>,
    pub comment: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterSequenceStep {
    Owner,
    Rename,
    Restart,
    Comment,
    Schema,
}

#[derive(Debug, Default, Clone)]
pub struct AlterView<'a> {
    pub schema: &'a str,
    pub name: &'a str,
    pub new_name: Option<&'a str>,
    pub new_owner: Option<&'a str>,
    pub comment: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlterViewStep {
    Owner,
    Rename,
    Comment,
}

fn comment_value(comment: &str) -> String {
    if comment.is_empty() {
        "NULL".to_string()
    } else {
        quote_literal(comment)
    }
}

impl Session {
    /// Rename, re-own, re-comment, and/or re-parent a table in one
    /// transaction. Order matters: owner is changed under the original
    /// name, the schema move runs last so every earlier step addresses
    /// the object where it still lives.
    pub fn alter_table(
        &mut self,
        change: &AlterTable<'_>,
    ) -> Result<(), OperationError<AlterTableStep>> {
        if change.new_schema.is_some() && !self.dialect().has(Capability::AlterTableSchema) {
            return Err(OperationError::Unsupported {
                step: AlterTableStep::Schema,
            });
        }

        let mut steps = Vec::new();
        let mut name = change.name;
        let target = |name: &str| qualified(change.schema, name);

        if let Some(owner) = change.new_owner {
            steps.push((
                AlterTableStep::Owner,
                format!(
                    "ALTER TABLE {} OWNER TO {}",
                    target(name),
                    quote_identifier(owner)
                ),
            ));
        }
        if let Some(new_name) = change.new_name {
            steps.push((
                AlterTableStep::Rename,
                format!(
                    "ALTER TABLE {} RENAME TO {}",
                    target(name),
                    quote_identifier(new_name)
                ),
            ));
            name = new_name;
        }
        if let Some(comment) = change.comment {
            steps.push((
                AlterTableStep::Comment,
                format!(
                    "COMMENT ON TABLE {} IS {}",
                    target(name),
                    comment_value(comment)
                ),
            ));
        }
        if let Some(new_schema) = change.new_schema {
            steps.push((
                AlterTableStep::Schema,
                format!(
                    "ALTER TABLE {} SET SCHEMA {}",
                    target(name),
                    quote_identifier(new_schema)
                ),
            ));
        }

        run_steps(self.conn.as_mut(), steps)
    }

    /// Sequence counterpart of [`Session::alter_table`]. Renames and
    /// moves go through ALTER TABLE, which the server accepts for
    /// sequences on every supported revision; restart is gated on the
    /// dialect knowing `RESTART WITH`.
    pub fn alter_sequence(
        &mut self,
        change: &AlterSequence<'_>,
    ) -> Result<(), OperationError<AlterSequenceStep>> {
        if change.new_schema.is_some() && !self.dialect().has(Capability::AlterSequenceSchema) {
            return Err(OperationError::Unsupported {
                step: AlterSequenceStep::Schema,
            });
        }
        if change.restart_with.is_some() && !self.dialect().has(Capability::AlterSequenceStart) {
            return Err(OperationError::Unsupported {
                step: AlterSequenceStep::Restart,
            });
        }

        let mut steps = Vec::new();
        let mut name = change.name;
        let target = |name: &str| qualified(change.schema, name);

        if let Some(owner) = change.new_owner {
            steps.push((
                AlterSequenceStep::Owner,
                format!(
                    "ALTER TABLE {} OWNER TO {}",
                    target(name),
                    quote_identifier(owner)
                ),
            ));
        }
        if let Some(new_name) = change.new_name {
            steps.push((
                AlterSequenceStep::Rename,
                format!(
                    "ALTER TABLE {} RENAME TO {}",
                    target(name),
                    quote_identifier(new_name)
                ),
            ));
            name = new_name;
        }
        if let Some(restart) = change.restart_with {
            steps.push((
                AlterSequenceStep::Restart,
                format!("ALTER SEQUENCE {} RESTART WITH {restart}", target(name)),
            ));
        }
        if let Some(comment) = change.comment {
            steps.push((
                AlterSequenceStep::Comment,
                format!(
                    "COMMENT ON SEQUENCE {} IS {}",
                    target(name),
                    comment_value(comment)
                ),
            ));
        }
        if let Some(new_schema) = change.new_schema {
            steps.push((
                AlterSequenceStep::Schema,
                format!(
                    "ALTER TABLE {} SET SCHEMA {}",
                    target(name),
                    quote_identifier(new_schema)
                ),
            ));
        }

        run_steps(self.conn.as_mut(), steps)
    }

    pub fn alter_view(
        &mut self,
        change: &AlterView<'_>,
    ) -> Result<(), OperationError<AlterViewStep>> {
        let mut steps = Vec::new();
        let mut name = change.name;
        let target = |name: &str| qualified(change.schema, name);

        if let Some(owner) = change.new_owner {
            steps.push((
                AlterViewStep::Owner,
                format!(
                    "ALTER TABLE {} OWNER TO {}",
                    target(name),
                    quote_identifier(owner)
                ),
            ));
        }
        if let Some(new_name) = change.new_name {
            steps.push((
                AlterViewStep::Rename,
                format!(
                    "ALTER TABLE {} RENAME TO {}",
                    target(name),
                    quote_identifier(new_name)
                ),
            ));
            name = new_name;
        }
        if let Some(comment) = change.comment {
            steps.push((
                AlterViewStep::Comment,
                format!(
                    "COMMENT ON VIEW {} IS {}",
                    target(name),
                    comment_value(comment)
                ),
            ));
        }

        run_steps(self.conn.as_mut(), steps)
    }
}
