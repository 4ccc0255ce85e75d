mod acl;
mod array;
mod config;
mod connection;
mod dialect;
mod error;
mod escape;
mod operation;
mod ops;
mod script;
mod session;
mod version;

pub use acl::{GrantEntry, GrantList, GranteeKind, Privilege, parse_acl};
pub use array::{format_array, parse_array};
pub use config::ConnectConfig;
pub use connection::{Connection, ExecOutcome, Transaction};
pub use dialect::{Capability, DialectConfig, Template, VersionTag};
pub use error::{
    ConnectError, Error, ExecutionError, OpenConstruct, OperationError, Result, ScriptError,
    TextParseError, VersionError, ViolationKind,
};
pub use escape::{qualified, quote_identifier, quote_literal};
pub use operation::run_steps;
pub use ops::{
    AlterSequence, AlterSequenceStep, AlterTable, AlterTableStep, AlterView, AlterViewStep,
};
pub use script::{ScriptSummary, StatementResult, run_script};
pub use session::Session;
pub use version::{ServerVersion, probe};
