use std::error::Error as StdError;
use std::fmt;

use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Top-level error for session setup and ad-hoc execution. Operation
/// failures are not folded in here; composite operations return their
/// own step-tagged [`OperationError`] so callers cannot confuse failure
/// codes across operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Connect(#[from] ConnectError),
    #[error(transparent)]
    Version(#[from] VersionError),
    #[error(transparent)]
    Execute(#[from] ExecutionError),
    #[error(transparent)]
    TextParse(#[from] TextParseError),
}

/// Could not reach or authenticate to the server. Always fatal to the
/// session.
#[derive(Debug, Error)]
#[error("connection failed: {message}")]
pub struct ConnectError {
    pub message: String,
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl ConnectError {
    pub fn new(
        message: impl Into<String>,
        source: impl Into<Option<Box<dyn StdError + Send + Sync>>>,
    ) -> Self {
        Self {
            message: message.into(),
            source: source.into(),
        }
    }
}

/// Version probing outcomes that end a session before it starts.
///
/// `Indeterminate` is a connectivity-shaped problem (the probe queries
/// themselves failed or returned garbage); `Unsupported` is a hard stop
/// for servers older than the oldest dialect in the chain. Callers must
/// treat the two differently, so they are distinct variants rather than
/// one message.
#[derive(Debug, Error)]
pub enum VersionError {
    #[error("could not determine server version: {message}")]
    Indeterminate { message: String },
    #[error("server version {version} predates the oldest supported dialect (7.4)")]
    Unsupported { version: String },
}

/// How a failed statement was classified from the server's error report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    Unique,
    Referential,
    Other,
}

impl ViolationKind {
    /// Substring heuristic over the human-readable error text. Only a
    /// fallback: backends that surface a SQLSTATE classify structurally
    /// and never call this. The substrings are English-locale only.
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if lower.contains("unique") || lower.contains("duplicate key") {
            Self::Unique
        } else if lower.contains("referential") || lower.contains("foreign key") {
            Self::Referential
        } else {
            Self::Other
        }
    }
}

/// A single SQL statement failed. Recovered locally by whatever issued
/// it; never fatal to the session on its own.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("statement failed: {message} (sql: {sql})")]
    StatementFailed {
        sql: String,
        message: String,
        /// SQLSTATE when the backend exposes one.
        code: Option<String>,
        violation: ViolationKind,
    },
    #[error("connection is not in bulk-copy mode")]
    NotInCopyMode,
}

impl ExecutionError {
    /// Build a statement failure, classifying by SQLSTATE when present
    /// and by message text otherwise.
    #[must_use]
    pub fn statement_failed(sql: &str, message: impl Into<String>, code: Option<String>) -> Self {
        let message = message.into();
        let violation = match code.as_deref() {
            Some("23505") => ViolationKind::Unique,
            Some("23503") => ViolationKind::Referential,
            Some(_) => ViolationKind::Other,
            None => ViolationKind::from_message(&message),
        };
        Self::StatementFailed {
            sql: sql.to_string(),
            message,
            code,
            violation,
        }
    }

    #[must_use]
    pub fn violation(&self) -> ViolationKind {
        match self {
            Self::StatementFailed { violation, .. } => *violation,
            Self::NotInCopyMode => ViolationKind::Other,
        }
    }
}

/// Malformed ACL or array-literal text coming back from the server.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TextParseError {
    #[error("unknown privilege type `{code}` in acl entry `{entry}`")]
    UnknownPrivilege { code: char, entry: String },
    #[error("malformed acl text `{text}`: {reason}")]
    MalformedAcl { text: String, reason: &'static str },
    #[error("malformed array literal `{text}`: {reason}")]
    MalformedArray { text: String, reason: &'static str },
}

/// The lexical construct still open when a script ended early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenConstruct {
    SingleQuote,
    DoubleQuote,
    DollarQuote,
    Comment,
    CopyData,
}

impl fmt::Display for OpenConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SingleQuote => "single-quoted literal",
            Self::DoubleQuote => "double-quoted identifier",
            Self::DollarQuote => "dollar-quoted block",
            Self::Comment => "comment",
            Self::CopyData => "bulk-copy data",
        };
        f.write_str(name)
    }
}

/// The script itself was truncated. Statement-level failures are never
/// reported this way; they flow through the per-statement callback so a
/// caller can tell "ran but some statements failed" apart from "script
/// was cut off mid-construct".
#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("script ended inside a {construct} opened on line {line}")]
    Unterminated { construct: OpenConstruct, line: u64 },
    #[error("failed to read script input: {0}")]
    Read(#[from] std::io::Error),
}

/// A composite administrative operation failed at a named sub-step and
/// was rolled back before this value was returned. `S` is the
/// operation's own step enumeration, so a failure from one operation
/// cannot be mistaken for a failure from another.
#[derive(Debug, Error)]
pub enum OperationError<S: fmt::Debug> {
    /// BEGIN or COMMIT itself failed; no sub-step is to blame.
    #[error("transaction control failed")]
    Transaction {
        #[source]
        source: ExecutionError,
    },
    #[error("operation step {step:?} failed and the transaction was rolled back")]
    Step {
        step: S,
        #[source]
        source: ExecutionError,
    },
    #[error("operation step {step:?} is not supported by the connected server version")]
    Unsupported { step: S },
}

impl<S: fmt::Debug + Copy> OperationError<S> {
    /// The failing sub-step, when one was reached.
    #[must_use]
    pub fn step(&self) -> Option<S> {
        match self {
            Self::Transaction { .. } => None,
            Self::Step { step, .. } | Self::Unsupported { step } => Some(*step),
        }
    }
}
