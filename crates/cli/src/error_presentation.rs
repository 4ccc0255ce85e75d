use std::{io, path::PathBuf};

use anyhow::Context;
use miette::Report;

const SESSION_CONTEXT: &str = "while opening the administrative session";
const SCRIPT_CONTEXT: &str = "while running the script";
const FILE_READ_CONTEXT: &str = "while opening script file";

pub(crate) type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug)]
pub(crate) enum CliError {
    OpenFile {
        path: PathBuf,
        source: io::Error,
    },
    Connect(pgsteward_core::ConnectError),
    Engine(pgsteward_core::Error),
    Script(pgsteward_core::ScriptError),
}

impl From<pgsteward_core::Error> for CliError {
    fn from(value: pgsteward_core::Error) -> Self {
        Self::Engine(value)
    }
}

impl From<pgsteward_core::ScriptError> for CliError {
    fn from(value: pgsteward_core::ScriptError) -> Self {
        Self::Script(value)
    }
}

pub(crate) fn render_runtime_error(error: CliError) -> String {
    match error {
        CliError::OpenFile { path, source } => {
            let context = format!("{FILE_READ_CONTEXT} `{}`", path.display());
            let report = report_with_context(source, context);
            format!("[io] {report}")
        }
        CliError::Connect(source) => {
            let report = report_with_context(source, SESSION_CONTEXT);
            format!("[connect] {report}")
        }
        CliError::Engine(source) => {
            let category = engine_category(&source);
            let report = report_with_context(source, SESSION_CONTEXT);
            format!("[{category}] {report}")
        }
        CliError::Script(source) => {
            let report = report_with_context(source, SCRIPT_CONTEXT);
            format!("[script] {report}")
        }
    }
}

fn report_with_context<E, C>(source: E, context: C) -> Report
where
    E: std::error::Error + Send + Sync + 'static,
    C: Into<String>,
{
    let context = context.into();
    let anyhow_error = std::result::Result::<(), E>::Err(source)
        .context(context)
        .expect_err("context wrapping must produce an error");
    miette::miette!("{anyhow_error:#}")
}

fn engine_category(error: &pgsteward_core::Error) -> &'static str {
    match error {
        pgsteward_core::Error::Connect(_) => "connect",
        pgsteward_core::Error::Version(_) => "version",
        pgsteward_core::Error::Execute(_) => "execute",
        pgsteward_core::Error::TextParse(_) => "parse",
    }
}
