mod error_presentation;

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pgsteward_core::{ConnectConfig, ExecOutcome, ScriptSummary, Session};

use crate::error_presentation::{CliError, CliResult, render_runtime_error};

const EXIT_STATEMENT_FAILURES: u8 = 1;
const EXIT_RUNTIME_ERROR: u8 = 2;
const EXIT_SCRIPT_TRUNCATED: u8 = 3;

/// Run an administrative SQL script against a PostgreSQL server.
#[derive(Debug, Parser)]
#[command(name = "pgsteward", version)]
struct Args {
    /// Server host (TCP) when no socket path is given.
    #[arg(long)]
    host: Option<String>,
    #[arg(long, short = 'p')]
    port: Option<u16>,
    /// Unix socket directory, preferred over --host when set.
    #[arg(long)]
    socket: Option<String>,
    #[arg(long, short = 'U')]
    user: Option<String>,
    #[arg(long)]
    password: Option<String>,
    #[arg(long, short = 'd')]
    dbname: String,
    /// Script file; reads stdin when omitted.
    #[arg(long, short = 'f')]
    file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(&args) {
        Ok(exit) => exit,
        Err(error) => {
            let truncated = matches!(error, CliError::Script(_));
            eprintln!("{}", render_runtime_error(error));
            if truncated {
                ExitCode::from(EXIT_SCRIPT_TRUNCATED)
            } else {
                ExitCode::from(EXIT_RUNTIME_ERROR)
            }
        }
    }
}

fn run(args: &Args) -> CliResult<ExitCode> {
    let backend = pgsteward_postgres::connect(&connect_config(args)).map_err(CliError::Connect)?;
    let mut session = Session::open(Box::new(backend))?;
    eprintln!("connected: {}", session.server_description());

    let summary = match &args.file {
        Some(path) => {
            let file = File::open(path).map_err(|source| CliError::OpenFile {
                path: path.clone(),
                source,
            })?;
            run_from(&mut session, BufReader::new(file))?
        }
        None => run_from(&mut session, io::stdin().lock())?,
    };

    eprintln!(
        "{} statement(s), {} failed",
        summary.statements, summary.failed
    );
    if summary.failed > 0 {
        Ok(ExitCode::from(EXIT_STATEMENT_FAILURES))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn run_from<R: BufRead>(session: &mut Session, input: R) -> CliResult<ScriptSummary> {
    let summary = session.run_script(input, |text, result, line| {
        match result {
            Ok(ExecOutcome::Rows { count }) => println!("line {line}: {count} row(s)"),
            Ok(ExecOutcome::Command { affected }) => {
                println!("line {line}: ok ({affected} affected)");
            }
            Ok(ExecOutcome::CopyIn) => println!("line {line}: copying data"),
            Err(err) => eprintln!("line {line}: FAILED: {err} [{}]", first_line(text)),
        }
    })?;
    Ok(summary)
}

fn connect_config(args: &Args) -> ConnectConfig {
    let mut config = ConnectConfig::new(&args.dbname);
    config.host = args.host.clone();
    config.port = args.port;
    config.socket = args.socket.clone();
    config.user = args.user.clone();
    config.password = args.password.clone();
    config
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or(text)
}
