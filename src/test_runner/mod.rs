//! `run-tests`: runs the service's test-suite through cargo in test mode.

pub mod cli;
pub mod output;
pub mod plan;
pub mod runner;

use std::ffi::OsString;

use cli::Cli;
use runner::Runner;

#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    #[error("Unknown command: {0}. Use 'help' to see available commands.")]
    UnknownCommand(String),

    #[error("Please specify a test file. Usage: run-tests specific <file>")]
    MissingFile,

    #[error("cargo executable not found ({0}). Install Rust from https://rustup.rs")]
    CargoNotFound(String),

    #[error(transparent)]
    Usage(#[from] clap::Error),

    #[error("{0:#}")]
    Io(anyhow::Error),
}

/// Parses `args`, runs the selected plan and returns the process exit code.
pub fn run<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let result = Cli::parse_args(args).and_then(|(root, command)| {
        let steps = plan::build(&command)?;
        Runner::new(root).execute(&steps)
    });

    match result {
        Ok(code) => code,
        Err(RunnerError::Usage(err)) => {
            let _ = err.print();
            if err.use_stderr() { 1 } else { 0 }
        }
        Err(err) => {
            output::error(&err.to_string());
            1
        }
    }
}
