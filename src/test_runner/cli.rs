use std::ffi::OsString;
use std::path::PathBuf;

use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::{CommandFactory, Parser, Subcommand};

use super::RunnerError;

#[derive(Debug, Parser)]
#[command(
    name = "run-tests",
    version,
    about = "Test runner for the content processor service",
    long_about = "Runs the content processor test-suite through cargo with the test\n\
                  environment (TESTING=true, RUN_ENV=test) applied to every step.",
    disable_help_subcommand = true
)]
pub struct Cli {
    /// Project root the commands run in
    #[arg(long, default_value = ".")]
    pub root: PathBuf,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Run every test (default)
    Basic,
    /// Run tests with coverage and write an HTML report to coverage/
    Coverage,
    /// Run unit tests only
    Unit,
    /// Run integration tests, including ignored external ones
    Integration,
    /// Run one test file or tests matching a name filter
    Specific {
        /// A tests/<name>.rs path or a test name filter
        file: Option<String>,
    },
    /// Show test counts
    Stats,
    /// Run the quick smoke tests
    Smoke,
    /// Remove coverage and profiling artifacts
    Clean,
    /// Prepare the development environment for testing
    Setup,
    /// Show this help
    Help,
}

impl Cli {
    /// Parses `args` (including the binary name). A missing subcommand
    /// selects [`Command::Basic`].
    pub fn parse_args<I, T>(args: I) -> Result<(PathBuf, Command), RunnerError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|err| match err.kind() {
            ErrorKind::InvalidSubcommand => {
                let name = match err.get(ContextKind::InvalidSubcommand) {
                    Some(ContextValue::String(name)) => name.clone(),
                    _ => String::new(),
                };
                RunnerError::UnknownCommand(name)
            }
            _ => RunnerError::Usage(err),
        })?;

        Ok((cli.root, cli.command.unwrap_or(Command::Basic)))
    }

    pub fn usage() -> String {
        Cli::command().render_long_help().to_string()
    }
}
