use std::ffi::OsString;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{Command as Process, Stdio};

use anyhow::Context;

use super::RunnerError;
use super::cli::Cli;
use super::output;
use super::plan::{self, Step, TEST_ENV};

const ENV_TEMPLATE: &str = ".env.example";
const ENV_FILE: &str = ".env";

/// Executes plan steps against a project root.
pub struct Runner {
    root: PathBuf,
    cargo: OsString,
}

impl Runner {
    /// Uses the `CARGO` the runner was launched with, else `cargo` from `PATH`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let cargo = std::env::var_os("CARGO").unwrap_or_else(|| "cargo".into());
        Self::with_cargo(root, cargo)
    }

    pub fn with_cargo(root: impl Into<PathBuf>, cargo: impl Into<OsString>) -> Self {
        Self {
            root: root.into(),
            cargo: cargo.into(),
        }
    }

    /// Runs `steps` in order and returns the exit code of the first failing
    /// cargo invocation, or 0.
    pub fn execute(&self, steps: &[Step]) -> Result<i32, RunnerError> {
        for step in steps {
            let code = self.execute_step(step)?;
            if code != 0 {
                return Ok(code);
            }
        }
        Ok(0)
    }

    fn execute_step(&self, step: &Step) -> Result<i32, RunnerError> {
        match step {
            Step::Cargo { label, args } => {
                output::info(&format!("{label}..."));
                let code = self.cargo(args)?;
                if code == 0 {
                    output::success(&format!("{label} finished"));
                } else {
                    output::error(&format!("{label} failed with exit code {code}"));
                }
                Ok(code)
            }
            Step::CountTests => self.print_stats(),
            Step::Clean => {
                output::info("Cleaning test artifacts...");
                let removed = clean(&self.root)?;
                output::success(&format!("Removed {removed} artifact(s)"));
                Ok(0)
            }
            Step::CopyEnvTemplate => {
                if copy_env_template(&self.root)? {
                    output::success(&format!("Created {ENV_FILE} from {ENV_TEMPLATE}"));
                } else {
                    output::info(&format!("{ENV_FILE} already present or no template found"));
                }
                Ok(0)
            }
            Step::CheckTool {
                subcommand,
                install_hint,
            } => {
                let available = self
                    .cargo_command(&[subcommand.to_string(), "--version".into()])
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .status()
                    .is_ok_and(|status| status.success());
                if available {
                    output::success(&format!("cargo {subcommand} is available"));
                } else {
                    output::warning(&format!(
                        "cargo {subcommand} is not installed, install it with `{install_hint}`"
                    ));
                }
                Ok(0)
            }
            Step::PrintUsage => {
                println!("{}", Cli::usage());
                Ok(0)
            }
        }
    }

    fn cargo_command(&self, args: &[String]) -> Process {
        let mut command = Process::new(&self.cargo);
        command
            .args(args)
            .current_dir(&self.root)
            .envs(TEST_ENV.iter().copied());
        command
    }

    fn cargo(&self, args: &[String]) -> Result<i32, RunnerError> {
        let status = self
            .cargo_command(args)
            .status()
            .map_err(|e| self.spawn_error(e))?;
        // killed by a signal
        Ok(status.code().unwrap_or(1))
    }

    fn cargo_output(&self, args: &[String]) -> Result<(i32, String), RunnerError> {
        let out = self
            .cargo_command(args)
            .stderr(Stdio::inherit())
            .output()
            .map_err(|e| self.spawn_error(e))?;
        Ok((
            out.status.code().unwrap_or(1),
            String::from_utf8_lossy(&out.stdout).into_owned(),
        ))
    }

    fn spawn_error(&self, err: std::io::Error) -> RunnerError {
        if err.kind() == ErrorKind::NotFound {
            RunnerError::CargoNotFound(self.cargo.to_string_lossy().into_owned())
        } else {
            RunnerError::Io(anyhow::Error::new(err).context("Failed to launch cargo"))
        }
    }

    fn print_stats(&self) -> Result<i32, RunnerError> {
        output::info("Collecting test statistics...");

        let list = |extra: &[&str]| {
            let mut args = vec!["test".to_string(), "--".into(), "--list".into()];
            args.extend(extra.iter().map(|s| s.to_string()));
            self.cargo_output(&args)
        };

        let (code, listed) = list(&[])?;
        if code != 0 {
            output::error("Failed to list tests");
            return Ok(code);
        }
        let (code, ignored) = list(&["--ignored"])?;
        if code != 0 {
            output::error("Failed to list ignored tests");
            return Ok(code);
        }

        let total = count_listed_tests(&listed);
        let ignored = count_listed_tests(&ignored);
        println!("Total tests: {total}");
        println!("Run by default: {}", total.saturating_sub(ignored));
        println!("Ignored (slow/external): {ignored}");
        Ok(0)
    }
}

/// Counts `name: test` lines in `cargo test -- --list` output.
pub fn count_listed_tests(listing: &str) -> usize {
    listing
        .lines()
        .filter(|line| line.trim_end().ends_with(": test"))
        .count()
}

/// Removes coverage output and `*.profraw` files below `root`. Paths that do
/// not exist are skipped. Returns how many entries were removed.
pub fn clean(root: &Path) -> Result<usize, RunnerError> {
    let mut removed = 0;

    for path in plan::clean_targets(root) {
        let result = if path.is_dir() {
            fs::remove_dir_all(&path)
        } else {
            fs::remove_file(&path)
        };
        match result {
            Ok(()) => removed += 1,
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RunnerError::Io(
                    anyhow::Error::new(e).context(format!("Failed to remove {}", path.display())),
                ));
            }
        }
    }

    let entries = fs::read_dir(root)
        .with_context(|| format!("Failed to read {}", root.display()))
        .map_err(RunnerError::Io)?;
    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "profraw") && path.is_file() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))
                .map_err(RunnerError::Io)?;
            removed += 1;
        }
    }

    Ok(removed)
}

/// Copies `.env.example` to `.env`. Returns false when `.env` already
/// exists or there is no template.
pub fn copy_env_template(root: &Path) -> Result<bool, RunnerError> {
    let template = root.join(ENV_TEMPLATE);
    let target = root.join(ENV_FILE);
    if target.exists() || !template.exists() {
        return Ok(false);
    }

    fs::copy(&template, &target)
        .with_context(|| format!("Failed to copy {ENV_TEMPLATE} to {ENV_FILE}"))
        .map_err(RunnerError::Io)?;
    Ok(true)
}
