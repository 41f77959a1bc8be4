use std::path::{Path, PathBuf};

use super::RunnerError;
use super::cli::Command;

/// Environment applied to every cargo invocation.
pub const TEST_ENV: &[(&str, &str)] = &[
    ("TESTING", "true"),
    ("RUN_ENV", "test"),
    ("DATABASE_NAME", "learning_platform_test"),
    ("DEBUG", "true"),
];

/// Paths removed by `clean`, relative to the project root.
pub const CLEAN_PATHS: &[&str] = &["coverage", "lcov.info", "target/llvm-cov-target"];

pub const COVERAGE_DIR: &str = "coverage";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Run cargo with `args`; a failing exit code ends the plan.
    Cargo {
        label: &'static str,
        args: Vec<String>,
    },
    /// List tests and print how many are run by default and how many are ignored.
    CountTests,
    /// Delete coverage output and stray `*.profraw` files.
    Clean,
    /// Create `.env` from `.env.example` unless it already exists.
    CopyEnvTemplate,
    /// Warn when a cargo subcommand is not installed.
    CheckTool {
        subcommand: &'static str,
        install_hint: &'static str,
    },
    PrintUsage,
}

fn cargo(label: &'static str, args: &[&str]) -> Step {
    Step::Cargo {
        label,
        args: args.iter().map(|a| a.to_string()).collect(),
    }
}

pub fn build(command: &Command) -> Result<Vec<Step>, RunnerError> {
    let steps = match command {
        Command::Basic => vec![cargo("Running all tests", &["test"])],
        Command::Coverage => vec![
            cargo(
                "Running tests with coverage",
                &["llvm-cov", "--html", "--output-dir", COVERAGE_DIR],
            ),
            cargo("Coverage summary", &["llvm-cov", "report", "--summary-only"]),
        ],
        Command::Unit => vec![cargo("Running unit tests", &["test", "--lib"])],
        Command::Integration => vec![cargo(
            "Running integration tests",
            &["test", "--test", "*", "--", "--include-ignored"],
        )],
        Command::Specific { file } => {
            let file = file
                .as_deref()
                .filter(|f| !f.trim().is_empty())
                .ok_or(RunnerError::MissingFile)?;
            vec![Step::Cargo {
                label: "Running specific tests",
                args: specific_args(file),
            }]
        }
        Command::Stats => vec![Step::CountTests],
        Command::Smoke => vec![cargo("Running smoke tests", &["test", "--test", "smoke"])],
        Command::Clean => vec![Step::Clean],
        Command::Setup => vec![
            cargo("Fetching dependencies", &["fetch"]),
            Step::CopyEnvTemplate,
            Step::CheckTool {
                subcommand: "llvm-cov",
                install_hint: "cargo install cargo-llvm-cov",
            },
        ],
        Command::Help => vec![Step::PrintUsage],
    };
    Ok(steps)
}

/// A `tests/<name>.rs` path selects that integration target, anything else
/// is passed through as a test name filter.
fn specific_args(file: &str) -> Vec<String> {
    let path = Path::new(file);
    let is_test_target = path.extension().is_some_and(|ext| ext == "rs")
        && path
            .parent()
            .and_then(Path::file_name)
            .is_some_and(|dir| dir == "tests");

    match path.file_stem().and_then(|s| s.to_str()) {
        Some(stem) if is_test_target => vec!["test".into(), "--test".into(), stem.into()],
        _ => vec!["test".into(), file.into()],
    }
}

pub fn clean_targets(root: &Path) -> Vec<PathBuf> {
    CLEAN_PATHS.iter().map(|p| root.join(p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cargo_args(steps: &[Step]) -> Vec<Vec<String>> {
        steps
            .iter()
            .filter_map(|s| match s {
                Step::Cargo { args, .. } => Some(args.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_basic_and_unit_plans() {
        assert_eq!(cargo_args(&build(&Command::Basic).unwrap()), vec![vec!["test"]]);
        assert_eq!(
            cargo_args(&build(&Command::Unit).unwrap()),
            vec![vec!["test", "--lib"]]
        );
    }

    #[test]
    fn test_integration_includes_ignored_tests() {
        let args = cargo_args(&build(&Command::Integration).unwrap());
        assert_eq!(
            args,
            vec![vec!["test", "--test", "*", "--", "--include-ignored"]]
        );
        // unit tests in the library are not part of this run
        assert!(!args[0].contains(&"--tests".to_string()));
        assert!(!args[0].contains(&"--lib".to_string()));
    }

    #[test]
    fn test_coverage_writes_html_report() {
        let args = cargo_args(&build(&Command::Coverage).unwrap());
        assert_eq!(args.len(), 2);
        assert_eq!(args[0][..2], ["llvm-cov", "--html"]);
        assert!(args[0].contains(&COVERAGE_DIR.to_string()));
    }

    #[test]
    fn test_specific_selects_integration_target() {
        let steps = build(&Command::Specific {
            file: Some("tests/api.rs".into()),
        })
        .unwrap();
        assert_eq!(cargo_args(&steps), vec![vec!["test", "--test", "api"]]);
    }

    #[test]
    fn test_specific_passes_filters_through() {
        let steps = build(&Command::Specific {
            file: Some("document_processor::tests".into()),
        })
        .unwrap();
        assert_eq!(
            cargo_args(&steps),
            vec![vec!["test", "document_processor::tests"]]
        );
    }

    #[test]
    fn test_specific_without_file_is_an_error() {
        assert!(matches!(
            build(&Command::Specific { file: None }),
            Err(RunnerError::MissingFile)
        ));
        assert!(matches!(
            build(&Command::Specific {
                file: Some("  ".into())
            }),
            Err(RunnerError::MissingFile)
        ));
    }

    #[test]
    fn test_setup_fetches_and_checks_tooling() {
        let steps = build(&Command::Setup).unwrap();
        assert_eq!(steps.len(), 3);
        assert!(steps.contains(&Step::CopyEnvTemplate));
        assert!(matches!(steps[2], Step::CheckTool { subcommand: "llvm-cov", .. }));
    }

    #[test]
    fn test_test_env_marks_testing_mode() {
        assert!(TEST_ENV.contains(&("TESTING", "true")));
        assert!(TEST_ENV.contains(&("DATABASE_NAME", "learning_platform_test")));
    }
}
