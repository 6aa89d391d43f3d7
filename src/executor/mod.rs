//! Command execution abstraction for rsdrupal.
//!
//! This module provides:
//! - [`CommandSpec`]: Specification for commands to execute
//! - [`StdinSource`]: Optional file streamed into a command's stdin
//! - [`ExecutionResult`]: Result of command execution
//! - [`CommandExecutor`]: Trait for command execution strategies
//! - [`RealCommandExecutor`]: Production implementation using `std::process::Command`

mod pipe;
mod real;

use std::io::Read;
use std::process::ExitStatus;

use camino::Utf8PathBuf;

use crate::dump::{self, Compression};
use crate::error::RsdrupalError;

pub use real::RealCommandExecutor;

const SECRET_MASK: &str = "********";

/// Formats string arguments into a space-separated, debug-quoted string.
///
/// Used by error messages and dry-run output to consistently format
/// command arguments (e.g., `"clone" "https://git.example.com/site.git"`).
pub(crate) fn format_command_args(args: &[String]) -> String {
    args.iter()
        .map(|a| format!("{:?}", a))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A file whose contents are streamed into the command's stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdinSource {
    /// File to read from
    pub path: Utf8PathBuf,
    /// How the file is compressed
    pub compression: Compression,
}

impl StdinSource {
    /// Opens the source as a decompressed byte stream.
    pub fn open(&self) -> Result<Box<dyn Read + Send>, RsdrupalError> {
        dump::open_dump(&self.path, self.compression)
    }
}

/// Specification for a command to be executed
#[derive(Debug, Clone)]
pub struct CommandSpec {
    /// The command to execute (e.g., "git")
    pub command: String,
    /// Command arguments
    pub args: Vec<String>,
    /// Working directory (optional, defaults to current directory)
    pub cwd: Option<Utf8PathBuf>,
    /// Environment variables to set (in addition to inherited environment)
    pub env: Vec<(String, String)>,
    /// File streamed into stdin; stdin is closed when `None`
    pub stdin: Option<StdinSource>,
    /// Collect stdout into [`ExecutionResult::stdout`] instead of logging it
    pub capture_stdout: bool,
    /// Values masked in [`CommandSpec::display`]
    pub secrets: Vec<String>,
}

impl CommandSpec {
    /// Creates a new CommandSpec with command and args
    #[must_use]
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            cwd: None,
            env: Vec::new(),
            stdin: None,
            capture_stdout: false,
            secrets: Vec::new(),
        }
    }

    /// Builds a spec from a non-empty argv slice (`argv[0]` is the command).
    ///
    /// Returns `None` for an empty slice.
    #[must_use]
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (command, args) = argv.split_first()?;
        Some(Self::new(command.clone(), args.to_vec()))
    }

    /// Appends arguments
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Sets the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: Utf8PathBuf) -> Self {
        self.cwd = Some(cwd);
        self
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Streams the given file into stdin
    #[must_use]
    pub fn with_stdin(mut self, stdin: StdinSource) -> Self {
        self.stdin = Some(stdin);
        self
    }

    /// Captures stdout instead of streaming it to the log
    #[must_use]
    pub fn capturing_stdout(mut self) -> Self {
        self.capture_stdout = true;
        self
    }

    /// Masks `secret` wherever it appears in the displayed command line
    #[must_use]
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        let secret = secret.into();
        if !secret.is_empty() {
            self.secrets.push(secret);
        }
        self
    }

    /// Human-readable command line without environment values or secrets.
    ///
    /// This is what gets logged and what error messages carry.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            return self.command.clone();
        }
        let args: Vec<String> = self
            .args
            .iter()
            .map(|arg| {
                self.secrets
                    .iter()
                    .fold(arg.clone(), |arg, secret| arg.replace(secret.as_str(), SECRET_MASK))
            })
            .collect();
        format!("{} {}", self.command, format_command_args(&args))
    }
}

/// Result of command execution
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Exit status of the command (None in dry-run mode)
    pub status: Option<ExitStatus>,
    /// Captured stdout, present only when the spec asked for capture and the
    /// command actually ran
    pub stdout: Option<String>,
}

impl ExecutionResult {
    /// Returns true if the command executed successfully.
    ///
    /// In dry-run mode (status is None), this always returns true.
    pub fn success(&self) -> bool {
        self.status.is_none_or(|s| s.success())
    }

    /// Returns the exit code if available
    pub fn code(&self) -> Option<i32> {
        self.status.and_then(|s| s.code())
    }

    /// Converts a non-zero exit into an `Execution` error.
    pub fn ensure_success(self, spec: &CommandSpec) -> Result<Self, RsdrupalError> {
        match self.status {
            Some(status) if !status.success() => {
                Err(RsdrupalError::execution(spec.display(), status.to_string()))
            }
            _ => Ok(self),
        }
    }
}

/// Trait for command execution.
///
/// Implementations must be `Send + Sync` so the executor can be shared as
/// `Arc<dyn CommandExecutor>`.
pub trait CommandExecutor: Send + Sync {
    /// Executes a command with the given specification.
    fn execute(&self, spec: &CommandSpec) -> anyhow::Result<ExecutionResult>;
}

/// Executes `spec` and fails on a non-zero exit.
///
/// Typed errors from the executor pass through unchanged.
pub fn run_checked(
    executor: &dyn CommandExecutor,
    spec: &CommandSpec,
) -> anyhow::Result<ExecutionResult> {
    let result = executor.execute(spec)?;
    Ok(result.ensure_success(spec)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_arguments() {
        let spec = CommandSpec::new("cp", vec!["-Rf".to_string(), "/src dir/.".to_string()]);
        assert_eq!(spec.display(), "cp \"-Rf\" \"/src dir/.\"");
    }

    #[test]
    fn display_without_arguments() {
        assert_eq!(CommandSpec::new("true", Vec::new()).display(), "true");
    }

    #[test]
    fn display_masks_secrets() {
        let spec = CommandSpec::new("drush", vec!["--account-pass=hunter2".to_string()])
            .with_secret("hunter2")
            .with_secret("");
        assert_eq!(spec.display(), "drush \"--account-pass=********\"");
        assert_eq!(spec.args, vec!["--account-pass=hunter2"]);
        assert_eq!(spec.secrets, vec!["hunter2"]);
    }

    #[test]
    fn from_argv_splits_command() {
        let argv = vec!["php".to_string(), "-d".to_string(), "x=y".to_string()];
        let spec = CommandSpec::from_argv(&argv).unwrap().with_args(["status"]);
        assert_eq!(spec.command, "php");
        assert_eq!(spec.args, vec!["-d", "x=y", "status"]);
        assert!(CommandSpec::from_argv(&[]).is_none());
    }

    #[cfg(unix)]
    mod ensure_success_tests {
        use std::os::unix::process::ExitStatusExt;

        use super::*;

        #[test]
        fn success_passes_through() {
            let spec = CommandSpec::new("git", vec!["clone".to_string()]);
            let result = ExecutionResult {
                status: Some(ExitStatus::from_raw(0)),
                stdout: None,
            };
            assert!(result.ensure_success(&spec).is_ok());
        }

        #[test]
        fn nonzero_exit_is_execution_error() {
            let spec = CommandSpec::new("git", vec!["clone".to_string()]);
            let result = ExecutionResult {
                status: Some(ExitStatus::from_raw(128 << 8)),
                stdout: None,
            };
            let err = result.ensure_success(&spec).unwrap_err();
            assert!(matches!(err, RsdrupalError::Execution { .. }));
            assert!(err.to_string().contains("git \"clone\""));
        }

        #[test]
        fn dry_run_has_no_status_and_succeeds() {
            let spec = CommandSpec::new("git", Vec::new());
            let result = ExecutionResult::default();
            assert!(result.success());
            assert!(result.ensure_success(&spec).is_ok());
        }
    }
}
