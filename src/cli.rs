use anyhow::Result;
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

#[derive(Parser, Debug)]
#[command(
    name = env!("CARGO_PKG_NAME"),
    version = env!("CARGO_PKG_VERSION"),
    about = env!("CARGO_PKG_DESCRIPTION"),
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision the Drupal site described by the given profile
    Apply(ApplyArgs),

    /// Validate the given YAML profile
    Validate(ValidateArgs),

    /// Print the settings.php generated from a default.settings.php
    Settings(SettingsArgs),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

/// Arguments shared by commands that read a profile.
#[derive(Args, Debug)]
pub struct CommonArgs {
    /// Path to the YAML file defining the profile
    #[arg(short, long, default_value = "profile.yml")]
    pub file: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Do not run, just show what would be done
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

#[derive(Args, Debug)]
pub struct SettingsArgs {
    /// Path to the default.settings.php template
    #[arg(short, long)]
    pub input: Utf8PathBuf,

    /// Set the log level
    #[arg(short, long, default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

/// Represents log levels for controlling the verbosity of logging output.
///
/// Maps directly to the levels of the `tracing` crate. `--log-level debug`
/// shows resolved paths and every command line; `trace` adds captured
/// command output.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

pub fn parse_args() -> Result<Cli> {
    Ok(Cli::parse())
}
