pub mod cli;
pub mod config;
pub mod context;
pub mod database;
pub mod dump;
pub mod error;
pub mod executor;
pub mod postinstall;
pub mod predicate;
pub mod provisioner;
pub mod scripts;
pub mod seeder;
pub mod settings;
pub mod source;
pub mod step;
pub mod template;
pub mod webserver;

pub use error::RsdrupalError;

use std::fs;
use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{FmtSubscriber, filter::LevelFilter};

use crate::context::RunContext;
use crate::executor::CommandExecutor;
use crate::provisioner::{Provisioner, RunReport};

pub fn init_logging(log_level: cli::LogLevel) -> Result<()> {
    let filter = match log_level {
        cli::LogLevel::Trace => LevelFilter::TRACE,
        cli::LogLevel::Debug => LevelFilter::DEBUG,
        cli::LogLevel::Info => LevelFilter::INFO,
        cli::LogLevel::Warn => LevelFilter::WARN,
        cli::LogLevel::Error => LevelFilter::ERROR,
    };

    tracing::subscriber::set_global_default(
        FmtSubscriber::builder().with_max_level(filter).finish(),
    )
    .context("failed to set global default tracing subscriber")
}

/// Loads, validates and provisions the profile named by `opts`.
pub fn run_apply(opts: &cli::ApplyArgs, executor: Arc<dyn CommandExecutor>) -> Result<RunReport> {
    let profile = config::load_profile(&opts.common.file)
        .with_context(|| format!("failed to load profile from {}", opts.common.file))?;
    profile.validate().context("profile validation failed")?;

    if opts.dry_run {
        info!("dry run: no command is executed and no file is written");
    }

    let ctx = RunContext::new(&profile, executor.as_ref(), opts.dry_run);
    Provisioner::new(ctx).run()
}

pub fn run_validate(opts: &cli::ValidateArgs) -> Result<()> {
    let profile = config::load_profile(&opts.common.file)
        .with_context(|| format!("failed to load profile from {}", opts.common.file))?;
    profile.validate().context("profile validation failed")?;
    info!("validation successful:\n{:#?}", profile);
    Ok(())
}

/// Writes the `settings.php` generated from `opts.input` to `out`.
pub fn run_settings(opts: &cli::SettingsArgs, out: &mut dyn Write) -> Result<()> {
    let template = fs::read_to_string(&opts.input)
        .map_err(|e| RsdrupalError::io(format!("failed to read {}", opts.input), e))?;
    out.write_all(settings::generate_settings(&template).as_bytes())
        .context("failed to write generated settings")?;
    Ok(())
}
