use std::io;
use std::process;
use std::sync::Arc;

use anyhow::Result;
use clap::CommandFactory;
use clap_complete::generate;
use tracing::error;

use rsdrupal::cli::{self, Commands};
use rsdrupal::executor::{CommandExecutor, RealCommandExecutor};

fn main() -> Result<()> {
    let args = cli::parse_args()?;

    let log_level = match &args.command {
        Commands::Apply(opts) => opts.common.log_level,
        Commands::Validate(opts) => opts.common.log_level,
        Commands::Settings(opts) => opts.log_level,
        Commands::Completions(opts) => {
            let mut cmd = cli::Cli::command();
            let name = cmd.get_name().to_string();
            generate(opts.shell, &mut cmd, name, &mut io::stdout());
            return Ok(());
        }
    };

    rsdrupal::init_logging(log_level)?;

    let result = match &args.command {
        Commands::Apply(opts) => {
            let executor: Arc<dyn CommandExecutor> = Arc::new(RealCommandExecutor {
                dry_run: opts.dry_run,
            });
            rsdrupal::run_apply(opts, executor).map(|_| ())
        }
        Commands::Validate(opts) => rsdrupal::run_validate(opts),
        Commands::Settings(opts) => rsdrupal::run_settings(opts, &mut io::stdout().lock()),
        Commands::Completions(_) => Ok(()),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        process::exit(1);
    }

    Ok(())
}
