use std::path::Path;
use std::process::ExitCode;

use clap::Parser;

use cvegate_cli::cli::{Cli, Commands};
use cvegate_cli::commands;
use cvegate_cli::error::CliError;
use cvegate_cli::logging::init_tracing;
use cvegate_cli::output::OutputWriter;
use cvegate_core::config::{GeneralConfig, PolicyConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut general = logging_config(&cli.config).await;
    if let Some(level) = cli.log_level.clone() {
        general.log_level = level;
    }
    if let Err(e) = init_tracing(&general) {
        eprintln!("warning: {e:#}");
    }

    // no-op until a recorder is installed
    cvegate_core::metrics::describe_all();
    tracing::debug!(config = %cli.config.display(), "cvegate starting");

    let writer = OutputWriter::new(cli.output);
    let result: Result<(), CliError> = match cli.command {
        Commands::Check(args) => commands::check::execute(args, &cli.config, &writer).await,
        Commands::Config(args) => commands::config::execute(args, &cli.config, &writer).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(1))
        }
    }
}

/// Best-effort read of the `[general]` section; a broken policy is reported by the command itself.
async fn logging_config(path: &Path) -> GeneralConfig {
    match PolicyConfig::from_file(path).await {
        Ok(mut policy) => {
            policy.apply_env_overrides();
            policy.general
        }
        Err(_) => GeneralConfig::default(),
    }
}
