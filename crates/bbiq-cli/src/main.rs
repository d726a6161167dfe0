//! bbiq CLI - Main entry point

use bbiq_cli::{commands, Cli, Commands};
use bbiq_common::logging::{init_logging, LogConfig, LogLevel, LogOutput};
use clap::Parser;
use std::process;
use tracing::error;

#[tokio::main]
async fn main() {
    // `.env` values feed both clap's env fallbacks and the configuration
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let log_config = LogConfig::builder()
        .level(if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Info
        })
        .output(LogOutput::Console)
        .log_file_prefix("bbiq")
        .build();

    // Environment variables take precedence
    let log_config = match log_config.merge_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: invalid logging configuration: {e:#}");
            process::exit(1);
        }
    };

    let _guard = match init_logging(&log_config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: failed to initialize logging: {e:#}");
            process::exit(1);
        }
    };

    if let Err(e) = execute_command(&cli).await {
        error!(error = %e, "Command failed");
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

/// Execute the CLI command
async fn execute_command(cli: &Cli) -> bbiq_cli::Result<()> {
    let config = cli.load_config()?;

    match &cli.command {
        Commands::Consume => commands::consume::run(config).await,
        Commands::Info => commands::info::run(config).await,
        Commands::Purge => commands::purge::run(config).await,
        Commands::Push { files } => commands::push::run(config, files).await,
        Commands::Import { files } => commands::import::run(config, files).await,
    }
}
