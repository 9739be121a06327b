//! Backtester CLI application.

mod cli;

use anyhow::{Context, Result};
use backtest_config::{load_config, load_from_env};
use backtest_monitor::setup_logging;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Validation reports on the file itself, before anything else.
    if let Commands::ValidateConfig = cli.command {
        return cli::commands::validate::run(&cli.config).await;
    }

    let config = if cli.config.exists() {
        load_config(&cli.config)
            .with_context(|| format!("Failed to load {}", cli.config.display()))?
    } else {
        load_from_env().context("Failed to load configuration from the environment")?
    };

    // Setup logging
    let log_level = cli
        .log_level
        .map(|level| level.as_str().to_string())
        .unwrap_or_else(|| config.logging.level.clone());
    let json = cli.json_logs || config.logging.is_json();
    let _guard = setup_logging(&log_level, json, config.logging.file.as_deref().map(Path::new))
        .context("Failed to initialize logging")?;

    if !cli.config.exists() {
        tracing::info!(
            "No configuration file at {}, using defaults",
            cli.config.display()
        );
    }

    // Execute command
    match cli.command {
        Commands::Backtest(args) => cli::commands::backtest::run(args, &config).await,
        Commands::Quick(args) => cli::commands::backtest::run_quick(args, &config).await,
        Commands::Strategies => cli::commands::strategies::run().await,
        Commands::ValidateConfig => cli::commands::validate::run(&cli.config).await,
    }
}
