//! CLI definitions.

pub mod commands;

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "backtester")]
#[command(author, version, about = "Deterministic strategy backtesting engine")]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", env = "BACKTEST_CONFIG")]
    pub config: PathBuf,

    /// Log level (overrides the configuration file)
    #[arg(short, long)]
    pub log_level: Option<LogLevel>,

    /// Enable JSON log format
    #[arg(long)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a backtest over the full date range
    Backtest(BacktestArgs),
    /// Run a backtest over the first N bar intervals only
    Quick(QuickArgs),
    /// List available strategies
    Strategies,
    /// Validate configuration
    ValidateConfig,
}

#[derive(Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args)]
pub struct BacktestArgs {
    /// Strategy to backtest
    #[arg(short, long)]
    pub strategy: String,

    /// Instruments to trade (comma-separated)
    #[arg(short = 'S', long, value_delimiter = ',', required = true)]
    pub symbols: Vec<String>,

    /// Start date (YYYY-MM-DD)
    #[arg(long)]
    pub start: NaiveDate,

    /// End date (YYYY-MM-DD), inclusive
    #[arg(long)]
    pub end: NaiveDate,

    /// Initial cash (overrides the configuration file)
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Benchmark instrument (overrides the configuration file)
    #[arg(long)]
    pub benchmark: Option<String>,

    /// Fill orders at the next bar's open instead of the current close
    #[arg(long)]
    pub next_open: bool,

    /// Strategy configuration file (JSON)
    #[arg(long)]
    pub strategy_config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Save the JSON result to a file
    #[arg(long)]
    pub save: Option<PathBuf>,

    /// Save the equity curve as CSV
    #[arg(long)]
    pub equity_csv: Option<PathBuf>,

    /// Data file or directory of CSV files (defaults to the configured data directory)
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Log progress every N bar intervals
    #[arg(long, default_value = "250")]
    pub progress_every: usize,
}

#[derive(clap::Args)]
pub struct QuickArgs {
    #[command(flatten)]
    pub backtest: BacktestArgs,

    /// Number of bar intervals to simulate
    #[arg(long, default_value = "100")]
    pub bars: usize,
}
