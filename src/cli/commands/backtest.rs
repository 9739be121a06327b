//! Backtest and quick backtest command implementation.

use anyhow::{Context, Result};
use backtest_config::AppConfig;
use backtest_core::Bar;
use backtest_data::{CsvDataSource, InMemoryFeed};
use backtest_engine::{BacktestEngine, BacktestError, BacktestResult, CancellationToken};
use backtest_monitor::LogProgress;
use backtest_strategies::StrategyRegistry;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::cli::{BacktestArgs, OutputFormat, QuickArgs};

pub async fn run(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    execute(args, config, None).await
}

pub async fn run_quick(args: QuickArgs, config: &AppConfig) -> Result<()> {
    if args.bars == 0 {
        anyhow::bail!("--bars must be at least 1");
    }
    execute(args.backtest, config, Some(args.bars)).await
}

async fn execute(args: BacktestArgs, config: &AppConfig, bar_limit: Option<usize>) -> Result<()> {
    info!("Starting backtest for strategy: {}", args.strategy);

    let mut settings = config.backtest.clone();
    if let Some(capital) = args.capital {
        settings.initial_cash = capital;
    }
    if let Some(benchmark) = &args.benchmark {
        settings.benchmark_symbol = Some(benchmark.clone());
    }
    if args.next_open {
        settings.fill_at_next_open = true;
    }
    let backtest_config = settings
        .into_config(args.start, args.end)
        .context("Invalid backtest configuration")?;

    // Create strategy
    let registry = StrategyRegistry::new();
    let strategy_config = match &args.strategy_config {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid strategy configuration in {}", path.display()))?
        }
        None => registry
            .get(&args.strategy)
            .map(|info| info.default_config.clone())
            .with_context(|| format!("Unknown strategy '{}'", args.strategy))?,
    };
    let mut strategy = registry
        .create(&args.strategy, strategy_config, args.symbols.clone())
        .context("Failed to create strategy")?;

    // Load data
    let data_path = args.data.clone().unwrap_or_else(|| config.app.data_dir.clone());
    if !data_path.exists() {
        anyhow::bail!(
            "Data path '{}' does not exist. Provide a CSV file or directory containing CSV files (e.g. --data ./data)",
            data_path.display()
        );
    }
    let mut wanted = args.symbols.clone();
    if let Some(benchmark) = &backtest_config.benchmark_symbol {
        wanted.push(benchmark.clone());
    }
    let feed = load_feed(&data_path, &wanted).await?;

    // Stop at the next bar boundary on Ctrl-C.
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping at the next bar");
            on_signal.cancel();
        }
    });

    let mut engine = BacktestEngine::new(backtest_config)?
        .with_cancellation(cancel)
        .with_progress(Arc::new(LogProgress::new(args.progress_every)));
    if let Some(limit) = bar_limit {
        engine = engine.with_bar_limit(limit);
    }

    let symbols = args.symbols.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        engine.run(strategy.as_mut(), &feed, &symbols)
    })
    .await
    .context("Backtest task failed")?;

    let report = match outcome {
        Ok(report) => report,
        Err(BacktestError::Strategy(failure)) => {
            println!("{}", failure.partial.summary_text());
            return Err(anyhow::Error::new(*failure).context("Backtest aborted"));
        }
        Err(e) => return Err(anyhow::Error::new(e).context("Backtest failed")),
    };

    output(&report, &args).await
}

async fn output(report: &BacktestResult, args: &BacktestArgs) -> Result<()> {
    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary_text()),
    }

    if let Some(save_path) = &args.save {
        tokio::fs::write(save_path, report.to_json()?)
            .await
            .with_context(|| format!("Failed to write {}", save_path.display()))?;
        info!("Results saved to {:?}", save_path);
    }
    if let Some(csv_path) = &args.equity_csv {
        tokio::fs::write(csv_path, report.equity_to_csv())
            .await
            .with_context(|| format!("Failed to write {}", csv_path.display()))?;
        info!("Equity curve saved to {:?}", csv_path);
    }

    Ok(())
}

/// A single CSV file is loaded for the first instrument; a directory is
/// searched for one file per instrument.
async fn load_feed(path: &Path, instruments: &[String]) -> Result<InMemoryFeed> {
    let feed = if path.is_file() {
        let instrument = instruments
            .first()
            .context("At least one instrument is required")?;
        let path_str = path
            .to_str()
            .with_context(|| format!("Non UTF-8 path: {}", path.display()))?;
        let bars: Vec<Bar> = CsvDataSource::new(path_str)?.load_all(instrument).await?;
        InMemoryFeed::new().with_series(instrument, bars)?
    } else {
        InMemoryFeed::load_csv_dir(path, instruments).await?
    };

    if feed.is_empty() {
        anyhow::bail!("No data loaded from {}", path.display());
    }
    Ok(feed)
}
