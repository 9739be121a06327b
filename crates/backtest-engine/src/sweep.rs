//! Parallel execution of independent backtests.

use backtest_core::traits::{MarketDataFeed, Strategy};
use rayon::prelude::*;
use tracing::info;

use crate::config::BacktestConfig;
use crate::error::BacktestError;
use crate::result::BacktestResult;
use crate::runner::BacktestEngine;

/// Run one backtest per case on the rayon pool.
///
/// `setup` builds the configuration and a fresh strategy for a case. Runs
/// share nothing but the read-only feed, and results come back in the
/// order of `cases`.
pub fn run_sweep<T, F>(
    cases: &[T],
    feed: &dyn MarketDataFeed,
    instruments: &[String],
    setup: F,
) -> Vec<Result<BacktestResult, BacktestError>>
where
    T: Sync,
    F: Fn(&T) -> Result<(BacktestConfig, Box<dyn Strategy>), BacktestError> + Sync,
{
    info!(cases = cases.len(), "Starting parameter sweep");

    cases
        .par_iter()
        .map(|case| {
            let (config, mut strategy) = setup(case)?;
            BacktestEngine::new(config)?.run(strategy.as_mut(), feed, instruments)
        })
        .collect()
}

/// Sequential counterpart of [`run_sweep`].
pub fn run_sequential<T, F>(
    cases: &[T],
    feed: &dyn MarketDataFeed,
    instruments: &[String],
    setup: F,
) -> Vec<Result<BacktestResult, BacktestError>>
where
    F: Fn(&T) -> Result<(BacktestConfig, Box<dyn Strategy>), BacktestError>,
{
    cases
        .iter()
        .map(|case| {
            let (config, mut strategy) = setup(case)?;
            BacktestEngine::new(config)?.run(strategy.as_mut(), feed, instruments)
        })
        .collect()
}
