//! Backtesting engine.
//!
//! Replays merged historical bars through a strategy, executes its intents
//! against a simulated ledger and analyzes the resulting equity curve.

mod analyzer;
mod cancel;
mod config;
mod error;
mod report;
mod result;
mod runner;
mod schedule;
mod sweep;

pub use analyzer::{max_drawdown, period_returns, round_trips, PerformanceAnalyzer, RoundTrip, Summary};
pub use cancel::{CancellationToken, Progress, ProgressObserver};
pub use config::{BacktestConfig, MarketSession, DEFAULT_HISTORY_WINDOW};
pub use error::{BacktestError, StrategyFailure};
pub use result::{BacktestResult, EquityPoint};
pub use runner::{run_backtest, run_quick_backtest, BacktestEngine, RunState};
pub use schedule::Scheduler;
pub use sweep::{run_sequential, run_sweep};
