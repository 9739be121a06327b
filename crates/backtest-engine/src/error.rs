//! Errors surfaced by a backtest run.

use backtest_core::error::{ConfigError, DataError, StrategyError};
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::result::BacktestResult;

/// Run-level error.
#[derive(Error, Debug)]
pub enum BacktestError {
    /// Invalid configuration, raised before the run starts
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Missing or malformed market data
    #[error(transparent)]
    Data(#[from] DataError),

    /// A strategy callback failed; partial results are attached
    #[error(transparent)]
    Strategy(Box<StrategyFailure>),
}

impl BacktestError {
    /// Results accumulated before a strategy failure.
    pub fn partial_result(&self) -> Option<&BacktestResult> {
        match self {
            BacktestError::Strategy(failure) => Some(&failure.partial),
            _ => None,
        }
    }
}

impl From<StrategyFailure> for BacktestError {
    fn from(failure: StrategyFailure) -> Self {
        BacktestError::Strategy(Box::new(failure))
    }
}

/// A strategy error together with where it happened.
#[derive(Debug)]
pub struct StrategyFailure {
    pub strategy: String,
    pub cause: StrategyError,
    /// Simulation time of the failing callback; `None` during initialize
    pub timestamp: Option<DateTime<Utc>>,
    /// Bar instrument of the failing `on_bar` call
    pub instrument: Option<String>,
    pub partial: BacktestResult,
}

impl fmt::Display for StrategyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strategy '{}' failed", self.strategy)?;
        match (&self.timestamp, &self.instrument) {
            (Some(ts), Some(instrument)) => write!(f, " at {} on {}", ts, instrument)?,
            (Some(ts), None) => write!(f, " at {}", ts)?,
            _ => write!(f, " during initialization")?,
        }
        write!(f, ": {}", self.cause)
    }
}

impl std::error::Error for StrategyFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}
