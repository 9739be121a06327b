//! Backtest result types.

use backtest_core::context::RecordedValue;
use backtest_core::types::{Fill, OrderRecord, PortfolioSnapshot};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::analyzer::{RoundTrip, Summary};
use crate::config::BacktestConfig;

/// One point of the equity curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
    /// Equity of a buy-and-hold position in the benchmark, when one is configured
    pub benchmark_equity: Option<Decimal>,
}

/// Complete outcome of one run.
///
/// Built once at the end of the run (or at the point of failure or
/// cancellation) from the ledger's own snapshot and fill history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub strategy: String,
    pub instruments: Vec<String>,
    pub config: BacktestConfig,
    pub equity_curve: Vec<EquityPoint>,
    pub snapshots: Vec<PortfolioSnapshot>,
    pub transactions: Vec<Fill>,
    pub orders: Vec<OrderRecord>,
    pub round_trips: Vec<RoundTrip>,
    pub recorded: Vec<RecordedValue>,
    pub summary: Summary,
    /// The run was stopped through its cancellation token
    pub cancelled: bool,
    /// Bars handed to the strategy
    pub bars_processed: usize,
}

impl BacktestResult {
    /// Equity at the end of the run.
    pub fn final_equity(&self) -> Decimal {
        self.summary.final_equity
    }

    /// Final portfolio state, if any interval completed.
    pub fn final_snapshot(&self) -> Option<&PortfolioSnapshot> {
        self.snapshots.last()
    }

    /// Values recorded under `name`, in time order.
    pub fn recorded_series(&self, name: &str) -> Vec<(DateTime<Utc>, f64)> {
        self.recorded
            .iter()
            .filter(|r| r.name == name)
            .map(|r| (r.timestamp, r.value))
            .collect()
    }
}
