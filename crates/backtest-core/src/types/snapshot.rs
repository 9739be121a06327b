//! Point-in-time portfolio valuation.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Position;

/// Portfolio state at the close of a bar interval.
///
/// `equity == cash + market_value` holds exactly for every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cash: Decimal,
    pub positions: BTreeMap<String, Position>,
    pub market_value: Decimal,
    pub equity: Decimal,
}

impl PortfolioSnapshot {
    /// Snapshot of an all-cash portfolio.
    pub fn cash_only(timestamp: DateTime<Utc>, cash: Decimal) -> Self {
        Self {
            timestamp,
            cash,
            positions: BTreeMap::new(),
            market_value: Decimal::ZERO,
            equity: cash,
        }
    }

    pub fn position(&self, instrument: &str) -> Option<&Position> {
        self.positions.get(instrument)
    }

    /// Shares held in `instrument` (zero when flat).
    pub fn shares(&self, instrument: &str) -> Decimal {
        self.positions
            .get(instrument)
            .map(|p| p.shares)
            .unwrap_or(Decimal::ZERO)
    }

    pub fn has_position(&self, instrument: &str) -> bool {
        self.shares(instrument) != Decimal::ZERO
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }
}
