//! Portfolio ledger: the authoritative record of cash, positions, fills and snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::error::LedgerError;
use crate::types::{Fill, PortfolioSnapshot, Position};

/// Ledger configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerConfig {
    pub initial_cash: Decimal,
    /// Allow positions to go below zero shares
    pub allow_short_selling: bool,
    /// Allow cash to go below zero
    pub allow_margin: bool,
}

impl LedgerConfig {
    /// Cash-only account with shorting and margin disabled.
    pub fn cash_account(initial_cash: Decimal) -> Self {
        Self {
            initial_cash,
            allow_short_selling: false,
            allow_margin: false,
        }
    }
}

/// Portfolio ledger.
///
/// Fills are the only way positions change. The fill log and the snapshot
/// history are append-only.
#[derive(Debug, Clone)]
pub struct Ledger {
    config: LedgerConfig,
    cash: Decimal,
    positions: BTreeMap<String, Position>,
    /// Latest valuation price per instrument
    marks: BTreeMap<String, Decimal>,
    fills: Vec<Fill>,
    snapshots: Vec<PortfolioSnapshot>,
    realized_pnl: Decimal,
}

impl Ledger {
    /// Create a ledger holding only the initial cash.
    pub fn new(config: LedgerConfig) -> Self {
        Self {
            cash: config.initial_cash,
            config,
            positions: BTreeMap::new(),
            marks: BTreeMap::new(),
            fills: Vec::new(),
            snapshots: Vec::new(),
            realized_pnl: Decimal::ZERO,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn initial_cash(&self) -> Decimal {
        self.config.initial_cash
    }

    pub fn cash(&self) -> Decimal {
        self.cash
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

    pub fn positions(&self) -> &BTreeMap<String, Position> {
        &self.positions
    }

    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn snapshots(&self) -> &[PortfolioSnapshot] {
        &self.snapshots
    }

    /// Realized P&L across all closed shares, before commissions.
    pub fn realized_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    /// Update the valuation price of an instrument without recording a snapshot.
    pub fn mark(&mut self, instrument: &str, price: Decimal) {
        self.marks.insert(instrument.to_string(), price);
    }

    /// Valuation price for an instrument; falls back to average cost when never marked.
    fn mark_price(&self, position: &Position) -> Decimal {
        self.marks
            .get(&position.instrument)
            .copied()
            .unwrap_or(position.average_cost)
    }

    /// Total market value of all positions at the current marks.
    pub fn market_value(&self) -> Decimal {
        self.positions
            .values()
            .map(|p| p.market_value(self.mark_price(p)))
            .sum()
    }

    /// Cash plus market value at the current marks.
    pub fn equity(&self) -> Decimal {
        self.cash + self.market_value()
    }

    /// Current state as a snapshot, without appending it to the history.
    pub fn snapshot(&self, timestamp: DateTime<Utc>) -> PortfolioSnapshot {
        let market_value = self.market_value();
        PortfolioSnapshot {
            timestamp,
            cash: self.cash,
            positions: self.positions.clone(),
            market_value,
            equity: self.cash + market_value,
        }
    }

    /// Apply a fill to cash and the named position.
    ///
    /// The ledger is left untouched when the fill is refused.
    pub fn apply_fill(&mut self, fill: Fill) -> Result<PortfolioSnapshot, LedgerError> {
        if let Some(last) = self.fills.last() {
            if fill.timestamp < last.timestamp {
                return Err(LedgerError::OutOfOrderFill {
                    timestamp: fill.timestamp,
                    last: last.timestamp,
                });
            }
        }

        let held = self.shares(&fill.instrument);
        if !self.config.allow_short_selling && held + fill.shares < Decimal::ZERO {
            return Err(LedgerError::ShortSellingDisabled {
                instrument: fill.instrument.clone(),
                held,
                shares: fill.shares,
            });
        }

        let new_cash = self.cash + fill.cash_impact();
        if !self.config.allow_margin && new_cash < Decimal::ZERO {
            return Err(LedgerError::InsufficientFunds {
                required: -fill.cash_impact(),
                available: self.cash,
            });
        }

        self.cash = new_cash;
        let position = self
            .positions
            .entry(fill.instrument.clone())
            .or_insert_with(|| Position::flat(&fill.instrument));
        self.realized_pnl += position.apply_fill(fill.shares, fill.price);

        if position.is_flat() {
            self.positions.remove(&fill.instrument);
        }
        self.marks.entry(fill.instrument.clone()).or_insert(fill.price);

        debug!(
            instrument = %fill.instrument,
            shares = %fill.shares,
            price = %fill.price,
            commission = %fill.commission,
            cash = %self.cash,
            "Fill applied"
        );

        let timestamp = fill.timestamp;
        self.fills.push(fill);
        Ok(self.snapshot(timestamp))
    }

    /// Revalue positions at the given prices and append a snapshot.
    pub fn mark_to_market(
        &mut self,
        timestamp: DateTime<Utc>,
        prices: &BTreeMap<String, Decimal>,
    ) -> PortfolioSnapshot {
        for (instrument, price) in prices {
            self.marks.insert(instrument.clone(), *price);
        }
        let snapshot = self.snapshot(timestamp);
        self.snapshots.push(snapshot.clone());
        snapshot
    }

    /// Consume the ledger, returning its snapshot history and fill log.
    pub fn into_history(self) -> (Vec<PortfolioSnapshot>, Vec<Fill>) {
        (self.snapshots, self.fills)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn prices(instrument: &str, price: Decimal) -> BTreeMap<String, Decimal> {
        [(instrument.to_string(), price)].into_iter().collect()
    }

    #[test]
    fn test_round_trip_cash() {
        let mut ledger = Ledger::new(LedgerConfig::cash_account(dec!(100000)));

        let snapshot = ledger
            .apply_fill(Fill::new("AAPL", day(2), dec!(100), dec!(150), dec!(101)))
            .unwrap();
        assert_eq!(snapshot.cash, dec!(84899));
        assert_eq!(snapshot.equity, dec!(99899));

        let snapshot = ledger
            .apply_fill(Fill::new("AAPL", day(3), dec!(-100), dec!(160), dec!(101)))
            .unwrap();
        assert_eq!(snapshot.cash, dec!(100798));
        assert!(ledger.positions().is_empty());
        assert_eq!(ledger.realized_pnl(), dec!(1000));
    }

    #[test]
    fn test_insufficient_funds_leaves_state() {
        let mut ledger = Ledger::new(LedgerConfig::cash_account(dec!(1000)));

        let err = ledger
            .apply_fill(Fill::new("AAPL", day(2), dec!(10), dec!(150), dec!(1)))
            .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientFunds { .. }));
        assert_eq!(ledger.cash(), dec!(1000));
        assert!(ledger.fills().is_empty());
    }

    #[test]
    fn test_margin_allows_negative_cash() {
        let mut config = LedgerConfig::cash_account(dec!(1000));
        config.allow_margin = true;
        let mut ledger = Ledger::new(config);

        let snapshot = ledger
            .apply_fill(Fill::new("AAPL", day(2), dec!(10), dec!(150), dec!(0)))
            .unwrap();
        assert_eq!(snapshot.cash, dec!(-500));
        assert_eq!(snapshot.equity, dec!(1000));
    }

    #[test]
    fn test_short_selling_disabled() {
        let mut ledger = Ledger::new(LedgerConfig::cash_account(dec!(1000)));

        let err = ledger
            .apply_fill(Fill::new("AAPL", day(2), dec!(-1), dec!(10), dec!(0)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::ShortSellingDisabled { .. }));
    }

    #[test]
    fn test_short_selling_enabled() {
        let mut config = LedgerConfig::cash_account(dec!(1000));
        config.allow_short_selling = true;
        let mut ledger = Ledger::new(config);

        ledger
            .apply_fill(Fill::new("AAPL", day(2), dec!(-10), dec!(10), dec!(0)))
            .unwrap();
        let snapshot = ledger.mark_to_market(day(2), &prices("AAPL", dec!(12)));

        assert_eq!(snapshot.cash, dec!(1100));
        assert_eq!(snapshot.market_value, dec!(-120));
        assert_eq!(snapshot.equity, dec!(980));
    }

    #[test]
    fn test_out_of_order_fill() {
        let mut ledger = Ledger::new(LedgerConfig::cash_account(dec!(100000)));
        ledger
            .apply_fill(Fill::new("AAPL", day(3), dec!(1), dec!(10), dec!(0)))
            .unwrap();

        let err = ledger
            .apply_fill(Fill::new("AAPL", day(2), dec!(1), dec!(10), dec!(0)))
            .unwrap_err();
        assert!(matches!(err, LedgerError::OutOfOrderFill { .. }));
    }

    #[test]
    fn test_mark_to_market_appends_snapshot() {
        let mut ledger = Ledger::new(LedgerConfig::cash_account(dec!(10000)));
        ledger
            .apply_fill(Fill::new("AAPL", day(2), dec!(10), dec!(100), dec!(0)))
            .unwrap();

        ledger.mark_to_market(day(2), &prices("AAPL", dec!(100)));
        let snapshot = ledger.mark_to_market(day(3), &prices("AAPL", dec!(110)));

        assert_eq!(ledger.snapshots().len(), 2);
        assert_eq!(snapshot.market_value, dec!(1100));
        assert_eq!(snapshot.cash + snapshot.market_value, snapshot.equity);
        assert_eq!(snapshot.equity, dec!(10100));
    }

    #[test]
    fn test_unmarked_position_valued_at_fill_price() {
        let mut ledger = Ledger::new(LedgerConfig::cash_account(dec!(10000)));
        ledger
            .apply_fill(Fill::new("MSFT", day(2), dec!(5), dec!(200), dec!(0)))
            .unwrap();

        assert_eq!(ledger.market_value(), dec!(1000));
        assert_eq!(ledger.equity(), dec!(10000));
    }
}
