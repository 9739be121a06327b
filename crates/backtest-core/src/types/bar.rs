//! OHLCV (Open, High, Low, Close, Volume) bar types.

use chrono::{DateTime, NaiveDate, Utc};
use num_traits::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One OHLCV record for one instrument at one timestamp.
///
/// Prices are exact decimals so fills and valuations never drift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bar {
    /// Instrument symbol
    pub instrument: String,
    /// Bar timestamp (exchange wall-clock time, encoded as UTC)
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: Decimal,
    /// Highest price
    pub high: Decimal,
    /// Lowest price
    pub low: Decimal,
    /// Closing price
    pub close: Decimal,
    /// Traded volume; `None` when the source carries prices only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<Decimal>,
}

impl Bar {
    /// Create a new bar.
    pub fn new(
        instrument: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
        volume: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume: Some(volume),
        }
    }

    /// Create a bar from a price-only source with no volume information.
    pub fn without_volume(
        instrument: impl Into<String>,
        timestamp: DateTime<Utc>,
        open: Decimal,
        high: Decimal,
        low: Decimal,
        close: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Calendar day this bar belongs to.
    #[inline]
    pub fn trading_day(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Closing price as `f64` for indicator math.
    #[inline]
    pub fn close_f64(&self) -> f64 {
        self.close.to_f64().unwrap_or(0.0)
    }

    /// Check if the bar is bullish (close > open).
    #[inline]
    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    /// Whether the bar can absorb an order.
    ///
    /// Only a reported volume of zero counts as illiquid; unknown volume does not.
    #[inline]
    pub fn has_liquidity(&self) -> bool {
        self.volume.map_or(true, |v| v > Decimal::ZERO)
    }
}

/// Bounded window of the most recent bars of one instrument.
///
/// When capacity is reached, the oldest bar is dropped.
#[derive(Debug, Clone)]
pub struct BarWindow {
    bars: VecDeque<Bar>,
    capacity: usize,
}

impl BarWindow {
    /// Create an empty window holding at most `capacity` bars.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bars: VecDeque::with_capacity(capacity.min(1024)),
            capacity: capacity.max(1),
        }
    }

    /// Push a new bar, removing the oldest if at capacity.
    pub fn push(&mut self, bar: Bar) {
        if self.bars.len() >= self.capacity {
            self.bars.pop_front();
        }
        self.bars.push_back(bar);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get the last N bars, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<&Bar> {
        let start = self.bars.len().saturating_sub(n);
        self.bars.iter().skip(start).collect()
    }

    /// Get the most recent bar.
    pub fn last(&self) -> Option<&Bar> {
        self.bars.back()
    }

    /// Closing prices of the last N bars as `f64`, oldest first.
    pub fn closes(&self, n: usize) -> Vec<f64> {
        self.last_n(n).into_iter().map(Bar::close_f64).collect()
    }

    /// Iterate over the bars, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Bar> {
        self.bars.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn bar(day: u32, close: Decimal) -> Bar {
        Bar::new(
            "AAPL",
            Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            close,
            close + dec!(1),
            close - dec!(1),
            close,
            dec!(1000),
        )
    }

    #[test]
    fn test_bar_helpers() {
        let b = Bar::new(
            "AAPL",
            Utc.with_ymd_and_hms(2024, 1, 2, 14, 30, 0).unwrap(),
            dec!(100),
            dec!(110),
            dec!(95),
            dec!(105.5),
            dec!(0),
        );

        assert!(b.is_bullish());
        assert!(!b.has_liquidity());
        assert_eq!(b.trading_day(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert!((b.close_f64() - 105.5).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_volume_is_tradable() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let b = Bar::without_volume("AAPL", ts, dec!(10), dec!(11), dec!(9), dec!(10.5));

        assert_eq!(b.volume, None);
        assert!(b.has_liquidity());
        assert!(bar(2, dec!(10)).has_liquidity());
    }

    #[test]
    fn test_window_capacity() {
        let mut window = BarWindow::with_capacity(3);
        for day in 1..=4 {
            window.push(bar(day, Decimal::from(day)));
        }

        assert_eq!(window.len(), 3);
        assert_eq!(window.iter().next().unwrap().close, dec!(2));
        assert_eq!(window.last().unwrap().close, dec!(4));
    }

    #[test]
    fn test_window_last_n_and_closes() {
        let mut window = BarWindow::with_capacity(10);
        window.push(bar(1, dec!(100.5)));
        window.push(bar(2, dec!(101.5)));
        window.push(bar(3, dec!(102.5)));

        assert_eq!(window.last_n(2).len(), 2);
        assert_eq!(window.last_n(50).len(), 3);
        assert_eq!(window.closes(2), vec![101.5, 102.5]);
    }
}
