//! Bounded lookback over bars already seen by the simulation.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::error::DataError;
use crate::types::{Bar, BarWindow};

/// History accessor handed to strategy callbacks.
///
/// Only the owner of a `&mut History` (the runner) can advance it, and it
/// only ever receives bars the simulation clock has reached, so a strategy
/// holding `&History` can never observe a bar later than [`History::now`].
#[derive(Debug, Clone)]
pub struct History {
    window: usize,
    series: BTreeMap<String, BarWindow>,
    now: Option<DateTime<Utc>>,
}

impl History {
    /// Create an empty history keeping `window` bars per instrument.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            series: BTreeMap::new(),
            now: None,
        }
    }

    /// Append a bar and advance the clock to its timestamp.
    pub fn push(&mut self, bar: Bar) -> Result<(), DataError> {
        if let Some(now) = self.now {
            if bar.timestamp < now {
                return Err(DataError::OutOfOrder {
                    instrument: bar.instrument,
                    timestamp: bar.timestamp,
                });
            }
        }
        let series = self
            .series
            .entry(bar.instrument.clone())
            .or_insert_with(|| BarWindow::with_capacity(self.window));
        if let Some(last) = series.last() {
            if bar.timestamp <= last.timestamp {
                return Err(DataError::OutOfOrder {
                    instrument: bar.instrument,
                    timestamp: bar.timestamp,
                });
            }
        }
        self.now = Some(bar.timestamp);
        series.push(bar);
        Ok(())
    }

    /// Current simulation time.
    pub fn now(&self) -> Option<DateTime<Utc>> {
        self.now
    }

    /// Maximum number of bars kept per instrument.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Most recent bar of an instrument.
    pub fn current(&self, instrument: &str) -> Option<&Bar> {
        self.series.get(instrument).and_then(BarWindow::last)
    }

    /// Up to `n` most recent bars of an instrument, oldest first.
    pub fn bars(&self, instrument: &str, n: usize) -> Vec<&Bar> {
        self.series
            .get(instrument)
            .map(|s| s.last_n(n))
            .unwrap_or_default()
    }

    /// Up to `n` most recent closes of an instrument, oldest first.
    pub fn closes(&self, instrument: &str, n: usize) -> Vec<f64> {
        self.series
            .get(instrument)
            .map(|s| s.closes(n))
            .unwrap_or_default()
    }

    /// Number of bars currently available for an instrument.
    pub fn len(&self, instrument: &str) -> usize {
        self.series.get(instrument).map(BarWindow::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Instruments seen so far.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    fn bar(instrument: &str, day: u32, close: i64) -> Bar {
        let close = Decimal::from(close);
        Bar::new(
            instrument,
            Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            close,
            close,
            close,
            close,
            Decimal::from(100),
        )
    }

    #[test]
    fn test_window_bounds_lookback() {
        let mut history = History::new(3);
        for day in 1..=5 {
            history.push(bar("SPY", day, day as i64)).unwrap();
        }

        assert_eq!(history.len("SPY"), 3);
        assert_eq!(history.bars("SPY", 10).len(), 3);
        assert_eq!(history.closes("SPY", 2), vec![4.0, 5.0]);
        assert_eq!(history.current("SPY").unwrap().close, Decimal::from(5));
    }

    #[test]
    fn test_rejects_past_bars() {
        let mut history = History::new(10);
        history.push(bar("SPY", 2, 1)).unwrap();

        assert!(history.push(bar("SPY", 2, 1)).is_err());
        assert!(history.push(bar("QQQ", 1, 1)).is_err());
        assert!(history.push(bar("QQQ", 2, 1)).is_ok());
    }

    #[test]
    fn test_unknown_instrument() {
        let history = History::new(10);
        assert!(history.current("SPY").is_none());
        assert!(history.bars("SPY", 5).is_empty());
        assert!(history.is_empty());
    }
}
