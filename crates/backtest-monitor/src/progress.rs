//! Progress observer that reports through `tracing`.

use backtest_engine::{Progress, ProgressObserver};
use tracing::info;

/// Logs run progress every `every` bar intervals.
#[derive(Debug, Clone)]
pub struct LogProgress {
    every: usize,
}

impl LogProgress {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
        }
    }

    fn should_log(&self, progress: &Progress) -> bool {
        progress.intervals % self.every == 0
    }
}

impl Default for LogProgress {
    fn default() -> Self {
        Self::new(250)
    }
}

impl ProgressObserver for LogProgress {
    fn on_progress(&self, progress: &Progress) {
        if !self.should_log(progress) {
            return;
        }
        match progress.fraction() {
            Some(fraction) => info!(
                intervals = progress.intervals,
                bars = progress.bars_processed,
                at = %progress.timestamp,
                equity = %progress.equity,
                "Backtest {:.0}% complete",
                fraction * 100.0
            ),
            None => info!(
                intervals = progress.intervals,
                bars = progress.bars_processed,
                at = %progress.timestamp,
                equity = %progress.equity,
                "Backtest progress"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;

    fn progress(intervals: usize) -> Progress {
        Progress {
            intervals,
            bars_processed: intervals,
            total_bars: Some(100),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            equity: Decimal::ONE_HUNDRED,
        }
    }

    #[test]
    fn test_logs_every_n_intervals() {
        let observer = LogProgress::new(10);
        assert!(!observer.should_log(&progress(9)));
        assert!(observer.should_log(&progress(10)));
        assert!(observer.should_log(&progress(20)));

        observer.on_progress(&progress(10));
    }

    #[test]
    fn test_zero_interval_logs_everything() {
        let observer = LogProgress::new(0);
        assert!(observer.should_log(&progress(1)));
    }
}
