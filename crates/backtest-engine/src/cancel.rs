//! Cooperative cancellation and progress reporting at bar boundaries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag, polled by the runner before every bar interval.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. The run stops at the next bar boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Progress after a completed bar interval.
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    /// Completed bar intervals
    pub intervals: usize,
    /// Bars handed to the strategy so far
    pub bars_processed: usize,
    /// Upper bound on the bars the feed will produce, when known
    pub total_bars: Option<usize>,
    pub timestamp: DateTime<Utc>,
    pub equity: Decimal,
}

impl Progress {
    /// Completed fraction in `[0, 1]`, when the total is known.
    pub fn fraction(&self) -> Option<f64> {
        self.total_bars
            .filter(|&total| total > 0)
            .map(|total| (self.bars_processed as f64 / total as f64).min(1.0))
    }
}

/// Receives progress notifications from a running backtest.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) {
        self(progress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_token_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn test_progress_fraction() {
        let mut progress = Progress {
            intervals: 5,
            bars_processed: 5,
            total_bars: Some(20),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            equity: Decimal::ONE,
        };
        assert_eq!(progress.fraction(), Some(0.25));

        progress.total_bars = None;
        assert_eq!(progress.fraction(), None);
    }
}
