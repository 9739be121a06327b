//! Market data feed trait definition.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

use crate::error::DataError;
use crate::types::Bar;

/// Lazy, finite stream of bars in chronological order.
pub type BarStream<'a> = Box<dyn Iterator<Item = Bar> + Send + 'a>;

/// Supplier of historical bars.
///
/// Implementations must be reproducible: calling [`MarketDataFeed::bars`]
/// twice with the same arguments yields the same sequence.
pub trait MarketDataFeed: Send + Sync {
    /// Bars for `instruments` within `[start, end]`, merged chronologically.
    ///
    /// # Errors
    /// * `DataError::Range` if `start > end`
    /// * `DataError::Gap` if an instrument has no bars in range
    fn bars(
        &self,
        instruments: &BTreeSet<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarStream<'_>, DataError>;

    /// Get the feed name.
    fn name(&self) -> &str;
}
