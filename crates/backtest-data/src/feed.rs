//! In-memory market data feed with a lazy chronological merge.

use backtest_core::error::DataError;
use backtest_core::traits::{BarStream, MarketDataFeed};
use backtest_core::types::Bar;
use chrono::{DateTime, Utc};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::path::Path;
use tracing::{debug, info};

use crate::CsvDataSource;

/// Feed backed by per-instrument bar vectors held in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryFeed {
    series: BTreeMap<String, Vec<Bar>>,
}

impl InMemoryFeed {
    /// Create an empty feed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the bars of one instrument.
    ///
    /// Timestamps must be strictly increasing, and every bar must belong to `instrument`.
    pub fn insert(&mut self, instrument: &str, bars: Vec<Bar>) -> Result<(), DataError> {
        for pair in bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(DataError::OutOfOrder {
                    instrument: instrument.to_string(),
                    timestamp: pair[1].timestamp,
                });
            }
        }
        if let Some(bar) = bars.iter().find(|b| b.instrument != instrument) {
            return Err(DataError::ParseError(format!(
                "Bar for {} inserted under {}",
                bar.instrument, instrument
            )));
        }
        self.series.insert(instrument.to_string(), bars);
        Ok(())
    }

    /// Builder-style [`InMemoryFeed::insert`].
    pub fn with_series(mut self, instrument: &str, bars: Vec<Bar>) -> Result<Self, DataError> {
        self.insert(instrument, bars)?;
        Ok(self)
    }

    /// Instruments with data in this feed.
    pub fn instruments(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Total number of bars held.
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Load `{SYMBOL}.csv`, `{symbol}.csv`, `{SYMBOL}_daily.csv` or `{symbol}_daily.csv`
    /// for each instrument from `dir`. Instruments without a file are skipped.
    pub async fn load_csv_dir(dir: &Path, instruments: &[String]) -> Result<Self, DataError> {
        let mut feed = Self::new();

        for instrument in instruments {
            let lower = instrument.to_lowercase();
            let candidates = [
                dir.join(format!("{}.csv", instrument)),
                dir.join(format!("{}.csv", lower)),
                dir.join(format!("{}_daily.csv", instrument)),
                dir.join(format!("{}_daily.csv", lower)),
            ];
            let Some(file_path) = candidates.iter().find(|p| p.exists()) else {
                debug!("No CSV file for {} in {}", instrument, dir.display());
                continue;
            };
            let path = file_path
                .to_str()
                .ok_or_else(|| DataError::Io(format!("Non UTF-8 path: {}", file_path.display())))?;
            let bars = CsvDataSource::new(path)?.load_all(instrument).await?;
            feed.insert(instrument, bars)?;
        }

        info!("Loaded data for {} instruments", feed.series.len());
        Ok(feed)
    }

    /// Slice of an instrument's bars within `[start, end]`.
    fn range(&self, instrument: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> &[Bar] {
        let Some(bars) = self.series.get(instrument) else {
            return &[];
        };
        let lo = bars.partition_point(|b| b.timestamp < start);
        let hi = bars.partition_point(|b| b.timestamp <= end);
        &bars[lo..hi.max(lo)]
    }
}

impl MarketDataFeed for InMemoryFeed {
    fn bars(
        &self,
        instruments: &BTreeSet<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BarStream<'_>, DataError> {
        if start > end {
            return Err(DataError::Range { start, end });
        }

        let mut series = Vec::with_capacity(instruments.len());
        for instrument in instruments {
            let bars = self.range(instrument, start, end);
            if bars.is_empty() {
                return Err(DataError::Gap {
                    instrument: instrument.clone(),
                    start,
                    end,
                });
            }
            series.push(bars);
        }

        Ok(Box::new(MergedBars::new(series)))
    }

    fn name(&self) -> &str {
        "In-Memory Feed"
    }
}

/// K-way merge of sorted series, ordered by (timestamp, series index).
///
/// Series are supplied in instrument-name order, so ties on timestamp
/// always resolve the same way.
struct MergedBars<'a> {
    series: Vec<&'a [Bar]>,
    cursors: Vec<usize>,
    heap: BinaryHeap<Reverse<(DateTime<Utc>, usize)>>,
}

impl<'a> MergedBars<'a> {
    fn new(series: Vec<&'a [Bar]>) -> Self {
        let heap = series
            .iter()
            .enumerate()
            .filter_map(|(i, bars)| bars.first().map(|b| Reverse((b.timestamp, i))))
            .collect();
        Self {
            cursors: vec![0; series.len()],
            series,
            heap,
        }
    }
}

impl Iterator for MergedBars<'_> {
    type Item = Bar;

    fn next(&mut self) -> Option<Bar> {
        let Reverse((_, idx)) = self.heap.pop()?;
        let bars = self.series[idx];
        let bar = bars[self.cursors[idx]].clone();

        self.cursors[idx] += 1;
        if let Some(next) = bars.get(self.cursors[idx]) {
            self.heap.push(Reverse((next.timestamp, idx)));
        }

        Some(bar)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining: usize = self
            .series
            .iter()
            .zip(&self.cursors)
            .map(|(bars, cursor)| bars.len() - cursor)
            .sum();
        (remaining, Some(remaining))
    }
}
