//! CSV data source.

use backtest_core::error::DataError;
use backtest_core::types::Bar;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// CSV record format.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(alias = "Date", alias = "date", alias = "timestamp", alias = "Timestamp")]
    date: String,
    #[serde(alias = "Open", alias = "open")]
    open: String,
    #[serde(alias = "High", alias = "high")]
    high: String,
    #[serde(alias = "Low", alias = "low")]
    low: String,
    #[serde(alias = "Close", default)]
    close: Option<String>,
    #[serde(alias = "Adj Close", alias = "AdjClose", alias = "adj close", default)]
    adj_close: Option<String>,
    #[serde(alias = "Volume", alias = "volume", default)]
    volume: Option<String>,
}

/// CSV data source for one instrument's historical bars.
pub struct CsvDataSource {
    path: String,
}

impl CsvDataSource {
    /// Create a new CSV data source.
    pub fn new(path: &str) -> Result<Self, DataError> {
        if !Path::new(path).exists() {
            return Err(DataError::Io(format!("File not found: {}", path)));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }

    /// Load all bars from the CSV file, sorted by timestamp.
    pub async fn load_all(&self, instrument: &str) -> Result<Vec<Bar>, DataError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| DataError::Io(format!("{}: {}", self.path, e)))?;
        let bars = parse_bars(&bytes, instrument)?;
        debug!("Loaded {} bars for {} from {}", bars.len(), instrument, self.path);
        Ok(bars)
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Parse CSV content into bars for `instrument`.
pub(crate) fn parse_bars(bytes: &[u8], instrument: &str) -> Result<Vec<Bar>, DataError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let mut bars = Vec::new();

    for result in reader.deserialize() {
        let record: CsvRecord = result.map_err(|e| DataError::ParseError(e.to_string()))?;

        // Raw close matches the unadjusted open/high/low; adjusted close is a fallback.
        let close = [record.close.as_deref(), record.adj_close.as_deref()]
            .into_iter()
            .flatten()
            .find(|v| !v.is_empty())
            .ok_or_else(|| DataError::ParseError(format!("Missing close on {}", record.date)))?;

        let timestamp = parse_timestamp(&record.date)?;
        let open = parse_decimal(&record.open)?;
        let high = parse_decimal(&record.high)?;
        let low = parse_decimal(&record.low)?;
        let close = parse_decimal(close)?;

        let bar = match record.volume.as_deref() {
            Some(v) if !v.is_empty() => {
                Bar::new(instrument, timestamp, open, high, low, close, parse_decimal(v)?)
            }
            _ => Bar::without_volume(instrument, timestamp, open, high, low, close),
        };
        bars.push(bar);
    }

    bars.sort_by_key(|b| b.timestamp);

    Ok(bars)
}

fn parse_decimal(value: &str) -> Result<Decimal, DataError> {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .map_err(|e| DataError::ParseError(format!("Invalid number '{}': {}", value, e)))
}

/// Parse various timestamp formats.
fn parse_timestamp(date_str: &str) -> Result<DateTime<Utc>, DataError> {
    let datetime_formats = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    for format in datetime_formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Ok(dt.and_utc());
        }
    }

    let date_formats = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];
    for format in date_formats {
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Ok(d.and_time(chrono::NaiveTime::MIN).and_utc());
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Unix timestamp; milliseconds if > 10 digits
    if let Ok(ts) = date_str.parse::<i64>() {
        let parsed = if ts > 10_000_000_000 {
            DateTime::from_timestamp_millis(ts)
        } else {
            DateTime::from_timestamp(ts, 0)
        };
        if let Some(dt) = parsed {
            return Ok(dt);
        }
    }

    Err(DataError::ParseError(format!(
        "Could not parse date: {}",
        date_str
    )))
}
