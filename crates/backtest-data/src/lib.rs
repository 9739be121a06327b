//! Historical market data feeds.

mod csv_source;
mod feed;

pub use csv_source::CsvDataSource;
pub use feed::InMemoryFeed;

use backtest_core::error::DataError;
use backtest_core::types::Bar;

/// Load one instrument's bars from a CSV file.
pub async fn load_csv(path: &str, instrument: &str) -> Result<Vec<Bar>, DataError> {
    let source = CsvDataSource::new(path)?;
    source.load_all(instrument).await
}
