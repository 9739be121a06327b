//! Core types and traits for the backtesting engine.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Bar, BarWindow) and the bar frequency
//! - Order intents, fills, order records and positions
//! - The portfolio ledger and its snapshots
//! - The strategy capability with its context and history accessor
//! - The market data feed trait

pub mod context;
pub mod error;
pub mod history;
pub mod ledger;
pub mod schedule;
pub mod traits;
pub mod types;

pub use context::{Context, RecordedValue};
pub use error::{ConfigError, DataError, LedgerError, StrategyError};
pub use history::History;
pub use ledger::{Ledger, LedgerConfig};
pub use schedule::{DateRule, ScheduledFunction, TimeRule};
pub use traits::*;
pub use types::*;
