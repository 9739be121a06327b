//! Error types for the backtesting engine.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Market data feed errors.
///
/// Data availability is a precondition of a run, so none of these are retried.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("No bars for {instrument} between {start} and {end}")]
    Gap {
        instrument: String,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Invalid range: start {start} is after end {end}")]
    Range {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("Bars for {instrument} are not strictly increasing at {timestamp}")]
    OutOfOrder {
        instrument: String,
        timestamp: DateTime<Utc>,
    },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(String),
}

/// Portfolio ledger errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient funds: required {required}, available {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error("Short selling disabled: {instrument} holds {held}, fill of {shares} would go short")]
    ShortSellingDisabled {
        instrument: String,
        held: Decimal,
        shares: Decimal,
    },

    #[error("Fill at {timestamp} precedes the last recorded fill at {last}")]
    OutOfOrderFill {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

/// Errors raised by (or on behalf of) user strategy code.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrategyError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Strategy not found: {0}")]
    NotFound(String),

    #[error("Context value error for '{key}': {message}")]
    Context { key: String, message: String },

    #[error("Strategy panicked: {0}")]
    Panicked(String),

    #[error("Strategy error: {0}")]
    Internal(String),
}

/// Configuration validation errors, raised before a run starts.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Negative rate for {field}: {value}")]
    NegativeRate { field: &'static str, value: Decimal },

    #[error("Start date {start} must be before end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("At least one instrument is required")]
    EmptyInstrumentSet,

    #[error("Initial cash must be positive, got {0}")]
    NonPositiveInitialCash(Decimal),

    #[error("History window must be at least 1 bar")]
    InvalidHistoryWindow,

    #[error("Market session open must precede close")]
    InvalidSession,

    #[error("Configuration error: {0}")]
    Invalid(String),
}
