//! Core traits for the backtesting engine.

mod feed;
mod strategy;

pub use feed::{BarStream, MarketDataFeed};
pub use strategy::Strategy;
