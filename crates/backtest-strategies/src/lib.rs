//! Built-in strategies.
//!
//! This crate provides ready-made strategies for the backtesting engine:
//! - Buy and hold
//! - Moving average crossover
//! - Equal-weight rebalancing on a daily schedule

mod buy_and_hold;
mod ma_crossover;
mod rebalance;
mod registry;

pub use buy_and_hold::{BuyAndHoldConfig, BuyAndHoldStrategy};
pub use ma_crossover::{MACrossoverConfig, MACrossoverStrategy};
pub use rebalance::{RebalanceConfig, RebalanceStrategy};
pub use registry::{StrategyInfo, StrategyRegistry};

use backtest_core::StrategyError;
use rust_decimal::Decimal;

/// Per-instrument weight: the configured one, or an equal split.
pub(crate) fn resolve_weight(
    weight: Option<Decimal>,
    instruments: usize,
) -> Result<Decimal, StrategyError> {
    match weight {
        Some(w) if w < Decimal::ZERO || w > Decimal::ONE => Err(StrategyError::InvalidConfig(
            format!("Weight must be between 0 and 1, got {}", w),
        )),
        Some(w) => Ok(w),
        None if instruments == 0 => Err(StrategyError::InvalidConfig(
            "At least one instrument required".into(),
        )),
        None => Ok(Decimal::ONE / Decimal::from(instruments)),
    }
}
