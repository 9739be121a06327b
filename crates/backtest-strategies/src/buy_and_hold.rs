//! Buy and hold.
//!
//! Targets a fixed fraction of equity in each instrument on that
//! instrument's first bar and never trades again.

use backtest_core::{Bar, Context, History, OrderIntent, Strategy, StrategyError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

use crate::resolve_weight;

/// Configuration for the buy and hold strategy.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuyAndHoldConfig {
    /// Instruments to hold
    pub instruments: Vec<String>,
    /// Fraction of equity per instrument; an equal split when unset
    pub weight: Option<Decimal>,
}

impl BuyAndHoldConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.instruments.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "At least one instrument required".into(),
            ));
        }
        resolve_weight(self.weight, self.instruments.len()).map(|_| ())
    }
}

/// Buy and hold strategy.
pub struct BuyAndHoldStrategy {
    config: BuyAndHoldConfig,
    weight: Decimal,
    invested: BTreeSet<String>,
}

impl BuyAndHoldStrategy {
    pub fn new(config: BuyAndHoldConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        let weight = resolve_weight(config.weight, config.instruments.len())?;
        Ok(Self {
            config,
            weight,
            invested: BTreeSet::new(),
        })
    }

    pub fn config(&self) -> &BuyAndHoldConfig {
        &self.config
    }
}

impl Strategy for BuyAndHoldStrategy {
    fn name(&self) -> &str {
        "buy_and_hold"
    }

    fn description(&self) -> &str {
        "Buys each instrument on its first bar and holds to the end"
    }

    fn initialize(&mut self, _ctx: &mut Context) -> Result<(), StrategyError> {
        self.invested.clear();
        Ok(())
    }

    fn on_bar(
        &mut self,
        _ctx: &mut Context,
        bar: &Bar,
        _history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        if !self.config.instruments.contains(&bar.instrument)
            || !self.invested.insert(bar.instrument.clone())
        {
            return Ok(Vec::new());
        }

        debug!(instrument = %bar.instrument, weight = %self.weight, "Entering position");
        Ok(vec![OrderIntent::target_percent(
            bar.instrument.as_str(),
            self.weight,
            bar.timestamp,
        )])
    }
}
