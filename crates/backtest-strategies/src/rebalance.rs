//! Scheduled equal-weight rebalancing.

use backtest_core::{
    Bar, Context, DateRule, History, OrderIntent, Strategy, StrategyError, TimeRule,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

const SCHEDULE: &str = "rebalance";

/// Configuration for the rebalancing strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RebalanceConfig {
    /// Instruments to hold in equal weight
    pub instruments: Vec<String>,
    /// Which days to rebalance on
    pub date_rule: DateRule,
    /// Minutes after the open to rebalance at
    pub offset_minutes: u32,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            instruments: vec![],
            date_rule: DateRule::EveryDay,
            offset_minutes: 0,
        }
    }
}

impl RebalanceConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.instruments.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "At least one instrument required".into(),
            ));
        }
        Ok(())
    }
}

/// Rebalances to equal weights across every instrument that has traded so
/// far. Overweight positions are reduced before underweight ones are
/// topped up, so sales free cash for the purchases of the same rebalance.
pub struct RebalanceStrategy {
    config: RebalanceConfig,
    rebalances: usize,
}

impl RebalanceStrategy {
    pub fn new(config: RebalanceConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        Ok(Self {
            config,
            rebalances: 0,
        })
    }

    pub fn rebalances(&self) -> usize {
        self.rebalances
    }

    fn rebalance(&self, ctx: &Context, history: &History) -> Vec<OrderIntent> {
        let portfolio = ctx.portfolio();
        let priced: Vec<&Bar> = self
            .config
            .instruments
            .iter()
            .filter_map(|instrument| history.current(instrument))
            .collect();
        if priced.is_empty() || portfolio.equity <= Decimal::ZERO {
            return Vec::new();
        }

        let target = Decimal::ONE / Decimal::from(priced.len());
        let (mut sells, buys): (Vec<_>, Vec<_>) = priced
            .into_iter()
            .map(|bar| {
                let weight = portfolio.shares(&bar.instrument) * bar.close / portfolio.equity;
                (bar, weight)
            })
            .partition(|(_, weight)| *weight > target);

        sells.extend(buys);
        sells
            .into_iter()
            .map(|(bar, _)| OrderIntent::target_percent(bar.instrument.as_str(), target, ctx.now()))
            .collect()
    }
}

impl Strategy for RebalanceStrategy {
    fn name(&self) -> &str {
        "rebalance"
    }

    fn description(&self) -> &str {
        "Rebalances to equal weights on a market-open schedule"
    }

    fn initialize(&mut self, ctx: &mut Context) -> Result<(), StrategyError> {
        ctx.schedule_function(
            SCHEDULE,
            self.config.date_rule,
            TimeRule::MarketOpen {
                offset_minutes: self.config.offset_minutes,
            },
        )
    }

    fn on_bar(
        &mut self,
        _ctx: &mut Context,
        _bar: &Bar,
        _history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        Ok(Vec::new())
    }

    fn on_schedule(
        &mut self,
        ctx: &mut Context,
        name: &str,
        history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        if name != SCHEDULE {
            return Ok(Vec::new());
        }
        self.rebalances += 1;
        ctx.record("holdings", ctx.portfolio().position_count() as f64);

        let intents = self.rebalance(ctx, history);
        debug!(orders = intents.len(), "Rebalancing");
        Ok(intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backtest_core::{PortfolioSnapshot, Position};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn strategy() -> RebalanceStrategy {
        RebalanceStrategy::new(RebalanceConfig {
            instruments: vec!["AAA".to_string(), "BBB".to_string(), "CCC".to_string()],
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_registers_market_open_schedule() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut ctx = Context::new(dec!(1000), start);
        strategy().initialize(&mut ctx).unwrap();

        assert_eq!(ctx.schedules().len(), 1);
        assert_eq!(ctx.schedules()[0].name, "rebalance");
        assert_eq!(ctx.schedules()[0].time_rule, TimeRule::market_open());
    }

    #[test]
    fn test_sells_overweight_first() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut history = History::new(5);
        for instrument in ["AAA", "BBB"] {
            history
                .push(Bar::new(instrument, ts, dec!(10), dec!(10), dec!(10), dec!(10), dec!(100)))
                .unwrap();
        }

        // AAA is worth 800 of 1000 equity, BBB nothing; CCC has no data yet.
        let mut positions = BTreeMap::new();
        positions.insert(
            "AAA".to_string(),
            Position {
                instrument: "AAA".to_string(),
                shares: dec!(80),
                average_cost: dec!(10),
            },
        );
        let snapshot = PortfolioSnapshot {
            timestamp: ts,
            cash: dec!(200),
            positions,
            market_value: dec!(800),
            equity: dec!(1000),
        };
        let mut ctx = Context::new(dec!(1000), ts);
        ctx.refresh(ts, snapshot);

        let mut strategy = strategy();
        let intents = strategy.on_schedule(&mut ctx, "rebalance", &history).unwrap();

        let order: Vec<&str> = intents.iter().map(|i| i.instrument.as_str()).collect();
        assert_eq!(order, vec!["AAA", "BBB"]);
        assert!(intents.iter().all(|i| i.target == dec!(0.5)));
        assert_eq!(ctx.records()[0].name, "holdings");
        assert_eq!(ctx.records()[0].value, 1.0);
        assert_eq!(strategy.rebalances(), 1);
    }

    #[test]
    fn test_ignores_unknown_schedule() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut ctx = Context::new(dec!(1000), ts);
        let mut strategy = strategy();
        let intents = strategy.on_schedule(&mut ctx, "other", &History::new(5)).unwrap();
        assert!(intents.is_empty());
        assert_eq!(strategy.rebalances(), 0);
    }
}
