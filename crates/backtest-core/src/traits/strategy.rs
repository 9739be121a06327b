//! Strategy trait definition.

use crate::context::Context;
use crate::error::StrategyError;
use crate::history::History;
use crate::types::{Bar, OrderIntent};

/// Core strategy trait.
///
/// Strategies never touch the ledger: the intents they return are the only
/// way to trade. Returning an error from any callback aborts the run.
pub trait Strategy: Send {
    /// Get the unique name of this strategy.
    fn name(&self) -> &str;

    /// One-time setup, called before any bar is processed.
    ///
    /// This is the only place scheduling directives may be registered.
    fn initialize(&mut self, ctx: &mut Context) -> Result<(), StrategyError>;

    /// Called once per calendar day, before that day's first bar reaches `on_bar`.
    fn before_trading_start(
        &mut self,
        _ctx: &mut Context,
        _history: &History,
    ) -> Result<(), StrategyError> {
        Ok(())
    }

    /// Process a new bar.
    ///
    /// # Arguments
    /// * `ctx` - The run's context
    /// * `bar` - The bar that just closed
    /// * `history` - Lookback over bars up to and including `bar`
    ///
    /// # Returns
    /// Order intents, applied in the order given.
    fn on_bar(
        &mut self,
        ctx: &mut Context,
        bar: &Bar,
        history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError>;

    /// Called when the scheduling directive `name` is due.
    fn on_schedule(
        &mut self,
        _ctx: &mut Context,
        _name: &str,
        _history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        Ok(Vec::new())
    }

    /// Get a description of the strategy.
    fn description(&self) -> &str {
        ""
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    struct CountingStrategy {
        bars_seen: usize,
    }

    impl Strategy for CountingStrategy {
        fn name(&self) -> &str {
            "counting"
        }

        fn initialize(&mut self, ctx: &mut Context) -> Result<(), StrategyError> {
            ctx.set("bars", 0usize)
        }

        fn on_bar(
            &mut self,
            ctx: &mut Context,
            _bar: &Bar,
            _history: &History,
        ) -> Result<Vec<OrderIntent>, StrategyError> {
            self.bars_seen += 1;
            ctx.set("bars", self.bars_seen)?;
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_default_hooks() {
        let start = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let mut ctx = Context::new(dec!(1000), start);
        let history = History::new(5);
        let bar = Bar::new("SPY", start, dec!(1), dec!(1), dec!(1), dec!(1), dec!(1));

        let mut strategy = CountingStrategy { bars_seen: 0 };
        strategy.initialize(&mut ctx).unwrap();
        strategy.before_trading_start(&mut ctx, &history).unwrap();
        strategy.on_bar(&mut ctx, &bar, &history).unwrap();

        assert!(strategy.on_schedule(&mut ctx, "x", &history).unwrap().is_empty());
        assert_eq!(ctx.get::<usize>("bars").unwrap(), Some(1));
        assert_eq!(strategy.description(), "");
    }
}
