//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use backtest_core::{Bar, Context, History, OrderIntent, Strategy, StrategyError};
use backtest_data::InMemoryFeed;
use backtest_engine::BacktestConfig;
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

/// Midnight of the `i`-th calendar day of 2024 (day 0 is Jan 1).
pub fn day(i: usize) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(i as i64)
}

pub fn bar(instrument: &str, i: usize, open: Decimal, close: Decimal) -> Bar {
    let high = open.max(close) + dec!(1);
    let low = open.min(close) - dec!(1);
    Bar::new(instrument, day(i), open, high, low, close, dec!(10000))
}

/// One bar per day at the given closes, opening at the previous close.
pub fn series(instrument: &str, closes: &[Decimal]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            bar(instrument, i, open, close)
        })
        .collect()
}

/// Deterministic pseudo-random walk of `n` closes around 100.
pub fn walk(n: usize, seed: u64) -> Vec<Decimal> {
    let mut cents: i64 = 10_000;
    (0..n)
        .map(|i| {
            let x = (i as u64 + seed)
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let step = ((x >> 33) % 401) as i64 - 200;
            cents = (cents + step).max(1_000);
            Decimal::new(cents, 2)
        })
        .collect()
}

pub fn feed(series_by_instrument: Vec<(&str, Vec<Decimal>)>) -> InMemoryFeed {
    let mut feed = InMemoryFeed::new();
    for (instrument, closes) in series_by_instrument {
        feed.insert(instrument, series(instrument, &closes)).unwrap();
    }
    feed
}

pub fn config(initial_cash: Decimal) -> BacktestConfig {
    BacktestConfig::new(
        initial_cash,
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
    )
}

pub fn instruments(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Strategy that never trades.
pub struct Idle;

impl Strategy for Idle {
    fn name(&self) -> &str {
        "idle"
    }

    fn initialize(&mut self, _ctx: &mut Context) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_bar(
        &mut self,
        _ctx: &mut Context,
        _bar: &Bar,
        _history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        Ok(Vec::new())
    }
}

/// Strategy whose `on_bar` is a closure.
pub struct Scripted<F> {
    pub on_bar: F,
}

impl<F> Scripted<F>
where
    F: FnMut(&mut Context, &Bar, &History) -> Result<Vec<OrderIntent>, StrategyError> + Send,
{
    pub fn new(on_bar: F) -> Self {
        Self { on_bar }
    }
}

impl<F> Strategy for Scripted<F>
where
    F: FnMut(&mut Context, &Bar, &History) -> Result<Vec<OrderIntent>, StrategyError> + Send,
{
    fn name(&self) -> &str {
        "scripted"
    }

    fn initialize(&mut self, _ctx: &mut Context) -> Result<(), StrategyError> {
        Ok(())
    }

    fn on_bar(
        &mut self,
        ctx: &mut Context,
        bar: &Bar,
        history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        (self.on_bar)(ctx, bar, history)
    }
}
