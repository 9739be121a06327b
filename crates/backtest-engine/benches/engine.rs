//! Benchmarks for the runner loop.

use backtest_core::{Bar, Context, History, OrderIntent, Strategy, StrategyError};
use backtest_data::InMemoryFeed;
use backtest_engine::{run_backtest, BacktestConfig};
use backtest_strategies::{MACrossoverConfig, MACrossoverStrategy};
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn generate_bars(instrument: &str, size: usize) -> Vec<Bar> {
    let start = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    (0..size)
        .map(|i| {
            let cents = 10_000 + ((i as f64 * 0.1).sin() * 1_000.0) as i64;
            let close = Decimal::new(cents, 2);
            Bar::new(
                instrument,
                start + Duration::days(i as i64),
                close,
                close + dec!(1),
                close - dec!(1),
                close,
                dec!(100000),
            )
        })
        .collect()
}

fn config() -> BacktestConfig {
    BacktestConfig::new(
        dec!(100000),
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        NaiveDate::from_ymd_opt(2099, 12, 31).unwrap(),
    )
}

struct Idle;

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

fn benchmark_runner(c: &mut Criterion) {
    let mut group = c.benchmark_group("runner");
    let instruments = vec!["AAA".to_string()];

    for size in [1000, 10000].iter() {
        let mut feed = InMemoryFeed::new();
        feed.insert("AAA", generate_bars("AAA", *size)).unwrap();

        group.bench_with_input(BenchmarkId::new("idle", size), &feed, |b, feed| {
            b.iter(|| run_backtest(&mut Idle, black_box(feed), &instruments, config()).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("ma_crossover", size), &feed, |b, feed| {
            b.iter(|| {
                let mut strategy = MACrossoverStrategy::new(MACrossoverConfig {
                    instruments: instruments.clone(),
                    fast_period: 10,
                    slow_period: 30,
                    allocation: None,
                })
                .unwrap();
                run_backtest(&mut strategy, black_box(feed), &instruments, config()).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_runner);
criterion_main!(benches);
