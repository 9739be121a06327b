//! Property tests for run invariants.
//!
//! Uses proptest to verify:
//! 1. No look-ahead: history never holds a bar later than the bar being processed
//! 2. Accounting identity: cash + market value == equity for every snapshot
//! 3. Monotonic transaction log
//! 4. Max drawdown stays within [-1, 0]

mod common;

use backtest_broker::CostModelSpec;
use backtest_core::{Bar, Context, History, OrderIntent, StrategyError};
use backtest_engine::run_backtest;
use common::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_closes(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(100i64..50_000, len)
        .prop_map(|cents| cents.into_iter().map(|c| Decimal::new(c, 2)).collect())
}

fn arb_targets(len: usize) -> impl Strategy<Value = Vec<i64>> {
    // Target weights in percent; negative values exercise sells past zero.
    prop::collection::vec(-50i64..=150, len)
}

fn arb_commission() -> impl Strategy<Value = CostModelSpec> {
    prop_oneof![
        Just(CostModelSpec::Zero),
        (0i64..10).prop_map(|c| CostModelSpec::PerShare { rate: Decimal::new(c, 2) }),
        (0i64..50).prop_map(|bp| CostModelSpec::PercentOfNotional { rate: Decimal::new(bp, 4) }),
        (0i64..5, 0i64..5).prop_map(|(f, p)| CostModelSpec::FixedPlusPerShare {
            fixed: Decimal::from(f),
            per_share: Decimal::new(p, 2),
        }),
    ]
}

// ── 1. No look-ahead ─────────────────────────────────────────────────

proptest! {
    /// Every bar reachable through the history accessor is at or before the
    /// bar handed to `on_bar`, and the newest one is that bar.
    #[test]
    fn history_never_exposes_future_bars(
        aaa in arb_closes(5..60),
        bbb in arb_closes(5..60),
        window in 1usize..30,
    ) {
        let feed = feed(vec![("AAA", aaa.clone()), ("BBB", bbb.clone())]);
        let violations = Arc::new(AtomicUsize::new(0));
        let seen = violations.clone();
        let mut strategy = Scripted::new(move |_ctx: &mut Context, bar: &Bar, history: &History| {
            for instrument in ["AAA", "BBB", "CCC"] {
                // Ask for far more than could exist.
                for peeked in history.bars(instrument, 10_000) {
                    if peeked.timestamp > bar.timestamp {
                        seen.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
            if history.current(&bar.instrument).map(|b| b.timestamp) != Some(bar.timestamp) {
                seen.fetch_add(1, Ordering::Relaxed);
            }
            if history.now() != Some(bar.timestamp) {
                seen.fetch_add(1, Ordering::Relaxed);
            }
            Ok(Vec::new())
        });
        let mut config = config(dec!(10000));
        config.history_window = window;

        let result = run_backtest(&mut strategy, &feed, &instruments(&["AAA", "BBB"]), config).unwrap();

        prop_assert_eq!(violations.load(Ordering::Relaxed), 0);
        prop_assert_eq!(result.bars_processed, aaa.len() + bbb.len());
    }
}

// ── 2-4. Accounting ──────────────────────────────────────────────────

proptest! {
    /// Random target-percent trading keeps the books consistent.
    #[test]
    fn accounting_invariants_hold(
        closes in arb_closes(2..80),
        targets in arb_targets(80),
        commission in arb_commission(),
        slippage_bps in 0i64..50,
        next_open in any::<bool>(),
    ) {
        let feed = feed(vec![("AAA", closes.clone())]);
        let mut i = 0usize;
        let mut strategy = Scripted::new(move |_ctx: &mut Context, bar: &Bar, _h: &History| {
            let target = Decimal::new(targets[i % targets.len()], 2);
            i += 1;
            Ok::<_, StrategyError>(vec![OrderIntent::target_percent("AAA", target, bar.timestamp)])
        });
        let mut config = config(dec!(10000))
            .with_commission(commission)
            .with_fill_at_next_open(next_open);
        config.slippage_bps = Decimal::from(slippage_bps);

        let result = run_backtest(&mut strategy, &feed, &instruments(&["AAA"]), config).unwrap();

        prop_assert_eq!(result.snapshots.len(), closes.len());
        for (snapshot, close) in result.snapshots.iter().zip(&closes) {
            prop_assert_eq!(snapshot.cash + snapshot.market_value, snapshot.equity);
            let valued: Decimal = snapshot.positions.values().map(|p| p.shares * *close).sum();
            prop_assert_eq!(valued, snapshot.market_value);
            prop_assert!(snapshot.cash >= Decimal::ZERO);
            prop_assert!(snapshot.positions.values().all(|p| p.shares > Decimal::ZERO));
        }

        for pair in result.transactions.windows(2) {
            prop_assert!(pair[0].timestamp <= pair[1].timestamp);
        }

        let dd = result.summary.max_drawdown;
        prop_assert!((-1.0..=0.0).contains(&dd), "max drawdown {} out of bounds", dd);
        prop_assert_eq!(result.summary.total_trades, result.transactions.len());
    }
}
