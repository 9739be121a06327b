//! Strategy runner: drives the simulation clock over a market data feed.

use backtest_broker::ExecutionSimulator;
use backtest_core::context::Context;
use backtest_core::error::{ConfigError, StrategyError};
use backtest_core::history::History;
use backtest_core::ledger::Ledger;
use backtest_core::traits::{BarStream, MarketDataFeed, Strategy};
use backtest_core::types::{Bar, OrderIntent, OrderRecord};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::iter::Peekable;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::analyzer::PerformanceAnalyzer;
use crate::cancel::{CancellationToken, Progress, ProgressObserver};
use crate::config::BacktestConfig;
use crate::error::{BacktestError, StrategyFailure};
use crate::result::{BacktestResult, EquityPoint};
use crate::schedule::Scheduler;

/// Lifecycle of a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Initializing,
    PerBarLoop,
    Finalizing,
    Completed,
    Failed,
    Cancelled,
}

impl RunState {
    /// Whether the state machine allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        matches!(
            (self, next),
            (NotStarted, Initializing)
                | (Initializing, PerBarLoop)
                | (PerBarLoop, Finalizing)
                | (PerBarLoop, Cancelled)
                | (Finalizing, Completed)
                | (NotStarted | Initializing | PerBarLoop | Finalizing, Failed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed | RunState::Cancelled)
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::NotStarted => "not_started",
            RunState::Initializing => "initializing",
            RunState::PerBarLoop => "per_bar_loop",
            RunState::Finalizing => "finalizing",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// Backtesting engine.
///
/// Holds a validated configuration; every call to [`BacktestEngine::run`]
/// gets its own ledger, context and history.
pub struct BacktestEngine {
    config: BacktestConfig,
    simulator: ExecutionSimulator,
    cancel: Option<CancellationToken>,
    progress: Option<Arc<dyn ProgressObserver>>,
    bar_limit: Option<usize>,
}

impl BacktestEngine {
    /// Create an engine, validating the configuration.
    pub fn new(config: BacktestConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let simulator =
            ExecutionSimulator::from_spec(config.simulator_config(), &config.commission_model)?;
        Ok(Self {
            config,
            simulator,
            cancel: None,
            progress: None,
            bar_limit: None,
        })
    }

    /// Poll `token` at every bar boundary.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Notify `observer` after every bar interval.
    pub fn with_progress(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.progress = Some(observer);
        self
    }

    /// Stop after `max_intervals` bar intervals.
    pub fn with_bar_limit(mut self, max_intervals: usize) -> Self {
        self.bar_limit = Some(max_intervals);
        self
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    /// Run `strategy` over `instruments`.
    pub fn run(
        &self,
        strategy: &mut dyn Strategy,
        feed: &dyn MarketDataFeed,
        instruments: &[String],
    ) -> Result<BacktestResult, BacktestError> {
        let traded: BTreeSet<String> = instruments
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if traded.is_empty() {
            return Err(ConfigError::EmptyInstrumentSet.into());
        }

        let mut requested = traded.clone();
        if let Some(benchmark) = &self.config.benchmark_symbol {
            requested.insert(benchmark.clone());
        }

        let stream = feed.bars(&requested, self.config.start_time(), self.config.end_time())?;

        info!(
            strategy = strategy.name(),
            feed = feed.name(),
            instruments = traded.len(),
            start = %self.config.start,
            end = %self.config.end,
            "Starting backtest"
        );

        StrategyRunner::new(self, strategy, traded).execute(stream)
    }
}

/// Run over the full configured range.
pub fn run_backtest(
    strategy: &mut dyn Strategy,
    feed: &dyn MarketDataFeed,
    instruments: &[String],
    config: BacktestConfig,
) -> Result<BacktestResult, BacktestError> {
    BacktestEngine::new(config)?.run(strategy, feed, instruments)
}

/// Same engine as [`run_backtest`], stopping after `max_bars` bar intervals.
pub fn run_quick_backtest(
    strategy: &mut dyn Strategy,
    feed: &dyn MarketDataFeed,
    instruments: &[String],
    config: BacktestConfig,
    max_bars: usize,
) -> Result<BacktestResult, BacktestError> {
    if max_bars == 0 {
        return Err(ConfigError::Invalid("quick backtest needs at least one bar".to_string()).into());
    }
    BacktestEngine::new(config)?
        .with_bar_limit(max_bars)
        .run(strategy, feed, instruments)
}

/// Buy-and-hold equity of the benchmark instrument.
struct BenchmarkTracker {
    symbol: String,
    initial_cash: Decimal,
    first_close: Option<Decimal>,
    last_close: Option<Decimal>,
}

impl BenchmarkTracker {
    fn update(&mut self, bar: &Bar) {
        if bar.instrument != self.symbol || bar.close <= Decimal::ZERO {
            return;
        }
        self.first_close.get_or_insert(bar.close);
        self.last_close = Some(bar.close);
    }

    /// Initial cash until the benchmark's first bar, then scaled by its closes.
    fn equity(&self) -> Decimal {
        match (self.first_close, self.last_close) {
            (Some(first), Some(last)) => self.initial_cash * last / first,
            _ => self.initial_cash,
        }
    }
}

/// Where a strategy callback failed.
struct FailurePoint {
    timestamp: Option<DateTime<Utc>>,
    instrument: Option<String>,
}

/// State of one run, owned exclusively by that run.
struct StrategyRunner<'a> {
    engine: &'a BacktestEngine,
    strategy: &'a mut dyn Strategy,
    instruments: BTreeSet<String>,
    state: RunState,
    ledger: Ledger,
    context: Context,
    history: History,
    scheduler: Scheduler,
    benchmark: Option<BenchmarkTracker>,
    orders: Vec<OrderRecord>,
    equity_curve: Vec<EquityPoint>,
    /// Intents waiting for their instrument's next open
    pending: Vec<OrderIntent>,
    current_day: Option<NaiveDate>,
    last_timestamp: Option<DateTime<Utc>>,
    intervals: usize,
    bars_processed: usize,
}

impl<'a> StrategyRunner<'a> {
    fn new(
        engine: &'a BacktestEngine,
        strategy: &'a mut dyn Strategy,
        instruments: BTreeSet<String>,
    ) -> Self {
        let config = &engine.config;
        Self {
            engine,
            strategy,
            instruments,
            state: RunState::NotStarted,
            ledger: Ledger::new(config.ledger_config()),
            context: Context::new(config.initial_cash, config.start_time()),
            history: History::new(config.history_window),
            scheduler: Scheduler::new(&[], config.frequency, config.session),
            benchmark: config.benchmark_symbol.as_ref().map(|symbol| BenchmarkTracker {
                symbol: symbol.clone(),
                initial_cash: config.initial_cash,
                first_close: None,
                last_close: None,
            }),
            orders: Vec::new(),
            equity_curve: Vec::new(),
            pending: Vec::new(),
            current_day: None,
            last_timestamp: None,
            intervals: 0,
            bars_processed: 0,
        }
    }

    fn transition(&mut self, next: RunState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid run state transition {} -> {}",
            self.state,
            next
        );
        debug!(from = %self.state, to = %next, "Run state transition");
        self.state = next;
    }

    fn execute(mut self, stream: BarStream<'_>) -> Result<BacktestResult, BacktestError> {
        self.transition(RunState::Initializing);
        let initialized = guarded(|| self.strategy.initialize(&mut self.context));
        if let Err(cause) = initialized {
            return Err(self.fail(
                cause,
                FailurePoint {
                    timestamp: None,
                    instrument: None,
                },
            ));
        }
        self.context.finish_initialization();
        self.scheduler = Scheduler::new(
            self.context.schedules(),
            self.engine.config.frequency,
            self.engine.config.session,
        );

        self.transition(RunState::PerBarLoop);
        let total_bars = stream.size_hint().1;
        let mut stream = stream.peekable();

        while let Some(interval) = next_interval(&mut stream) {
            if self.engine.cancel.as_ref().is_some_and(|t| t.is_cancelled()) {
                info!(intervals = self.intervals, "Backtest cancelled");
                self.transition(RunState::Cancelled);
                self.reject_pending();
                return Ok(self.into_result(true));
            }
            if self.engine.bar_limit.is_some_and(|limit| self.intervals >= limit) {
                debug!(intervals = self.intervals, "Bar limit reached");
                break;
            }

            if let Err((cause, point)) = self.process_interval(&interval) {
                return match cause {
                    IntervalError::Strategy(cause) => Err(self.fail(cause, point)),
                    IntervalError::Data(e) => {
                        self.transition(RunState::Failed);
                        Err(e.into())
                    }
                };
            }

            if let Some(observer) = &self.engine.progress {
                if let Some(timestamp) = self.last_timestamp {
                    observer.on_progress(&Progress {
                        intervals: self.intervals,
                        bars_processed: self.bars_processed,
                        total_bars,
                        timestamp,
                        equity: self.ledger.equity(),
                    });
                }
            }
        }

        self.transition(RunState::Finalizing);
        self.reject_pending();
        let result = self.into_result(false);
        info!(
            strategy = %result.strategy,
            bars = result.bars_processed,
            fills = result.transactions.len(),
            final_equity = %result.summary.final_equity,
            total_return = result.summary.total_return,
            "Backtest completed"
        );
        Ok(result)
    }

    /// Process all bars sharing one timestamp.
    fn process_interval(&mut self, interval: &[Bar]) -> Result<(), (IntervalError, FailurePoint)> {
        let Some(timestamp) = interval.first().map(|b| b.timestamp) else {
            return Ok(());
        };
        let at = |instrument: Option<&str>| FailurePoint {
            timestamp: Some(timestamp),
            instrument: instrument.map(str::to_string),
        };

        let traded: Vec<&Bar> = interval
            .iter()
            .filter(|b| self.instruments.contains(&b.instrument))
            .collect();

        for bar in interval {
            if let Some(benchmark) = &mut self.benchmark {
                benchmark.update(bar);
            }
        }
        for bar in &traded {
            self.history
                .push((*bar).clone())
                .map_err(|e| (IntervalError::Data(e), at(Some(bar.instrument.as_str()))))?;
        }
        self.last_timestamp = Some(timestamp);

        self.fill_pending(&traded);

        let day = timestamp.date_naive();
        if self.current_day != Some(day) {
            self.current_day = Some(day);
            self.refresh_context(timestamp);
            guarded(|| {
                self.strategy
                    .before_trading_start(&mut self.context, &self.history)
            })
            .map_err(|e| (IntervalError::Strategy(e), at(None)))?;
        }

        for name in self.scheduler.due(timestamp) {
            self.refresh_context(timestamp);
            let intents = guarded(|| {
                self.strategy
                    .on_schedule(&mut self.context, &name, &self.history)
            })
            .map_err(|e| (IntervalError::Strategy(e), at(None)))?;
            self.handle_intents(intents, &traded, timestamp);
        }

        for bar in &traded {
            self.refresh_context(timestamp);
            let intents = guarded(|| self.strategy.on_bar(&mut self.context, bar, &self.history))
                .map_err(|e| (IntervalError::Strategy(e), at(Some(bar.instrument.as_str()))))?;
            self.handle_intents(intents, &traded, timestamp);
            self.bars_processed += 1;
        }

        let prices: BTreeMap<String, Decimal> = traded
            .iter()
            .map(|b| (b.instrument.clone(), b.close))
            .collect();
        let snapshot = self.ledger.mark_to_market(timestamp, &prices);
        self.equity_curve.push(EquityPoint {
            timestamp,
            equity: snapshot.equity,
            benchmark_equity: self.benchmark.as_ref().map(BenchmarkTracker::equity),
        });
        self.intervals += 1;
        Ok(())
    }

    fn refresh_context(&mut self, timestamp: DateTime<Utc>) {
        self.context.refresh(timestamp, self.ledger.snapshot(timestamp));
    }

    /// Execute (or queue, under next-open timing) intents in emission order.
    fn handle_intents(&mut self, intents: Vec<OrderIntent>, traded: &[&Bar], timestamp: DateTime<Utc>) {
        for intent in intents {
            debug!(
                instrument = %intent.instrument,
                kind = %intent.kind,
                target = %intent.target,
                "Order intent"
            );
            if self.engine.config.fill_at_next_open {
                self.pending.push(intent);
                continue;
            }
            match traded.iter().find(|b| b.instrument == intent.instrument) {
                Some(bar) => {
                    if let Some(record) =
                        self.engine
                            .simulator
                            .execute(&mut self.ledger, intent, bar, bar.close)
                    {
                        self.orders.push(record);
                    }
                }
                None => {
                    let record = self.engine.simulator.reject_unfilled(intent, timestamp);
                    self.orders.push(record);
                }
            }
        }
    }

    /// Fill queued intents whose instrument has a bar in this interval, at its open.
    fn fill_pending(&mut self, traded: &[&Bar]) {
        if self.pending.is_empty() {
            return;
        }
        let pending = std::mem::take(&mut self.pending);
        for intent in pending {
            match traded.iter().find(|b| b.instrument == intent.instrument) {
                Some(bar) => {
                    if let Some(record) =
                        self.engine
                            .simulator
                            .execute(&mut self.ledger, intent, bar, bar.open)
                    {
                        self.orders.push(record);
                    }
                }
                None => self.pending.push(intent),
            }
        }
    }

    /// Intents still waiting for a next open when the run stops.
    fn reject_pending(&mut self) {
        let timestamp = self
            .last_timestamp
            .unwrap_or_else(|| self.engine.config.start_time());
        for intent in std::mem::take(&mut self.pending) {
            let record = self.engine.simulator.reject_unfilled(intent, timestamp);
            self.orders.push(record);
        }
    }

    fn fail(mut self, cause: StrategyError, point: FailurePoint) -> BacktestError {
        warn!(
            strategy = self.strategy.name(),
            timestamp = ?point.timestamp,
            instrument = ?point.instrument,
            "Strategy failed: {}",
            cause
        );
        self.reject_pending();
        self.transition(RunState::Failed);
        let strategy = self.strategy.name().to_string();
        let partial = self.into_result(false);
        StrategyFailure {
            strategy,
            cause,
            timestamp: point.timestamp,
            instrument: point.instrument,
            partial,
        }
        .into()
    }

    /// Build the result from the ledger's own history.
    fn into_result(mut self, cancelled: bool) -> BacktestResult {
        let config = self.engine.config.clone();
        let strategy = self.strategy.name().to_string();
        let recorded = self.context.take_records();
        let (snapshots, transactions) = self.ledger.into_history();

        let (summary, round_trips) = PerformanceAnalyzer::from_config(&config).analyze(
            config.initial_cash,
            &self.equity_curve,
            &transactions,
        );
        if self.state == RunState::Finalizing {
            self.state = RunState::Completed;
        }
        debug!(state = %self.state, "Run finished");

        BacktestResult {
            strategy,
            instruments: self.instruments.into_iter().collect(),
            config,
            equity_curve: self.equity_curve,
            snapshots,
            transactions,
            orders: self.orders,
            round_trips,
            recorded,
            summary,
            cancelled,
            bars_processed: self.bars_processed,
        }
    }
}

enum IntervalError {
    Strategy(StrategyError),
    Data(backtest_core::error::DataError),
}

/// Next group of bars sharing one timestamp.
fn next_interval<I: Iterator<Item = Bar>>(stream: &mut Peekable<I>) -> Option<Vec<Bar>> {
    let first = stream.next()?;
    let timestamp = first.timestamp;
    let mut interval = vec![first];
    while let Some(bar) = stream.next_if(|b| b.timestamp == timestamp) {
        interval.push(bar);
    }
    Some(interval)
}

/// Run a strategy callback, converting a panic into a strategy error.
fn guarded<T>(f: impl FnOnce() -> Result<T, StrategyError>) -> Result<T, StrategyError> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(StrategyError::Panicked(message))
        }
    }
}
