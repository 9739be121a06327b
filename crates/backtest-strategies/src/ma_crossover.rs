//! Moving Average Crossover Strategy.
//!
//! Holds `allocation` of equity in an instrument while its fast simple
//! moving average is above the slow one, and is flat otherwise.

use backtest_core::{Bar, Context, History, OrderIntent, Strategy, StrategyError};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::resolve_weight;

/// Configuration for the MA Crossover strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MACrossoverConfig {
    /// Instruments to trade
    pub instruments: Vec<String>,
    /// Fast moving average period
    pub fast_period: usize,
    /// Slow moving average period
    pub slow_period: usize,
    /// Fraction of equity per instrument while invested; an equal split when unset
    pub allocation: Option<Decimal>,
}

impl Default for MACrossoverConfig {
    fn default() -> Self {
        Self {
            instruments: vec![],
            fast_period: 20,
            slow_period: 50,
            allocation: None,
        }
    }
}

impl MACrossoverConfig {
    pub fn validate(&self) -> Result<(), StrategyError> {
        if self.fast_period == 0 {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be greater than 0".into(),
            ));
        }
        if self.fast_period >= self.slow_period {
            return Err(StrategyError::InvalidConfig(
                "Fast period must be less than slow period".into(),
            ));
        }
        if self.instruments.is_empty() {
            return Err(StrategyError::InvalidConfig(
                "At least one instrument required".into(),
            ));
        }
        resolve_weight(self.allocation, self.instruments.len()).map(|_| ())
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Moving Average Crossover Strategy.
///
/// Whether an instrument is currently invested lives in the run's context
/// under `invested.<instrument>`.
pub struct MACrossoverStrategy {
    config: MACrossoverConfig,
    allocation: Decimal,
    window_warned: bool,
}

impl MACrossoverStrategy {
    /// Create a new MA Crossover strategy.
    pub fn new(config: MACrossoverConfig) -> Result<Self, StrategyError> {
        config.validate()?;
        let allocation = resolve_weight(config.allocation, config.instruments.len())?;
        Ok(Self {
            config,
            allocation,
            window_warned: false,
        })
    }

    pub fn config(&self) -> &MACrossoverConfig {
        &self.config
    }

    /// Bars needed before the first signal.
    ///
    /// The run's history window must hold at least this many bars, or the
    /// strategy never trades.
    pub fn warmup_period(&self) -> usize {
        self.config.slow_period
    }

    /// Whether a history window of `window` bars can produce a signal.
    pub fn fits_window(&self, window: usize) -> bool {
        window >= self.warmup_period()
    }
}

impl Strategy for MACrossoverStrategy {
    fn name(&self) -> &str {
        "ma_crossover"
    }

    fn description(&self) -> &str {
        "Holds instruments while the fast moving average is above the slow one"
    }

    fn initialize(&mut self, ctx: &mut Context) -> Result<(), StrategyError> {
        ctx.set("fast_period", self.config.fast_period)?;
        ctx.set("slow_period", self.config.slow_period)
    }

    fn on_bar(
        &mut self,
        ctx: &mut Context,
        bar: &Bar,
        history: &History,
    ) -> Result<Vec<OrderIntent>, StrategyError> {
        if !self.config.instruments.contains(&bar.instrument) {
            return Ok(Vec::new());
        }

        if !self.window_warned && !self.fits_window(history.window()) {
            warn!(
                history_window = history.window(),
                slow_period = self.config.slow_period,
                "History window is shorter than the slow period; no signals will be produced"
            );
            self.window_warned = true;
        }

        let closes = history.closes(&bar.instrument, self.config.slow_period);
        if closes.len() < self.config.slow_period {
            return Ok(Vec::new());
        }

        let fast = mean(&closes[closes.len() - self.config.fast_period..]);
        let slow = mean(&closes);
        ctx.record(&format!("{}.fast_ma", bar.instrument), fast);
        ctx.record(&format!("{}.slow_ma", bar.instrument), slow);

        let key = format!("invested.{}", bar.instrument);
        let invested = ctx.get::<bool>(&key)?.unwrap_or(false);
        let bullish = fast > slow;
        if bullish == invested {
            return Ok(Vec::new());
        }
        ctx.set(&key, bullish)?;

        let target = if bullish { self.allocation } else { Decimal::ZERO };
        debug!(
            instrument = %bar.instrument,
            fast_ma = fast,
            slow_ma = slow,
            target = %target,
            "Crossover"
        );
        Ok(vec![OrderIntent::target_percent(
            bar.instrument.as_str(),
            target,
            bar.timestamp,
        )])
    }
}
