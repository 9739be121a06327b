//! Backtest configuration.

use backtest_broker::{CostModelSpec, SimulatorConfig};
use backtest_core::error::ConfigError;
use backtest_core::ledger::LedgerConfig;
use backtest_core::types::Frequency;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Default number of bars kept per instrument in the history window.
pub const DEFAULT_HISTORY_WINDOW: usize = 252;

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

/// Regular trading hours, used to anchor scheduling time rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSession {
    pub open: NaiveTime,
    pub close: NaiveTime,
}

impl Default for MarketSession {
    fn default() -> Self {
        Self {
            open: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
            close: NaiveTime::from_hms_opt(16, 0, 0).unwrap_or_default(),
        }
    }
}

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestConfig {
    /// Starting cash
    pub initial_cash: Decimal,
    /// First day of the simulated range (inclusive)
    pub start: NaiveDate,
    /// Last day of the simulated range (inclusive)
    pub end: NaiveDate,
    #[serde(default)]
    pub frequency: Frequency,
    #[serde(default)]
    pub commission_model: CostModelSpec,
    /// Slippage in basis points
    #[serde(default)]
    pub slippage_bps: Decimal,
    #[serde(default)]
    pub allow_short_selling: bool,
    #[serde(default)]
    pub allow_margin: bool,
    /// Fill intents at the next bar's open instead of the current close
    #[serde(default)]
    pub fill_at_next_open: bool,
    #[serde(default)]
    pub fractional_shares: bool,
    #[serde(default)]
    pub benchmark_symbol: Option<String>,
    /// Bars kept per instrument for strategy lookback
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Annual risk-free rate
    #[serde(default)]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub annualize_alpha: bool,
    #[serde(default)]
    pub session: MarketSession,
}

impl BacktestConfig {
    /// Configuration with default execution settings.
    pub fn new(initial_cash: Decimal, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            initial_cash,
            start,
            end,
            frequency: Frequency::Daily,
            commission_model: CostModelSpec::Zero,
            slippage_bps: Decimal::ZERO,
            allow_short_selling: false,
            allow_margin: false,
            fill_at_next_open: false,
            fractional_shares: false,
            benchmark_symbol: None,
            history_window: DEFAULT_HISTORY_WINDOW,
            risk_free_rate: 0.0,
            annualize_alpha: false,
            session: MarketSession::default(),
        }
    }

    pub fn with_commission(mut self, model: CostModelSpec) -> Self {
        self.commission_model = model;
        self
    }

    pub fn with_benchmark(mut self, symbol: impl Into<String>) -> Self {
        self.benchmark_symbol = Some(symbol.into());
        self
    }

    pub fn with_fill_at_next_open(mut self, enabled: bool) -> Self {
        self.fill_at_next_open = enabled;
        self
    }

    /// Check every setting that can be checked before a run starts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_cash <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveInitialCash(self.initial_cash));
        }
        if self.start >= self.end {
            return Err(ConfigError::InvalidDateRange {
                start: self.start,
                end: self.end,
            });
        }
        self.commission_model.validate()?;
        if self.slippage_bps < Decimal::ZERO {
            return Err(ConfigError::NegativeRate {
                field: "slippage_bps",
                value: self.slippage_bps,
            });
        }
        if self.history_window == 0 {
            return Err(ConfigError::InvalidHistoryWindow);
        }
        if self.session.open >= self.session.close {
            return Err(ConfigError::InvalidSession);
        }
        if !self.risk_free_rate.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "risk-free rate must be finite, got {}",
                self.risk_free_rate
            )));
        }
        if let Some(symbol) = &self.benchmark_symbol {
            if symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("benchmark symbol is empty".to_string()));
            }
        }
        Ok(())
    }

    /// First instant of the range.
    pub fn start_time(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Last instant of the range: the end day is fully included.
    pub fn end_time(&self) -> DateTime<Utc> {
        self.end.and_time(NaiveTime::MIN).and_utc() + Duration::days(1) - Duration::nanoseconds(1)
    }

    pub fn ledger_config(&self) -> LedgerConfig {
        LedgerConfig {
            initial_cash: self.initial_cash,
            allow_short_selling: self.allow_short_selling,
            allow_margin: self.allow_margin,
        }
    }

    pub fn simulator_config(&self) -> SimulatorConfig {
        SimulatorConfig {
            slippage_bps: self.slippage_bps,
            fractional_shares: self.fractional_shares,
            allow_short_selling: self.allow_short_selling,
        }
    }
}
