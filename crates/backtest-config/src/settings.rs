//! Configuration structures.

use backtest_broker::CostModelSpec;
use backtest_core::error::ConfigError;
use backtest_core::types::Frequency;
use backtest_engine::{BacktestConfig, MarketSession, DEFAULT_HISTORY_WINDOW};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
    pub environment: String,
    /// Directory holding `{SYMBOL}.csv` bar files
    pub data_dir: PathBuf,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "backtester".to_string(),
            environment: "development".to_string(),
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    pub file: Option<String>,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

/// Backtest settings: everything in [`BacktestConfig`] except the date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_cash: Decimal,
    pub frequency: Frequency,
    pub commission_model: CostModelSpec,
    pub slippage_bps: Decimal,
    pub allow_short_selling: bool,
    pub allow_margin: bool,
    pub fill_at_next_open: bool,
    pub fractional_shares: bool,
    pub benchmark_symbol: Option<String>,
    pub history_window: usize,
    pub risk_free_rate: f64,
    pub annualize_alpha: bool,
    pub session: MarketSession,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_cash: Decimal::from(100_000),
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
}

impl BacktestSettings {
    /// Check everything except the date range, which the settings do not carry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.clone().into_config(NaiveDate::MIN, NaiveDate::MAX).map(|_| ())
    }

    /// Engine configuration for `[start, end]`, validated.
    pub fn into_config(self, start: NaiveDate, end: NaiveDate) -> Result<BacktestConfig, ConfigError> {
        let config = BacktestConfig {
            initial_cash: self.initial_cash,
            start,
            end,
            frequency: self.frequency,
            commission_model: self.commission_model,
            slippage_bps: self.slippage_bps,
            allow_short_selling: self.allow_short_selling,
            allow_margin: self.allow_margin,
            fill_at_next_open: self.fill_at_next_open,
            fractional_shares: self.fractional_shares,
            benchmark_symbol: self.benchmark_symbol,
            history_window: self.history_window,
            risk_free_rate: self.risk_free_rate,
            annualize_alpha: self.annualize_alpha,
            session: self.session,
        };
        config.validate()?;
        Ok(config)
    }
}
