//! Configuration management.

mod settings;

pub use settings::{AppConfig, AppSettings, BacktestSettings, LoggingConfig};

use config::{Config, ConfigError, Environment, File};
use std::path::Path;

/// Prefix of environment overrides, e.g. `BACKTEST__BACKTEST__INITIAL_CASH`.
pub const ENV_PREFIX: &str = "BACKTEST";

/// Load configuration from file and environment.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from(path).required(true))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    config.try_deserialize()
}

/// Load configuration from the environment alone, on top of the defaults.
pub fn load_from_env() -> Result<AppConfig, ConfigError> {
    Config::builder()
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use backtest_broker::CostModelSpec;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_toml(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_file() {
        let file = write_toml(
            r#"
            [app]
            name = "research"
            data_dir = "market-data"

            [logging]
            level = "debug"
            format = "json"

            [backtest]
            initial_cash = 250000
            fill_at_next_open = true
            benchmark_symbol = "SPY"
            risk_free_rate = 0.02

            [backtest.commission_model]
            type = "fixed_plus_per_share"
            fixed = 1
            per_share = "0.005"
            "#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.app.name, "research");
        assert_eq!(config.app.data_dir.to_str(), Some("market-data"));
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.is_json());

        let backtest = &config.backtest;
        assert_eq!(backtest.initial_cash, dec!(250000));
        assert!(backtest.fill_at_next_open);
        assert_eq!(backtest.benchmark_symbol.as_deref(), Some("SPY"));
        assert_eq!(
            backtest.commission_model,
            CostModelSpec::FixedPlusPerShare {
                fixed: dec!(1),
                per_share: dec!(0.005),
            }
        );
    }

    #[test]
    fn test_missing_sections_use_defaults() {
        let file = write_toml("[app]\nname = \"bare\"\n");
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.backtest.initial_cash, dec!(100000));
        assert_eq!(config.backtest.commission_model, CostModelSpec::Zero);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config(Path::new("/nonexistent/backtest.toml")).is_err());
    }

    #[test]
    fn test_environment_overrides_file() {
        let file = write_toml("[backtest]\nhistory_window = 100\n");
        std::env::set_var("BACKTEST__BACKTEST__HISTORY_WINDOW", "30");

        let config = load_config(file.path()).unwrap();
        std::env::remove_var("BACKTEST__BACKTEST__HISTORY_WINDOW");

        assert_eq!(config.backtest.history_window, 30);
    }

    #[test]
    fn test_settings_into_engine_config() {
        let file = write_toml("[backtest]\nslippage_bps = 5\n");
        let settings = load_config(file.path()).unwrap().backtest;

        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 30).unwrap();
        let config = settings.clone().into_config(start, end).unwrap();
        assert_eq!(config.slippage_bps, dec!(5));
        assert_eq!(config.start, start);

        assert!(settings.into_config(end, start).is_err());
    }

    #[test]
    fn test_invalid_settings() {
        let file = write_toml("[backtest.commission_model]\ntype = \"per_share\"\nrate = -1\n");
        let settings = load_config(file.path()).unwrap().backtest;
        assert!(settings.validate().is_err());

        assert!(BacktestSettings::default().validate().is_ok());
    }
}
