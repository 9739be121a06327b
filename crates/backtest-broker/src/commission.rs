//! Commission models.

use backtest_core::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Computes the commission charged for a fill.
///
/// Implementations are pure: the same inputs always give the same commission.
pub trait CostModel: Debug + Send + Sync {
    /// Commission for trading `shares` (sign ignored) at `price`.
    fn commission(&self, shares: Decimal, price: Decimal) -> Decimal;

    /// Get the model name.
    fn name(&self) -> &str;
}

fn non_negative(field: &'static str, value: Decimal) -> Result<Decimal, ConfigError> {
    if value < Decimal::ZERO {
        return Err(ConfigError::NegativeRate { field, value });
    }
    Ok(value)
}

/// No commission.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZeroCommission;

impl CostModel for ZeroCommission {
    fn commission(&self, _shares: Decimal, _price: Decimal) -> Decimal {
        Decimal::ZERO
    }

    fn name(&self) -> &str {
        "zero"
    }
}

/// Flat rate per share traded.
#[derive(Debug, Clone, Copy)]
pub struct PerShare {
    rate: Decimal,
}

impl PerShare {
    pub fn new(rate: Decimal) -> Result<Self, ConfigError> {
        Ok(Self {
            rate: non_negative("per_share", rate)?,
        })
    }
}

impl CostModel for PerShare {
    fn commission(&self, shares: Decimal, _price: Decimal) -> Decimal {
        shares.abs() * self.rate
    }

    fn name(&self) -> &str {
        "per_share"
    }
}

/// Fraction of traded notional (0.001 = 10 bps).
#[derive(Debug, Clone, Copy)]
pub struct PercentOfNotional {
    rate: Decimal,
}

impl PercentOfNotional {
    pub fn new(rate: Decimal) -> Result<Self, ConfigError> {
        Ok(Self {
            rate: non_negative("rate", rate)?,
        })
    }
}

impl CostModel for PercentOfNotional {
    fn commission(&self, shares: Decimal, price: Decimal) -> Decimal {
        (shares * price).abs() * self.rate
    }

    fn name(&self) -> &str {
        "percent_of_notional"
    }
}

/// Fixed ticket charge plus a per-share rate.
#[derive(Debug, Clone, Copy)]
pub struct FixedPlusPerShare {
    fixed: Decimal,
    per_share: Decimal,
}

impl FixedPlusPerShare {
    pub fn new(fixed: Decimal, per_share: Decimal) -> Result<Self, ConfigError> {
        Ok(Self {
            fixed: non_negative("fixed", fixed)?,
            per_share: non_negative("per_share", per_share)?,
        })
    }
}

impl CostModel for FixedPlusPerShare {
    fn commission(&self, shares: Decimal, _price: Decimal) -> Decimal {
        if shares.is_zero() {
            return Decimal::ZERO;
        }
        self.fixed + shares.abs() * self.per_share
    }

    fn name(&self) -> &str {
        "fixed_plus_per_share"
    }
}

/// Serializable choice of commission model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CostModelSpec {
    #[default]
    Zero,
    PerShare {
        rate: Decimal,
    },
    PercentOfNotional {
        rate: Decimal,
    },
    FixedPlusPerShare {
        fixed: Decimal,
        per_share: Decimal,
    },
}

impl CostModelSpec {
    /// Check the configured rates without building the model.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.build().map(|_| ())
    }

    /// Build the model, rejecting negative rates.
    pub fn build(&self) -> Result<Box<dyn CostModel>, ConfigError> {
        Ok(match *self {
            CostModelSpec::Zero => Box::new(ZeroCommission),
            CostModelSpec::PerShare { rate } => Box::new(PerShare::new(rate)?),
            CostModelSpec::PercentOfNotional { rate } => Box::new(PercentOfNotional::new(rate)?),
            CostModelSpec::FixedPlusPerShare { fixed, per_share } => {
                Box::new(FixedPlusPerShare::new(fixed, per_share)?)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_per_share() {
        let model = PerShare::new(dec!(0.005)).unwrap();
        assert_eq!(model.commission(dec!(100), dec!(150)), dec!(0.5));
        assert_eq!(model.commission(dec!(-100), dec!(150)), dec!(0.5));
    }

    #[test]
    fn test_percent_of_notional() {
        let model = PercentOfNotional::new(dec!(0.001)).unwrap();
        assert_eq!(model.commission(dec!(-100), dec!(150)), dec!(15));
    }

    #[test]
    fn test_fixed_plus_per_share() {
        let model = FixedPlusPerShare::new(dec!(1), dec!(1)).unwrap();
        assert_eq!(model.commission(dec!(100), dec!(150)), dec!(101));
        assert_eq!(model.commission(Decimal::ZERO, dec!(150)), Decimal::ZERO);
    }

    #[test]
    fn test_negative_rates_rejected() {
        assert!(matches!(
            PerShare::new(dec!(-0.01)),
            Err(ConfigError::NegativeRate { field: "per_share", .. })
        ));
        assert!(PercentOfNotional::new(dec!(-1)).is_err());
        assert!(FixedPlusPerShare::new(dec!(-1), dec!(0)).is_err());
        assert!(CostModelSpec::FixedPlusPerShare {
            fixed: dec!(1),
            per_share: dec!(-1)
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_spec_deserialize_and_build() {
        let spec: CostModelSpec =
            serde_json::from_str(r#"{"type":"fixed_plus_per_share","fixed":"1","per_share":"1"}"#)
                .unwrap();
        let model = spec.build().unwrap();

        assert_eq!(model.name(), "fixed_plus_per_share");
        assert_eq!(model.commission(dec!(100), dec!(160)), dec!(101));
        assert_eq!(CostModelSpec::default().build().unwrap().name(), "zero");
    }
}
