//! Bar frequency of a backtest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trading minutes in a regular US equity session.
const MINUTES_PER_SESSION: u32 = 390;

/// Trading days per year used for annualization.
const TRADING_DAYS_PER_YEAR: u32 = 252;

/// Frequency of the bars driving a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    /// One bar per trading day
    #[default]
    Daily,
    /// One bar per trading minute
    Minute,
}

impl Frequency {
    /// Number of bar intervals in a trading year.
    pub fn periods_per_year(&self) -> f64 {
        match self {
            Frequency::Daily => f64::from(TRADING_DAYS_PER_YEAR),
            Frequency::Minute => f64::from(TRADING_DAYS_PER_YEAR * MINUTES_PER_SESSION),
        }
    }

    /// Duration of one bar in seconds.
    pub fn as_secs(&self) -> u64 {
        match self {
            Frequency::Daily => 86_400,
            Frequency::Minute => 60,
        }
    }

    /// Check if this is an intraday frequency.
    pub fn is_intraday(&self) -> bool {
        matches!(self, Frequency::Minute)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Frequency::Daily => "daily",
            Frequency::Minute => "minute",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1d" | "day" | "daily" => Ok(Frequency::Daily),
            "1m" | "1min" | "minute" => Ok(Frequency::Minute),
            _ => Err(format!("Invalid frequency: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Frequency::Daily.periods_per_year(), 252.0);
        assert_eq!(Frequency::Minute.periods_per_year(), 98_280.0);
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!(Frequency::from_str("daily").unwrap(), Frequency::Daily);
        assert_eq!(Frequency::from_str("1D").unwrap(), Frequency::Daily);
        assert_eq!(Frequency::from_str("minute").unwrap(), Frequency::Minute);
        assert!(Frequency::from_str("weekly").is_err());
    }

    #[test]
    fn test_frequency_display() {
        assert_eq!(Frequency::Daily.to_string(), "daily");
        assert_eq!(Frequency::Minute.to_string(), "minute");
        assert!(Frequency::Minute.is_intraday());
    }
}
