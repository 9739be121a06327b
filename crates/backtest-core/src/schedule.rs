//! Scheduling directives a strategy registers during initialization.

use serde::{Deserialize, Serialize};

/// Which trading days a directive runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateRule {
    EveryDay,
    /// First trading day of each ISO week
    WeekStart,
    /// First trading day of each month
    MonthStart,
}

/// When within a trading day a directive runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "anchor")]
pub enum TimeRule {
    /// Minutes after the session opens
    MarketOpen { offset_minutes: u32 },
    /// Minutes before the session closes
    MarketClose { offset_minutes: u32 },
}

impl TimeRule {
    pub fn market_open() -> Self {
        TimeRule::MarketOpen { offset_minutes: 0 }
    }

    pub fn market_close() -> Self {
        TimeRule::MarketClose { offset_minutes: 0 }
    }
}

/// A named directive; the runner calls `Strategy::on_schedule` with its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledFunction {
    pub name: String,
    pub date_rule: DateRule,
    pub time_rule: TimeRule,
}
