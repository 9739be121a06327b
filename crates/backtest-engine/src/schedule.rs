//! Evaluation of scheduling directives against bar timestamps.

use backtest_core::schedule::{DateRule, ScheduledFunction, TimeRule};
use backtest_core::types::Frequency;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::config::MarketSession;

#[derive(Debug, Clone)]
struct Entry {
    function: ScheduledFunction,
    last_fired: Option<NaiveDate>,
}

/// Decides which registered directives are due at each bar interval.
///
/// A directive fires at most once per trading day. With daily bars the
/// day's bar satisfies every time rule; with minute bars a directive fires
/// on the first bar at or after its target time.
#[derive(Debug, Clone)]
pub struct Scheduler {
    entries: Vec<Entry>,
    frequency: Frequency,
    session: MarketSession,
    current_day: Option<NaiveDate>,
    previous_day: Option<NaiveDate>,
}

impl Scheduler {
    pub fn new(functions: &[ScheduledFunction], frequency: Frequency, session: MarketSession) -> Self {
        Self {
            entries: functions
                .iter()
                .cloned()
                .map(|function| Entry {
                    function,
                    last_fired: None,
                })
                .collect(),
            frequency,
            session,
            current_day: None,
            previous_day: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names of the directives due at `timestamp`, in registration order.
    ///
    /// Must be called once per bar interval, in time order.
    pub fn due(&mut self, timestamp: DateTime<Utc>) -> Vec<String> {
        let day = timestamp.date_naive();
        if self.current_day != Some(day) {
            self.previous_day = self.current_day;
            self.current_day = Some(day);
        }

        let time = timestamp.time();
        let mut names = Vec::new();
        for entry in &mut self.entries {
            if entry.last_fired == Some(day) {
                continue;
            }
            if !date_rule_matches(entry.function.date_rule, day, self.previous_day) {
                continue;
            }
            if self.frequency.is_intraday()
                && time < target_time(entry.function.time_rule, &self.session)
            {
                continue;
            }
            entry.last_fired = Some(day);
            names.push(entry.function.name.clone());
        }
        names
    }
}

/// Whether `day` qualifies, given the previous trading day seen.
fn date_rule_matches(rule: DateRule, day: NaiveDate, previous: Option<NaiveDate>) -> bool {
    match (rule, previous) {
        (DateRule::EveryDay, _) | (_, None) => true,
        (DateRule::WeekStart, Some(prev)) => prev.iso_week() != day.iso_week(),
        (DateRule::MonthStart, Some(prev)) => (prev.year(), prev.month()) != (day.year(), day.month()),
    }
}

/// Minute-bar target time of a rule.
///
/// `market_close` targets the last minute bar that starts before the
/// close, moved earlier by the offset.
fn target_time(rule: TimeRule, session: &MarketSession) -> NaiveTime {
    match rule {
        TimeRule::MarketOpen { offset_minutes } => {
            session.open + Duration::minutes(i64::from(offset_minutes))
        }
        TimeRule::MarketClose { offset_minutes } => {
            session.close - Duration::minutes(i64::from(offset_minutes) + 1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn directive(name: &str, date_rule: DateRule, time_rule: TimeRule) -> ScheduledFunction {
        ScheduledFunction {
            name: name.to_string(),
            date_rule,
            time_rule,
        }
    }

    fn daily(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn minute(d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_every_day_fires_once_per_day() {
        let mut scheduler = Scheduler::new(
            &[directive("rebalance", DateRule::EveryDay, TimeRule::market_open())],
            Frequency::Daily,
            MarketSession::default(),
        );

        assert_eq!(scheduler.due(daily(2024, 1, 2)), vec!["rebalance"]);
        assert!(scheduler.due(daily(2024, 1, 2)).is_empty());
        assert_eq!(scheduler.due(daily(2024, 1, 3)), vec!["rebalance"]);
    }

    #[test]
    fn test_week_and_month_start() {
        let mut scheduler = Scheduler::new(
            &[
                directive("weekly", DateRule::WeekStart, TimeRule::market_open()),
                directive("monthly", DateRule::MonthStart, TimeRule::market_close()),
            ],
            Frequency::Daily,
            MarketSession::default(),
        );

        // Wed 2024-01-31 is the first day seen
        assert_eq!(scheduler.due(daily(2024, 1, 31)), vec!["weekly", "monthly"]);
        // Thu 2024-02-01: same ISO week, new month
        assert_eq!(scheduler.due(daily(2024, 2, 1)), vec!["monthly"]);
        assert!(scheduler.due(daily(2024, 2, 2)).is_empty());
        // Mon 2024-02-05: new week
        assert_eq!(scheduler.due(daily(2024, 2, 5)), vec!["weekly"]);
    }

    #[test]
    fn test_minute_bars_fire_at_target_time() {
        let mut scheduler = Scheduler::new(
            &[
                directive("open", DateRule::EveryDay, TimeRule::MarketOpen { offset_minutes: 30 }),
                directive("close", DateRule::EveryDay, TimeRule::market_close()),
            ],
            Frequency::Minute,
            MarketSession::default(),
        );

        assert!(scheduler.due(minute(2, 9, 30)).is_empty());
        assert!(scheduler.due(minute(2, 9, 59)).is_empty());
        assert_eq!(scheduler.due(minute(2, 10, 1)), vec!["open"]);
        assert!(scheduler.due(minute(2, 10, 2)).is_empty());
        assert_eq!(scheduler.due(minute(2, 15, 59)), vec!["close"]);
        assert_eq!(scheduler.due(minute(3, 10, 0)), vec!["open"]);
    }
}
