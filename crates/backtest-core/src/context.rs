//! Per-run mutable state handed to strategy callbacks.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::StrategyError;
use crate::schedule::{DateRule, ScheduledFunction, TimeRule};
use crate::types::PortfolioSnapshot;

/// A value recorded by a strategy for later plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordedValue {
    pub timestamp: DateTime<Utc>,
    pub name: String,
    pub value: f64,
}

/// Strategy context.
///
/// Owned by the runner and passed explicitly to every callback. Strategies
/// keep their own state in the named variables; the portfolio view is
/// read-only and refreshed by the runner before each callback.
#[derive(Debug, Clone)]
pub struct Context {
    vars: BTreeMap<String, serde_json::Value>,
    portfolio: PortfolioSnapshot,
    now: DateTime<Utc>,
    records: Vec<RecordedValue>,
    schedules: Vec<ScheduledFunction>,
    initializing: bool,
}

impl Context {
    /// Create the context for a run starting with `initial_cash`.
    pub fn new(initial_cash: Decimal, start: DateTime<Utc>) -> Self {
        Self {
            vars: BTreeMap::new(),
            portfolio: PortfolioSnapshot::cash_only(start, initial_cash),
            now: start,
            records: Vec::new(),
            schedules: Vec::new(),
            initializing: true,
        }
    }

    /// Store a value under `key`.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> Result<(), StrategyError> {
        let value = serde_json::to_value(value).map_err(|e| StrategyError::Context {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.vars.insert(key.to_string(), value);
        Ok(())
    }

    /// Read the value stored under `key`; `Ok(None)` when absent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StrategyError> {
        self.vars
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| StrategyError::Context {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.vars.remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.vars.contains_key(key)
    }

    /// Portfolio as of the latest fill or mark.
    pub fn portfolio(&self) -> &PortfolioSnapshot {
        &self.portfolio
    }

    /// Current simulation time.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Record a named value at the current simulation time.
    pub fn record(&mut self, name: &str, value: f64) {
        self.records.push(RecordedValue {
            timestamp: self.now,
            name: name.to_string(),
            value,
        });
    }

    pub fn records(&self) -> &[RecordedValue] {
        &self.records
    }

    /// Register a scheduling directive. Only allowed from `Strategy::initialize`.
    pub fn schedule_function(
        &mut self,
        name: &str,
        date_rule: DateRule,
        time_rule: TimeRule,
    ) -> Result<(), StrategyError> {
        if !self.initializing {
            return Err(StrategyError::InvalidConfig(format!(
                "schedule '{}' must be registered during initialize",
                name
            )));
        }
        self.schedules.push(ScheduledFunction {
            name: name.to_string(),
            date_rule,
            time_rule,
        });
        Ok(())
    }

    pub fn schedules(&self) -> &[ScheduledFunction] {
        &self.schedules
    }

    /// Close the registration window for scheduling directives.
    pub fn finish_initialization(&mut self) {
        self.initializing = false;
    }

    /// Refresh the runner-owned view before a callback.
    pub fn refresh(&mut self, now: DateTime<Utc>, portfolio: PortfolioSnapshot) {
        self.now = now;
        self.portfolio = portfolio;
    }

    /// Take the recorded values, leaving the context empty of records.
    pub fn take_records(&mut self) -> Vec<RecordedValue> {
        std::mem::take(&mut self.records)
    }
}
