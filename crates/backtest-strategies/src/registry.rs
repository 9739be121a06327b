//! Strategy registry for loading strategies by name.

use backtest_core::{Strategy, StrategyError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    BuyAndHoldConfig, BuyAndHoldStrategy, MACrossoverConfig, MACrossoverStrategy,
    RebalanceConfig, RebalanceStrategy,
};

/// Information about a registered strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyInfo {
    /// Strategy name
    pub name: String,
    /// Strategy description
    pub description: String,
    /// Default configuration as JSON
    pub default_config: serde_json::Value,
}

/// Registry of the built-in strategies, keyed by id.
pub struct StrategyRegistry {
    strategies: BTreeMap<String, StrategyInfo>,
}

fn parse<T: DeserializeOwned>(config: serde_json::Value) -> Result<T, StrategyError> {
    serde_json::from_value(config).map_err(|e| StrategyError::InvalidConfig(e.to_string()))
}

impl StrategyRegistry {
    /// Create a new strategy registry with all built-in strategies.
    pub fn new() -> Self {
        let mut strategies = BTreeMap::new();

        strategies.insert(
            "buy_and_hold".to_string(),
            StrategyInfo {
                name: "Buy and Hold".to_string(),
                description: "Buys each instrument on its first bar and holds to the end"
                    .to_string(),
                default_config: serde_json::to_value(BuyAndHoldConfig::default())
                    .unwrap_or_default(),
            },
        );

        strategies.insert(
            "ma_crossover".to_string(),
            StrategyInfo {
                name: "MA Crossover".to_string(),
                description: "Holds instruments while the fast moving average is above the slow one"
                    .to_string(),
                default_config: serde_json::to_value(MACrossoverConfig::default())
                    .unwrap_or_default(),
            },
        );

        strategies.insert(
            "rebalance".to_string(),
            StrategyInfo {
                name: "Equal-Weight Rebalance".to_string(),
                description: "Rebalances to equal weights on a market-open schedule".to_string(),
                default_config: serde_json::to_value(RebalanceConfig::default())
                    .unwrap_or_default(),
            },
        );

        Self { strategies }
    }

    /// List all available strategies, ordered by id.
    pub fn list(&self) -> Vec<(&str, &StrategyInfo)> {
        self.strategies
            .iter()
            .map(|(id, info)| (id.as_str(), info))
            .collect()
    }

    /// Get strategy info by id.
    pub fn get(&self, name: &str) -> Option<&StrategyInfo> {
        self.strategies.get(name)
    }

    /// Check if a strategy exists.
    pub fn exists(&self, name: &str) -> bool {
        self.strategies.contains_key(name)
    }

    /// Get all strategy ids.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.keys().map(String::as_str).collect()
    }

    /// Create a strategy instance from configuration.
    ///
    /// `instruments` replaces whatever instrument list the JSON carries.
    pub fn create(
        &self,
        name: &str,
        config: serde_json::Value,
        instruments: Vec<String>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        match name {
            "buy_and_hold" => {
                let mut config: BuyAndHoldConfig = parse(config)?;
                config.instruments = instruments;
                Ok(Box::new(BuyAndHoldStrategy::new(config)?))
            }
            "ma_crossover" => {
                let mut config: MACrossoverConfig = parse(config)?;
                config.instruments = instruments;
                Ok(Box::new(MACrossoverStrategy::new(config)?))
            }
            "rebalance" => {
                let mut config: RebalanceConfig = parse(config)?;
                config.instruments = instruments;
                Ok(Box::new(RebalanceStrategy::new(config)?))
            }
            _ => Err(StrategyError::NotFound(name.to_string())),
        }
    }

    /// Create a strategy with default configuration.
    pub fn create_default(
        &self,
        name: &str,
        instruments: Vec<String>,
    ) -> Result<Box<dyn Strategy>, StrategyError> {
        let info = self
            .get(name)
            .ok_or_else(|| StrategyError::NotFound(name.to_string()))?;
        self.create(name, info.default_config.clone(), instruments)
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_list() {
        let registry = StrategyRegistry::new();
        assert_eq!(
            registry.names(),
            vec!["buy_and_hold", "ma_crossover", "rebalance"]
        );
        assert_eq!(registry.list().len(), 3);
    }

    #[test]
    fn test_registry_get() {
        let registry = StrategyRegistry::new();

        assert!(registry.get("ma_crossover").is_some());
        assert!(registry.exists("rebalance"));
        assert!(registry.get("unknown").is_none());
    }

    #[test]
    fn test_create_default() {
        let registry = StrategyRegistry::new();

        for name in registry.names() {
            let strategy = registry
                .create_default(name, vec!["AAPL".to_string()])
                .unwrap();
            assert_eq!(strategy.name(), name);
        }
    }

    #[test]
    fn test_create_with_config() {
        let registry = StrategyRegistry::new();

        let config = serde_json::json!({
            "fast_period": 5,
            "slow_period": 10,
            "allocation": "0.5"
        });
        assert!(registry
            .create("ma_crossover", config, vec!["GOOGL".to_string()])
            .is_ok());

        let bad = serde_json::json!({ "fast_period": 10, "slow_period": 5 });
        assert!(matches!(
            registry.create("ma_crossover", bad, vec!["GOOGL".to_string()]),
            Err(StrategyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_create_requires_instruments() {
        let registry = StrategyRegistry::new();
        assert!(registry.create_default("buy_and_hold", vec![]).is_err());
    }

    #[test]
    fn test_create_unknown_strategy() {
        let registry = StrategyRegistry::new();

        let result = registry.create_default("unknown", vec!["AAPL".to_string()]);
        assert!(matches!(result, Err(StrategyError::NotFound(_))));
    }
}
