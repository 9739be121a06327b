//! Execution simulator: turns order intents into fills against the ledger.

use backtest_core::error::{ConfigError, LedgerError};
use backtest_core::ledger::Ledger;
use backtest_core::types::{Bar, Fill, OrderIntent, OrderKind, OrderRecord, RejectReason};
use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::commission::{CostModel, CostModelSpec};

/// Decimal places kept when fractional shares are enabled.
const FRACTIONAL_DP: u32 = 6;

/// Execution settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulatorConfig {
    /// Price impact in basis points, applied against the order
    pub slippage_bps: Decimal,
    /// Allow non-integer share quantities
    pub fractional_shares: bool,
    /// Allow sells beyond the held position
    pub allow_short_selling: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            slippage_bps: Decimal::ZERO,
            fractional_shares: false,
            allow_short_selling: false,
        }
    }
}

/// Simulated execution venue for backtesting.
#[derive(Debug)]
pub struct ExecutionSimulator {
    config: SimulatorConfig,
    cost_model: Box<dyn CostModel>,
}

impl ExecutionSimulator {
    /// Create a simulator with an explicit cost model.
    pub fn new(config: SimulatorConfig, cost_model: Box<dyn CostModel>) -> Result<Self, ConfigError> {
        if config.slippage_bps < Decimal::ZERO {
            return Err(ConfigError::NegativeRate {
                field: "slippage_bps",
                value: config.slippage_bps,
            });
        }
        Ok(Self { config, cost_model })
    }

    /// Create a simulator from a serializable cost model choice.
    pub fn from_spec(config: SimulatorConfig, spec: &CostModelSpec) -> Result<Self, ConfigError> {
        Self::new(config, spec.build()?)
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    pub fn cost_model(&self) -> &dyn CostModel {
        self.cost_model.as_ref()
    }

    /// Execute one intent against `bar` at reference `price` (its close or open).
    ///
    /// Returns `None` when the intent's target is already met. Rejections
    /// never propagate as errors; they are returned as rejected records.
    pub fn execute(
        &self,
        ledger: &mut Ledger,
        intent: OrderIntent,
        bar: &Bar,
        price: Decimal,
    ) -> Option<OrderRecord> {
        let timestamp = bar.timestamp;
        let instrument = intent.instrument.clone();

        if bar.instrument != instrument || price <= Decimal::ZERO {
            return Some(self.reject(intent, timestamp, Decimal::ZERO, RejectReason::NoLiquidity));
        }

        ledger.mark(&instrument, price);
        let held = ledger.shares(&instrument);

        let requested = match intent.kind {
            OrderKind::TargetPercent => {
                let target = self.quantize(intent.target * ledger.equity() / price);
                target - held
            }
            OrderKind::TargetShares => self.quantize(intent.target) - held,
            OrderKind::DeltaShares => self.quantize(intent.target),
        };

        if requested.is_zero() {
            if intent.kind == OrderKind::DeltaShares {
                return Some(self.reject(intent, timestamp, requested, RejectReason::InvalidQuantity));
            }
            debug!(instrument = %instrument, "Target already met");
            return None;
        }

        if !bar.has_liquidity() {
            return Some(self.reject(intent, timestamp, requested, RejectReason::NoLiquidity));
        }

        let mut shares = requested;
        if !self.config.allow_short_selling && held + shares < Decimal::ZERO {
            shares = -held.max(Decimal::ZERO);
            if shares.is_zero() {
                return Some(self.reject(intent, timestamp, requested, RejectReason::InvalidQuantity));
            }
        }

        let fill_price = self.fill_price(price, shares > Decimal::ZERO);
        let fill = self.make_fill(&instrument, bar, shares, fill_price);

        match ledger.apply_fill(fill.clone()) {
            Ok(_) => Some(OrderRecord::executed(intent, requested, &fill)),
            Err(LedgerError::InsufficientFunds { required, available }) if shares > Decimal::ZERO => {
                let affordable = self.max_affordable(available, fill_price, shares);
                debug!(
                    instrument = %instrument,
                    %required,
                    %available,
                    %affordable,
                    "Downsizing order to affordable quantity"
                );
                if affordable.is_zero() {
                    return Some(self.reject(
                        intent,
                        timestamp,
                        requested,
                        RejectReason::InsufficientFunds,
                    ));
                }

                let fill = self.make_fill(&instrument, bar, affordable, fill_price);
                match ledger.apply_fill(fill.clone()) {
                    Ok(_) => Some(OrderRecord::executed(intent, requested, &fill)),
                    Err(_) => Some(self.reject(
                        intent,
                        timestamp,
                        requested,
                        RejectReason::InsufficientFunds,
                    )),
                }
            }
            Err(LedgerError::InsufficientFunds { .. }) => Some(self.reject(
                intent,
                timestamp,
                requested,
                RejectReason::InsufficientFunds,
            )),
            Err(e) => {
                warn!(instrument = %instrument, "Ledger refused fill: {}", e);
                Some(self.reject(intent, timestamp, requested, RejectReason::InvalidQuantity))
            }
        }
    }

    /// Reject an intent that never reached a bar of its instrument.
    pub fn reject_unfilled(
        &self,
        intent: OrderIntent,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> OrderRecord {
        self.reject(intent, timestamp, Decimal::ZERO, RejectReason::NoLiquidity)
    }

    fn reject(
        &self,
        intent: OrderIntent,
        timestamp: chrono::DateTime<chrono::Utc>,
        requested: Decimal,
        reason: RejectReason,
    ) -> OrderRecord {
        warn!(
            instrument = %intent.instrument,
            kind = %intent.kind,
            target = %intent.target,
            %reason,
            "Order rejected"
        );
        OrderRecord::rejected(intent, timestamp, requested, reason)
    }

    fn make_fill(&self, instrument: &str, bar: &Bar, shares: Decimal, price: Decimal) -> Fill {
        let commission = self.cost_model.commission(shares, price);
        Fill::new(instrument, bar.timestamp, shares, price, commission)
    }

    /// Reference price moved against the order by the configured slippage.
    fn fill_price(&self, price: Decimal, is_buy: bool) -> Decimal {
        let impact = self.config.slippage_bps / dec!(10000);
        if is_buy {
            price * (Decimal::ONE + impact)
        } else {
            price * (Decimal::ONE - impact)
        }
    }

    /// Truncate a quantity toward zero to the tradable granularity.
    fn quantize(&self, shares: Decimal) -> Decimal {
        if self.config.fractional_shares {
            shares.round_dp_with_strategy(FRACTIONAL_DP, RoundingStrategy::ToZero)
        } else {
            shares.trunc()
        }
    }

    fn share_unit(&self) -> Decimal {
        if self.config.fractional_shares {
            Decimal::new(1, FRACTIONAL_DP)
        } else {
            Decimal::ONE
        }
    }

    /// Largest buy quantity (at most `requested`) whose cost plus commission fits in `cash`.
    fn max_affordable(&self, cash: Decimal, price: Decimal, requested: Decimal) -> Decimal {
        let unit = self.share_unit();
        if price <= Decimal::ZERO || cash <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        // Nothing beyond cash / price can fit, whatever the commission.
        let ceiling = requested.min(cash / price);
        let max_units = (ceiling / unit).trunc().to_u64().unwrap_or(u64::MAX);
        let fits = |units: u64| {
            let shares = Decimal::from(units) * unit;
            shares * price + self.cost_model.commission(shares, price) <= cash
        };

        // Total cost is monotonic in quantity
        let (mut lo, mut hi) = (0u64, max_units);
        while lo < hi {
            let mid = lo + (hi - lo + 1) / 2;
            if fits(mid) {
                lo = mid;
            } else {
                hi = mid - 1;
            }
        }
        Decimal::from(lo) * unit
    }
}
