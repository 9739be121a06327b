//! Order intents, fills and order outcomes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the target of an [`OrderIntent`] is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    /// Hold `target` as a fraction of portfolio equity (1.0 = 100%)
    TargetPercent,
    /// Hold exactly `target` shares
    TargetShares,
    /// Trade `target` shares (positive buys, negative sells)
    DeltaShares,
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKind::TargetPercent => write!(f, "TARGET_PERCENT"),
            OrderKind::TargetShares => write!(f, "TARGET_SHARES"),
            OrderKind::DeltaShares => write!(f, "DELTA_SHARES"),
        }
    }
}

/// A strategy's request to change a position.
///
/// Intents are the only channel from strategy code to the execution
/// simulator; they live for the bar that created them (or until the
/// instrument's next open under next-open fill timing).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderIntent {
    pub instrument: String,
    pub target: Decimal,
    pub kind: OrderKind,
    pub requested_at: DateTime<Utc>,
}

impl OrderIntent {
    /// Target a fraction of equity in `instrument`.
    pub fn target_percent(
        instrument: impl Into<String>,
        fraction: Decimal,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            target: fraction,
            kind: OrderKind::TargetPercent,
            requested_at,
        }
    }

    /// Target an absolute share count in `instrument`.
    pub fn target_shares(
        instrument: impl Into<String>,
        shares: Decimal,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            target: shares,
            kind: OrderKind::TargetShares,
            requested_at,
        }
    }

    /// Buy (positive) or sell (negative) a number of shares.
    pub fn delta_shares(
        instrument: impl Into<String>,
        shares: Decimal,
        requested_at: DateTime<Utc>,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            target: shares,
            kind: OrderKind::DeltaShares,
            requested_at,
        }
    }
}

/// An executed trade. Immutable once recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fill {
    pub instrument: String,
    pub timestamp: DateTime<Utc>,
    /// Signed quantity: positive buys, negative sells
    pub shares: Decimal,
    pub price: Decimal,
    pub commission: Decimal,
}

impl Fill {
    pub fn new(
        instrument: impl Into<String>,
        timestamp: DateTime<Utc>,
        shares: Decimal,
        price: Decimal,
        commission: Decimal,
    ) -> Self {
        Self {
            instrument: instrument.into(),
            timestamp,
            shares,
            price,
            commission,
        }
    }

    #[inline]
    pub fn is_buy(&self) -> bool {
        self.shares > Decimal::ZERO
    }

    /// Unsigned traded value, excluding commission.
    pub fn notional(&self) -> Decimal {
        (self.shares * self.price).abs()
    }

    /// Change in cash caused by this fill.
    pub fn cash_impact(&self) -> Decimal {
        -(self.shares * self.price) - self.commission
    }
}

/// Final status of a processed intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Completely filled at the requested size
    Filled,
    /// Filled at a reduced size
    PartiallyFilled,
    /// Not filled; see the reason
    Rejected,
}

impl OrderStatus {
    /// Whether any shares were traded.
    pub fn is_filled(&self) -> bool {
        matches!(self, OrderStatus::Filled | OrderStatus::PartiallyFilled)
    }
}

/// Why an intent was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    InsufficientFunds,
    NoLiquidity,
    InvalidQuantity,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::InsufficientFunds => write!(f, "insufficient_funds"),
            RejectReason::NoLiquidity => write!(f, "no_liquidity"),
            RejectReason::InvalidQuantity => write!(f, "invalid_quantity"),
        }
    }
}

/// Outcome of one intent, kept in the run's order history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    pub intent: OrderIntent,
    /// When the intent was processed
    pub timestamp: DateTime<Utc>,
    pub status: OrderStatus,
    /// Signed share delta derived from the intent
    pub requested_shares: Decimal,
    /// Signed shares actually traded
    pub filled_shares: Decimal,
    pub fill_price: Option<Decimal>,
    pub commission: Decimal,
    pub reason: Option<RejectReason>,
}

impl OrderRecord {
    /// Record a rejected intent.
    pub fn rejected(
        intent: OrderIntent,
        timestamp: DateTime<Utc>,
        requested_shares: Decimal,
        reason: RejectReason,
    ) -> Self {
        Self {
            intent,
            timestamp,
            status: OrderStatus::Rejected,
            requested_shares,
            filled_shares: Decimal::ZERO,
            fill_price: None,
            commission: Decimal::ZERO,
            reason: Some(reason),
        }
    }

    /// Record an executed intent. Partial when the fill is smaller than requested.
    pub fn executed(intent: OrderIntent, requested_shares: Decimal, fill: &Fill) -> Self {
        let status = if fill.shares.abs() < requested_shares.abs() {
            OrderStatus::PartiallyFilled
        } else {
            OrderStatus::Filled
        };
        Self {
            intent,
            timestamp: fill.timestamp,
            status,
            requested_shares,
            filled_shares: fill.shares,
            fill_price: Some(fill.price),
            commission: fill.commission,
            reason: None,
        }
    }
}
