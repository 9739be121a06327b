//! Position held in a single instrument.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A position in a single instrument. Mutated only by applying fills.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub instrument: String,
    /// Number of shares (positive for long, negative for short)
    pub shares: Decimal,
    /// Volume-weighted average entry price of the open shares
    pub average_cost: Decimal,
}

impl Position {
    /// Create a flat position.
    pub fn flat(instrument: impl Into<String>) -> Self {
        Self {
            instrument: instrument.into(),
            shares: Decimal::ZERO,
            average_cost: Decimal::ZERO,
        }
    }

    pub fn is_long(&self) -> bool {
        self.shares > Decimal::ZERO
    }

    pub fn is_short(&self) -> bool {
        self.shares < Decimal::ZERO
    }

    pub fn is_flat(&self) -> bool {
        self.shares == Decimal::ZERO
    }

    /// Value of the position at `price`.
    pub fn market_value(&self, price: Decimal) -> Decimal {
        self.shares * price
    }

    /// Apply a signed fill quantity at `price`.
    /// Returns the realized P&L (before commission) if the position is being reduced.
    pub fn apply_fill(&mut self, shares: Decimal, price: Decimal) -> Decimal {
        let same_direction = (self.is_long() && shares > Decimal::ZERO)
            || (self.is_short() && shares < Decimal::ZERO);

        if same_direction || self.is_flat() {
            let total_cost = self.shares * self.average_cost + shares * price;
            let new_shares = self.shares + shares;
            if new_shares != Decimal::ZERO {
                self.average_cost = total_cost / new_shares;
            }
            self.shares = new_shares;
            return Decimal::ZERO;
        }

        // Reducing or reversing
        let close_qty = shares.abs().min(self.shares.abs());
        let realized = if self.is_long() {
            close_qty * (price - self.average_cost)
        } else {
            close_qty * (self.average_cost - price)
        };

        let remaining = shares.abs() - close_qty;
        if remaining > Decimal::ZERO {
            // Position reversed
            self.shares = if shares > Decimal::ZERO {
                remaining
            } else {
                -remaining
            };
            self.average_cost = price;
        } else {
            self.shares += shares;
            if self.is_flat() {
                self.average_cost = Decimal::ZERO;
            }
        }

        realized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_increase_updates_average_cost() {
        let mut position = Position::flat("AAPL");
        position.apply_fill(dec!(100), dec!(150));
        let realized = position.apply_fill(dec!(100), dec!(160));

        assert_eq!(realized, Decimal::ZERO);
        assert_eq!(position.shares, dec!(200));
        assert_eq!(position.average_cost, dec!(155));
    }

    #[test]
    fn test_close_realizes_pnl() {
        let mut position = Position::flat("AAPL");
        position.apply_fill(dec!(100), dec!(150));
        let realized = position.apply_fill(dec!(-100), dec!(160));

        assert_eq!(realized, dec!(1000));
        assert!(position.is_flat());
        assert_eq!(position.average_cost, Decimal::ZERO);
    }

    #[test]
    fn test_partial_reduce_keeps_average_cost() {
        let mut position = Position::flat("AAPL");
        position.apply_fill(dec!(100), dec!(150));
        let realized = position.apply_fill(dec!(-40), dec!(140));

        assert_eq!(realized, dec!(-400));
        assert_eq!(position.shares, dec!(60));
        assert_eq!(position.average_cost, dec!(150));
    }

    #[test]
    fn test_reversal_resets_average_cost() {
        let mut position = Position::flat("AAPL");
        position.apply_fill(dec!(10), dec!(100));
        let realized = position.apply_fill(dec!(-15), dec!(110));

        assert_eq!(realized, dec!(100));
        assert!(position.is_short());
        assert_eq!(position.shares, dec!(-5));
        assert_eq!(position.average_cost, dec!(110));
    }
}
