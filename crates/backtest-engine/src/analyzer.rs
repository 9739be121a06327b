//! Performance statistics over a completed equity curve and fill log.
//!
//! Everything here is a pure function of its inputs, so independent runs can
//! be analyzed in parallel and repeated analysis gives identical output.

use backtest_core::types::{Fill, Frequency};
use chrono::{DateTime, Utc};
use num_traits::{Signed, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, VecDeque};

use crate::config::BacktestConfig;
use crate::result::EquityPoint;

/// Summary statistics of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// `final_equity / initial_cash - 1`
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe: f64,
    pub sortino: f64,
    /// Worst peak-to-trough decline as a fraction in `[-1, 0]`
    pub max_drawdown: f64,
    /// `None` without a benchmark or when the benchmark never moves
    pub alpha: Option<f64>,
    pub beta: Option<f64>,
    /// Annualized standard deviation of period returns
    pub volatility: f64,
    pub calmar: f64,
    /// Fraction of closed round trips with positive P&L
    pub win_rate: f64,
    /// Number of fills
    pub total_trades: usize,
    pub closed_trades: usize,
    pub avg_trade_return: f64,
    pub final_equity: Decimal,
    /// Number of return periods
    pub periods: usize,
}

/// A FIFO-matched closed trade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundTrip {
    pub instrument: String,
    pub entry_timestamp: DateTime<Utc>,
    pub exit_timestamp: DateTime<Utc>,
    /// Matched quantity; negative for a short round trip
    pub shares: Decimal,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    /// Realized P&L net of the allocated commissions
    pub pnl: Decimal,
    /// P&L relative to the entry notional
    pub return_pct: f64,
}

impl RoundTrip {
    pub fn is_winner(&self) -> bool {
        self.pnl > Decimal::ZERO
    }
}

/// Computes [`Summary`] statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerformanceAnalyzer {
    periods_per_year: f64,
    /// Annual risk-free rate
    risk_free_rate: f64,
    annualize_alpha: bool,
}

impl PerformanceAnalyzer {
    pub fn new(frequency: Frequency, risk_free_rate: f64) -> Self {
        Self {
            periods_per_year: frequency.periods_per_year(),
            risk_free_rate,
            annualize_alpha: false,
        }
    }

    pub fn from_config(config: &BacktestConfig) -> Self {
        Self::new(config.frequency, config.risk_free_rate)
            .with_annualized_alpha(config.annualize_alpha)
    }

    pub fn with_annualized_alpha(mut self, annualize: bool) -> Self {
        self.annualize_alpha = annualize;
        self
    }

    /// Risk-free return per period.
    fn risk_free_per_period(&self) -> f64 {
        self.risk_free_rate / self.periods_per_year
    }

    /// Analyze a run. The return series starts from `initial_cash`.
    pub fn analyze(
        &self,
        initial_cash: Decimal,
        equity_curve: &[EquityPoint],
        fills: &[Fill],
    ) -> (Summary, Vec<RoundTrip>) {
        let initial = to_f64(initial_cash);
        let equity: Vec<f64> = equity_curve.iter().map(|p| to_f64(p.equity)).collect();
        let returns = period_returns(initial, &equity);
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_cash);

        let total_return = if initial_cash > Decimal::ZERO {
            to_f64(final_equity / initial_cash - Decimal::ONE)
        } else {
            0.0
        };
        let annualized_return = self.annualized_return(total_return, returns.len());
        let max_drawdown = max_drawdown(initial, &equity);
        let calmar = if max_drawdown < 0.0 {
            annualized_return / max_drawdown.abs()
        } else {
            0.0
        };

        let (alpha, beta) = self.alpha_beta(initial, equity_curve, &returns);

        let round_trips = round_trips(fills);
        let closed_trades = round_trips.len();
        let (win_rate, avg_trade_return) = if closed_trades == 0 {
            (0.0, 0.0)
        } else {
            let winners = round_trips.iter().filter(|t| t.is_winner()).count();
            (
                winners as f64 / closed_trades as f64,
                finite_or_zero(round_trips.iter().map(|t| t.return_pct).mean()),
            )
        };

        let summary = Summary {
            total_return,
            annualized_return,
            sharpe: self.sharpe(&returns),
            sortino: self.sortino(&returns),
            max_drawdown,
            alpha,
            beta,
            volatility: self.volatility(&returns),
            calmar,
            win_rate,
            total_trades: fills.len(),
            closed_trades,
            avg_trade_return,
            final_equity,
            periods: returns.len(),
        };
        (summary, round_trips)
    }

    /// Annualized standard deviation of returns.
    pub fn volatility(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        finite_or_zero(returns.std_dev()) * self.periods_per_year.sqrt()
    }

    /// Annualized Sharpe ratio; 0 for a flat return series.
    pub fn sharpe(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let std = finite_or_zero(returns.std_dev());
        if std < 1e-15 {
            return 0.0;
        }
        let rf = self.risk_free_per_period();
        let mean_excess = returns.iter().map(|r| r - rf).mean();
        finite_or_zero(mean_excess / std * self.periods_per_year.sqrt())
    }

    /// Annualized Sortino ratio; downside deviation is taken over all periods.
    pub fn sortino(&self, returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }
        let rf = self.risk_free_per_period();
        let excess: Vec<f64> = returns.iter().map(|r| r - rf).collect();
        let downside = excess.iter().map(|r| r.min(0.0).powi(2)).mean().sqrt();
        if !downside.is_finite() || downside < 1e-15 {
            return 0.0;
        }
        finite_or_zero(excess.iter().mean() / downside * self.periods_per_year.sqrt())
    }

    fn annualized_return(&self, total_return: f64, periods: usize) -> f64 {
        if periods == 0 {
            return 0.0;
        }
        let growth = 1.0 + total_return;
        if growth <= 0.0 {
            return -1.0;
        }
        finite_or_zero(growth.powf(self.periods_per_year / periods as f64) - 1.0)
    }

    /// Per-period alpha and beta against the benchmark equity series.
    fn alpha_beta(
        &self,
        initial: f64,
        equity_curve: &[EquityPoint],
        returns: &[f64],
    ) -> (Option<f64>, Option<f64>) {
        let benchmark: Option<Vec<f64>> = equity_curve
            .iter()
            .map(|p| p.benchmark_equity.map(to_f64))
            .collect();
        let Some(benchmark) = benchmark else {
            return (None, None);
        };
        let benchmark_returns = period_returns(initial, &benchmark);
        if benchmark_returns.len() < 2 || benchmark_returns.len() != returns.len() {
            return (None, None);
        }

        let variance = benchmark_returns.iter().variance();
        if !variance.is_finite() || variance.abs() < 1e-18 {
            return (None, None);
        }
        let beta = returns.iter().covariance(benchmark_returns.iter()) / variance;
        let mut alpha = returns.iter().mean() - beta * benchmark_returns.iter().mean();
        if self.annualize_alpha {
            alpha *= self.periods_per_year;
        }

        if alpha.is_finite() && beta.is_finite() {
            (Some(alpha), Some(beta))
        } else {
            (None, None)
        }
    }
}

fn to_f64(value: Decimal) -> f64 {
    value.to_f64().unwrap_or(0.0)
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Simple returns of `equity` with `initial` as the value before the first point.
pub fn period_returns(initial: f64, equity: &[f64]) -> Vec<f64> {
    let mut previous = initial;
    equity
        .iter()
        .map(|&value| {
            let r = if previous != 0.0 {
                value / previous - 1.0
            } else {
                0.0
            };
            previous = value;
            r
        })
        .collect()
}

/// Largest decline from a running peak, as a fraction in `[-1, 0]`.
pub fn max_drawdown(initial: f64, equity: &[f64]) -> f64 {
    let mut peak = initial;
    let mut worst = 0.0_f64;
    for &value in equity {
        if value > peak {
            peak = value;
        }
        if peak > 0.0 {
            worst = worst.min(value / peak - 1.0);
        }
    }
    worst.max(-1.0)
}

#[derive(Debug, Clone)]
struct Lot {
    timestamp: DateTime<Utc>,
    /// Signed open quantity
    shares: Decimal,
    price: Decimal,
    commission_per_share: Decimal,
}

/// Match fills into closed round trips with FIFO lots per instrument.
///
/// Long and short lots are both matched. Commissions are allocated pro rata
/// by shares to each matched entry and exit.
pub fn round_trips(fills: &[Fill]) -> Vec<RoundTrip> {
    let mut open: BTreeMap<&str, VecDeque<Lot>> = BTreeMap::new();
    let mut trips = Vec::new();

    for fill in fills {
        if fill.shares.is_zero() {
            continue;
        }
        let commission_per_share = fill.commission / fill.shares.abs();
        let lots = open.entry(fill.instrument.as_str()).or_default();
        let mut remaining = fill.shares;

        while !remaining.is_zero() {
            let Some(lot) = lots.front_mut() else {
                break;
            };
            if lot.shares.is_sign_positive() == remaining.is_sign_positive() {
                break;
            }

            let direction = lot.shares.signum();
            let quantity = remaining.abs().min(lot.shares.abs());
            let commissions = quantity * (lot.commission_per_share + commission_per_share);
            let pnl = (fill.price - lot.price) * quantity * direction - commissions;
            let entry_notional = lot.price * quantity;
            let return_pct = if entry_notional.is_zero() {
                0.0
            } else {
                to_f64(pnl / entry_notional)
            };

            trips.push(RoundTrip {
                instrument: fill.instrument.clone(),
                entry_timestamp: lot.timestamp,
                exit_timestamp: fill.timestamp,
                shares: quantity * direction,
                entry_price: lot.price,
                exit_price: fill.price,
                pnl,
                return_pct,
            });

            lot.shares -= quantity * direction;
            remaining += quantity * direction;
            if lot.shares.is_zero() {
                lots.pop_front();
            }
        }

        if !remaining.is_zero() {
            lots.push_back(Lot {
                timestamp: fill.timestamp,
                shares: remaining,
                price: fill.price,
                commission_per_share,
            });
        }
    }

    trips
}
