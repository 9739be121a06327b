//! Simulated execution for backtesting.
//!
//! Provides pluggable commission models and the execution simulator that
//! turns order intents into fills against the portfolio ledger.

mod commission;
mod simulator;

pub use commission::{
    CostModel, CostModelSpec, FixedPlusPerShare, PercentOfNotional, PerShare, ZeroCommission,
};
pub use simulator::{ExecutionSimulator, SimulatorConfig};
