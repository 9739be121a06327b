//! Core data types for the backtesting engine.

mod bar;
mod frequency;
mod order;
mod position;
mod snapshot;

pub use bar::{Bar, BarWindow};
pub use frequency::Frequency;
pub use order::{Fill, OrderIntent, OrderKind, OrderRecord, OrderStatus, RejectReason};
pub use position::Position;
pub use snapshot::PortfolioSnapshot;
