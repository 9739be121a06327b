//! Logging setup and progress reporting.

mod logging;
mod progress;

pub use logging::setup_logging;
pub use progress::LogProgress;
