//! Backtesting engine.
//!
//! Walks a candle sequence once, applying a [`SignalGenerator`]'s decisions
//! to a cash-constrained portfolio, and produces a trade ledger, an equity
//! curve and run statistics.
//!
//! [`SignalGenerator`]: gridtrend_core::traits::SignalGenerator

mod costs;
mod engine;
mod portfolio;
mod report;
mod statistics;

pub use costs::TransactionCosts;
pub use engine::{
    BacktestConfig, BacktestEngine, Depletion, RejectReason, Rejection, RunPhase,
    TerminationPolicy,
};
pub use portfolio::PortfolioState;
pub use report::BacktestReport;
pub use statistics::{RunStatistics, RunSummaryInput};
