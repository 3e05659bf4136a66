//! Core traits for the grid backtester.

mod indicator;
mod portfolio;
mod signal;

pub use indicator::{Indicator, PriceSeries};
pub use portfolio::PortfolioView;
pub use signal::{SignalGenerator, StrategyConfig};
