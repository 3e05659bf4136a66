//! Hybrid trend-following grid strategy.
//!
//! - [`trend`]: classifies each candle as up, down or flat
//! - [`grid`]: builds and recenters the volatility-spaced level set
//! - [`hybrid`]: combines both into per-candle entry and exit actions

pub mod grid;
pub mod hybrid;
pub mod trend;

pub use grid::{DownTrendPolicy, GridConfig, GridMode, GridReference, StaleLevels};
pub use hybrid::{HybridConfig, HybridSignalGenerator, TakeProfitRule};
pub use trend::TrendRule;
