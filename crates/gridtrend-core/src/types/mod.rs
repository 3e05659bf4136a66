//! Core data types for the grid backtester.

mod action;
mod candle;
mod grid;
mod lot;
mod timeframe;

pub use action::{Action, Decision, TrendState};
pub use candle::{Candle, IndicatorField, Indicators};
pub use grid::{Grid, GridLevel};
pub use lot::{to_money, EquityPoint, ExitReason, Lot, Side, Trade};
pub use timeframe::Timeframe;
