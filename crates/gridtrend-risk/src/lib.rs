//! Risk rules for grid lots.
//!
//! Provides position sizing and protective stop placement. Both are
//! evaluated once, when a lot is opened.

mod sizing;
mod stop_loss;

pub use sizing::{PositionSizer, PositionSizingMethod, SIZE_DECIMALS};
pub use stop_loss::StopLossMethod;
