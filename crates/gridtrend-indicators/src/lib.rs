//! Trend and volatility indicators.
//!
//! The candle feed annotates each candle with:
//! - exponential moving averages of closes (trend, fast and slow trend)
//! - the average true range (volatility), smoothed with Wilder's method
//!
//! Both implement [`gridtrend_core::traits::Indicator`], so output index
//! `i` always belongs to input point `i`.

pub mod moving_average;
pub mod volatility;

pub use moving_average::Ema;
pub use volatility::Atr;
