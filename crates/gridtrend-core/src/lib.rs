//! Core types and traits for the grid backtester.
//!
//! This crate provides the foundational building blocks including:
//! - Market data types (Candle, Indicators, Timeframe)
//! - Grid, lot, trade and equity-curve types
//! - Actions and decisions exchanged between the signal generator and the engine
//! - Core traits for indicators, signal generators and portfolio views

pub mod types;
pub mod traits;
pub mod error;

pub use error::{GridError, GridResult};
pub use types::*;
pub use traits::*;
