//! Signal generator trait definitions.

use crate::error::ConfigError;
use crate::traits::PortfolioView;
use crate::types::{Candle, Decision, IndicatorField};

/// Configuration trait for signal generators.
pub trait StrategyConfig: Send + Sync + Clone + 'static {
    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError>;
}

/// Turns candle history and account state into a per-candle decision.
///
/// Implementations hold only configuration. Grid and lot state live in the
/// portfolio, so the same candles and portfolio always yield the same decision.
pub trait SignalGenerator {
    /// Get the name of this generator.
    fn name(&self) -> &str;

    /// Decide what to do on the last candle of `history`.
    ///
    /// `history` is never empty and ends with the candle being processed.
    fn evaluate(&self, history: &[Candle], portfolio: &dyn PortfolioView) -> Decision;

    /// Number of candles needed before the trend can be classified.
    fn warmup_period(&self) -> usize {
        1
    }

    /// Optional indicators every candle must carry for this generator.
    fn required_indicators(&self) -> Vec<IndicatorField> {
        Vec::new()
    }
}
