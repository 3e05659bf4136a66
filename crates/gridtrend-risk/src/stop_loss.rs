//! Stop-loss placement.

use gridtrend_core::error::ConfigError;
use gridtrend_core::types::Side;
use serde::{Deserialize, Serialize};

/// Stop-loss calculation method.
///
/// The stop is fixed when the lot opens and never trails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum StopLossMethod {
    /// No protective stop
    #[default]
    None,
    /// A multiple of the volatility at entry
    VolatilityMultiple { multiple: f64 },
    /// A percentage of the entry price
    Percent { percent: f64 },
}

impl StopLossMethod {
    /// Calculate the stop price for a new lot.
    ///
    /// Returns `None` when no stop applies or the computed long stop would not be positive.
    pub fn stop_price(&self, entry_price: f64, side: Side, volatility: f64) -> Option<f64> {
        let offset = match self {
            StopLossMethod::None => return None,
            StopLossMethod::VolatilityMultiple { multiple } => volatility * multiple,
            StopLossMethod::Percent { percent } => entry_price * percent / 100.0,
        };

        let stop = match side {
            Side::Long => entry_price - offset,
            Side::Short => entry_price + offset,
        };

        (stop > 0.0).then_some(stop)
    }

    /// Reject non-positive or non-finite distances.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (field, value) = match self {
            StopLossMethod::None => return Ok(()),
            StopLossMethod::VolatilityMultiple { multiple } => {
                ("strategy.stop_loss.multiple", *multiple)
            }
            StopLossMethod::Percent { percent } => {
                if *percent >= 100.0 {
                    return Err(ConfigError::invalid(
                        "strategy.stop_loss.percent",
                        "must be below 100",
                    ));
                }
                ("strategy.stop_loss.percent", *percent)
            }
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::invalid(field, "must be a positive number"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_stop() {
        let method = StopLossMethod::Percent { percent: 5.0 };
        assert_eq!(method.stop_price(100.0, Side::Long, 3.0), Some(95.0));
        assert_eq!(method.stop_price(100.0, Side::Short, 3.0), Some(105.0));
    }

    #[test]
    fn test_volatility_stop() {
        let method = StopLossMethod::VolatilityMultiple { multiple: 2.0 };
        assert_eq!(method.stop_price(100.0, Side::Long, 5.0), Some(90.0));
        assert_eq!(method.stop_price(100.0, Side::Short, 5.0), Some(110.0));
    }

    #[test]
    fn test_no_stop() {
        assert_eq!(StopLossMethod::None.stop_price(100.0, Side::Long, 5.0), None);
    }

    #[test]
    fn test_long_stop_below_zero_is_dropped() {
        let method = StopLossMethod::VolatilityMultiple { multiple: 10.0 };
        assert_eq!(method.stop_price(20.0, Side::Long, 5.0), None);
    }

    #[test]
    fn test_validate() {
        assert!(StopLossMethod::None.validate().is_ok());
        assert!(StopLossMethod::Percent { percent: 0.0 }.validate().is_err());
        assert!(StopLossMethod::Percent { percent: 100.0 }.validate().is_err());
        assert!(StopLossMethod::VolatilityMultiple { multiple: f64::NAN }
            .validate()
            .is_err());
    }

    #[test]
    fn test_deserialize_tagged() {
        let method: StopLossMethod =
            toml::from_str("method = \"volatility_multiple\"\nmultiple = 3.0").unwrap();
        assert_eq!(method, StopLossMethod::VolatilityMultiple { multiple: 3.0 });
    }
}
