//! Position sizing rules.

use gridtrend_core::error::ConfigError;
use gridtrend_core::types::to_money;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Lot sizes are truncated toward zero to this many decimal places.
pub const SIZE_DECIMALS: u32 = 8;

/// Position sizing method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum PositionSizingMethod {
    /// Fixed number of units per lot
    FixedUnits { units: Decimal },
    /// Fixed notional amount per lot
    FixedNotional { amount: Decimal },
    /// Percentage of current equity per lot
    PercentEquity { percent: Decimal },
}

impl Default for PositionSizingMethod {
    fn default() -> Self {
        PositionSizingMethod::PercentEquity {
            percent: Decimal::TEN,
        }
    }
}

impl PositionSizingMethod {
    /// Reject non-positive parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (field, value) = match self {
            PositionSizingMethod::FixedUnits { units } => ("strategy.sizing.units", *units),
            PositionSizingMethod::FixedNotional { amount } => ("strategy.sizing.amount", *amount),
            PositionSizingMethod::PercentEquity { percent } => {
                if *percent > Decimal::ONE_HUNDRED {
                    return Err(ConfigError::invalid(
                        "strategy.sizing.percent",
                        "must not exceed 100",
                    ));
                }
                ("strategy.sizing.percent", *percent)
            }
        };
        if value <= Decimal::ZERO {
            return Err(ConfigError::invalid(field, "must be positive"));
        }
        Ok(())
    }
}

/// Turns a sizing method into a lot size at a given entry price.
///
/// Percent-of-equity sizing uses the equity at entry time, so lot sizes
/// compound with performance over the run.
#[derive(Debug, Clone)]
pub struct PositionSizer {
    method: PositionSizingMethod,
}

impl PositionSizer {
    /// Create a new position sizer.
    pub fn new(method: PositionSizingMethod) -> Self {
        Self { method }
    }

    /// The configured sizing method.
    pub fn method(&self) -> &PositionSizingMethod {
        &self.method
    }

    /// Calculate lot size in units.
    ///
    /// Returns zero when the price is not positive or the result truncates to nothing.
    pub fn calculate(&self, equity: Decimal, entry_price: f64) -> Decimal {
        let price = to_money(entry_price);
        if price <= Decimal::ZERO {
            return Decimal::ZERO;
        }

        let size = match &self.method {
            PositionSizingMethod::FixedUnits { units } => *units,
            PositionSizingMethod::FixedNotional { amount } => *amount / price,
            PositionSizingMethod::PercentEquity { percent } => {
                let notional = equity.max(Decimal::ZERO) * (*percent / Decimal::ONE_HUNDRED);
                notional / price
            }
        };

        size.round_dp_with_strategy(SIZE_DECIMALS, RoundingStrategy::ToZero)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fixed_units() {
        let sizer = PositionSizer::new(PositionSizingMethod::FixedUnits { units: dec!(3) });
        assert_eq!(sizer.calculate(dec!(100000), 50.0), dec!(3));
    }

    #[test]
    fn test_fixed_notional() {
        let sizer = PositionSizer::new(PositionSizingMethod::FixedNotional {
            amount: dec!(1000),
        });
        assert_eq!(sizer.calculate(dec!(100000), 250.0), dec!(4));
    }

    #[test]
    fn test_percent_equity_uses_current_equity() {
        let sizer = PositionSizer::new(PositionSizingMethod::PercentEquity { percent: dec!(5) });
        // 5% of 100000 = 5000, at 100 per unit
        assert_eq!(sizer.calculate(dec!(100000), 100.0), dec!(50));
        // equity grew, so the lot grows with it
        assert_eq!(sizer.calculate(dec!(120000), 100.0), dec!(60));
    }

    #[test]
    fn test_size_truncates_toward_zero() {
        let sizer = PositionSizer::new(PositionSizingMethod::FixedNotional { amount: dec!(1) });
        // 1 / 3 = 0.333333333...
        assert_eq!(sizer.calculate(dec!(0), 3.0), dec!(0.33333333));
    }

    #[test]
    fn test_non_positive_price() {
        let sizer = PositionSizer::new(PositionSizingMethod::FixedUnits { units: dec!(1) });
        assert_eq!(sizer.calculate(dec!(1000), 0.0), Decimal::ZERO);
    }

    #[test]
    fn test_validate() {
        assert!(PositionSizingMethod::FixedUnits { units: dec!(0) }.validate().is_err());
        assert!(PositionSizingMethod::PercentEquity { percent: dec!(150) }
            .validate()
            .is_err());
        assert!(PositionSizingMethod::default().validate().is_ok());
    }

    #[test]
    fn test_deserialize_tagged() {
        let method: PositionSizingMethod =
            toml::from_str("method = \"fixed_notional\"\namount = 2500").unwrap();
        assert_eq!(
            method,
            PositionSizingMethod::FixedNotional {
                amount: dec!(2500)
            }
        );
    }
}
