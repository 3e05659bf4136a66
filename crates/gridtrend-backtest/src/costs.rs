//! Transaction cost models.

use gridtrend_core::error::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cost charged per fill.
///
/// Both legs of a round trip are charged when the lot closes: the entry
/// leg on the cost basis, the exit leg on the proceeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum TransactionCosts {
    /// Frictionless fills
    #[default]
    None,
    /// Fixed fee per fill
    Flat { fee: Decimal },
    /// Percentage of the fill's notional
    Percent { rate_pct: Decimal },
}

impl TransactionCosts {
    /// Fee for a single fill of the given notional.
    pub fn fee(&self, notional: Decimal) -> Decimal {
        match self {
            TransactionCosts::None => Decimal::ZERO,
            TransactionCosts::Flat { fee } => *fee,
            TransactionCosts::Percent { rate_pct } => {
                notional.abs() * *rate_pct / Decimal::ONE_HUNDRED
            }
        }
    }

    /// Validate the cost parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TransactionCosts::None => Ok(()),
            TransactionCosts::Flat { fee } if *fee < Decimal::ZERO => Err(ConfigError::invalid(
                "backtest.costs.fee",
                "must not be negative",
            )),
            TransactionCosts::Percent { rate_pct }
                if *rate_pct < Decimal::ZERO || *rate_pct >= Decimal::ONE_HUNDRED =>
            {
                Err(ConfigError::invalid(
                    "backtest.costs.rate_pct",
                    "must be in [0, 100)",
                ))
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_models() {
        assert_eq!(TransactionCosts::None.fee(dec!(1000)), dec!(0));
        assert_eq!(TransactionCosts::Flat { fee: dec!(1.5) }.fee(dec!(1000)), dec!(1.5));
        assert_eq!(
            TransactionCosts::Percent { rate_pct: dec!(0.1) }.fee(dec!(1000)),
            dec!(1)
        );
    }

    #[test]
    fn test_validate() {
        assert!(TransactionCosts::Flat { fee: dec!(-1) }.validate().is_err());
        assert!(TransactionCosts::Percent { rate_pct: dec!(100) }
            .validate()
            .is_err());
        assert!(TransactionCosts::Percent { rate_pct: dec!(0.04) }
            .validate()
            .is_ok());
    }
}
