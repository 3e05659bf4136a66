//! Read-only view of the account handed to signal generators.

use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::types::{Grid, Lot};

/// What a generator may observe about the account.
///
/// Generators never mutate the portfolio; all changes flow back through
/// the actions of a [`Decision`](crate::types::Decision).
pub trait PortfolioView {
    /// Initial capital plus realized profit and loss.
    fn cash(&self) -> Decimal;

    /// Cash not committed to open lots.
    fn free_cash(&self) -> Decimal;

    /// Cash plus unrealized profit and loss as of the last mark.
    fn equity(&self) -> Decimal;

    /// Open lots keyed by level index.
    fn lots(&self) -> &BTreeMap<i32, Lot>;

    /// Current grid, if one has been generated.
    fn grid(&self) -> Option<&Grid>;

    /// Check whether a level currently holds a lot.
    fn is_filled(&self, level: i32) -> bool {
        self.lots().contains_key(&level)
    }
}
