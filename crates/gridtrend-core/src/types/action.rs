//! Signal generator output types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{ExitReason, Grid, Side};

/// Classified market direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendState {
    Up,
    Down,
    /// No clear direction; entries are suppressed
    #[default]
    Flat,
}

impl fmt::Display for TrendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrendState::Up => write!(f, "up"),
            TrendState::Down => write!(f, "down"),
            TrendState::Flat => write!(f, "flat"),
        }
    }
}

/// An instruction emitted by a signal generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Open a lot at a grid level.
    OpenLot {
        level: i32,
        side: Side,
        price: f64,
        size: Decimal,
        target: f64,
        stop: Option<f64>,
    },
    /// Close the lot held at a grid level.
    CloseLot {
        level: i32,
        price: f64,
        reason: ExitReason,
    },
}

impl Action {
    /// Level index the action refers to.
    pub fn level(&self) -> i32 {
        match self {
            Action::OpenLot { level, .. } | Action::CloseLot { level, .. } => *level,
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, Action::OpenLot { .. })
    }
}

/// Everything a generator decided for one candle.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Decision {
    pub trend: TrendState,
    /// Replacement grid, when the level set was (re)generated this candle
    pub regrid: Option<Grid>,
    pub actions: Vec<Action>,
}

impl Decision {
    /// A decision that does nothing.
    pub fn hold(trend: TrendState) -> Self {
        Self {
            trend,
            regrid: None,
            actions: Vec::new(),
        }
    }

    pub fn opens(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| a.is_open())
    }

    pub fn closes(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter().filter(|a| !a.is_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decision_partitions_actions() {
        let decision = Decision {
            trend: TrendState::Up,
            regrid: None,
            actions: vec![
                Action::CloseLot {
                    level: -2,
                    price: 100.0,
                    reason: ExitReason::TargetHit,
                },
                Action::OpenLot {
                    level: -1,
                    side: Side::Long,
                    price: 95.0,
                    size: dec!(1),
                    target: 100.0,
                    stop: None,
                },
            ],
        };

        let opens: Vec<i32> = decision.opens().map(Action::level).collect();
        let closes: Vec<i32> = decision.closes().map(Action::level).collect();
        assert_eq!(opens, vec![-1]);
        assert_eq!(closes, vec![-2]);
    }

    #[test]
    fn test_hold_is_empty() {
        let decision = Decision::hold(TrendState::Flat);
        assert!(decision.actions.is_empty());
        assert!(decision.regrid.is_none());
        assert_eq!(TrendState::default(), TrendState::Flat);
    }
}
