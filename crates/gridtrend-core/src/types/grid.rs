//! Grid level types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A price threshold identified by its integer offset from the grid origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridLevel {
    /// Offset index (negative below the origin, positive above)
    pub index: i32,
    /// Trigger price
    pub price: f64,
}

/// The armed level set around a reference price.
///
/// Levels present in `levels` are armed. Whether a level is filled is not
/// stored here: a level is filled while the portfolio holds a lot under its index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grid {
    /// Reference price the level set was generated around
    pub origin: f64,
    /// Distance between adjacent levels
    pub spacing: f64,
    /// Timestamp of the candle that generated this grid
    pub generated_at: i64,
    levels: BTreeMap<i32, GridLevel>,
}

impl Grid {
    /// Create an empty grid.
    pub fn new(origin: f64, spacing: f64, generated_at: i64) -> Self {
        Self {
            origin,
            spacing,
            generated_at,
            levels: BTreeMap::new(),
        }
    }

    /// Arm a level, replacing any level at the same index.
    pub fn arm(&mut self, level: GridLevel) {
        self.levels.insert(level.index, level);
    }

    /// Get the level at an index.
    pub fn level(&self, index: i32) -> Option<&GridLevel> {
        self.levels.get(&index)
    }

    /// Check whether a level is armed at an index.
    pub fn is_armed(&self, index: i32) -> bool {
        self.levels.contains_key(&index)
    }

    /// Iterate levels in ascending index order.
    pub fn levels(&self) -> impl Iterator<Item = &GridLevel> {
        self.levels.values()
    }

    /// Levels below the origin, nearest first.
    pub fn levels_below(&self) -> impl Iterator<Item = &GridLevel> {
        self.levels.range(..0).rev().map(|(_, level)| level)
    }

    /// Levels above the origin, nearest first.
    pub fn levels_above(&self) -> impl Iterator<Item = &GridLevel> {
        self.levels.range(1..).map(|(_, level)| level)
    }

    /// Number of armed levels.
    pub fn len(&self) -> usize {
        self.levels.len()
    }

    /// Check if no level is armed.
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Distance of `reference` from the origin, in spacings.
    pub fn drift(&self, reference: f64) -> f64 {
        if self.spacing > 0.0 {
            (reference - self.origin).abs() / self.spacing
        } else {
            0.0
        }
    }
}
