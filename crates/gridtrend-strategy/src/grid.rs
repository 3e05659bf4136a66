//! Grid construction and recentering.

use gridtrend_core::error::ConfigError;
use gridtrend_core::types::{Candle, Grid, GridLevel};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Price the grid is centered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridReference {
    /// The candle's trend indicator value
    #[default]
    Trend,
    /// The candle's close
    Close,
}

/// When the level set is regenerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum GridMode {
    /// Built once, on the first candle with a usable spacing
    Static,
    /// Rebuilt whenever the reference drifts more than one spacing from the origin
    #[default]
    Recentering,
}

/// What recentering does with armed levels that fall outside the new window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StaleLevels {
    /// Drop them; only the new window is armed
    #[default]
    Cancel,
    /// Keep them armed at their original price until triggered
    KeepArmed,
}

/// Grid behavior while the trend is down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DownTrendPolicy {
    /// Arm short entries above the reference
    Mirror,
    /// No entries while the trend is down
    #[default]
    Disabled,
}

/// Grid configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// Spacing as a multiple of the candle's volatility
    pub spacing_multiplier: f64,
    /// Lower bound on spacing, as a percentage of the reference
    pub min_spacing_pct: Option<f64>,
    /// Upper bound on spacing, as a percentage of the reference
    pub max_spacing_pct: Option<f64>,
    pub reference: GridReference,
    /// Number of levels armed below the reference
    pub levels_below: u32,
    /// Number of levels armed above the reference
    pub levels_above: u32,
    pub mode: GridMode,
    pub stale_levels: StaleLevels,
    pub down_trend: DownTrendPolicy,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            spacing_multiplier: 2.5,
            min_spacing_pct: None,
            max_spacing_pct: None,
            reference: GridReference::Trend,
            levels_below: 5,
            levels_above: 5,
            mode: GridMode::Recentering,
            stale_levels: StaleLevels::Cancel,
            down_trend: DownTrendPolicy::Disabled,
        }
    }
}

impl GridConfig {
    /// Validate the grid configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.spacing_multiplier.is_finite() || self.spacing_multiplier <= 0.0 {
            return Err(ConfigError::invalid(
                "strategy.grid.spacing_multiplier",
                "must be a positive number",
            ));
        }
        for (field, bound) in [
            ("strategy.grid.min_spacing_pct", self.min_spacing_pct),
            ("strategy.grid.max_spacing_pct", self.max_spacing_pct),
        ] {
            if let Some(pct) = bound {
                if !pct.is_finite() || pct <= 0.0 {
                    return Err(ConfigError::invalid(field, "must be a positive number"));
                }
            }
        }
        if let (Some(min), Some(max)) = (self.min_spacing_pct, self.max_spacing_pct) {
            if min > max {
                return Err(ConfigError::invalid(
                    "strategy.grid.min_spacing_pct",
                    "must not exceed max_spacing_pct",
                ));
            }
        }
        if self.levels_below == 0 && self.levels_above == 0 {
            return Err(ConfigError::invalid(
                "strategy.grid.levels_below",
                "at least one level must be armed",
            ));
        }
        Ok(())
    }

    /// Reference price of a candle.
    pub fn reference_price(&self, candle: &Candle) -> f64 {
        match self.reference {
            GridReference::Trend => candle.trend(),
            GridReference::Close => candle.close,
        }
    }

    /// Spacing derived from the candle's volatility, clamped to the configured bounds.
    ///
    /// Returns `None` when no usable spacing exists (zero volatility and no lower bound).
    pub fn spacing(&self, candle: &Candle) -> Option<f64> {
        let reference = self.reference_price(candle);
        let mut spacing = candle.volatility() * self.spacing_multiplier;
        if let Some(min_pct) = self.min_spacing_pct {
            spacing = spacing.max(reference * min_pct / 100.0);
        }
        if let Some(max_pct) = self.max_spacing_pct {
            spacing = spacing.min(reference * max_pct / 100.0);
        }
        (spacing.is_finite() && spacing > 0.0).then_some(spacing)
    }

    /// Build a fresh level set around the candle's reference price.
    pub fn build(&self, candle: &Candle) -> Option<Grid> {
        let origin = self.reference_price(candle);
        let spacing = self.spacing(candle)?;
        if !origin.is_finite() || origin <= 0.0 {
            return None;
        }

        let mut grid = Grid::new(origin, spacing, candle.timestamp);
        for index in self.window() {
            let price = origin + index as f64 * spacing;
            if price > 0.0 {
                grid.arm(GridLevel { index, price });
            }
        }
        Some(grid)
    }

    /// Decide whether the level set must be (re)generated on this candle.
    ///
    /// Returns the replacement grid, or `None` when the current grid stays.
    pub fn regrid(&self, current: Option<&Grid>, candle: &Candle) -> Option<Grid> {
        let Some(current) = current else {
            return self.build(candle);
        };

        if self.mode == GridMode::Static {
            return None;
        }

        let reference = self.reference_price(candle);
        if current.drift(reference) <= 1.0 {
            return None;
        }

        let mut grid = self.build(candle)?;
        if self.stale_levels == StaleLevels::KeepArmed {
            self.carry_stale_levels(current, &mut grid);
        }

        debug!(
            old_origin = current.origin,
            new_origin = grid.origin,
            spacing = grid.spacing,
            levels = grid.len(),
            "Grid recentered"
        );
        Some(grid)
    }

    /// Keep old armed levels whose price lies outside the new window.
    ///
    /// Each is re-indexed against the new origin and spacing; the first
    /// level to claim an index wins.
    fn carry_stale_levels(&self, old: &Grid, new: &mut Grid) {
        let below = -(self.levels_below as i64);
        let above = self.levels_above as i64;

        for level in old.levels() {
            let offset = ((level.price - new.origin) / new.spacing).round();
            if !offset.is_finite() {
                continue;
            }
            let index = offset as i64;
            if (below..=above).contains(&index) {
                continue;
            }
            let Ok(index) = i32::try_from(index) else {
                continue;
            };
            if !new.is_armed(index) {
                new.arm(GridLevel {
                    index,
                    price: level.price,
                });
            }
        }
    }

    fn window(&self) -> impl Iterator<Item = i32> {
        let below = -(self.levels_below as i32);
        let above = self.levels_above as i32;
        (below..=above).filter(|index| *index != 0)
    }
}
