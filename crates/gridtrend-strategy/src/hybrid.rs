//! Hybrid trend-following grid signal generator.
//!
//! The trend filter decides which side of the grid may trade; the grid
//! decides where. Each call is a pure function of the candle history and
//! the portfolio view: grid state lives in the portfolio and changes only
//! through [`Decision::regrid`].

use gridtrend_core::error::ConfigError;
use gridtrend_core::traits::{PortfolioView, SignalGenerator, StrategyConfig};
use gridtrend_core::types::{
    Action, Candle, Decision, ExitReason, Grid, GridLevel, IndicatorField, Lot, Side, TrendState,
};
use gridtrend_risk::{PositionSizer, PositionSizingMethod, StopLossMethod};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::grid::{DownTrendPolicy, GridConfig};
use crate::trend::TrendRule;

/// Take-profit distance for new lots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TakeProfitRule {
    /// One grid spacing in the lot's favor
    #[default]
    NextLevel,
    /// A multiple of the volatility at entry
    VolatilityMultiple { multiple: f64 },
    /// A percentage of the entry price
    Percent { percent: f64 },
}

impl TakeProfitRule {
    /// Target price for a lot entered at `price`.
    pub fn target(&self, price: f64, side: Side, spacing: f64, volatility: f64) -> f64 {
        let distance = match self {
            TakeProfitRule::NextLevel => spacing,
            TakeProfitRule::VolatilityMultiple { multiple } => volatility * multiple,
            TakeProfitRule::Percent { percent } => price * percent / 100.0,
        };
        match side {
            Side::Long => price + distance,
            Side::Short => price - distance,
        }
    }

    /// Validate the take-profit distance.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let (field, value) = match self {
            TakeProfitRule::NextLevel => return Ok(()),
            TakeProfitRule::VolatilityMultiple { multiple } => {
                ("strategy.take_profit.multiple", *multiple)
            }
            TakeProfitRule::Percent { percent } => {
                if *percent >= 100.0 {
                    return Err(ConfigError::invalid(
                        "strategy.take_profit.percent",
                        "must be below 100",
                    ));
                }
                ("strategy.take_profit.percent", *percent)
            }
        };
        if !value.is_finite() || value <= 0.0 {
            return Err(ConfigError::invalid(field, "must be a positive number"));
        }
        Ok(())
    }
}

/// Configuration for the hybrid generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HybridConfig {
    pub trend: TrendRule,
    pub grid: GridConfig,
    pub take_profit: TakeProfitRule,
    pub stop_loss: StopLossMethod,
    pub sizing: PositionSizingMethod,
}

impl StrategyConfig for HybridConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.trend.validate()?;
        self.grid.validate()?;
        self.take_profit.validate()?;
        self.stop_loss.validate()?;
        self.sizing.validate()?;
        Ok(())
    }
}

/// Hybrid trend + grid signal generator.
#[derive(Debug, Clone)]
pub struct HybridSignalGenerator {
    config: HybridConfig,
    sizer: PositionSizer,
}

impl HybridSignalGenerator {
    /// Create a generator from a validated configuration.
    pub fn new(config: HybridConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let sizer = PositionSizer::new(config.sizing.clone());
        Ok(Self { config, sizer })
    }

    pub fn config(&self) -> &HybridConfig {
        &self.config
    }

    /// First matching exit rule for a lot: target, then trend reversal, then stop.
    fn exit_for(&self, lot: &Lot, candle: &Candle, trend: TrendState) -> Option<(f64, ExitReason)> {
        if lot.target_reached(candle.high, candle.low) {
            return Some((lot.target, ExitReason::TargetHit));
        }

        let reversed = matches!(
            (lot.side, trend),
            (Side::Long, TrendState::Down) | (Side::Short, TrendState::Up)
        );
        if reversed {
            return Some((candle.close, ExitReason::TrendReversal));
        }

        if lot.stop_reached(candle.high, candle.low) {
            let stop = lot.stop?;
            // A gap through the stop fills at the open.
            let price = match lot.side {
                Side::Long => stop.min(candle.open),
                Side::Short => stop.max(candle.open),
            };
            return Some((price, ExitReason::StopLoss));
        }

        None
    }

    fn entry_side(&self, trend: TrendState) -> Option<Side> {
        match trend {
            TrendState::Up => Some(Side::Long),
            TrendState::Down if self.config.grid.down_trend == DownTrendPolicy::Mirror => {
                Some(Side::Short)
            }
            _ => None,
        }
    }

    fn open_action(
        &self,
        level: &GridLevel,
        side: Side,
        grid: &Grid,
        candle: &Candle,
        portfolio: &dyn PortfolioView,
    ) -> Option<Action> {
        let target = self.config.take_profit.target(
            level.price,
            side,
            grid.spacing,
            candle.volatility(),
        );
        if !target.is_finite() || target <= 0.0 {
            trace!(level = level.index, target, "Skipping level with unusable target");
            return None;
        }
        let stop = self
            .config
            .stop_loss
            .stop_price(level.price, side, candle.volatility());
        let size = self.sizer.calculate(portfolio.equity(), level.price);

        Some(Action::OpenLot {
            level: level.index,
            side,
            price: level.price,
            size,
            target,
            stop,
        })
    }
}

impl SignalGenerator for HybridSignalGenerator {
    fn name(&self) -> &str {
        "Hybrid Trend Grid"
    }

    fn evaluate(&self, history: &[Candle], portfolio: &dyn PortfolioView) -> Decision {
        let Some(candle) = history.last() else {
            return Decision::default();
        };

        let trend = self.config.trend.classify(history);
        let regrid = self.config.grid.regrid(portfolio.grid(), candle);
        let mut actions = Vec::new();

        for lot in portfolio.lots().values() {
            if let Some((price, reason)) = self.exit_for(lot, candle, trend) {
                actions.push(Action::CloseLot {
                    level: lot.level,
                    price,
                    reason,
                });
            }
        }

        let grid = regrid.as_ref().or(portfolio.grid());
        if let (Some(grid), Some(side)) = (grid, self.entry_side(trend)) {
            let candidates: Box<dyn Iterator<Item = &GridLevel>> = match side {
                Side::Long => Box::new(grid.levels_below()),
                Side::Short => Box::new(grid.levels_above()),
            };
            for level in candidates {
                let triggered = match side {
                    Side::Long => candle.low <= level.price,
                    Side::Short => candle.high >= level.price,
                };
                if !triggered || portfolio.is_filled(level.index) {
                    continue;
                }
                if let Some(action) = self.open_action(level, side, grid, candle, portfolio) {
                    actions.push(action);
                }
            }
        }

        Decision {
            trend,
            regrid,
            actions,
        }
    }

    fn warmup_period(&self) -> usize {
        self.config.trend.warmup_period()
    }

    fn required_indicators(&self) -> Vec<IndicatorField> {
        self.config.trend.required_indicators()
    }
}
