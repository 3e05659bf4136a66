//! Trend filter.
//!
//! Classifies the market as up, down or flat from the trend indicator.
//! A flat market suppresses new grid entries.

use gridtrend_core::error::ConfigError;
use gridtrend_core::types::{Candle, IndicatorField, TrendState};
use serde::{Deserialize, Serialize};

/// Rule used to classify the trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum TrendRule {
    /// Compare the fast trend against the trend value.
    ///
    /// spread = (fast - trend) / trend * 100
    Crossover { min_spread_pct: f64 },
    /// Percentage change of the trend value over `lookback` candles.
    Slope { lookback: usize, min_slope_pct: f64 },
    /// Up when the close is above the trend and the fast average is above
    /// the slow one; down when both are below; flat otherwise.
    Regime,
}

impl Default for TrendRule {
    fn default() -> Self {
        TrendRule::Crossover {
            min_spread_pct: 0.1,
        }
    }
}

impl TrendRule {
    /// Classify the trend at the last candle of `history`.
    pub fn classify(&self, history: &[Candle]) -> TrendState {
        let Some(current) = history.last() else {
            return TrendState::Flat;
        };

        match self {
            TrendRule::Crossover { min_spread_pct } => {
                let Some(fast) = current.indicators.fast_trend else {
                    return TrendState::Flat;
                };
                percent_change(current.trend(), fast)
                    .map(|spread| threshold(spread, *min_spread_pct))
                    .unwrap_or(TrendState::Flat)
            }
            TrendRule::Slope {
                lookback,
                min_slope_pct,
            } => {
                if history.len() <= *lookback {
                    return TrendState::Flat;
                }
                let past = &history[history.len() - 1 - lookback];
                percent_change(past.trend(), current.trend())
                    .map(|slope| threshold(slope, *min_slope_pct))
                    .unwrap_or(TrendState::Flat)
            }
            TrendRule::Regime => {
                let ind = &current.indicators;
                let (Some(fast), Some(slow)) = (ind.fast_trend, ind.slow_trend) else {
                    return TrendState::Flat;
                };
                if current.close > ind.trend && fast > slow {
                    TrendState::Up
                } else if current.close < ind.trend && fast < slow {
                    TrendState::Down
                } else {
                    TrendState::Flat
                }
            }
        }
    }

    /// Candles needed before the rule can report anything other than flat.
    pub fn warmup_period(&self) -> usize {
        match self {
            TrendRule::Crossover { .. } | TrendRule::Regime => 1,
            TrendRule::Slope { lookback, .. } => lookback + 1,
        }
    }

    /// Validate thresholds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TrendRule::Crossover { min_spread_pct } => {
                if !min_spread_pct.is_finite() || *min_spread_pct < 0.0 {
                    return Err(ConfigError::invalid(
                        "strategy.trend.min_spread_pct",
                        "must be a non-negative number",
                    ));
                }
            }
            TrendRule::Slope {
                lookback,
                min_slope_pct,
            } => {
                if *lookback == 0 {
                    return Err(ConfigError::invalid(
                        "strategy.trend.lookback",
                        "must be at least 1",
                    ));
                }
                if !min_slope_pct.is_finite() || *min_slope_pct < 0.0 {
                    return Err(ConfigError::invalid(
                        "strategy.trend.min_slope_pct",
                        "must be a non-negative number",
                    ));
                }
            }
            TrendRule::Regime => {}
        }
        Ok(())
    }

    /// Optional indicators the rule reads on every candle.
    pub fn required_indicators(&self) -> Vec<IndicatorField> {
        match self {
            TrendRule::Crossover { .. } => vec![IndicatorField::FastTrend],
            TrendRule::Slope { .. } => Vec::new(),
            TrendRule::Regime => vec![IndicatorField::FastTrend, IndicatorField::SlowTrend],
        }
    }
}

fn percent_change(base: f64, value: f64) -> Option<f64> {
    if base > 0.0 && base.is_finite() && value.is_finite() {
        Some((value - base) / base * 100.0)
    } else {
        None
    }
}

fn threshold(value: f64, min: f64) -> TrendState {
    if value > min {
        TrendState::Up
    } else if value < -min {
        TrendState::Down
    } else {
        TrendState::Flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtrend_core::types::Indicators;

    fn candle(i: i64, trend: f64, fast: Option<f64>) -> Candle {
        let mut indicators = Indicators::new(trend, 1.0);
        indicators.fast_trend = fast;
        Candle::new(i * 3_600_000, 100.0, 101.0, 99.0, 100.0, 10.0, indicators)
    }

    #[test]
    fn test_crossover_classification() {
        let rule = TrendRule::Crossover {
            min_spread_pct: 0.5,
        };
        assert_eq!(rule.classify(&[candle(0, 100.0, Some(101.0))]), TrendState::Up);
        assert_eq!(rule.classify(&[candle(0, 100.0, Some(99.0))]), TrendState::Down);
        assert_eq!(
            rule.classify(&[candle(0, 100.0, Some(100.4))]),
            TrendState::Flat
        );
    }

    #[test]
    fn test_crossover_threshold_is_strict() {
        let rule = TrendRule::Crossover {
            min_spread_pct: 1.0,
        };
        assert_eq!(rule.classify(&[candle(0, 100.0, Some(101.0))]), TrendState::Flat);
    }

    #[test]
    fn test_crossover_without_fast_trend_is_flat() {
        let rule = TrendRule::default();
        assert_eq!(rule.classify(&[candle(0, 100.0, None)]), TrendState::Flat);
    }

    #[test]
    fn test_slope_classification() {
        let rule = TrendRule::Slope {
            lookback: 2,
            min_slope_pct: 1.0,
        };
        let rising = vec![
            candle(0, 100.0, None),
            candle(1, 101.0, None),
            candle(2, 102.0, None),
        ];
        let falling = vec![
            candle(0, 100.0, None),
            candle(1, 99.5, None),
            candle(2, 98.0, None),
        ];
        assert_eq!(rule.classify(&rising), TrendState::Up);
        assert_eq!(rule.classify(&falling), TrendState::Down);
    }

    #[test]
    fn test_slope_needs_history() {
        let rule = TrendRule::Slope {
            lookback: 3,
            min_slope_pct: 0.0,
        };
        let history = vec![candle(0, 100.0, None), candle(1, 200.0, None)];
        assert_eq!(rule.classify(&history), TrendState::Flat);
        assert_eq!(rule.warmup_period(), 4);
    }

    fn regime_candle(close: f64, fast: f64, slow: f64) -> Candle {
        let indicators = Indicators::new(100.0, 1.0)
            .with_fast_trend(fast)
            .with_slow_trend(slow);
        Candle::new(0, close, close, close, close, 10.0, indicators)
    }

    #[test]
    fn test_regime_needs_price_and_averages_to_agree() {
        let rule = TrendRule::Regime;
        assert_eq!(rule.classify(&[regime_candle(101.0, 102.0, 101.0)]), TrendState::Up);
        assert_eq!(rule.classify(&[regime_candle(99.0, 98.0, 99.0)]), TrendState::Down);
        // price above trend, averages bearish
        assert_eq!(rule.classify(&[regime_candle(101.0, 98.0, 99.0)]), TrendState::Flat);
        // price on the trend
        assert_eq!(rule.classify(&[regime_candle(100.0, 102.0, 101.0)]), TrendState::Flat);
    }

    #[test]
    fn test_regime_without_slow_trend_is_flat() {
        let c = candle(0, 90.0, Some(100.0));
        assert_eq!(TrendRule::Regime.classify(&[c]), TrendState::Flat);
    }

    #[test]
    fn test_required_indicators() {
        assert_eq!(
            TrendRule::default().required_indicators(),
            vec![IndicatorField::FastTrend]
        );
        assert!(TrendRule::Slope {
            lookback: 3,
            min_slope_pct: 0.1
        }
        .required_indicators()
        .is_empty());
        assert_eq!(
            TrendRule::Regime.required_indicators(),
            vec![IndicatorField::FastTrend, IndicatorField::SlowTrend]
        );
    }

    #[test]
    fn test_regime_parses_from_config() {
        let rule: TrendRule = toml::from_str("rule = \"regime\"").unwrap();
        assert_eq!(rule, TrendRule::Regime);
    }

    #[test]
    fn test_empty_history_is_flat() {
        assert_eq!(TrendRule::default().classify(&[]), TrendState::Flat);
    }

    #[test]
    fn test_validate() {
        assert!(TrendRule::default().validate().is_ok());
        assert!(TrendRule::Slope {
            lookback: 0,
            min_slope_pct: 0.1
        }
        .validate()
        .is_err());
        assert!(TrendRule::Crossover {
            min_spread_pct: -1.0
        }
        .validate()
        .is_err());
    }
}
