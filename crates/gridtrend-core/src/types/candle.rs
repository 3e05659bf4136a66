//! Candle (OHLCV plus indicators) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Indicator values attached to a candle by the feed.
///
/// The core never recomputes these; it only reads them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    /// Trend value (long moving average), also the default grid reference
    pub trend: f64,
    /// Fast moving average, required by the crossover and regime trend rules
    pub fast_trend: Option<f64>,
    /// Slow moving average, required by the regime trend rule
    #[serde(default)]
    pub slow_trend: Option<f64>,
    /// Volatility in price units (ATR)
    pub volatility: f64,
}

impl Indicators {
    /// Create indicators without a fast trend value.
    pub fn new(trend: f64, volatility: f64) -> Self {
        Self {
            trend,
            fast_trend: None,
            slow_trend: None,
            volatility,
        }
    }

    /// Attach a fast trend value.
    pub fn with_fast_trend(mut self, fast_trend: f64) -> Self {
        self.fast_trend = Some(fast_trend);
        self
    }

    pub fn with_slow_trend(mut self, slow_trend: f64) -> Self {
        self.slow_trend = Some(slow_trend);
        self
    }

    /// Value of an optional indicator, if the feed supplied it.
    pub fn get(&self, field: IndicatorField) -> Option<f64> {
        match field {
            IndicatorField::FastTrend => self.fast_trend,
            IndicatorField::SlowTrend => self.slow_trend,
        }
    }
}

/// Indicator columns that only some trend rules read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndicatorField {
    FastTrend,
    SlowTrend,
}

impl IndicatorField {
    /// Canonical CSV column name.
    pub fn column(&self) -> &'static str {
        match self {
            IndicatorField::FastTrend => "fast_trend",
            IndicatorField::SlowTrend => "slow_trend",
        }
    }
}

/// One candle of the input sequence.
///
/// Candles are produced once by the feed and shared read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
    /// Precomputed indicators
    pub indicators: Indicators,
}

impl Candle {
    /// Create a new candle.
    pub fn new(
        timestamp: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        indicators: Indicators,
    ) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
            indicators,
        }
    }

    /// Trend indicator value.
    #[inline]
    pub fn trend(&self) -> f64 {
        self.indicators.trend
    }

    /// Volatility indicator value.
    #[inline]
    pub fn volatility(&self) -> f64 {
        self.indicators.volatility
    }

    /// Timestamp as UTC time; out-of-range values map to the epoch.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle() -> Candle {
        Candle::new(
            1000,
            100.0,
            110.0,
            95.0,
            105.0,
            1_000.0,
            Indicators::new(102.0, 4.0).with_fast_trend(104.0),
        )
    }

    #[test]
    fn test_candle_accessors() {
        let c = candle();
        assert_eq!(c.trend(), 102.0);
        assert_eq!(c.volatility(), 4.0);
        assert_eq!(c.indicators.fast_trend, Some(104.0));
    }

    #[test]
    fn test_optional_indicator_lookup() {
        let ind = Indicators::new(100.0, 2.0).with_slow_trend(98.0);
        assert_eq!(ind.get(IndicatorField::FastTrend), None);
        assert_eq!(ind.get(IndicatorField::SlowTrend), Some(98.0));
        assert_eq!(IndicatorField::SlowTrend.column(), "slow_trend");
    }

    #[test]
    fn test_candle_datetime() {
        let c = Candle {
            timestamp: 86_400_000,
            ..candle()
        };
        assert_eq!(c.datetime().to_rfc3339(), "1970-01-02T00:00:00+00:00");
    }
}
