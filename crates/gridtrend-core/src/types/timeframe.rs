//! Candle interval, used to annualize return statistics.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const SECS_PER_YEAR: f64 = 365.0 * 86_400.0;

/// Interval between consecutive candles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Timeframe {
    #[serde(rename = "1m")]
    Minute1,
    #[serde(rename = "5m")]
    Minute5,
    #[serde(rename = "15m")]
    Minute15,
    #[serde(rename = "30m")]
    Minute30,
    #[serde(rename = "1h")]
    #[default]
    Hour1,
    #[serde(rename = "4h")]
    Hour4,
    #[serde(rename = "1d")]
    Daily,
    #[serde(rename = "1w")]
    Weekly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 8] = [
        Timeframe::Minute1,
        Timeframe::Minute5,
        Timeframe::Minute15,
        Timeframe::Minute30,
        Timeframe::Hour1,
        Timeframe::Hour4,
        Timeframe::Daily,
        Timeframe::Weekly,
    ];

    /// Short label, identical to the configuration spelling.
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Minute1 => "1m",
            Timeframe::Minute5 => "5m",
            Timeframe::Minute15 => "15m",
            Timeframe::Minute30 => "30m",
            Timeframe::Hour1 => "1h",
            Timeframe::Hour4 => "4h",
            Timeframe::Daily => "1d",
            Timeframe::Weekly => "1w",
        }
    }

    /// Candle length in milliseconds, the unit of candle timestamps.
    pub fn as_millis(&self) -> i64 {
        let minutes = match self {
            Timeframe::Minute1 => 1,
            Timeframe::Minute5 => 5,
            Timeframe::Minute15 => 15,
            Timeframe::Minute30 => 30,
            Timeframe::Hour1 => 60,
            Timeframe::Hour4 => 240,
            Timeframe::Daily => 1_440,
            Timeframe::Weekly => 10_080,
        };
        minutes * 60_000
    }

    /// Number of candles in a year of continuous trading.
    ///
    /// Markets are assumed open around the clock, so an hourly feed has 8760 periods.
    pub fn periods_per_year(&self) -> f64 {
        SECS_PER_YEAR * 1000.0 / self.as_millis() as f64
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Timeframe::ALL
            .into_iter()
            .find(|tf| tf.label() == wanted)
            .ok_or_else(|| format!("unknown timeframe `{}`, expected one of 1m 5m 15m 30m 1h 4h 1d 1w", s))
    }
}
