//! Indicator feed: validated, indicator-annotated candles.

use gridtrend_core::error::{ConfigError, DataError};
use gridtrend_core::traits::{Indicator, PriceSeries};
use gridtrend_core::types::{Candle, IndicatorField, Indicators, Timeframe};
use gridtrend_indicators::{Atr, Ema};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

use crate::csv_source::{CsvSource, CsvTable, RawRow};

/// Where candles come from and how their indicators are derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// CSV file with a header row
    pub path: PathBuf,
    /// Candle interval, used to annualize statistics
    pub timeframe: Timeframe,
    /// EMA period of the trend value
    pub trend_period: usize,
    /// EMA period of the fast trend value
    pub fast_period: usize,
    /// EMA period of the slow trend value
    pub slow_period: usize,
    /// ATR period of the volatility value
    pub atr_period: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/candles.csv"),
            timeframe: Timeframe::Hour1,
            trend_period: 100,
            fast_period: 20,
            slow_period: 50,
            atr_period: 14,
        }
    }
}

impl FeedConfig {
    /// Validate indicator periods.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, period) in [
            ("data.trend_period", self.trend_period),
            ("data.fast_period", self.fast_period),
            ("data.slow_period", self.slow_period),
            ("data.atr_period", self.atr_period),
        ] {
            if period == 0 {
                return Err(ConfigError::invalid(field, "must be at least 1"));
            }
        }
        if self.fast_period >= self.slow_period || self.slow_period > self.trend_period {
            warn!(
                fast = self.fast_period,
                slow = self.slow_period,
                trend = self.trend_period,
                "Moving average periods are not ordered fast < slow <= trend"
            );
        }
        Ok(())
    }

    /// Rows consumed before every computed indicator is defined.
    pub fn warmup_rows(&self) -> usize {
        self.trend_period
            .max(self.fast_period)
            .max(self.slow_period)
            .max(self.atr_period + 1)
    }
}

/// Load, validate and annotate candles from the configured CSV file.
///
/// `required` lists the optional indicators every candle must carry.
pub fn load_candles(
    config: &FeedConfig,
    required: &[IndicatorField],
) -> Result<Vec<Candle>, DataError> {
    let source = CsvSource::new(&config.path)?;
    let table = source.read()?;
    info!(
        path = %source.path().display(),
        rows = table.rows.len(),
        "Read candle file"
    );
    build_candles(table, config, required)
}

/// Turn parsed rows into candles, failing on the first invalid row.
pub fn build_candles(
    table: CsvTable,
    config: &FeedConfig,
    required: &[IndicatorField],
) -> Result<Vec<Candle>, DataError> {
    if table.rows.is_empty() {
        return Err(DataError::NoDataAvailable);
    }

    validate_rows(&table.rows)?;

    let gaps = count_gaps(&table.rows, config.timeframe);
    if gaps > 0 {
        warn!(
            gaps,
            timeframe = %config.timeframe,
            "Candle spacing differs from the configured timeframe"
        );
    }

    let annotated = if table.has_indicators() {
        from_columns(&table.rows)?
    } else {
        compute_indicators(&table.rows, config)?
    };

    for (line, candle) in &annotated {
        validate_indicators(*line, candle)?;
        for field in required {
            if candle.indicators.get(*field).is_none() {
                return Err(DataError::MissingField {
                    row: *line,
                    field: field.column().to_string(),
                });
            }
        }
    }

    let candles: Vec<Candle> = annotated.into_iter().map(|(_, c)| c).collect();
    if let (Some(first), Some(last)) = (candles.first(), candles.last()) {
        info!(
            candles = candles.len(),
            from = %first.datetime(),
            to = %last.datetime(),
            "Candle feed ready"
        );
    }
    Ok(candles)
}

/// Check ordering and OHLCV sanity of every row.
pub fn validate_rows(rows: &[RawRow]) -> Result<(), DataError> {
    let mut previous: Option<i64> = None;

    for row in rows {
        if let Some(prev) = previous {
            if row.timestamp == prev {
                return Err(DataError::DuplicateTimestamp {
                    row: row.line,
                    timestamp: row.timestamp,
                });
            }
            if row.timestamp < prev {
                return Err(DataError::OutOfOrder {
                    row: row.line,
                    previous: prev,
                    current: row.timestamp,
                });
            }
        }
        previous = Some(row.timestamp);

        for (name, value) in [
            ("open", row.open),
            ("high", row.high),
            ("low", row.low),
            ("close", row.close),
            ("volume", row.volume),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(row.line, format!("{} must be positive, got {}", name, value)));
            }
        }

        if row.high < row.open.max(row.close) {
            return Err(invalid(row.line, "high is below open or close".to_string()));
        }
        if row.low > row.open.min(row.close) {
            return Err(invalid(row.line, "low is above open or close".to_string()));
        }
    }

    Ok(())
}

/// Number of consecutive rows whose spacing is not one timeframe.
pub fn count_gaps(rows: &[RawRow], timeframe: Timeframe) -> usize {
    let step = timeframe.as_millis();
    rows.windows(2)
        .filter(|pair| pair[1].timestamp - pair[0].timestamp != step)
        .count()
}

fn validate_indicators(line: usize, candle: &Candle) -> Result<(), DataError> {
    let ind = &candle.indicators;
    if !ind.trend.is_finite() || ind.trend <= 0.0 {
        return Err(invalid(line, format!("trend must be positive, got {}", ind.trend)));
    }
    for field in [IndicatorField::FastTrend, IndicatorField::SlowTrend] {
        if let Some(value) = ind.get(field) {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(
                    line,
                    format!("{} must be positive, got {}", field.column(), value),
                ));
            }
        }
    }
    if !ind.volatility.is_finite() || ind.volatility < 0.0 {
        return Err(invalid(
            line,
            format!("volatility must not be negative, got {}", ind.volatility),
        ));
    }
    Ok(())
}

fn from_columns(rows: &[RawRow]) -> Result<Vec<(usize, Candle)>, DataError> {
    rows.iter()
        .map(|row| {
            let missing = |field: &str| DataError::MissingField {
                row: row.line,
                field: field.to_string(),
            };
            let trend = row.trend.ok_or_else(|| missing("trend"))?;
            let volatility = row.volatility.ok_or_else(|| missing("volatility"))?;
            let indicators = Indicators {
                trend,
                fast_trend: row.fast_trend,
                slow_trend: row.slow_trend,
                volatility,
            };
            Ok((row.line, candle(row, indicators)))
        })
        .collect()
}

fn compute_indicators(
    rows: &[RawRow],
    config: &FeedConfig,
) -> Result<Vec<(usize, Candle)>, DataError> {
    let invalid_param = |e: gridtrend_core::error::IndicatorError| DataError::Parse(e.to_string());
    let trend_ema = Ema::new(config.trend_period).map_err(invalid_param)?;
    let fast_ema = Ema::new(config.fast_period).map_err(invalid_param)?;
    let slow_ema = Ema::new(config.slow_period).map_err(invalid_param)?;
    let atr = Atr::new(config.atr_period).map_err(invalid_param)?;

    let required = config.warmup_rows();
    if rows.len() < required {
        return Err(DataError::InsufficientHistory {
            required,
            available: rows.len(),
        });
    }

    let close: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let high: Vec<f64> = rows.iter().map(|r| r.high).collect();
    let low: Vec<f64> = rows.iter().map(|r| r.low).collect();

    let series = PriceSeries::new(&high, &low, &close);

    let trend = trend_ema.compute(series);
    let fast = fast_ema.compute(series);
    let slow = slow_ema.compute(series);
    let volatility = atr.compute(series);

    let candles: Vec<(usize, Candle)> = rows
        .iter()
        .enumerate()
        .filter_map(|(i, row)| {
            let indicators = Indicators {
                trend: trend[i]?,
                fast_trend: Some(fast[i]?),
                slow_trend: Some(slow[i]?),
                volatility: volatility[i]?,
            };
            Some((row.line, candle(row, indicators)))
        })
        .collect();

    info!(
        warmup = rows.len() - candles.len(),
        trend_period = config.trend_period,
        fast_period = config.fast_period,
        slow_period = config.slow_period,
        atr_period = config.atr_period,
        "Computed indicators"
    );
    Ok(candles)
}

fn candle(row: &RawRow, indicators: Indicators) -> Candle {
    Candle::new(
        row.timestamp,
        row.open,
        row.high,
        row.low,
        row.close,
        row.volume,
        indicators,
    )
}

fn invalid(row: usize, reason: String) -> DataError {
    DataError::InvalidRow { row, reason }
}
