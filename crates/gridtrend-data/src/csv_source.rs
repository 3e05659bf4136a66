//! CSV candle source.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use csv::{ReaderBuilder, StringRecord};
use gridtrend_core::error::DataError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

const REQUIRED_COLUMNS: [&str; 6] = ["timestamp", "open", "high", "low", "close", "volume"];

/// CSV record format, after header normalization.
#[derive(Debug, Deserialize)]
struct CsvRecord {
    timestamp: Option<String>,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
    #[serde(default)]
    trend: Option<f64>,
    #[serde(default)]
    fast_trend: Option<f64>,
    #[serde(default)]
    slow_trend: Option<f64>,
    #[serde(default)]
    volatility: Option<f64>,
}

/// One parsed data row, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// Line number in the file (header is line 1)
    pub line: usize,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub trend: Option<f64>,
    pub fast_trend: Option<f64>,
    pub slow_trend: Option<f64>,
    pub volatility: Option<f64>,
}

/// Rows read from a CSV file, plus which indicator columns its header carried.
#[derive(Debug, Clone, Default)]
pub struct CsvTable {
    pub rows: Vec<RawRow>,
    pub has_trend: bool,
    pub has_fast_trend: bool,
    pub has_slow_trend: bool,
    pub has_volatility: bool,
}

impl CsvTable {
    /// The file carries every indicator the core needs.
    pub fn has_indicators(&self) -> bool {
        self.has_trend && self.has_volatility
    }
}

/// CSV data source for historical candles.
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Create a new CSV source.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::NoDataAvailable);
        }
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read every row of the file.
    pub fn read(&self) -> Result<CsvTable, DataError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)
            .map_err(|e| DataError::Parse(e.to_string()))?;
        read_table(reader)
    }
}

/// Read rows from any CSV reader whose first line is a header.
pub(crate) fn read_table<R: std::io::Read>(
    mut reader: csv::Reader<R>,
) -> Result<CsvTable, DataError> {
    let raw_headers = reader
        .headers()
        .map_err(|e| DataError::Parse(e.to_string()))?
        .clone();
    let headers = normalize_headers(&raw_headers);
    debug!(columns = ?headers, "Normalized CSV header");

    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            return Err(DataError::MissingField {
                row: 1,
                field: column.to_string(),
            });
        }
    }

    let mut table = CsvTable {
        rows: Vec::new(),
        has_trend: headers.iter().any(|h| h == "trend"),
        has_fast_trend: headers.iter().any(|h| h == "fast_trend"),
        has_slow_trend: headers.iter().any(|h| h == "slow_trend"),
        has_volatility: headers.iter().any(|h| h == "volatility"),
    };

    for (i, result) in reader.records().enumerate() {
        let record = result.map_err(|e| DataError::Parse(e.to_string()))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(i + 2);

        let parsed: CsvRecord = record
            .deserialize(Some(&headers))
            .map_err(|e| DataError::InvalidRow {
                row: line,
                reason: e.to_string(),
            })?;

        table.rows.push(into_row(parsed, line)?);
    }

    Ok(table)
}

fn into_row(record: CsvRecord, line: usize) -> Result<RawRow, DataError> {
    let missing = |field: &str| DataError::MissingField {
        row: line,
        field: field.to_string(),
    };

    let date = record
        .timestamp
        .filter(|s| !s.is_empty())
        .ok_or_else(|| missing("timestamp"))?;
    let timestamp = parse_timestamp(&date).ok_or_else(|| DataError::InvalidRow {
        row: line,
        reason: format!("could not parse timestamp `{}`", date),
    })?;

    Ok(RawRow {
        line,
        timestamp,
        open: record.open.ok_or_else(|| missing("open"))?,
        high: record.high.ok_or_else(|| missing("high"))?,
        low: record.low.ok_or_else(|| missing("low"))?,
        close: record.close.ok_or_else(|| missing("close"))?,
        volume: record.volume.ok_or_else(|| missing("volume"))?,
        trend: record.trend,
        fast_trend: record.fast_trend,
        slow_trend: record.slow_trend,
        volatility: record.volatility,
    })
}

/// Map header names onto the canonical column set.
///
/// Matching is case-insensitive. An alias is only applied when its
/// canonical column is not already present.
fn normalize_headers(raw: &StringRecord) -> StringRecord {
    let lowered: Vec<String> = raw
        .iter()
        .map(|h| h.trim().to_lowercase().replace([' ', '-'], "_"))
        .collect();

    let canonical: Vec<String> = lowered
        .iter()
        .map(|h| {
            let target = match h.as_str() {
                "date" | "datetime" | "time" | "open_time" => "timestamp",
                "adj_close" => "close",
                "volume_btc" | "vol" => "volume",
                "ema_trend" => "trend",
                "ema_fast" => "fast_trend",
                "ema_slow" => "slow_trend",
                "atr" => "volatility",
                other => other,
            };
            if target != h && lowered.iter().any(|existing| existing == target) {
                h.clone()
            } else {
                target.to_string()
            }
        })
        .collect();

    StringRecord::from(canonical)
}

/// Parse various timestamp formats into Unix milliseconds.
pub fn parse_timestamp(date_str: &str) -> Option<i64> {
    let date_str = date_str.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(date_str) {
        return Some(dt.timestamp_millis());
    }
    if let Ok(dt) = DateTime::parse_from_str(date_str, "%Y-%m-%d %H:%M:%S%:z") {
        return Some(dt.timestamp_millis());
    }

    let formats = [
        "%Y-%m-%d",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d",
        "%m/%d/%Y",
        "%d-%m-%Y",
    ];

    for format in formats {
        if let Ok(dt) = NaiveDateTime::parse_from_str(date_str, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
        if let Ok(d) = NaiveDate::parse_from_str(date_str, format) {
            return Some(d.and_time(NaiveTime::MIN).and_utc().timestamp_millis());
        }
    }

    // Unix timestamp: milliseconds if more than 10 digits, else seconds
    if let Ok(ts) = date_str.parse::<i64>() {
        return Some(if ts > 10_000_000_000 { ts } else { ts * 1000 });
    }

    None
}
