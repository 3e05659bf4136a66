//! Error types for the grid backtester.

use thiserror::Error;

/// Top-level error.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    #[error("Indicator error: {0}")]
    Indicator(#[from] IndicatorError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Configuration errors. A run never starts with an invalid configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for `{field}`: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Failed to load configuration: {0}")]
    Load(String),
}

impl ConfigError {
    /// Shorthand for an invalid field.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Data ingestion errors.
///
/// Row numbers are line numbers in the source file: the header is line 1,
/// the first data row is line 2.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("No data available")]
    NoDataAvailable,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Row {row}: missing required field `{field}`")]
    MissingField { row: usize, field: String },

    #[error("Row {row}: {reason}")]
    InvalidRow { row: usize, reason: String },

    #[error("Row {row}: timestamp {current} is earlier than previous timestamp {previous}")]
    OutOfOrder { row: usize, previous: i64, current: i64 },

    #[error("Row {row}: duplicate timestamp {timestamp}")]
    DuplicateTimestamp { row: usize, timestamp: i64 },

    #[error("Candle {candle_index}: indicator `{field}` is required by the trend rule but missing")]
    MissingIndicator { candle_index: usize, field: String },

    #[error("Insufficient history: need {required} rows, have {available}")]
    InsufficientHistory { required: usize, available: usize },
}

/// Engine faults. These indicate a logic defect, never a market condition.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Invariant violated at candle {candle_index}: {invariant}")]
    InvariantViolation { candle_index: usize, invariant: String },

    #[error("Candle feed is empty: a run requires at least one candle")]
    EmptyFeed,

    #[error("Run has not finished: {processed} of {total} candles processed")]
    NotFinished { processed: usize, total: usize },
}

impl EngineError {
    /// Shorthand for an invariant violation.
    pub fn invariant(candle_index: usize, invariant: impl Into<String>) -> Self {
        Self::InvariantViolation {
            candle_index,
            invariant: invariant.into(),
        }
    }
}

/// Indicator calculation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IndicatorError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type alias for backtester operations.
pub type GridResult<T> = Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invariant_message_names_candle() {
        let err = EngineError::invariant(7, "negative free cash");
        assert_eq!(
            err.to_string(),
            "Invariant violated at candle 7: negative free cash"
        );
    }

    #[test]
    fn test_data_error_identifies_row() {
        let err = DataError::DuplicateTimestamp {
            row: 12,
            timestamp: 1000,
        };
        assert!(err.to_string().starts_with("Row 12"));

        let wrapped: GridError = err.into();
        assert!(matches!(wrapped, GridError::Data(_)));
    }
}
