//! Candle feed for the backtester.
//!
//! Reads a CSV file, validates every row and annotates candles with the
//! trend and volatility indicators the signal generator consumes.

mod csv_source;
mod feed;

pub use csv_source::{parse_timestamp, CsvSource, CsvTable, RawRow};
pub use feed::{build_candles, count_gaps, load_candles, validate_rows, FeedConfig};
