//! Lot, trade and equity record types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Convert an f64 price into a Decimal for cash accounting.
///
/// Prices are validated finite by the feed, so the fallback never fires in a run.
pub fn to_money(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

/// Direction of a lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(&self) -> Decimal {
        match self {
            Side::Long => Decimal::ONE,
            Side::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

/// Why a lot was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Price reached the take-profit target
    TargetHit,
    /// The trend turned against the lot
    TrendReversal,
    /// Price reached the protective stop
    StopLoss,
    /// Force-closed at the last candle
    EndOfData,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::TargetHit => "target_hit",
            ExitReason::TrendReversal => "trend_reversal",
            ExitReason::StopLoss => "stop_loss",
            ExitReason::EndOfData => "end_of_data",
        };
        write!(f, "{}", s)
    }
}

/// An open position attributed to exactly one grid level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lot {
    /// Index of the level that opened this lot
    pub level: i32,
    pub side: Side,
    pub entry_price: f64,
    pub size: Decimal,
    pub entry_timestamp: i64,
    pub entry_candle_index: usize,
    /// Take-profit price
    pub target: f64,
    /// Protective stop, if any
    pub stop: Option<f64>,
}

impl Lot {
    /// Cash committed to this lot (entry notional).
    pub fn basis(&self) -> Decimal {
        to_money(self.entry_price) * self.size
    }

    /// Value of the lot at `price`.
    pub fn notional_at(&self, price: f64) -> Decimal {
        to_money(price) * self.size
    }

    /// Gross profit or loss if closed at `price`, before costs.
    pub fn unrealized_pnl(&self, price: f64) -> Decimal {
        (self.notional_at(price) - self.basis()) * self.side.sign()
    }

    /// Check if the target has been reached within a candle's range.
    pub fn target_reached(&self, high: f64, low: f64) -> bool {
        match self.side {
            Side::Long => high >= self.target,
            Side::Short => low <= self.target,
        }
    }

    /// Check if the stop has been reached within a candle's range.
    pub fn stop_reached(&self, high: f64, low: f64) -> bool {
        match (self.side, self.stop) {
            (Side::Long, Some(stop)) => low <= stop,
            (Side::Short, Some(stop)) => high >= stop,
            (_, None) => false,
        }
    }
}

/// A completed round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub level: i32,
    pub side: Side,
    pub entry_timestamp: i64,
    pub entry_price: f64,
    pub exit_timestamp: i64,
    pub exit_price: f64,
    pub size: Decimal,
    /// Net of transaction costs
    pub pnl: Decimal,
    /// Total fees paid on entry and exit
    pub fees: Decimal,
    pub exit_reason: ExitReason,
}

impl Trade {
    /// Build a trade from the lot it closes.
    pub fn from_lot(
        lot: &Lot,
        exit_timestamp: i64,
        exit_price: f64,
        pnl: Decimal,
        fees: Decimal,
        exit_reason: ExitReason,
    ) -> Self {
        Self {
            level: lot.level,
            side: lot.side,
            entry_timestamp: lot.entry_timestamp,
            entry_price: lot.entry_price,
            exit_timestamp,
            exit_price,
            size: lot.size,
            pnl,
            fees,
            exit_reason,
        }
    }

    /// Check if this trade made money after costs.
    pub fn is_win(&self) -> bool {
        self.pnl > Decimal::ZERO
    }

    /// Return on the entry notional, in percent.
    pub fn return_pct(&self) -> f64 {
        let basis = to_money(self.entry_price) * self.size;
        if basis.is_zero() {
            return 0.0;
        }
        let pct = self.pnl / basis * Decimal::ONE_HUNDRED;
        pct.to_string().parse::<f64>().unwrap_or(0.0)
    }
}

/// Account snapshot taken after a candle is fully processed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    /// Initial capital plus realized profit and loss
    pub cash: Decimal,
    pub unrealized_pnl: Decimal,
    pub equity: Decimal,
    /// Cash tied up in open lots
    pub committed: Decimal,
    pub open_lots: usize,
}
