//! Portfolio state owned by the engine.

use gridtrend_core::traits::PortfolioView;
use gridtrend_core::types::{to_money, EquityPoint, ExitReason, Grid, Lot, Trade};
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::costs::TransactionCosts;

/// Cash, open lots, closed trades and the equity curve of one run.
///
/// `cash` is the initial capital plus realized profit and loss. Cash tied up
/// in open lots is tracked separately as `committed`, so
/// `equity = cash + unrealized` holds at every mark.
#[derive(Debug, Clone)]
pub struct PortfolioState {
    initial_capital: Decimal,
    cash: Decimal,
    committed: Decimal,
    unrealized: Decimal,
    fees_paid: Decimal,
    lots: BTreeMap<i32, Lot>,
    grid: Option<Grid>,
    trades: Vec<Trade>,
    equity_curve: Vec<EquityPoint>,
}

impl PortfolioState {
    /// Create a portfolio holding only cash.
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            initial_capital,
            cash: initial_capital,
            committed: Decimal::ZERO,
            unrealized: Decimal::ZERO,
            fees_paid: Decimal::ZERO,
            lots: BTreeMap::new(),
            grid: None,
            trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn initial_capital(&self) -> Decimal {
        self.initial_capital
    }

    /// Cash tied up in open lots.
    pub fn committed(&self) -> Decimal {
        self.committed
    }

    /// Unrealized profit and loss as of the last mark.
    pub fn unrealized(&self) -> Decimal {
        self.unrealized
    }

    pub fn fees_paid(&self) -> Decimal {
        self.fees_paid
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity_curve(&self) -> &[EquityPoint] {
        &self.equity_curve
    }

    /// Revalue every open lot at `price`, in ascending level order.
    pub fn mark_to_market(&mut self, price: f64) {
        self.unrealized = self
            .lots
            .values()
            .fold(Decimal::ZERO, |acc, lot| acc + lot.unrealized_pnl(price));
    }

    /// Market value of every open lot at `price`, shorts counted as positive.
    pub fn exposure(&self, price: f64) -> Decimal {
        let price = to_money(price);
        self.lots.values().map(|lot| price * lot.size).sum()
    }

    /// Replace the grid.
    pub fn set_grid(&mut self, grid: Grid) {
        self.grid = Some(grid);
    }

    /// Add a lot and commit its basis. The caller checks the level is free.
    pub fn open_lot(&mut self, lot: Lot) {
        self.committed += lot.basis();
        self.lots.insert(lot.level, lot);
    }

    /// Close the lot at `level`, realizing its profit and loss.
    ///
    /// Accumulation order is fixed: entry basis, then exit proceeds, then
    /// both fee legs. Returns `None` if no lot is open at `level`.
    pub fn close_lot(
        &mut self,
        level: i32,
        exit_timestamp: i64,
        exit_price: f64,
        reason: ExitReason,
        costs: &TransactionCosts,
    ) -> Option<Trade> {
        let lot = self.lots.remove(&level)?;

        let basis = lot.basis();
        let proceeds = to_money(exit_price) * lot.size;
        let gross = (proceeds - basis) * lot.side.sign();
        let fees = costs.fee(basis) + costs.fee(proceeds);
        let pnl = gross - fees;

        self.cash += pnl;
        self.committed -= basis;
        self.fees_paid += fees;

        let trade = Trade::from_lot(&lot, exit_timestamp, exit_price, pnl, fees, reason);
        self.trades.push(trade.clone());
        Some(trade)
    }

    /// Append an equity point from the current marks.
    pub fn record_equity(&mut self, timestamp: i64) -> &EquityPoint {
        let point = EquityPoint {
            timestamp,
            cash: self.cash,
            unrealized_pnl: self.unrealized,
            equity: self.cash + self.unrealized,
            committed: self.committed,
            open_lots: self.lots.len(),
        };
        self.equity_curve.push(point);
        &self.equity_curve[self.equity_curve.len() - 1]
    }

    /// Split into the parts a report needs.
    pub(crate) fn into_parts(self) -> (Vec<Trade>, Vec<EquityPoint>, Vec<Lot>) {
        (
            self.trades,
            self.equity_curve,
            self.lots.into_values().collect(),
        )
    }
}

impl PortfolioView for PortfolioState {
    fn cash(&self) -> Decimal {
        self.cash
    }

    fn free_cash(&self) -> Decimal {
        self.cash - self.committed
    }

    fn equity(&self) -> Decimal {
        self.cash + self.unrealized
    }

    fn lots(&self) -> &BTreeMap<i32, Lot> {
        &self.lots
    }

    fn grid(&self) -> Option<&Grid> {
        self.grid.as_ref()
    }
}
