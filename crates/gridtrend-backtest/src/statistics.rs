//! Run statistics.

use gridtrend_core::types::{EquityPoint, Timeframe, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::TerminationPolicy;

/// Summary statistics of a finished run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Equity after the termination policy was applied
    pub final_equity: Decimal,
    /// Sum of realized trade P&L
    pub realized_pnl: Decimal,
    /// Unrealized P&L of lots left open
    pub open_pnl: Decimal,
    /// Total return percentage
    pub total_return_pct: Decimal,
    /// Largest peak-to-trough equity decline
    pub max_drawdown: Decimal,
    /// Largest peak-to-trough decline as a percentage of the peak
    pub max_drawdown_pct: Decimal,
    /// Annualized Sharpe ratio (risk-free rate of 0)
    pub sharpe_ratio: f64,
    /// Annualized Sortino ratio
    pub sortino_ratio: f64,
    /// Closed trades
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    /// Win rate percentage
    pub win_rate_pct: Decimal,
    /// Average profit per winning trade
    pub avg_win: Decimal,
    /// Average loss per losing trade, as a positive amount
    pub avg_loss: Decimal,
    /// Gross profit / gross loss, zero without losses
    pub profit_factor: Decimal,
    /// Fees charged over the run
    pub fees_paid: Decimal,
    /// Opens the engine refused
    pub rejected_opens: usize,
    /// Lots still open at the end
    pub open_lots: usize,
    pub candles_processed: usize,
    /// Number of times a grid was generated
    pub regrids: usize,
    pub termination_policy: TerminationPolicy,
}

/// Everything statistics are computed from.
#[derive(Debug, Clone, Copy)]
pub struct RunSummaryInput<'a> {
    pub initial_capital: Decimal,
    pub final_equity: Decimal,
    pub trades: &'a [Trade],
    pub equity_curve: &'a [EquityPoint],
    pub open_pnl: Decimal,
    pub open_lots: usize,
    pub rejected_opens: usize,
    pub candles_processed: usize,
    pub regrids: usize,
    pub timeframe: Timeframe,
    pub termination_policy: TerminationPolicy,
}

impl RunStatistics {
    /// Compute statistics for a finished run.
    pub fn compute(input: RunSummaryInput<'_>) -> Self {
        let mut winning_trades = 0;
        let mut losing_trades = 0;
        let mut gross_profit = Decimal::ZERO;
        let mut gross_loss = Decimal::ZERO;
        let mut realized_pnl = Decimal::ZERO;
        let mut fees_paid = Decimal::ZERO;

        for trade in input.trades {
            realized_pnl += trade.pnl;
            fees_paid += trade.fees;
            if trade.pnl > Decimal::ZERO {
                winning_trades += 1;
                gross_profit += trade.pnl;
            } else if trade.pnl < Decimal::ZERO {
                losing_trades += 1;
                gross_loss += trade.pnl.abs();
            }
        }

        let total_trades = input.trades.len();
        let win_rate_pct = if total_trades > 0 {
            Decimal::from(winning_trades * 100) / Decimal::from(total_trades)
        } else {
            Decimal::ZERO
        };
        let avg_win = if winning_trades > 0 {
            gross_profit / Decimal::from(winning_trades)
        } else {
            Decimal::ZERO
        };
        let avg_loss = if losing_trades > 0 {
            gross_loss / Decimal::from(losing_trades)
        } else {
            Decimal::ZERO
        };
        let profit_factor = if gross_loss > Decimal::ZERO {
            gross_profit / gross_loss
        } else {
            Decimal::ZERO
        };

        let total_return_pct = if input.initial_capital > Decimal::ZERO {
            (input.final_equity - input.initial_capital) / input.initial_capital
                * Decimal::ONE_HUNDRED
        } else {
            Decimal::ZERO
        };

        let (max_drawdown, max_drawdown_pct) =
            max_drawdown(input.initial_capital, input.equity_curve);
        let returns = period_returns(input.initial_capital, input.equity_curve);
        let periods = input.timeframe.periods_per_year();

        Self {
            initial_capital: input.initial_capital,
            final_equity: input.final_equity,
            realized_pnl,
            open_pnl: input.open_pnl,
            total_return_pct,
            max_drawdown,
            max_drawdown_pct,
            sharpe_ratio: sharpe_ratio(&returns, periods),
            sortino_ratio: sortino_ratio(&returns, periods),
            total_trades,
            winning_trades,
            losing_trades,
            win_rate_pct,
            avg_win,
            avg_loss,
            profit_factor,
            fees_paid,
            rejected_opens: input.rejected_opens,
            open_lots: input.open_lots,
            candles_processed: input.candles_processed,
            regrids: input.regrids,
            termination_policy: input.termination_policy,
        }
    }
}

/// Peak-based drawdown over the equity curve, starting from the initial capital.
fn max_drawdown(initial_capital: Decimal, curve: &[EquityPoint]) -> (Decimal, Decimal) {
    let mut peak = initial_capital;
    let mut worst = Decimal::ZERO;
    let mut worst_pct = Decimal::ZERO;

    for point in curve {
        if point.equity > peak {
            peak = point.equity;
        }
        let drawdown = peak - point.equity;
        if drawdown > worst {
            worst = drawdown;
        }
        if peak > Decimal::ZERO {
            let pct = drawdown / peak * Decimal::ONE_HUNDRED;
            if pct > worst_pct {
                worst_pct = pct;
            }
        }
    }

    (worst, worst_pct)
}

/// Per-candle simple returns of equity.
fn period_returns(initial_capital: Decimal, curve: &[EquityPoint]) -> Vec<f64> {
    let mut previous = initial_capital;
    let mut returns = Vec::with_capacity(curve.len());
    for point in curve {
        if previous > Decimal::ZERO {
            let ret = ((point.equity - previous) / previous)
                .to_string()
                .parse::<f64>()
                .unwrap_or(0.0);
            returns.push(ret);
        }
        previous = point.equity;
    }
    returns
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean = mean(returns);
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / returns.len() as f64;
    let std_dev = variance.sqrt();
    if std_dev > 0.0 {
        mean * periods_per_year.sqrt() / std_dev
    } else {
        0.0
    }
}

fn sortino_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let mean = mean(returns);
    let downside: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();
    if downside.is_empty() {
        return 0.0;
    }
    let downside_dev = (downside.iter().map(|r| r.powi(2)).sum::<f64>() / downside.len() as f64).sqrt();
    if downside_dev > 0.0 {
        mean * periods_per_year.sqrt() / downside_dev
    } else {
        0.0
    }
}
