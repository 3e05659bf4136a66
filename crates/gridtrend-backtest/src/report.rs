//! Backtest report generation.

use chrono::{DateTime, SecondsFormat};
use gridtrend_core::error::{GridError, GridResult};
use gridtrend_core::types::{EquityPoint, Lot, Trade};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::info;

use crate::engine::{BacktestConfig, Depletion, Rejection};
use crate::portfolio::PortfolioState;
use crate::statistics::{RunStatistics, RunSummaryInput};

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Signal generator name
    pub strategy: String,
    /// Configuration used
    pub config: BacktestConfig,
    /// Statistics
    pub stats: RunStatistics,
    /// Equity after the termination policy was applied
    pub final_equity: Decimal,
    /// Close of the last processed candle
    pub last_close: Option<f64>,
    /// Closed trades in close order
    pub trades: Vec<Trade>,
    /// One point per processed candle
    pub equity_curve: Vec<EquityPoint>,
    /// Lots left open under `leave_open`
    pub open_lots: Vec<Lot>,
    /// Opens the engine refused
    pub rejections: Vec<Rejection>,
    /// Set when the account ran out of money before the candles did
    pub depletion: Option<Depletion>,
}

const TRADE_HEADER: [&str; 10] = [
    "level",
    "side",
    "entry_time",
    "entry_price",
    "exit_time",
    "exit_price",
    "size",
    "pnl",
    "fees",
    "exit_reason",
];

const EQUITY_HEADER: [&str; 6] = [
    "time",
    "cash",
    "unrealized_pnl",
    "equity",
    "committed",
    "open_lots",
];

const OPEN_LOT_HEADER: [&str; 8] = [
    "level",
    "side",
    "entry_time",
    "entry_price",
    "size",
    "target",
    "stop",
    "unrealized_pnl",
];

#[derive(Serialize)]
struct TradeRow<'a> {
    level: i32,
    side: String,
    entry_time: String,
    entry_price: f64,
    exit_time: String,
    exit_price: f64,
    size: &'a Decimal,
    pnl: &'a Decimal,
    fees: &'a Decimal,
    exit_reason: String,
}

#[derive(Serialize)]
struct EquityRow<'a> {
    time: String,
    cash: &'a Decimal,
    unrealized_pnl: &'a Decimal,
    equity: &'a Decimal,
    committed: &'a Decimal,
    open_lots: usize,
}

#[derive(Serialize)]
struct OpenLotRow<'a> {
    level: i32,
    side: String,
    entry_time: String,
    entry_price: f64,
    size: &'a Decimal,
    target: f64,
    stop: Option<f64>,
    unrealized_pnl: Decimal,
}

impl BacktestReport {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        strategy: String,
        config: BacktestConfig,
        portfolio: PortfolioState,
        rejections: Vec<Rejection>,
        regrids: usize,
        candles_processed: usize,
        final_equity: Decimal,
        last_close: Option<f64>,
        depletion: Option<Depletion>,
    ) -> Self {
        let (trades, equity_curve, open_lots) = portfolio.into_parts();
        let open_pnl = last_close
            .map(|price| {
                open_lots
                    .iter()
                    .fold(Decimal::ZERO, |acc, lot| acc + lot.unrealized_pnl(price))
            })
            .unwrap_or(Decimal::ZERO);

        let stats = RunStatistics::compute(RunSummaryInput {
            initial_capital: config.initial_capital,
            final_equity,
            trades: &trades,
            equity_curve: &equity_curve,
            open_pnl,
            open_lots: open_lots.len(),
            rejected_opens: rejections.len(),
            candles_processed,
            regrids,
            timeframe: config.timeframe,
            termination_policy: config.on_finish,
        });

        Self {
            strategy,
            config,
            stats,
            final_equity,
            last_close,
            trades,
            equity_curve,
            open_lots,
            rejections,
            depletion,
        }
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let stats = &self.stats;
        let mut s = String::new();

        s.push_str("═══════════════════════════════════════════════════════════\n");
        s.push_str("                     BACKTEST REPORT                        \n");
        s.push_str("═══════════════════════════════════════════════════════════\n\n");
        s.push_str(&format!("  Strategy:            {}\n\n", self.strategy));

        s.push_str("PERFORMANCE\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Initial Capital:     ${:.2}\n",
            stats.initial_capital
        ));
        s.push_str(&format!("  Final Equity:        ${:.2}\n", stats.final_equity));
        s.push_str(&format!("  Realized P&L:        ${:.2}\n", stats.realized_pnl));
        s.push_str(&format!("  Open P&L:            ${:.2}\n", stats.open_pnl));
        s.push_str(&format!(
            "  Total Return:        {:.2}%\n",
            stats.total_return_pct
        ));
        s.push_str(&format!(
            "  Max Drawdown:        ${:.2} ({:.2}%)\n",
            stats.max_drawdown, stats.max_drawdown_pct
        ));
        s.push('\n');

        s.push_str("RISK METRICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Sharpe Ratio:        {:.2}\n", stats.sharpe_ratio));
        s.push_str(&format!("  Sortino Ratio:       {:.2}\n", stats.sortino_ratio));
        s.push_str(&format!("  Profit Factor:       {:.2}\n", stats.profit_factor));
        s.push('\n');

        s.push_str("TRADE STATISTICS\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!("  Total Trades:        {}\n", stats.total_trades));
        s.push_str(&format!("  Winning Trades:      {}\n", stats.winning_trades));
        s.push_str(&format!("  Losing Trades:       {}\n", stats.losing_trades));
        s.push_str(&format!("  Win Rate:            {:.2}%\n", stats.win_rate_pct));
        s.push_str(&format!("  Avg Win:             ${:.2}\n", stats.avg_win));
        s.push_str(&format!("  Avg Loss:            ${:.2}\n", stats.avg_loss));
        s.push_str(&format!("  Fees Paid:           ${:.2}\n", stats.fees_paid));
        s.push('\n');

        s.push_str("EXECUTION\n");
        s.push_str("───────────────────────────────────────────────────────────\n");
        s.push_str(&format!(
            "  Candles Processed:   {}\n",
            stats.candles_processed
        ));
        s.push_str(&format!("  Grids Generated:     {}\n", stats.regrids));
        s.push_str(&format!("  Rejected Opens:      {}\n", stats.rejected_opens));
        s.push_str(&format!("  Open Lots:           {}\n", stats.open_lots));
        s.push_str(&format!(
            "  On Finish:           {}\n",
            stats.termination_policy
        ));
        if let Some(d) = &self.depletion {
            s.push_str(&format!(
                "  Depleted:            candle {} (equity ${:.2})\n",
                d.candle_index, d.equity
            ));
        }
        s.push('\n');

        s.push_str("═══════════════════════════════════════════════════════════\n");

        s
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the trade ledger as CSV.
    pub fn write_trades<W: io::Write>(&self, writer: W) -> GridResult<()> {
        let mut wtr = headed_writer(writer, &TRADE_HEADER)?;
        for t in &self.trades {
            wtr.serialize(TradeRow {
                level: t.level,
                side: t.side.to_string(),
                entry_time: format_timestamp(t.entry_timestamp),
                entry_price: t.entry_price,
                exit_time: format_timestamp(t.exit_timestamp),
                exit_price: t.exit_price,
                size: &t.size,
                pnl: &t.pnl,
                fees: &t.fees,
                exit_reason: t.exit_reason.to_string(),
            })
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write the equity curve as CSV.
    pub fn write_equity_curve<W: io::Write>(&self, writer: W) -> GridResult<()> {
        let mut wtr = headed_writer(writer, &EQUITY_HEADER)?;
        for p in &self.equity_curve {
            wtr.serialize(EquityRow {
                time: format_timestamp(p.timestamp),
                cash: &p.cash,
                unrealized_pnl: &p.unrealized_pnl,
                equity: &p.equity,
                committed: &p.committed,
                open_lots: p.open_lots,
            })
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write lots left open, valued at the last processed close.
    pub fn write_open_lots<W: io::Write>(&self, writer: W) -> GridResult<()> {
        let mut wtr = headed_writer(writer, &OPEN_LOT_HEADER)?;
        for lot in &self.open_lots {
            wtr.serialize(OpenLotRow {
                level: lot.level,
                side: lot.side.to_string(),
                entry_time: format_timestamp(lot.entry_timestamp),
                entry_price: lot.entry_price,
                size: &lot.size,
                target: lot.target,
                stop: lot.stop,
                unrealized_pnl: self
                    .last_close
                    .map(|price| lot.unrealized_pnl(price))
                    .unwrap_or(Decimal::ZERO),
            })
            .map_err(csv_error)?;
        }
        wtr.flush()?;
        Ok(())
    }

    /// Write every artifact into `dir`, creating it if needed.
    pub fn save(&self, dir: &Path) -> GridResult<()> {
        fs::create_dir_all(dir)?;
        self.write_trades(File::create(dir.join("trades.csv"))?)?;
        self.write_equity_curve(File::create(dir.join("equity_curve.csv"))?)?;
        self.write_open_lots(File::create(dir.join("open_lots.csv"))?)?;

        let json = self
            .to_json()
            .map_err(|e| GridError::Serialization(e.to_string()))?;
        fs::write(dir.join("summary.json"), json)?;

        info!(dir = %dir.display(), "Report written");
        Ok(())
    }
}

fn format_timestamp(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Secs, true))
        .unwrap_or_else(|| millis.to_string())
}

/// A CSV writer that has already written `header`, so empty files still carry one.
fn headed_writer<W: io::Write>(writer: W, header: &[&str]) -> GridResult<csv::Writer<W>> {
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(header).map_err(csv_error)?;
    Ok(wtr)
}

fn csv_error(e: csv::Error) -> GridError {
    GridError::Serialization(e.to_string())
}
