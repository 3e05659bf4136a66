//! Backtesting engine.
//!
//! A single-pass state machine over the candle sequence. Each step marks
//! open lots, asks the signal generator for a decision, applies opens and
//! then closes, and appends exactly one equity point.

use gridtrend_core::error::{ConfigError, DataError, EngineError};
use gridtrend_core::traits::{PortfolioView, SignalGenerator};
use gridtrend_core::types::{to_money, Action, Candle, ExitReason, Lot, Timeframe};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, warn};

use crate::costs::TransactionCosts;
use crate::portfolio::PortfolioState;
use crate::report::BacktestReport;

/// What happens to lots still open when the candles run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationPolicy {
    /// Close every open lot at the last close, reason `EndOfData`
    ForceClose,
    /// Leave lots open; they are reported separately and excluded from realized P&L
    LeaveOpen,
}

impl fmt::Display for TerminationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationPolicy::ForceClose => write!(f, "force_close"),
            TerminationPolicy::LeaveOpen => write!(f, "leave_open"),
        }
    }
}

/// Backtest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    /// Initial capital
    pub initial_capital: Decimal,
    /// Cost charged per fill
    pub costs: TransactionCosts,
    /// Policy for lots open at the end of the run
    pub on_finish: TerminationPolicy,
    /// Candle interval, used to annualize statistics
    pub timeframe: Timeframe,
    /// Refuse opens while open lots are worth this percentage of equity or more
    #[serde(default)]
    pub max_exposure_pct: Option<Decimal>,
}

impl BacktestConfig {
    /// Create a configuration. The termination policy has no default.
    pub fn new(initial_capital: Decimal, on_finish: TerminationPolicy) -> Self {
        Self {
            initial_capital,
            costs: TransactionCosts::None,
            on_finish,
            timeframe: Timeframe::default(),
            max_exposure_pct: None,
        }
    }

    pub fn with_costs(mut self, costs: TransactionCosts) -> Self {
        self.costs = costs;
        self
    }

    pub fn with_timeframe(mut self, timeframe: Timeframe) -> Self {
        self.timeframe = timeframe;
        self
    }

    pub fn with_max_exposure(mut self, pct: Decimal) -> Self {
        self.max_exposure_pct = Some(pct);
        self
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_capital <= Decimal::ZERO {
            return Err(ConfigError::invalid(
                "backtest.initial_capital",
                "must be positive",
            ));
        }
        if let Some(pct) = self.max_exposure_pct {
            if pct <= Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
                return Err(ConfigError::invalid(
                    "backtest.max_exposure_pct",
                    "must be in (0, 100]",
                ));
            }
        }
        self.costs.validate()
    }
}

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Running,
    Finished,
}

/// Why an open was not applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    /// The level already holds a lot
    LevelFilled,
    /// Free cash does not cover notional plus the entry fee
    InsufficientCash { required: Decimal, available: Decimal },
    /// The sizing rule produced no units
    ZeroSize,
    /// Open lots are already worth `max_exposure_pct` of equity or more
    ExposureCap {
        exposure: Decimal,
        equity: Decimal,
        cap_pct: Decimal,
    },
    /// Lots opened on the last candle of a `force_close` run would close immediately
    FinalCandle,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::LevelFilled => write!(f, "level already filled"),
            RejectReason::InsufficientCash {
                required,
                available,
            } => write!(
                f,
                "insufficient cash: required {}, available {}",
                required, available
            ),
            RejectReason::ZeroSize => write!(f, "size rounds to zero"),
            RejectReason::ExposureCap {
                exposure,
                equity,
                cap_pct,
            } => write!(
                f,
                "exposure {} is at or above {}% of equity {}",
                exposure, cap_pct, equity
            ),
            RejectReason::FinalCandle => write!(f, "last candle of a force-close run"),
        }
    }
}

/// A rejected open. Expected market behavior, not a fault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub candle_index: usize,
    pub timestamp: i64,
    pub level: i32,
    pub reason: RejectReason,
}

/// The account ran out of money and the run stopped at `candle_index`.
///
/// A market outcome, not a fault: a short can lose more than its basis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Depletion {
    pub candle_index: usize,
    pub timestamp: i64,
    pub equity: Decimal,
    pub free_cash: Decimal,
}

/// Backtesting engine.
pub struct BacktestEngine<'a, S: SignalGenerator> {
    config: BacktestConfig,
    generator: S,
    candles: &'a [Candle],
    cursor: usize,
    phase: RunPhase,
    portfolio: PortfolioState,
    rejections: Vec<Rejection>,
    regrids: usize,
    depletion: Option<Depletion>,
    final_equity: Decimal,
}

impl<'a, S: SignalGenerator> BacktestEngine<'a, S> {
    /// Create a new backtest engine over a validated candle sequence.
    pub fn new(
        config: BacktestConfig,
        generator: S,
        candles: &'a [Candle],
    ) -> Result<Self, gridtrend_core::GridError> {
        config.validate()?;
        if candles.is_empty() {
            return Err(EngineError::EmptyFeed.into());
        }
        for field in generator.required_indicators() {
            if let Some(candle_index) = candles
                .iter()
                .position(|c| c.indicators.get(field).is_none())
            {
                return Err(DataError::MissingIndicator {
                    candle_index,
                    field: field.column().to_string(),
                }
                .into());
            }
        }

        let portfolio = PortfolioState::new(config.initial_capital);
        let final_equity = config.initial_capital;
        Ok(Self {
            config,
            generator,
            candles,
            cursor: 0,
            phase: RunPhase::Running,
            portfolio,
            rejections: Vec::new(),
            regrids: 0,
            depletion: None,
            final_equity,
        })
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Number of candles fully processed.
    pub fn processed(&self) -> usize {
        self.cursor
    }

    pub fn portfolio(&self) -> &PortfolioState {
        &self.portfolio
    }

    pub fn rejections(&self) -> &[Rejection] {
        &self.rejections
    }

    /// Set when the run stopped because the account was depleted.
    pub fn depletion(&self) -> Option<&Depletion> {
        self.depletion.as_ref()
    }

    /// Run until the candles are exhausted.
    pub fn run(&mut self) -> Result<(), EngineError> {
        info!(
            generator = self.generator.name(),
            candles = self.candles.len(),
            capital = %self.config.initial_capital,
            on_finish = %self.config.on_finish,
            "Starting backtest"
        );
        while self.step()? == RunPhase::Running {}
        Ok(())
    }

    /// Process exactly one candle. A step either completes or returns an error.
    pub fn step(&mut self) -> Result<RunPhase, EngineError> {
        if self.phase == RunPhase::Finished {
            return Ok(RunPhase::Finished);
        }

        let index = self.cursor;
        let candles = self.candles;
        let candle = candles[index];
        debug_assert!(
            index == 0 || candles[index - 1].timestamp < candle.timestamp,
            "candles must be strictly ascending by timestamp"
        );

        self.portfolio.mark_to_market(candle.close);

        let decision = self
            .generator
            .evaluate(&candles[..=index], &self.portfolio);

        if let Some(grid) = decision.regrid {
            debug!(
                candle = index,
                origin = grid.origin,
                spacing = grid.spacing,
                levels = grid.len(),
                "Grid generated"
            );
            self.portfolio.set_grid(grid);
            self.regrids += 1;
        }

        let final_candle = index + 1 == candles.len()
            && self.config.on_finish == TerminationPolicy::ForceClose;
        for action in decision.actions.iter().filter(|a| a.is_open()) {
            self.apply_open(index, &candle, action, final_candle);
        }
        // opens never spend more than free cash
        self.check_solvency(index)?;

        for action in decision.actions.iter().filter(|a| !a.is_open()) {
            self.apply_close(index, candle.timestamp, action)?;
        }

        self.portfolio.mark_to_market(candle.close);
        self.portfolio.record_equity(candle.timestamp);

        self.cursor += 1;
        let free_cash = self.portfolio.free_cash();
        let equity = self.portfolio.equity();
        if free_cash < Decimal::ZERO || equity <= Decimal::ZERO {
            warn!(
                candle = index,
                %equity,
                %free_cash,
                "Account depleted, stopping backtest"
            );
            self.depletion = Some(Depletion {
                candle_index: index,
                timestamp: candle.timestamp,
                equity,
                free_cash,
            });
            self.finish()?;
        } else if self.cursor == self.candles.len() {
            self.finish()?;
        }
        Ok(self.phase)
    }

    /// Stop between steps and apply the termination policy at the last processed candle.
    ///
    /// Under `force_close`, lots opened on that candle close on it too, so
    /// their exit timestamp equals their entry timestamp.
    pub fn finish_early(&mut self) -> Result<(), EngineError> {
        if self.phase == RunPhase::Running {
            info!(
                processed = self.cursor,
                total = self.candles.len(),
                "Stopping backtest early"
            );
            self.finish()?;
        }
        Ok(())
    }

    /// Build the report. Only available once the run has finished.
    pub fn into_report(self) -> Result<BacktestReport, EngineError> {
        if self.phase != RunPhase::Finished {
            return Err(EngineError::NotFinished {
                processed: self.cursor,
                total: self.candles.len(),
            });
        }

        let last_close = self
            .cursor
            .checked_sub(1)
            .map(|i| self.candles[i].close);
        Ok(BacktestReport::new(
            self.generator.name().to_string(),
            self.config,
            self.portfolio,
            self.rejections,
            self.regrids,
            self.cursor,
            self.final_equity,
            last_close,
            self.depletion,
        ))
    }

    fn apply_open(&mut self, index: usize, candle: &Candle, action: &Action, final_candle: bool) {
        let Action::OpenLot {
            level,
            side,
            price,
            size,
            target,
            stop,
        } = *action
        else {
            return;
        };

        let rejection = if final_candle {
            Some(RejectReason::FinalCandle)
        } else if self.portfolio.is_filled(level) {
            Some(RejectReason::LevelFilled)
        } else if size <= Decimal::ZERO {
            Some(RejectReason::ZeroSize)
        } else if let Some(reason) = self.exposure_cap(candle.close) {
            Some(reason)
        } else {
            let notional = to_money(price) * size;
            let required = notional + self.config.costs.fee(notional);
            let available = self.portfolio.free_cash();
            (required > available).then_some(RejectReason::InsufficientCash {
                required,
                available,
            })
        };

        if let Some(reason) = rejection {
            debug!(candle = index, level, %reason, "Open rejected");
            self.rejections.push(Rejection {
                candle_index: index,
                timestamp: candle.timestamp,
                level,
                reason,
            });
            return;
        }

        debug!(candle = index, level, %side, price, %size, target, ?stop, "Lot opened");
        self.portfolio.open_lot(Lot {
            level,
            side,
            entry_price: price,
            size,
            entry_timestamp: candle.timestamp,
            entry_candle_index: index,
            target,
            stop,
        });
    }

    fn apply_close(
        &mut self,
        index: usize,
        timestamp: i64,
        action: &Action,
    ) -> Result<(), EngineError> {
        let Action::CloseLot {
            level,
            price,
            reason,
        } = *action
        else {
            return Ok(());
        };
        self.close(index, timestamp, level, price, reason)
    }

    fn close(
        &mut self,
        index: usize,
        timestamp: i64,
        level: i32,
        price: f64,
        reason: ExitReason,
    ) -> Result<(), EngineError> {
        let trade = self
            .portfolio
            .close_lot(level, timestamp, price, reason, &self.config.costs)
            .ok_or_else(|| {
                EngineError::invariant(index, format!("no open lot at level {} to close", level))
            })?;
        debug!(
            candle = index,
            level,
            price,
            %reason,
            pnl = %trade.pnl,
            "Lot closed"
        );
        Ok(())
    }

    /// Open lots valued at `price` against the configured share of equity.
    fn exposure_cap(&self, price: f64) -> Option<RejectReason> {
        let cap_pct = self.config.max_exposure_pct?;
        let exposure = self.portfolio.exposure(price);
        let equity = self.portfolio.equity();
        let capped = equity <= Decimal::ZERO
            || exposure * Decimal::ONE_HUNDRED >= cap_pct * equity;
        capped.then_some(RejectReason::ExposureCap {
            exposure,
            equity,
            cap_pct,
        })
    }

    fn check_solvency(&self, index: usize) -> Result<(), EngineError> {
        let free = self.portfolio.free_cash();
        if free < Decimal::ZERO {
            return Err(EngineError::invariant(
                index,
                format!("free cash is negative ({})", free),
            ));
        }
        Ok(())
    }

    /// Apply the termination policy and enter `Finished`.
    fn finish(&mut self) -> Result<(), EngineError> {
        if let Some(last_index) = self.cursor.checked_sub(1) {
            let last = self.candles[last_index];
            if self.config.on_finish == TerminationPolicy::ForceClose {
                let levels: Vec<i32> = self.portfolio.lots().keys().copied().collect();
                for level in levels {
                    self.close(
                        last_index,
                        last.timestamp,
                        level,
                        last.close,
                        ExitReason::EndOfData,
                    )?;
                }
            }
            self.portfolio.mark_to_market(last.close);
        }

        self.final_equity = self.portfolio.equity();
        self.phase = RunPhase::Finished;

        let pnl = self.final_equity - self.config.initial_capital;
        let return_pct = if self.config.initial_capital > Decimal::ZERO {
            (pnl / self.config.initial_capital * Decimal::ONE_HUNDRED).round_dp(2)
        } else {
            Decimal::ZERO
        };
        info!(
            processed = self.cursor,
            trades = self.portfolio.trades().len(),
            open_lots = self.portfolio.lots().len(),
            rejections = self.rejections.len(),
            final_equity = %self.final_equity,
            return_pct = %return_pct,
            "Backtest finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridtrend_core::types::{
        Decision, Grid, GridLevel, IndicatorField, Indicators, Side, TrendState,
    };
    use rust_decimal_macros::dec;
    use std::collections::HashMap;

    /// Emits pre-scripted actions keyed by candle index.
    struct Scripted {
        actions: HashMap<usize, Vec<Action>>,
    }

    impl Scripted {
        fn new(script: Vec<(usize, Action)>) -> Self {
            let mut actions: HashMap<usize, Vec<Action>> = HashMap::new();
            for (index, action) in script {
                actions.entry(index).or_default().push(action);
            }
            Self { actions }
        }
    }

    impl SignalGenerator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn evaluate(&self, history: &[Candle], portfolio: &dyn PortfolioView) -> Decision {
            let index = history.len() - 1;
            let regrid = portfolio.grid().is_none().then(|| {
                let mut grid = Grid::new(100.0, 5.0, history[index].timestamp);
                grid.arm(GridLevel {
                    index: -1,
                    price: 95.0,
                });
                grid
            });
            Decision {
                trend: TrendState::Up,
                regrid,
                actions: self.actions.get(&index).cloned().unwrap_or_default(),
            }
        }
    }

    fn candles(closes: &[f64]) -> Vec<Candle> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                Candle::new(
                    i as i64 * 3_600_000,
                    c,
                    c,
                    c,
                    c,
                    1.0,
                    Indicators::new(100.0, 5.0),
                )
            })
            .collect()
    }

    fn open(level: i32, price: f64, size: Decimal) -> Action {
        Action::OpenLot {
            level,
            side: Side::Long,
            price,
            size,
            target: price + 5.0,
            stop: None,
        }
    }

    fn close(level: i32, price: f64) -> Action {
        Action::CloseLot {
            level,
            price,
            reason: ExitReason::TargetHit,
        }
    }

    fn config(policy: TerminationPolicy) -> BacktestConfig {
        BacktestConfig::new(dec!(1000), policy)
    }

    #[test]
    fn test_empty_feed_rejected() {
        let data: Vec<Candle> = Vec::new();
        let result = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(vec![]),
            &data,
        );
        assert!(matches!(
            result,
            Err(gridtrend_core::GridError::Engine(EngineError::EmptyFeed))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let data = candles(&[100.0]);
        let result = BacktestEngine::new(
            BacktestConfig::new(dec!(0), TerminationPolicy::LeaveOpen),
            Scripted::new(vec![]),
            &data,
        );
        assert!(matches!(
            result,
            Err(gridtrend_core::GridError::Config(_))
        ));
    }

    #[test]
    fn test_one_equity_point_per_candle() {
        let data = candles(&[100.0, 101.0, 102.0]);
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(vec![]),
            &data,
        )
        .unwrap();

        assert_eq!(engine.step().unwrap(), RunPhase::Running);
        assert_eq!(engine.portfolio().equity_curve().len(), 1);
        engine.run().unwrap();
        assert_eq!(engine.phase(), RunPhase::Finished);

        let report = engine.into_report().unwrap();
        assert_eq!(report.equity_curve.len(), 3);
        assert_eq!(report.stats.regrids, 1);
    }

    #[test]
    fn test_open_then_close_realizes_pnl() {
        let data = candles(&[100.0, 95.0, 90.0, 95.0, 100.0]);
        let script = vec![(1, open(-1, 95.0, dec!(1))), (4, close(-1, 100.0))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.run().unwrap();
        let report = engine.into_report().unwrap();

        let unrealized: Vec<Decimal> = report
            .equity_curve
            .iter()
            .map(|p| p.unrealized_pnl)
            .collect();
        assert_eq!(
            unrealized,
            vec![dec!(0), dec!(0), dec!(-5), dec!(0), dec!(0)]
        );
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].pnl, dec!(5));
        assert_eq!(report.equity_curve[4].equity, dec!(1005));
    }

    #[test]
    fn test_insufficient_cash_is_rejected() {
        let data = candles(&[100.0, 95.0]);
        let script = vec![(1, open(-1, 95.0, dec!(20)))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::LeaveOpen),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.run().unwrap();

        assert_eq!(engine.rejections().len(), 1);
        assert!(matches!(
            engine.rejections()[0].reason,
            RejectReason::InsufficientCash { .. }
        ));
        let report = engine.into_report().unwrap();
        assert!(report.open_lots.is_empty());
        assert!(report.equity_curve.iter().all(|p| p.equity == dec!(1000)));
    }

    #[test]
    fn test_double_fill_is_rejected() {
        let data = candles(&[100.0, 95.0, 95.0]);
        let script = vec![
            (1, open(-1, 95.0, dec!(1))),
            (1, open(-1, 95.0, dec!(1))),
            (2, open(-1, 95.0, dec!(1))),
        ];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::LeaveOpen),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.run().unwrap();

        let reasons: Vec<&RejectReason> = engine.rejections().iter().map(|r| &r.reason).collect();
        assert_eq!(reasons, vec![&RejectReason::LevelFilled, &RejectReason::LevelFilled]);
        assert_eq!(engine.portfolio().lots().len(), 1);
    }

    #[test]
    fn test_zero_size_is_rejected() {
        let data = candles(&[100.0, 95.0]);
        let script = vec![(1, open(-1, 95.0, dec!(0)))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::LeaveOpen),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.run().unwrap();
        assert_eq!(engine.rejections()[0].reason, RejectReason::ZeroSize);
    }

    #[test]
    fn test_closing_missing_lot_is_fatal() {
        let data = candles(&[100.0, 95.0, 90.0]);
        let script = vec![(1, close(-1, 95.0))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(script),
            &data,
        )
        .unwrap();

        let err = engine.run().unwrap_err();
        assert_eq!(
            err,
            EngineError::InvariantViolation {
                candle_index: 1,
                invariant: "no open lot at level -1 to close".to_string(),
            }
        );
    }

    #[test]
    fn test_force_close_at_last_close() {
        let data = candles(&[100.0, 95.0, 97.0]);
        let script = vec![(1, open(-1, 95.0, dec!(1)))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.run().unwrap();
        let report = engine.into_report().unwrap();

        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].exit_reason, ExitReason::EndOfData);
        assert_eq!(report.trades[0].exit_price, 97.0);
        assert_eq!(report.trades[0].pnl, dec!(2));
        assert!(report.open_lots.is_empty());
        assert_eq!(report.final_equity, dec!(1002));
        // the curve is not revised by termination
        assert_eq!(report.equity_curve[2].unrealized_pnl, dec!(2));
    }

    #[test]
    fn test_leave_open_reports_lots() {
        let data = candles(&[100.0, 95.0, 97.0]);
        let script = vec![(1, open(-1, 95.0, dec!(1)))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::LeaveOpen),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.run().unwrap();
        let report = engine.into_report().unwrap();

        assert!(report.trades.is_empty());
        assert_eq!(report.open_lots.len(), 1);
        assert_eq!(report.stats.realized_pnl, dec!(0));
        assert_eq!(report.final_equity, dec!(1002));
    }

    #[test]
    fn test_finish_early_stops_between_steps() {
        let data = candles(&[100.0, 95.0, 97.0, 99.0]);
        let script = vec![(1, open(-1, 95.0, dec!(1)))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.step().unwrap();
        engine.step().unwrap();
        engine.finish_early().unwrap();
        assert_eq!(engine.phase(), RunPhase::Finished);
        assert_eq!(engine.step().unwrap(), RunPhase::Finished);

        let report = engine.into_report().unwrap();
        assert_eq!(report.equity_curve.len(), 2);
        assert_eq!(report.trades[0].exit_price, 95.0);
        assert_eq!(report.stats.candles_processed, 2);
    }

    #[test]
    fn test_report_requires_finished_run() {
        let data = candles(&[100.0, 101.0]);
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(vec![]),
            &data,
        )
        .unwrap();
        engine.step().unwrap();
        assert!(matches!(
            engine.into_report(),
            Err(EngineError::NotFinished {
                processed: 1,
                total: 2
            })
        ));
    }

    #[test]
    fn test_costs_charged_on_both_legs() {
        let data = candles(&[100.0, 95.0, 100.0]);
        let script = vec![(1, open(-1, 95.0, dec!(1))), (2, close(-1, 100.0))];
        let config = config(TerminationPolicy::ForceClose)
            .with_costs(TransactionCosts::Percent { rate_pct: dec!(1) });
        let mut engine = BacktestEngine::new(config, Scripted::new(script), &data).unwrap();
        engine.run().unwrap();
        let report = engine.into_report().unwrap();

        // 5 gross - 0.95 entry fee - 1.00 exit fee
        assert_eq!(report.trades[0].pnl, dec!(3.05));
        assert_eq!(report.stats.fees_paid, dec!(1.95));
    }

    fn short(level: i32, price: f64, size: Decimal) -> Action {
        Action::OpenLot {
            level,
            side: Side::Short,
            price,
            size,
            target: price - 5.0,
            stop: None,
        }
    }

    #[test]
    fn test_exposure_cap_refuses_opens() {
        let data = candles(&[100.0, 95.0, 95.0, 95.0]);
        let script = vec![
            (1, open(-1, 95.0, dec!(1))),
            (2, open(-2, 95.0, dec!(1))),
            (3, open(-3, 95.0, dec!(1))),
        ];
        let config = config(TerminationPolicy::LeaveOpen).with_max_exposure(dec!(10));
        let mut engine = BacktestEngine::new(config, Scripted::new(script), &data).unwrap();
        engine.run().unwrap();

        // 95 of 1000 is under the cap, 190 is not
        assert_eq!(engine.portfolio().lots().len(), 2);
        assert_eq!(
            engine.rejections()[0].reason,
            RejectReason::ExposureCap {
                exposure: dec!(190),
                equity: dec!(1000),
                cap_pct: dec!(10),
            }
        );
    }

    #[test]
    fn test_exposure_cap_validated() {
        let data = candles(&[100.0]);
        for pct in [dec!(0), dec!(101)] {
            let config = config(TerminationPolicy::LeaveOpen).with_max_exposure(pct);
            assert!(matches!(
                BacktestEngine::new(config, Scripted::new(vec![]), &data),
                Err(gridtrend_core::GridError::Config(_))
            ));
        }
    }

    #[test]
    fn test_no_opens_on_last_candle_under_force_close() {
        let data = candles(&[100.0, 95.0]);
        let script = vec![(1, open(-1, 95.0, dec!(1)))];

        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(script.clone()),
            &data,
        )
        .unwrap();
        engine.run().unwrap();
        assert_eq!(engine.rejections()[0].reason, RejectReason::FinalCandle);
        assert!(engine.into_report().unwrap().trades.is_empty());

        // nothing to close immediately when lots are left open
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::LeaveOpen),
            Scripted::new(script),
            &data,
        )
        .unwrap();
        engine.run().unwrap();
        assert!(engine.rejections().is_empty());
        assert_eq!(engine.portfolio().lots().len(), 1);
    }

    #[test]
    fn test_short_blowout_depletes_account() {
        let data = candles(&[100.0, 105.0, 250.0, 260.0]);
        let script = vec![(1, short(1, 105.0, dec!(9)))];
        let mut engine = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            Scripted::new(script),
            &data,
        )
        .unwrap();

        engine.run().unwrap();
        assert_eq!(engine.phase(), RunPhase::Finished);
        assert_eq!(
            engine.depletion(),
            Some(&Depletion {
                candle_index: 2,
                timestamp: 2 * 3_600_000,
                equity: dec!(-305),
                free_cash: dec!(55),
            })
        );

        let report = engine.into_report().unwrap();
        assert_eq!(report.equity_curve.len(), 3);
        assert_eq!(report.stats.candles_processed, 3);
        assert_eq!(report.trades[0].exit_reason, ExitReason::EndOfData);
        assert_eq!(report.trades[0].pnl, dec!(-1305));
        assert_eq!(report.final_equity, dec!(-305));
        assert!(report.depletion.is_some());
    }

    #[test]
    fn test_missing_required_indicator_rejected() {
        struct NeedsSlowTrend;

        impl SignalGenerator for NeedsSlowTrend {
            fn name(&self) -> &str {
                "needs_slow_trend"
            }

            fn evaluate(&self, _: &[Candle], _: &dyn PortfolioView) -> Decision {
                Decision::default()
            }

            fn required_indicators(&self) -> Vec<IndicatorField> {
                vec![IndicatorField::SlowTrend]
            }
        }

        let mut data = candles(&[100.0, 101.0, 102.0]);
        data[0].indicators.slow_trend = Some(99.0);
        let result = BacktestEngine::new(
            config(TerminationPolicy::ForceClose),
            NeedsSlowTrend,
            &data,
        );
        assert!(matches!(
            result,
            Err(gridtrend_core::GridError::Data(DataError::MissingIndicator {
                candle_index: 1,
                ref field,
            })) if field == "slow_trend"
        ));
    }
}
