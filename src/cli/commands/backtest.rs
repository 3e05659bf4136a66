//! Backtest command implementation.

use anyhow::{Context, Result};
use gridtrend_backtest::BacktestEngine;
use gridtrend_config::AppConfig;
use gridtrend_core::traits::SignalGenerator;
use gridtrend_data::load_candles;
use gridtrend_strategy::HybridSignalGenerator;
use tracing::{info, warn};

use crate::cli::{BacktestArgs, OutputFormat};

pub fn run(args: BacktestArgs, mut config: AppConfig) -> Result<()> {
    if let Some(data) = args.data {
        config.data.path = data;
    }
    if let Some(out) = args.out {
        config.backtest.output_dir = out;
    }
    if let Some(capital) = args.capital {
        config.backtest.initial_capital = capital;
    }
    config.validate().context("Invalid configuration")?;

    let generator = HybridSignalGenerator::new(config.strategy.clone())
        .context("Failed to create signal generator")?;

    let candles = load_candles(&config.data, &generator.required_indicators())
        .with_context(|| format!("Failed to load candles from {}", config.data.path.display()))?;
    if candles.len() < generator.warmup_period() {
        warn!(
            candles = candles.len(),
            warmup = generator.warmup_period(),
            "Fewer candles than the trend rule needs; the trend stays flat"
        );
    }

    let backtest_config = config.backtest_config()?;
    info!(
        strategy = generator.name(),
        data = %config.data.path.display(),
        "Running backtest"
    );

    let mut engine = BacktestEngine::new(backtest_config, generator, &candles)
        .context("Failed to create backtest engine")?;
    engine.run().context("Backtest aborted")?;
    let report = engine.into_report()?;

    match args.output {
        OutputFormat::Json => println!("{}", report.to_json()?),
        OutputFormat::Text => println!("{}", report.summary()),
    }

    report
        .save(&config.backtest.output_dir)
        .with_context(|| {
            format!(
                "Failed to write results to {}",
                config.backtest.output_dir.display()
            )
        })?;

    Ok(())
}
