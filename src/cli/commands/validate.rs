//! Validate configuration command.

use anyhow::Result;
use std::path::Path;
use gridtrend_config::load_config;

pub fn run(config_path: &Path) -> Result<()> {
    println!("Validating configuration: {:?}", config_path);

    match load_config(config_path) {
        Ok(config) => {
            println!("Configuration is valid!");
            println!();
            println!("App: {}", config.app.name);
            println!("Log level: {}", config.logging.level);
            println!("Data: {} ({})", config.data.path.display(), config.data.timeframe);
            println!("Trend rule: {:?}", config.strategy.trend);
            println!(
                "Grid: {} below / {} above, spacing {} x volatility, {:?}",
                config.strategy.grid.levels_below,
                config.strategy.grid.levels_above,
                config.strategy.grid.spacing_multiplier,
                config.strategy.grid.mode
            );
            println!("Sizing: {:?}", config.strategy.sizing);
            println!("Initial capital: {}", config.backtest.initial_capital);
            println!("Costs: {:?}", config.backtest.costs);
            if let Some(cap) = config.backtest.max_exposure_pct {
                println!("Max exposure: {}%", cap);
            }
            if let Some(policy) = config.backtest.on_finish {
                println!("On finish: {}", policy);
            }
        }
        Err(e) => {
            println!("Configuration error: {}", e);
            return Err(e.into());
        }
    }

    Ok(())
}
