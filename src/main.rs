//! Grid backtester CLI application.

mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use gridtrend_config::load_config;
use gridtrend_monitor::setup_logging;
use std::path::Path;

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Backtest(args) => {
            let config = load_config(&cli.config)
                .with_context(|| format!("Failed to load {}", cli.config.display()))?;

            let level = cli
                .log_level
                .map(|l| l.as_str().to_string())
                .unwrap_or_else(|| config.logging.level.clone());
            let json = cli.json_logs || config.logging.is_json();
            let _guard = setup_logging(&level, json, config.logging.file.as_deref().map(Path::new))
                .context("Failed to initialize logging")?;

            cli::commands::backtest::run(args, config)
        }
        Commands::ValidateConfig => {
            let level = cli.log_level.map(|l| l.as_str()).unwrap_or("warn");
            setup_logging(level, cli.json_logs, None).context("Failed to initialize logging")?;
            cli::commands::validate::run(&cli.config)
        }
    }
}
