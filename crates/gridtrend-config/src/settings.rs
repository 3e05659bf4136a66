//! Configuration structures.

use gridtrend_backtest::{BacktestConfig, TerminationPolicy, TransactionCosts};
use gridtrend_core::error::ConfigError;
use gridtrend_core::traits::StrategyConfig;
use gridtrend_data::FeedConfig;
use gridtrend_strategy::HybridConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub app: AppSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub data: FeedConfig,
    #[serde(default)]
    pub strategy: HybridConfig,
    #[serde(default)]
    pub backtest: BacktestSettings,
}

impl AppConfig {
    /// Parse a TOML document. Missing sections take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Validate every section. A run never starts with an invalid configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        self.data.validate()?;
        self.strategy.validate()?;
        self.backtest_config()?.validate()?;
        Ok(())
    }

    /// Engine configuration assembled from the `[backtest]` and `[data]` sections.
    pub fn backtest_config(&self) -> Result<BacktestConfig, ConfigError> {
        let on_finish = self.backtest.on_finish.ok_or_else(|| {
            ConfigError::invalid(
                "backtest.on_finish",
                "is required: choose `force_close` or `leave_open`",
            )
        })?;
        let config = BacktestConfig::new(self.backtest.initial_capital, on_finish)
            .with_costs(self.backtest.costs.clone())
            .with_timeframe(self.data.timeframe);
        Ok(match self.backtest.max_exposure_pct {
            Some(pct) => config.with_max_exposure(pct),
            None => config,
        })
    }
}

/// General app settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub name: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: "gridtrend".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
    /// Log file; when set, logs are also written there with daily rotation
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !matches!(self.format.as_str(), "pretty" | "json") {
            return Err(ConfigError::invalid(
                "logging.format",
                format!("expected `pretty` or `json`, got `{}`", self.format),
            ));
        }
        if !matches!(
            self.level.to_ascii_lowercase().as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(ConfigError::invalid(
                "logging.level",
                format!("unknown level `{}`", self.level),
            ));
        }
        Ok(())
    }
}

/// Backtest settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSettings {
    pub initial_capital: Decimal,
    pub costs: TransactionCosts,
    /// No default: a run must say what happens to lots open at the end
    pub on_finish: Option<TerminationPolicy>,
    /// Cap on open exposure as a percentage of equity; unlimited when unset
    pub max_exposure_pct: Option<Decimal>,
    /// Directory for the trade ledger, equity curve and summary
    pub output_dir: PathBuf,
}

impl Default for BacktestSettings {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::new(10_000, 0),
            costs: TransactionCosts::None,
            on_finish: None,
            max_exposure_pct: None,
            output_dir: PathBuf::from("results"),
        }
    }
}
