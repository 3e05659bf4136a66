//! Configuration management.
//!
//! Settings come from a TOML file, overridden by `GRIDTREND__<SECTION>__<KEY>`
//! environment variables, and are validated before anything runs.

mod settings;

pub use settings::{AppConfig, AppSettings, BacktestSettings, LoggingConfig};

use config::{Config, Environment, File, FileFormat};
use gridtrend_core::error::ConfigError;
use std::path::Path;

/// Load configuration from file and environment, then validate it.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Load(format!(
            "configuration file not found: {}",
            path.display()
        )));
    }

    let config = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(true))
        .add_source(
            Environment::with_prefix("GRIDTREND")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;
    app.validate()?;
    Ok(app)
}
