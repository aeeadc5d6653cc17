//! Configuration loader

use config::{Config, Environment, File, FileFormat};
use std::path::Path;

use super::types::AppConfig;
use crate::common::errors::{EngineError, Result};

/// Load and validate configuration from file and environment variables
///
/// Priority (highest to lowest):
/// 1. Environment variables (prefixed with GRID_, nested with `__`)
/// 2. Configuration file (TOML format)
/// 3. Default values
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    // Pick up a .env file if one exists
    dotenvy::dotenv().ok();

    let mut builder = Config::builder();

    if let Some(path) = config_path {
        if !Path::new(path).exists() {
            return Err(EngineError::Configuration(format!(
                "config file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::with_name(path));
    }

    builder = builder.add_source(
        Environment::with_prefix("GRID")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config: AppConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    Ok(config)
}

/// Load and validate configuration from a TOML string
pub fn load_from_str(toml: &str) -> Result<AppConfig> {
    let config: AppConfig = Config::builder()
        .add_source(File::from_str(toml, FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    config.validate()?;
    Ok(config)
}
