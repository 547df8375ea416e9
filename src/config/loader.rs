// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{HarnessConfig, RawHarnessConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawHarnessConfig`.
///
/// This only performs TOML deserialization; it does **not** check ids,
/// required fields or timing values. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawHarnessConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawHarnessConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
///
/// Validation problems are collected and returned together as
/// `HarnessError::ConfigError`, before any process could be spawned.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<HarnessConfig> {
    let raw_config = load_from_path(&path)?;
    HarnessConfig::try_from(raw_config)
}

