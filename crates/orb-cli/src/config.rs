//! TOML configuration for the reader settings

use orb_formats::{OrbConfig, OrbError};
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(#[from] OrbError),
}

/// Parse and validate a configuration document
pub fn parse_config(text: &str) -> Result<OrbConfig, ConfigError> {
    let config: OrbConfig = toml::from_str(text)?;
    config.validate()?;
    Ok(config)
}

/// Load the configuration file, falling back to defaults when none is given
pub fn load_config(path: Option<&Path>) -> Result<OrbConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(OrbConfig::default());
    };

    debug!("Loading configuration from {}", path.display());
    let text = fs::read_to_string(path)?;
    parse_config(&text)
}
