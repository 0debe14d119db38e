// src/config.rs

//! Configuration loading utilities.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file is missing. A file that exists but
/// does not parse is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        log::warn!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }
    Config::load(path)
}

/// Load and validate the configuration.
pub fn load_all(path: &Path) -> Result<Config> {
    let config = load_config(path)?;
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_all(&tmp.path().join("nope.toml")).unwrap();
        assert_eq!(config.immobiliare.base_url, "https://www.immobiliare.it");
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[crawler]\ntimeout_secs = 0\n").unwrap();
        let err = load_all(&path).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
