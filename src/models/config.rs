//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and fetch pacing settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// immobiliare.it site layout
    #[serde(default)]
    pub immobiliare: ImmobiliareConfig,

    /// Storage backend selection
    #[serde(default)]
    pub storage: StorageConfig,

    /// Batch error policy
    #[serde(default)]
    pub connector: ConnectorConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| AppError::config(e.to_string()))
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agents.iter().all(|ua| ua.trim().is_empty()) {
            return Err(AppError::validation("crawler.user_agents is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.immobiliare.base_url.trim().is_empty() {
            return Err(AppError::validation("immobiliare.base_url is empty"));
        }
        url::Url::parse(&self.immobiliare.base_url).map_err(|e| {
            AppError::validation(format!("immobiliare.base_url is not a URL: {e}"))
        })?;
        if !self.immobiliare.listing_path.starts_with('/') {
            return Err(AppError::validation(
                "immobiliare.listing_path must start with '/'",
            ));
        }
        if self.immobiliare.max_pages == 0 {
            return Err(AppError::validation("immobiliare.max_pages must be > 0"));
        }
        match self.storage.backend {
            StorageBackend::File if self.storage.file.base_path.as_os_str().is_empty() => {
                return Err(AppError::validation("storage.file.base_path is empty"));
            }
            StorageBackend::Mongodb if self.storage.mongodb.connection_string.trim().is_empty() => {
                return Err(AppError::validation(
                    "storage.mongodb.connection_string is empty",
                ));
            }
            StorageBackend::Mongodb if self.storage.mongodb.database.trim().is_empty() => {
                return Err(AppError::validation("storage.mongodb.database is empty"));
            }
            _ => {}
        }
        Ok(())
    }
}

/// HTTP client and fetch pacing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent headers, rotated per request
    #[serde(default = "defaults::user_agents")]
    pub user_agents: Vec<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between successive fetches in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Extra attempts after a failed fetch
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Pause before each retry in milliseconds
    #[serde(default = "defaults::retry_delay")]
    pub retry_delay_ms: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agents: defaults::user_agents(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            max_retries: defaults::max_retries(),
            retry_delay_ms: defaults::retry_delay(),
        }
    }
}

/// immobiliare.it URL layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmobiliareConfig {
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// Path prefix of listing detail pages
    #[serde(default = "defaults::listing_path")]
    pub listing_path: String,

    /// Path of the default search page
    #[serde(default = "defaults::search_path")]
    pub search_path: String,

    /// Maximum number of search result pages to walk
    #[serde(default = "defaults::max_pages")]
    pub max_pages: u32,
}

impl ImmobiliareConfig {
    /// Prefix every listing URL must start with.
    pub fn listing_prefix(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.listing_path
        )
    }

    /// Default search URL.
    pub fn search_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.search_path
        )
    }
}

impl Default for ImmobiliareConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            listing_path: defaults::listing_path(),
            search_path: defaults::search_path(),
            max_pages: defaults::max_pages(),
        }
    }
}

/// Which storage backend to write to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Mongodb,
}

/// Storage settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    #[serde(default)]
    pub file: FileStorageConfig,

    #[serde(default)]
    pub mongodb: MongoStorageConfig,
}

/// Flat-file backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileStorageConfig {
    /// Directory holding one `.jsonl` file per collection
    #[serde(default = "defaults::base_path")]
    pub base_path: PathBuf,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            base_path: defaults::base_path(),
        }
    }
}

/// Document database backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoStorageConfig {
    #[serde(default = "defaults::connection_string")]
    pub connection_string: String,

    #[serde(default = "defaults::database")]
    pub database: String,

    #[serde(default = "defaults::max_pool_size")]
    pub max_pool_size: u32,

    #[serde(default = "defaults::min_pool_size")]
    pub min_pool_size: u32,
}

impl Default for MongoStorageConfig {
    fn default() -> Self {
        Self {
            connection_string: defaults::connection_string(),
            database: defaults::database(),
            max_pool_size: defaults::max_pool_size(),
            min_pool_size: defaults::min_pool_size(),
        }
    }
}

/// Batch error policy for the connector.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorConfig {
    /// Stop the remaining batch after the first storage failure
    #[serde(default)]
    pub abort_on_storage_error: bool,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Crawler defaults
    pub fn user_agents() -> Vec<String> {
        vec![
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into(),
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15".into(),
            "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".into(),
        ]
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        2000
    }
    pub fn max_retries() -> u32 {
        2
    }
    pub fn retry_delay() -> u64 {
        1000
    }

    // Site defaults
    pub fn base_url() -> String {
        "https://www.immobiliare.it".into()
    }
    pub fn listing_path() -> String {
        "/annunci/".into()
    }
    pub fn search_path() -> String {
        "/vendita-case/".into()
    }
    pub fn max_pages() -> u32 {
        10
    }

    // Storage defaults
    pub fn base_path() -> PathBuf {
        PathBuf::from("data")
    }
    pub fn connection_string() -> String {
        "mongodb://localhost:27017".into()
    }
    pub fn database() -> String {
        "quant_estate".into()
    }
    pub fn max_pool_size() -> u32 {
        100
    }
    pub fn min_pool_size() -> u32 {
        10
    }

    pub fn log_level() -> String {
        "info".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_empty_user_agents() {
        let mut config = Config::default();
        config.crawler.user_agents = vec!["  ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.crawler.timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_mongodb_without_connection_string() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Mongodb;
        config.storage.mongodb.connection_string = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [crawler]
            request_delay_ms = 0

            [storage]
            backend = "memory"
            "#,
        )
        .unwrap();
        assert_eq!(config.crawler.request_delay_ms, 0);
        assert_eq!(config.crawler.timeout_secs, 30);
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert_eq!(
            config.immobiliare.listing_prefix(),
            "https://www.immobiliare.it/annunci/"
        );
    }

    #[test]
    fn load_reports_bad_toml_as_config_error() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), "crawler = [").unwrap();
        let err = Config::load(tmp.path()).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Configuration);
    }

    #[test]
    fn load_or_default_falls_back_on_unreadable_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let missing = Config::load_or_default(tmp.path().join("missing.toml"));
        assert_eq!(missing.crawler.timeout_secs, 30);

        let bad = tmp.path().join("bad.toml");
        std::fs::write(&bad, "storage = 1").unwrap();
        let config = Config::load_or_default(&bad);
        assert_eq!(config.storage.backend, StorageConfig::default().backend);

        let good = tmp.path().join("good.toml");
        std::fs::write(&good, "[crawler]\nmax_retries = 7\n").unwrap();
        assert_eq!(Config::load_or_default(&good).crawler.max_retries, 7);
    }
}
