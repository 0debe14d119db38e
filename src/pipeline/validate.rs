// src/pipeline/validate.rs

use std::path::Path;

use crate::config::load_all;
use crate::error::Result;
use crate::models::{Config, StorageBackend};

/// Validate the configuration file using load_all and log a summary.
pub fn run_validate(path: &Path) -> Result<Config> {
    log::info!("Validating configuration at {}", path.display());

    match load_all(path) {
        Ok(config) => {
            log::info!("Configuration is valid");
            log::info!("  user agents: {}", config.crawler.user_agents.len());
            log::info!("  timeout: {}s", config.crawler.timeout_secs);
            log::info!("  request delay: {}ms", config.crawler.request_delay_ms);
            log::info!("  listing prefix: {}", config.immobiliare.listing_prefix());
            match config.storage.backend {
                StorageBackend::Memory => log::info!("  storage: memory"),
                StorageBackend::File => log::info!(
                    "  storage: file ({})",
                    config.storage.file.base_path.display()
                ),
                StorageBackend::Mongodb => {
                    log::info!("  storage: mongodb ({})", config.storage.mongodb.database)
                }
            }
            Ok(config)
        }
        Err(e) => {
            log::error!("Configuration is invalid: {e}");
            Err(e)
        }
    }
}
