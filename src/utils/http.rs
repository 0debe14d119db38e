// src/utils/http.rs

//! HTTP client utilities.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
///
/// The User-Agent is set per request by [`UserAgentRotation`].
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .gzip(true)
        .brotli(true)
        .deflate(true)
        .build()?;
    Ok(client)
}

/// Round-robin over the configured User-Agent strings.
#[derive(Debug)]
pub struct UserAgentRotation {
    agents: Vec<String>,
    next: AtomicUsize,
}

impl UserAgentRotation {
    pub fn new(agents: &[String]) -> Result<Self> {
        let agents: Vec<String> = agents
            .iter()
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .collect();
        if agents.is_empty() {
            return Err(AppError::config("no user agents configured"));
        }
        Ok(Self {
            agents,
            next: AtomicUsize::new(0),
        })
    }

    /// The User-Agent for the next request.
    pub fn next_agent(&self) -> &str {
        let i = self.next.fetch_add(1, Ordering::Relaxed) % self.agents.len();
        &self.agents[i]
    }
}
