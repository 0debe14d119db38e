// src/services/fetcher.rs

//! Page fetching with retry and User-Agent rotation.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::USER_AGENT;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http::{UserAgentRotation, create_async_client};

/// Source of raw page bodies.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the body of `url` as text.
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Outcome of one HTTP attempt.
enum Attempt {
    Done(String),
    Retry(AppError),
    Fail(AppError),
}

/// Fetches pages over HTTP.
pub struct HttpFetcher {
    client: Client,
    agents: UserAgentRotation,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    /// Create a fetcher from crawler settings.
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            agents: UserAgentRotation::new(&config.user_agents)?,
            max_retries: config.max_retries,
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        })
    }

    async fn attempt(&self, url: &str) -> Attempt {
        let response = match self
            .client
            .get(url)
            .header(USER_AGENT, self.agents.next_agent())
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => return Attempt::Retry(AppError::scraping(url, e)),
        };

        let status = response.status();
        if !status.is_success() {
            let err = AppError::scraping(url, format!("HTTP status {status}"));
            // 4xx other than 429 will not change on retry.
            return if status.is_client_error() && status.as_u16() != 429 {
                Attempt::Fail(err)
            } else {
                Attempt::Retry(err)
            };
        }

        match response.text().await {
            Ok(body) => Attempt::Done(body),
            Err(e) => Attempt::Retry(AppError::scraping(url, e)),
        }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            log::debug!("GET {} (attempt {})", url, attempt + 1);
            match self.attempt(url).await {
                Attempt::Done(body) => return Ok(body),
                Attempt::Fail(err) => return Err(err),
                Attempt::Retry(err) if attempt >= self.max_retries => return Err(err),
                Attempt::Retry(err) => {
                    attempt += 1;
                    log::warn!(
                        "Fetch failed ({}), retry {}/{} in {:?}",
                        err,
                        attempt,
                        self.max_retries,
                        self.retry_delay
                    );
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay).await;
                    }
                }
            }
        }
    }
}

/// Serves pages from memory, keyed by URL. Used for offline replays and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryFetcher {
    pages: HashMap<String, String>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the body returned for `url`.
    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }
}

#[async_trait]
impl PageFetcher for MemoryFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::scraping(url, "no page registered for URL"))
    }
}
