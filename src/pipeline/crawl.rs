// src/pipeline/crawl.rs

//! Listing crawl: scrape each URL and upsert the result.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::error::{ErrorKind, Result};
use crate::models::{Config, ListingRecord};
use crate::services::{HttpFetcher, ImmobiliareScraper, ListingScraper};
use crate::storage::{self, ListingStorage, PersistOutcome, persist};

/// What happened to one URL.
#[derive(Debug)]
pub struct UrlOutcome {
    pub url: String,
    pub result: Result<PersistOutcome>,
}

/// Summary of a crawl run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-URL results, in processing order
    pub outcomes: Vec<UrlOutcome>,
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Failure counts by kind
    pub failures: BTreeMap<ErrorKind, usize>,
    /// URLs not attempted because the batch was aborted
    pub skipped: Vec<String>,
}

impl RunReport {
    fn record(&mut self, url: String, result: Result<PersistOutcome>) {
        match &result {
            Ok(PersistOutcome::Inserted) => self.inserted += 1,
            Ok(PersistOutcome::Updated) => self.updated += 1,
            Ok(PersistOutcome::Unchanged) => self.unchanged += 1,
            Err(e) => *self.failures.entry(e.kind()).or_default() += 1,
        }
        self.outcomes.push(UrlOutcome { url, result });
    }

    /// Number of URLs that ended in an error.
    pub fn failed(&self) -> usize {
        self.failures.values().sum()
    }

    pub fn failures_of(&self, kind: ErrorKind) -> usize {
        self.failures.get(&kind).copied().unwrap_or(0)
    }

    /// Whether the batch stopped before every URL was attempted.
    pub fn aborted(&self) -> bool {
        !self.skipped.is_empty()
    }
}

/// Drives a scraper and a storage backend over a batch of URLs.
pub struct Connector {
    scraper: Arc<dyn ListingScraper>,
    storage: Arc<dyn ListingStorage>,
    request_delay: Duration,
    abort_on_storage_error: bool,
}

impl Connector {
    pub fn new(
        scraper: Arc<dyn ListingScraper>,
        storage: Arc<dyn ListingStorage>,
        config: &Config,
    ) -> Self {
        Self {
            scraper,
            storage,
            request_delay: Duration::from_millis(config.crawler.request_delay_ms),
            abort_on_storage_error: config.connector.abort_on_storage_error,
        }
    }

    /// Scrape one URL and persist the listing.
    ///
    /// The normalized record is rewritten whenever the listing was inserted
    /// or updated.
    pub async fn process(&self, url: &str) -> Result<PersistOutcome> {
        let details = self.scraper.fetch_and_parse(url).await?;
        let outcome = persist(self.storage.as_ref(), &details).await?;
        if outcome != PersistOutcome::Unchanged {
            let record = ListingRecord::from_details(&details, Utc::now());
            self.storage.store_record(&record).await?;
        }
        Ok(outcome)
    }

    /// Process every URL once, in order.
    ///
    /// Per-URL failures are recorded and the batch continues. A storage
    /// failure stops the batch only when `abort_on_storage_error` is set.
    pub async fn run(&self, urls: &[String]) -> RunReport {
        let mut seen = HashSet::new();
        let batch: Vec<String> = urls
            .iter()
            .map(|u| u.trim().to_string())
            .filter(|u| seen.insert(u.clone()))
            .collect();

        log::info!(
            "Crawling {} URLs from {} into {} storage",
            batch.len(),
            self.scraper.source(),
            self.storage.name()
        );

        let mut report = RunReport::default();
        let mut pending = batch.into_iter();
        let mut first = true;
        while let Some(url) = pending.next() {
            if !first && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }
            first = false;

            let result = self.process(&url).await;
            let abort = match &result {
                Ok(outcome) => {
                    log::info!("{url}: {outcome}");
                    false
                }
                Err(e) => {
                    log::warn!("{url}: {} failure: {e}", e.kind());
                    e.kind() == ErrorKind::Storage && self.abort_on_storage_error
                }
            };
            report.record(url, result);

            if abort {
                report.skipped = pending.by_ref().collect();
                log::error!(
                    "Storage failure, aborting batch ({} URLs skipped)",
                    report.skipped.len()
                );
                break;
            }
        }

        log::info!(
            "Crawl finished: {} inserted, {} updated, {} unchanged, {} failed",
            report.inserted,
            report.updated,
            report.unchanged,
            report.failed()
        );
        report
    }
}

/// Crawl `urls` with the HTTP fetcher and the configured storage backend.
pub async fn run_crawler(config: &Config, urls: &[String]) -> Result<RunReport> {
    let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
    let scraper = Arc::new(ImmobiliareScraper::new(config.immobiliare.clone(), fetcher));
    let storage = storage::open(&config.storage).await?;
    let connector = Connector::new(scraper, storage, config);
    Ok(connector.run(urls).await)
}
