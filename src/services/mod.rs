//! Service layer for the crawler application.
//!
//! - Page fetching (`PageFetcher`, `HttpFetcher`, `MemoryFetcher`)
//! - Listing scraping (`ListingScraper`, `ImmobiliareScraper`)

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ListingDetails, Source};

mod fetcher;
mod immobiliare;

pub use fetcher::{HttpFetcher, MemoryFetcher, PageFetcher};
pub use immobiliare::ImmobiliareScraper;

#[cfg(test)]
pub(crate) use immobiliare::tests::{LISTING_URL, listing_page};

/// A site-specific scraper turning a listing URL into a validated record.
#[async_trait]
pub trait ListingScraper: Send + Sync {
    /// Site this scraper reads from.
    fn source(&self) -> Source;

    /// Fetch `url`, extract the listing and validate it.
    async fn fetch_and_parse(&self, url: &str) -> Result<ListingDetails>;
}
