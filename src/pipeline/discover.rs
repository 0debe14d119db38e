// src/pipeline/discover.rs

//! Search-page discovery of listing URLs.

use std::collections::HashSet;
use std::time::Duration;

use crate::error::Result;
use crate::services::ImmobiliareScraper;
use crate::utils::url::{current_page, page_url};

/// Walk search result pages starting at `search_url` and collect listing URLs.
///
/// Stops after `max_pages` pages or at the first page that links no new
/// listing. A failure on the first page is returned; later failures end the
/// walk with what was found so far.
pub async fn run_discover(
    scraper: &ImmobiliareScraper,
    search_url: &str,
    max_pages: u32,
    page_delay: Duration,
) -> Result<Vec<String>> {
    scraper.validate_search_url(search_url)?;
    let start = current_page(search_url);

    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for page in start..start.saturating_add(max_pages) {
        if page > start && !page_delay.is_zero() {
            tokio::time::sleep(page_delay).await;
        }

        let url = page_url(search_url, page)?;
        let found = match scraper.fetch_search_page(&url).await {
            Ok(found) => found,
            Err(e) if page == start => return Err(e),
            Err(e) => {
                log::warn!("Search page {page} failed, stopping discovery: {e}");
                break;
            }
        };

        let before = urls.len();
        for listing in found {
            if seen.insert(listing.clone()) {
                urls.push(listing);
            }
        }
        let added = urls.len() - before;
        log::info!("Search page {page}: {added} new listings");
        if added == 0 {
            break;
        }
    }

    log::info!("Discovered {} listing URLs", urls.len());
    Ok(urls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error::ErrorKind;
    use crate::models::ImmobiliareConfig;
    use crate::services::MemoryFetcher;

    const SEARCH: &str = "https://www.immobiliare.it/vendita-case/milano/";

    fn results(ids: &[u32]) -> String {
        ids.iter()
            .map(|id| format!(r#"<a href="/annunci/{id}/">Annuncio {id}</a>"#))
            .collect()
    }

    fn scraper(fetcher: MemoryFetcher) -> ImmobiliareScraper {
        ImmobiliareScraper::new(ImmobiliareConfig::default(), Arc::new(fetcher))
    }

    #[tokio::test]
    async fn test_walk_stops_at_page_without_new_listings() {
        let fetcher = MemoryFetcher::new()
            .with_page(SEARCH, results(&[1, 2]))
            .with_page(format!("{SEARCH}?pag=2"), results(&[2, 3]))
            .with_page(format!("{SEARCH}?pag=3"), results(&[3]))
            .with_page(format!("{SEARCH}?pag=4"), results(&[4]));

        let urls = run_discover(&scraper(fetcher), SEARCH, 10, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(
            urls,
            vec![
                "https://www.immobiliare.it/annunci/1/",
                "https://www.immobiliare.it/annunci/2/",
                "https://www.immobiliare.it/annunci/3/",
            ]
        );
    }

    #[tokio::test]
    async fn test_walk_respects_max_pages() {
        let fetcher = MemoryFetcher::new()
            .with_page(SEARCH, results(&[1]))
            .with_page(format!("{SEARCH}?pag=2"), results(&[2]));
        let urls = run_discover(&scraper(fetcher), SEARCH, 1, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn test_later_page_failure_keeps_results() {
        let fetcher = MemoryFetcher::new().with_page(SEARCH, results(&[1]));
        let urls = run_discover(&scraper(fetcher), SEARCH, 5, Duration::ZERO)
            .await
            .unwrap();
        assert_eq!(urls.len(), 1);
    }

    #[tokio::test]
    async fn test_first_page_failure_is_returned() {
        let err = run_discover(&scraper(MemoryFetcher::new()), SEARCH, 5, Duration::ZERO)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Scraping);

        let err = run_discover(
            &scraper(MemoryFetcher::new()),
            "https://www.immobiliare.it/search-list/?mapCenter=45.4,9.1",
            5,
            Duration::ZERO,
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
