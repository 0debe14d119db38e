// src/utils/url.rs

//! URL manipulation utilities.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::error::Result;

static LISTING_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/annunci/(\d+)(?:/|$|\?|#)").expect("listing key pattern is valid")
});

/// Resolve a potentially relative URL against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    match base.join(href) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

/// Extract the numeric listing key from a listing URL.
///
/// # Examples
/// ```
/// use estate_crawler::utils::url::extract_listing_key;
///
/// assert_eq!(
///     extract_listing_key("https://www.immobiliare.it/annunci/122361988/"),
///     Some("122361988".to_string())
/// );
/// ```
pub fn extract_listing_key(url: &str) -> Option<String> {
    LISTING_KEY
        .captures(url.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Canonical listing URL: scheme, host and path only, with a trailing slash.
pub fn canonical_listing_url(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let key = extract_listing_key(parsed.path())?;
    let host = parsed.host_str()?;
    Some(format!("{}://{}/annunci/{}/", parsed.scheme(), host, key))
}

/// URL of a given search result page (sets the `pag` query parameter).
pub fn page_url(url: &str, page: u32) -> Result<String> {
    let mut parsed = Url::parse(url)?;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| k != "pag")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        for (k, v) in &pairs {
            query.append_pair(k, v);
        }
        if page > 1 {
            query.append_pair("pag", &page.to_string());
        }
    }
    if parsed.query() == Some("") {
        parsed.set_query(None);
    }
    Ok(parsed.to_string())
}

/// Current search page number (1 when `pag` is absent or invalid).
pub fn current_page(url: &str) -> u32 {
    Url::parse(url)
        .ok()
        .and_then(|u| {
            u.query_pairs()
                .find(|(k, _)| k == "pag")
                .and_then(|(_, v)| v.parse().ok())
        })
        .unwrap_or(1)
}
