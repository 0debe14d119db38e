// src/services/immobiliare.rs

//! immobiliare.it listing scraper.
//!
//! Listing pages embed their data as JSON in a `__NEXT_DATA__` script tag;
//! the scraper reads that blob instead of the rendered markup. Search pages
//! are scanned for links to listing detail pages.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ImmobiliareConfig, ListingDetails, Location, RawListing, Source};
use crate::services::{ListingScraper, PageFetcher};
use crate::utils::url::canonical_listing_url;
use crate::utils::{extract_listing_key, resolve_url};

const NEXT_DATA_SELECTOR: &str = "script#__NEXT_DATA__";
const LISTING_LINK_SELECTOR: &str = "a[href*='/annunci/']";
const REAL_ESTATE_POINTER: &str = "/props/pageProps/detailData/realEstate";

/// Search URL fragments of map and list views that carry no listing links.
const UNSUPPORTED_SEARCH_MARKERS: [&str; 2] = ["mapCenter", "search-list"];

/// Scraper for immobiliare.it listing pages.
pub struct ImmobiliareScraper {
    site: ImmobiliareConfig,
    fetcher: Arc<dyn PageFetcher>,
}

impl ImmobiliareScraper {
    pub fn new(site: ImmobiliareConfig, fetcher: Arc<dyn PageFetcher>) -> Self {
        Self { site, fetcher }
    }

    /// Check that `url` is a listing detail page and return its key.
    pub fn validate_url(&self, url: &str) -> Result<String> {
        let url = url.trim();
        let prefix = self.site.listing_prefix();
        if !url.starts_with(&prefix) {
            return Err(AppError::validation(format!(
                "URL must start with [{prefix}], got [{url}]"
            )));
        }
        extract_listing_key(url)
            .ok_or_else(|| AppError::validation(format!("URL carries no listing key: {url}")))
    }

    /// Check that `url` is a search page the discovery walk can read.
    pub fn validate_search_url(&self, url: &str) -> Result<()> {
        let url = url.trim();
        let base = self.site.base_url.trim_end_matches('/');
        if !url.starts_with(base) {
            return Err(AppError::validation(format!(
                "search URL must start with [{base}], got [{url}]"
            )));
        }
        if let Some(marker) = UNSUPPORTED_SEARCH_MARKERS.iter().find(|m| url.contains(*m)) {
            return Err(AppError::validation(format!(
                "search URL uses an unsupported view ({marker}): {url}"
            )));
        }
        Ok(())
    }

    /// Extract a candidate listing from a detail page.
    pub fn parse_listing(html: &str, url: &str) -> Result<RawListing> {
        let document = Html::parse_document(html);
        let selector = parse_selector(NEXT_DATA_SELECTOR)?;
        let script = document
            .select(&selector)
            .next()
            .ok_or_else(|| AppError::parsing(url, "no __NEXT_DATA__ script on page"))?;

        let json: String = script.text().collect();
        let data: Value = serde_json::from_str(&json)
            .map_err(|e| AppError::parsing(url, format!("__NEXT_DATA__ is not JSON: {e}")))?;

        let estate = data
            .pointer(REAL_ESTATE_POINTER)
            .filter(|v| v.is_object())
            .ok_or_else(|| AppError::parsing(url, "listing data missing from page"))?;
        let property = estate
            .pointer("/properties/0")
            .filter(|v| v.is_object())
            .ok_or_else(|| AppError::parsing(url, "listing has no property block"))?;

        let source_id = field(estate, "/id")
            .or_else(|| extract_listing_key(url))
            .unwrap_or_default();

        let location = Location {
            city: field(property, "/location/city").unwrap_or_default(),
            province: field(property, "/location/province"),
            region: field(property, "/location/region"),
            macrozone: field(property, "/location/macrozone"),
            microzone: field(property, "/location/microzone"),
            country: field(property, "/location/nation/id").unwrap_or_else(|| "IT".to_string()),
            latitude: number(property, "/location/latitude"),
            longitude: number(property, "/location/longitude"),
        };

        Ok(RawListing {
            source: Source::Immobiliare.as_str().to_string(),
            source_id,
            title: field(estate, "/title").unwrap_or_default(),
            url: url.trim().to_string(),
            formatted_price: field(estate, "/price/formattedValue").unwrap_or_default(),
            price: number(estate, "/price/value"),
            surface: field(property, "/surface"),
            rooms: field(property, "/rooms"),
            bathrooms: field(property, "/bathrooms"),
            bedrooms: field(property, "/bedRoomsNumber"),
            floor: field(property, "/floor/abbreviation").or_else(|| field(property, "/floor/value")),
            total_floors: field(property, "/floors"),
            property_type: field(property, "/typologyGA4Translation")
                .or_else(|| field(property, "/typology"))
                .unwrap_or_default(),
            contract: field(estate, "/contract").unwrap_or_default(),
            condition: field(property, "/condition"),
            energy_class: field(property, "/energy/class"),
            is_luxury: estate
                .get("luxury")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            location,
            description_title: field(property, "/caption"),
            description: field(property, "/description").unwrap_or_default(),
            features: property
                .get("features")
                .and_then(Value::as_array)
                .map(|items| items.iter().filter_map(text).collect())
                .unwrap_or_default(),
        })
    }

    /// Collect unique listing URLs linked from a search result page.
    pub fn parse_search_page(&self, html: &str, page_url: &str) -> Result<Vec<String>> {
        let base = Url::parse(page_url)?;
        let document = Html::parse_document(html);
        let selector = parse_selector(LISTING_LINK_SELECTOR)?;
        let prefix = self.site.listing_prefix();

        let mut seen = HashSet::new();
        let mut urls = Vec::new();
        for anchor in document.select(&selector) {
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let Some(url) = canonical_listing_url(&resolve_url(&base, href)) else {
                continue;
            };
            if url.starts_with(&prefix) && seen.insert(url.clone()) {
                urls.push(url);
            }
        }
        log::debug!("{} listing links on {}", urls.len(), page_url);
        Ok(urls)
    }

    /// Fetch one search page and return the listing URLs it links to.
    pub async fn fetch_search_page(&self, url: &str) -> Result<Vec<String>> {
        self.validate_search_url(url)?;
        let html = self.fetcher.fetch(url).await?;
        self.parse_search_page(&html, url)
    }
}

#[async_trait]
impl ListingScraper for ImmobiliareScraper {
    fn source(&self) -> Source {
        Source::Immobiliare
    }

    async fn fetch_and_parse(&self, url: &str) -> Result<ListingDetails> {
        self.validate_url(url)?;
        let html = self.fetcher.fetch(url.trim()).await?;
        let raw = Self::parse_listing(&html, url)?;
        ListingDetails::try_from(raw)
    }
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Text of a JSON value. Objects contribute their `name`, `label` or `value`.
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Number(n) => Some(n.to_string()),
        Value::Object(map) => ["name", "label", "value"]
            .iter()
            .find_map(|key| map.get(*key).and_then(text)),
        _ => None,
    }
}

fn field(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer).and_then(text)
}

fn number(value: &Value, pointer: &str) -> Option<f64> {
    match value.pointer(pointer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
