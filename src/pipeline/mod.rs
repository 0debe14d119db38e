//! Pipeline entry points for crawler operations.
//!
//! - `run_crawler` / `Connector`: scrape listing URLs and upsert them
//! - `run_discover`: collect listing URLs from search result pages
//! - `run_validate`: check the configuration file

pub mod crawl;
pub mod discover;
pub mod validate;

pub use crawl::{Connector, RunReport, UrlOutcome, run_crawler};
pub use discover::run_discover;
pub use validate::run_validate;
