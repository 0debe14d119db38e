//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use self::url::{extract_listing_key, resolve_url};
