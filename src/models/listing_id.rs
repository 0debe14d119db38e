//! Listing identity: data source tag plus the source's own listing key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Known listing data sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Immobiliare,
}

impl Source {
    /// All supported sources.
    pub const ALL: [Source; 1] = [Source::Immobiliare];

    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Immobiliare => "immobiliare",
        }
    }

    /// Parse a raw source tag (case-insensitive, surrounding whitespace ignored).
    pub fn from_tag(tag: &str) -> Result<Self> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(AppError::validation("source tag is empty"));
        }
        Self::ALL
            .into_iter()
            .find(|s| s.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| AppError::validation(format!("unknown source '{tag}'")))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifier of a listing across runs.
///
/// Equality and hashing are structural over `(source, source_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ListingId {
    source: Source,
    source_id: String,
}

impl ListingId {
    /// Build an identifier from a known source and a source-native key.
    pub fn new(source: Source, source_id: impl Into<String>) -> Result<Self> {
        let source_id = source_id.into().trim().to_string();
        let id = Self { source, source_id };
        id.validate()?;
        Ok(id)
    }

    /// Derive an identifier from raw strings as found by a scraper.
    pub fn derive(raw_source: &str, raw_key: &str) -> Result<Self> {
        Self::new(Source::from_tag(raw_source)?, raw_key)
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Serialized storage key, `"{source}:{source_id}"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.source, self.source_id)
    }

    /// Check the identifier invariants.
    ///
    /// Values that arrive through deserialization skip [`ListingId::new`], so
    /// storage re-checks them before any write.
    pub fn validate(&self) -> Result<()> {
        if self.source_id.trim().is_empty() {
            return Err(AppError::validation(format!(
                "listing key for source '{}' is empty",
                self.source
            )));
        }
        if self.source_id.contains(':') {
            return Err(AppError::validation(format!(
                "listing key '{}' must not contain ':'",
                self.source_id
            )));
        }
        Ok(())
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.source_id)
    }
}

impl FromStr for ListingId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        let (source, key) = s
            .split_once(':')
            .ok_or_else(|| AppError::validation(format!("'{s}' is not of the form source:key")))?;
        Self::derive(source, key)
    }
}
