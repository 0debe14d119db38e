// src/error.rs

//! Unified error handling for the crawler.
//!
//! Every failure maps to exactly one [`ErrorKind`], which is what the
//! connector reports per URL.

use std::fmt;

use thiserror::Error;

/// Result type alias for crawler operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// The failure taxonomy reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ErrorKind {
    /// Bad or missing settings
    Configuration,
    /// Network, timeout or unreachable source
    Scraping,
    /// Unexpected page structure
    Parsing,
    /// Extracted data fails schema checks
    Validation,
    /// Backend unreachable or write rejected
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Scraping => "scraping",
            ErrorKind::Parsing => "parsing",
            ErrorKind::Validation => "validation",
            ErrorKind::Storage => "storage",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fetching a page failed
    #[error("Scraping error for {url}: {message}")]
    Scraping { url: String, message: String },

    /// Page did not have the expected structure
    #[error("Parsing error for {url}: {message}")]
    Parsing { url: String, message: String },

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage backend error
    #[error("Storage error: {0}")]
    Storage(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },
}

impl AppError {
    /// Classify this error into the reporting taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Config(_) | AppError::Toml(_) => ErrorKind::Configuration,
            AppError::Scraping { .. } | AppError::Http(_) => ErrorKind::Scraping,
            AppError::Parsing { .. } | AppError::Json(_) | AppError::Selector { .. } => {
                ErrorKind::Parsing
            }
            AppError::Validation(_) | AppError::Url(_) => ErrorKind::Validation,
            AppError::Storage(_) | AppError::Io(_) => ErrorKind::Storage,
        }
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a scraping error for a URL.
    pub fn scraping(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Scraping {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a parsing error for a URL.
    pub fn parsing(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parsing {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a storage error carrying the underlying cause.
    pub fn storage(message: impl fmt::Display) -> Self {
        Self::Storage(message.to_string())
    }
}
