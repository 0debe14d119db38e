// src/models/mod.rs

//! Domain models for the crawler.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod enums;
mod listing;
mod listing_id;
mod record;

// Re-export all public types
pub use config::{
    Config, ConnectorConfig, CrawlerConfig, FileStorageConfig, ImmobiliareConfig, LoggingConfig,
    MongoStorageConfig, StorageBackend, StorageConfig,
};
pub use enums::{
    ContractTerms, ContractType, CurrentAvailability, EnergyClass, Garden, OwnershipType,
    PropertyClass, PropertyCondition, PropertyType, TypeParts,
};
pub use listing::{ListingDetails, Location, RawListing, normalize_text};
pub use listing_id::{ListingId, Source};
pub use record::{Amenities, ListingRecord};

#[cfg(test)]
pub(crate) use listing::tests::sample_details;
