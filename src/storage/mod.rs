//! Storage abstractions for listing persistence.
//!
//! A backend holds one record per [`ListingId`] in a collection named after
//! the listing source. [`persist`] is the upsert every caller goes through:
//!
//! ```text
//! validate ──▶ lookup ──▶ none ──────────▶ insert  ──▶ Inserted
//!                     └─▶ same attributes ────────────▶ Unchanged
//!                     └─▶ changed ───────▶ replace ──▶ Updated
//! ```
//!
//! Backends also keep the normalized [`ListingRecord`] of each listing in a
//! second collection ([`record_collection_name`]), overwritten whenever the
//! listing is inserted or updated.

pub mod file;
pub mod memory;
#[cfg(feature = "mongodb")]
pub mod mongo;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    ListingDetails, ListingId, ListingRecord, Source, StorageBackend, StorageConfig,
};

pub use file::FileStorage;
pub use memory::MemoryStorage;
#[cfg(feature = "mongodb")]
pub use mongo::MongoStorage;

/// Result of a raw insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A record with the same id already exists.
    Duplicate,
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersistOutcome {
    Inserted,
    Updated,
    Unchanged,
}

impl PersistOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            PersistOutcome::Inserted => "inserted",
            PersistOutcome::Updated => "updated",
            PersistOutcome::Unchanged => "unchanged",
        }
    }
}

impl fmt::Display for PersistOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for listing storage backends.
///
/// Implementations keep at most one record per id and report every backend
/// failure as [`AppError::Storage`](crate::error::AppError::Storage).
#[async_trait]
pub trait ListingStorage: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// The stored record for `id`, if any.
    async fn lookup(&self, id: &ListingId) -> Result<Option<ListingDetails>>;

    /// Store a record whose id is not yet present.
    async fn insert(&self, record: &ListingDetails) -> Result<InsertOutcome>;

    /// Overwrite the stored record with the same id.
    async fn replace(&self, record: &ListingDetails) -> Result<()>;

    /// Number of stored records for `source`.
    async fn count(&self, source: Source) -> Result<usize>;

    /// Insert or overwrite the normalized record with the same id.
    async fn store_record(&self, record: &ListingRecord) -> Result<()>;
}

/// Collection holding the listings of one source, e.g. `immobiliare_listing`.
pub fn collection_name(source: Source) -> String {
    format!("{}_listing", source.as_str())
}

/// Collection holding the normalized records of one source, e.g.
/// `immobiliare_record`.
pub fn record_collection_name(source: Source) -> String {
    format!("{}_record", source.as_str())
}

/// Insert `record`, or update the stored copy if any attribute changed.
///
/// Invalid records are rejected before the backend is touched.
pub async fn persist(
    storage: &dyn ListingStorage,
    record: &ListingDetails,
) -> Result<PersistOutcome> {
    record.validate()?;

    match storage.lookup(&record.id).await? {
        None => match storage.insert(record).await? {
            InsertOutcome::Inserted => Ok(PersistOutcome::Inserted),
            InsertOutcome::Duplicate => {
                // Another writer stored the id between lookup and insert.
                log::debug!("{}: duplicate on insert, replacing", record.id);
                storage.replace(record).await?;
                Ok(PersistOutcome::Updated)
            }
        },
        Some(existing) if existing.same_attributes(record) => Ok(PersistOutcome::Unchanged),
        Some(_) => {
            storage.replace(record).await?;
            Ok(PersistOutcome::Updated)
        }
    }
}

/// Open the backend selected in `config`.
pub async fn open(config: &StorageConfig) -> Result<Arc<dyn ListingStorage>> {
    match config.backend {
        StorageBackend::Memory => Ok(Arc::new(MemoryStorage::new())),
        StorageBackend::File => {
            let storage = FileStorage::new(&config.file.base_path);
            log::info!("File storage rooted at {}", storage.root_dir().display());
            Ok(Arc::new(storage))
        }
        #[cfg(feature = "mongodb")]
        StorageBackend::Mongodb => Ok(Arc::new(MongoStorage::connect(&config.mongodb).await?)),
        #[cfg(not(feature = "mongodb"))]
        StorageBackend::Mongodb => Err(crate::error::AppError::config(
            "storage backend 'mongodb' requires the `mongodb` feature",
        )),
    }
}
