//! MongoDB storage backend.
//!
//! One collection per source (`immobiliare_listing`), one document per
//! listing with `_id` set to the serialized listing id. Normalized records
//! go to `immobiliare_record` under the same `_id`.

use async_trait::async_trait;
use mongodb::bson::{Document, doc};
use mongodb::error::{ErrorKind as MongoErrorKind, WriteFailure};
use mongodb::options::ClientOptions;
use mongodb::{Client, Collection, Database};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ListingDetails, ListingId, ListingRecord, MongoStorageConfig, Source};
use crate::storage::{InsertOutcome, ListingStorage, collection_name, record_collection_name};

/// Server error code for a unique index violation.
const DUPLICATE_KEY: i32 = 11000;

/// Stored document shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredListing {
    #[serde(rename = "_id")]
    key: String,
    #[serde(flatten)]
    listing: ListingDetails,
}

impl From<&ListingDetails> for StoredListing {
    fn from(listing: &ListingDetails) -> Self {
        Self {
            key: listing.id.key(),
            listing: listing.clone(),
        }
    }
}

/// Stored normalized record shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredRecord {
    #[serde(rename = "_id")]
    key: String,
    #[serde(flatten)]
    record: ListingRecord,
}

impl From<&ListingRecord> for StoredRecord {
    fn from(record: &ListingRecord) -> Self {
        Self {
            key: record.id.key(),
            record: record.clone(),
        }
    }
}

fn id_filter(id: &ListingId) -> Document {
    doc! { "_id": id.key() }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        MongoErrorKind::Write(WriteFailure::WriteError(e)) if e.code == DUPLICATE_KEY
    )
}

/// Listing store backed by a MongoDB database.
pub struct MongoStorage {
    database: Database,
}

impl MongoStorage {
    /// Connect with the configured pool sizes and verify the server answers.
    pub async fn connect(config: &MongoStorageConfig) -> Result<Self> {
        let mut options = ClientOptions::parse(&config.connection_string)
            .await
            .map_err(|e| AppError::config(format!("invalid MongoDB connection string: {e}")))?;
        options.max_pool_size = Some(config.max_pool_size);
        options.min_pool_size = Some(config.min_pool_size);
        options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        let client = Client::with_options(options).map_err(AppError::storage)?;
        let database = client.database(&config.database);
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| AppError::storage(format!("MongoDB ping failed: {e}")))?;
        log::info!("Connected to MongoDB database '{}'", config.database);

        Ok(Self { database })
    }

    fn collection(&self, source: Source) -> Collection<StoredListing> {
        self.database.collection(&collection_name(source))
    }

    fn record_collection(&self, source: Source) -> Collection<StoredRecord> {
        self.database.collection(&record_collection_name(source))
    }
}

#[async_trait]
impl ListingStorage for MongoStorage {
    fn name(&self) -> &'static str {
        "mongodb"
    }

    async fn lookup(&self, id: &ListingId) -> Result<Option<ListingDetails>> {
        let found = self
            .collection(id.source())
            .find_one(id_filter(id))
            .await
            .map_err(AppError::storage)?;
        Ok(found.map(|stored| stored.listing))
    }

    async fn insert(&self, record: &ListingDetails) -> Result<InsertOutcome> {
        match self
            .collection(record.id.source())
            .insert_one(StoredListing::from(record))
            .await
        {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(e) if is_duplicate_key(&e) => Ok(InsertOutcome::Duplicate),
            Err(e) => Err(AppError::storage(e)),
        }
    }

    async fn replace(&self, record: &ListingDetails) -> Result<()> {
        let result = self
            .collection(record.id.source())
            .replace_one(id_filter(&record.id), StoredListing::from(record))
            .await
            .map_err(AppError::storage)?;
        if result.matched_count == 0 {
            return Err(AppError::storage(format!(
                "{}: no record to replace",
                record.id
            )));
        }
        Ok(())
    }

    async fn count(&self, source: Source) -> Result<usize> {
        let n = self
            .collection(source)
            .count_documents(doc! {})
            .await
            .map_err(AppError::storage)?;
        Ok(n as usize)
    }

    async fn store_record(&self, record: &ListingRecord) -> Result<()> {
        self.record_collection(record.source)
            .replace_one(id_filter(&record.id), StoredRecord::from(record))
            .upsert(true)
            .await
            .map_err(AppError::storage)?;
        Ok(())
    }
}
