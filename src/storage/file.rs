//! Local filesystem storage implementation.
//!
//! Each collection is a JSON Lines file with one row per listing:
//!
//! ```text
//! {base_path}/
//! ├── immobiliare_listing.jsonl
//! └── immobiliare_record.jsonl
//! ```
//!
//! Rows are keyed by the serialized listing id. Every write rewrites the
//! whole file through a temp file and a rename, so readers never see a
//! partial collection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{ListingDetails, ListingId, ListingRecord, Source};
use crate::storage::{InsertOutcome, ListingStorage, collection_name, record_collection_name};

/// One line of a collection file.
#[derive(Debug, Serialize, Deserialize)]
struct Row<T> {
    key: String,
    value: T,
}

type Collection<T> = BTreeMap<String, T>;

/// Flat-file listing store.
pub struct FileStorage {
    root_dir: PathBuf,
    // Serializes read-modify-write cycles within the process.
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Create a FileStorage rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    /// Path of the listing collection file for `source`.
    pub fn collection_path(&self, source: Source) -> PathBuf {
        self.root_dir
            .join(format!("{}.jsonl", collection_name(source)))
    }

    /// Path of the normalized record file for `source`.
    pub fn record_path(&self, source: Source) -> PathBuf {
        self.root_dir
            .join(format!("{}.jsonl", record_collection_name(source)))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("jsonl.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn load<T: DeserializeOwned>(&self, path: &Path) -> Result<Collection<T>> {
        let Some(bytes) = self.read_bytes(path).await? else {
            return Ok(Collection::new());
        };
        let text = String::from_utf8(bytes)
            .map_err(|e| AppError::storage(format!("{}: {e}", path.display())))?;

        let mut collection = Collection::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let row: Row<T> = serde_json::from_str(line).map_err(|e| {
                AppError::storage(format!("{} line {}: {e}", path.display(), n + 1))
            })?;
            collection.insert(row.key, row.value);
        }
        Ok(collection)
    }

    async fn save<T: Serialize>(&self, path: &Path, collection: &Collection<T>) -> Result<()> {
        let mut buf = Vec::new();
        for (key, value) in collection {
            let row = Row {
                key: key.clone(),
                value,
            };
            serde_json::to_writer(&mut buf, &row).map_err(AppError::storage)?;
            buf.push(b'\n');
        }
        self.write_bytes(path, &buf).await?;
        log::debug!("{} rows written to {}", collection.len(), path.display());
        Ok(())
    }

    async fn load_listings(&self, source: Source) -> Result<Collection<ListingDetails>> {
        self.load(&self.collection_path(source)).await
    }
}

#[async_trait]
impl ListingStorage for FileStorage {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn lookup(&self, id: &ListingId) -> Result<Option<ListingDetails>> {
        let collection = self.load_listings(id.source()).await?;
        Ok(collection.get(&id.key()).cloned())
    }

    async fn insert(&self, record: &ListingDetails) -> Result<InsertOutcome> {
        let _guard = self.write_lock.lock().await;
        let path = self.collection_path(record.id.source());
        let mut collection: Collection<ListingDetails> = self.load(&path).await?;
        let key = record.id.key();
        if collection.contains_key(&key) {
            return Ok(InsertOutcome::Duplicate);
        }
        collection.insert(key, record.clone());
        self.save(&path, &collection).await?;
        Ok(InsertOutcome::Inserted)
    }

    async fn replace(&self, record: &ListingDetails) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.collection_path(record.id.source());
        let mut collection: Collection<ListingDetails> = self.load(&path).await?;
        match collection.get_mut(&record.id.key()) {
            Some(stored) => *stored = record.clone(),
            None => {
                return Err(AppError::storage(format!(
                    "{}: no record to replace",
                    record.id
                )));
            }
        }
        self.save(&path, &collection).await
    }

    async fn count(&self, source: Source) -> Result<usize> {
        Ok(self.load_listings(source).await?.len())
    }

    async fn store_record(&self, record: &ListingRecord) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let path = self.record_path(record.source);
        let mut collection: Collection<ListingRecord> = self.load(&path).await?;
        collection.insert(record.id.key(), record.clone());
        self.save(&path, &collection).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::sample_details;
    use crate::storage::{PersistOutcome, persist};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_collection() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());
        let record = sample_details();
        assert_eq!(storage.lookup(&record.id).await.unwrap(), None);
        assert_eq!(storage.count(Source::Immobiliare).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        let record = sample_details();
        {
            let storage = FileStorage::new(tmp.path());
            assert_eq!(persist(&storage, &record).await.unwrap(), PersistOutcome::Inserted);
        }

        let reopened = FileStorage::new(tmp.path());
        let stored = reopened.lookup(&record.id).await.unwrap().unwrap();
        assert!(stored.same_attributes(&record));
        assert_eq!(
            persist(&reopened, &record).await.unwrap(),
            PersistOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_full_precision_coordinates_reload_unchanged() {
        let tmp = TempDir::new().unwrap();
        let mut record = sample_details().with_price(312_499.99, "€ 312.500");
        record.location.latitude = Some(41.692710485330004);
        record.location.longitude = Some(12.483929792046547);
        record.surface_sqm = Some(87.33000000000001);
        {
            let storage = FileStorage::new(tmp.path());
            assert_eq!(persist(&storage, &record).await.unwrap(), PersistOutcome::Inserted);
        }

        let reopened = FileStorage::new(tmp.path());
        let stored = reopened.lookup(&record.id).await.unwrap().unwrap();
        assert_eq!(stored.location.latitude, Some(41.692710485330004));
        assert_eq!(stored.location.longitude, record.location.longitude);
        assert_eq!(stored.fingerprint(), record.fingerprint());
        assert_eq!(
            persist(&reopened, &record).await.unwrap(),
            PersistOutcome::Unchanged
        );
    }

    #[tokio::test]
    async fn test_collection_path_is_under_root_dir() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path().join("data"));
        assert_eq!(storage.root_dir(), tmp.path().join("data"));
        assert_eq!(
            storage.collection_path(Source::Immobiliare),
            tmp.path().join("data").join("immobiliare_listing.jsonl")
        );
    }

    #[tokio::test]
    async fn test_file_layout_is_one_row_per_listing() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());
        let record = sample_details();
        persist(&storage, &record).await.unwrap();
        persist(&storage, &record.clone().with_price(1.0, "€ 1"))
            .await
            .unwrap();

        let path = tmp.path().join("immobiliare_listing.jsonl");
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"key\":\"immobiliare:122361988\""));
        assert!(content.contains("\"property_type\":\"apartment\""));
        assert!(!tmp.path().join("immobiliare_listing.jsonl.tmp").exists());
    }

    #[tokio::test]
    async fn test_records_live_in_their_own_collection() {
        let tmp = TempDir::new().unwrap();
        let storage = FileStorage::new(tmp.path());
        let listing = sample_details();
        persist(&storage, &listing).await.unwrap();

        let record = ListingRecord::from_details(&listing, listing.fetch_date);
        storage.store_record(&record).await.unwrap();
        storage.store_record(&record).await.unwrap();

        let content = std::fs::read_to_string(tmp.path().join("immobiliare_record.jsonl")).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"ownership_type\":\"full_ownership\""));
        assert!(content.contains("\"has_armored_door\":true"));
        assert_eq!(storage.count(Source::Immobiliare).await.unwrap(), 1);

        let row: Row<ListingRecord> = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(row.value, record);
    }

    #[tokio::test]
    async fn test_corrupt_file_is_storage_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("immobiliare_listing.jsonl"), "{not json\n").unwrap();
        let storage = FileStorage::new(tmp.path());
        let err = storage.count(Source::Immobiliare).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }
}
