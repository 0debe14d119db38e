//! MemoryStorage - HashMap-backed listing store for tests and dry runs.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::{ListingDetails, ListingId, ListingRecord, Source};
use crate::storage::{InsertOutcome, ListingStorage};

/// In-memory listing store. Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    records: Arc<RwLock<HashMap<ListingId, ListingDetails>>>,
    normalized: Arc<RwLock<HashMap<ListingId, ListingRecord>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored record, in no particular order.
    pub fn records(&self) -> Result<Vec<ListingDetails>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.values().cloned().collect())
    }

    /// Every stored normalized record, in no particular order.
    pub fn listing_records(&self) -> Result<Vec<ListingRecord>> {
        let normalized = self.normalized.read().map_err(|_| poisoned())?;
        Ok(normalized.values().cloned().collect())
    }
}

fn poisoned() -> AppError {
    AppError::storage("lock poisoned")
}

#[async_trait]
impl ListingStorage for MemoryStorage {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn lookup(&self, id: &ListingId) -> Result<Option<ListingDetails>> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(id).cloned())
    }

    async fn insert(&self, record: &ListingDetails) -> Result<InsertOutcome> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.contains_key(&record.id) {
            return Ok(InsertOutcome::Duplicate);
        }
        records.insert(record.id.clone(), record.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn replace(&self, record: &ListingDetails) -> Result<()> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        match records.get_mut(&record.id) {
            Some(stored) => {
                *stored = record.clone();
                Ok(())
            }
            None => Err(AppError::storage(format!("{}: no record to replace", record.id))),
        }
    }

    async fn count(&self, source: Source) -> Result<usize> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.keys().filter(|id| id.source() == source).count())
    }

    async fn store_record(&self, record: &ListingRecord) -> Result<()> {
        let mut normalized = self.normalized.write().map_err(|_| poisoned())?;
        normalized.insert(record.id.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::sample_details;

    #[tokio::test]
    async fn test_insert_and_lookup() {
        let storage = MemoryStorage::new();
        let record = sample_details();

        assert_eq!(storage.lookup(&record.id).await.unwrap(), None);
        assert_eq!(storage.insert(&record).await.unwrap(), InsertOutcome::Inserted);
        assert_eq!(storage.insert(&record).await.unwrap(), InsertOutcome::Duplicate);
        assert_eq!(storage.lookup(&record.id).await.unwrap(), Some(record));
        assert_eq!(storage.records().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_replace_requires_existing_record() {
        let storage = MemoryStorage::new();
        let err = storage.replace(&sample_details()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let storage = MemoryStorage::new();
        let clone = storage.clone();
        storage.insert(&sample_details()).await.unwrap();
        assert_eq!(clone.count(Source::Immobiliare).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_store_record_overwrites_by_id() {
        let storage = MemoryStorage::new();
        let listing = sample_details();
        let first = ListingRecord::from_details(&listing, listing.fetch_date);
        storage.store_record(&first).await.unwrap();

        let repriced = listing.with_price(400_000.0, "€ 400.000");
        let second = ListingRecord::from_details(&repriced, repriced.fetch_date);
        storage.store_record(&second).await.unwrap();

        let stored = storage.listing_records().unwrap();
        assert_eq!(stored, vec![second]);
        assert_eq!(storage.count(Source::Immobiliare).await.unwrap(), 0);
    }
}
