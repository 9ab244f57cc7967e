//! In-memory content store.
//!
//! Reference implementation of [`ContentStore`] for tests and embedded use.
//! Records live behind a `tokio` `RwLock` with a monotonically increasing id
//! sequence starting at 1, so the absent sentinel (`-1`) can never collide
//! with a real identifier.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{ContentStore, CreateRecordParams, RecordFilter, StoreError};
use crate::domain::records::{RecordStatus, StoredRecord};

#[derive(Clone, Default)]
pub struct MemoryContentStore {
    records: Arc<RwLock<HashMap<i64, StoredRecord>>>,
    sequence: Arc<AtomicI64>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record without going through [`ContentStore::create`], e.g. a
    /// record written by another code path whose payload carries no
    /// authenticity flag.
    pub async fn insert_record(
        &self,
        payload: impl Into<String>,
        status: RecordStatus,
        tags: Vec<String>,
    ) -> i64 {
        let id = self.next_id();
        let record = StoredRecord {
            id,
            title: String::new(),
            payload: payload.into(),
            status,
            tags,
            created_at: OffsetDateTime::now_utc(),
        };
        self.records.write().await.insert(id, record);
        id
    }

    pub async fn delete(&self, id: i64) -> bool {
        self.records.write().await.remove(&id).is_some()
    }

    fn next_id(&self) -> i64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find(&self, filter: &RecordFilter) -> Result<Vec<StoredRecord>, StoreError> {
        let records = self.records.read().await;
        let mut matches: Vec<StoredRecord> = records
            .values()
            .filter(|record| record.tags.contains(&filter.tag))
            .filter(|record| filter.statuses.contains(&record.status))
            .cloned()
            .collect();

        // Newest first; ids break ties because they are monotonic.
        matches.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        matches.truncate(filter.limit as usize);
        Ok(matches)
    }

    async fn create(&self, params: CreateRecordParams) -> Result<i64, StoreError> {
        let id = self.next_id();
        let record = StoredRecord {
            id,
            title: params.title,
            payload: params.payload,
            status: params.status,
            tags: params.tags,
            created_at: OffsetDateTime::now_utc(),
        };
        self.records.write().await.insert(id, record);
        Ok(id)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<StoredRecord>, StoreError> {
        Ok(self.records.read().await.get(&id).cloned())
    }
}
