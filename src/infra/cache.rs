//! In-memory settings cache.
//!
//! Reference implementation of [`SettingsCache`] for single-process
//! deployments and tests. Multi-worker deployments should adapt their shared
//! cache service instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::repos::{CacheError, SettingsCache};

#[derive(Clone, Copy)]
struct CacheEntry {
    value: i64,
    expires_at: Instant,
}

#[derive(Clone, Default)]
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn invalidate_all(&self) {
        let mut guard = self.entries.write().await;
        guard.clear();
    }
}

#[async_trait]
impl SettingsCache for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<i64>, CacheError> {
        let now = Instant::now();
        {
            let guard = self.entries.read().await;
            match guard.get(key) {
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value)),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Expired entry; drop it lazily.
        let mut guard = self.entries.write().await;
        if guard.get(key).is_some_and(|entry| entry.expires_at <= now) {
            guard.remove(key);
        }
        Ok(None)
    }

    async fn set(&self, key: &str, value: i64, ttl: Duration) -> Result<(), CacheError> {
        let entry = CacheEntry {
            value,
            expires_at: Instant::now() + ttl,
        };
        let mut guard = self.entries.write().await;
        guard.insert(key.to_string(), entry);
        Ok(())
    }
}
