//! In-memory [`StorageAdapter`] for testing the login coordinator, translation cache, and
//! stream bus without Redis or the filesystem.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::{ErrorClass, OpError};
use crate::storage::{CacheType, StorageAdapter};

struct Entry {
    value: Vec<u8>,
    expires_at: Option<Instant>,
}

/// In-memory storage adapter. TTLs are honored on read (lazy expiry), matching the
/// filesystem adapter's observable behavior closely enough for unit tests.
pub struct MockStorage {
    entries: RwLock<HashMap<(CacheType, String), Entry>>,
    next_error: RwLock<Option<ErrorClass>>,
}

impl Default for MockStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStorage {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            next_error: RwLock::new(None),
        }
    }

    pub async fn set_next_error(&self, class: ErrorClass) {
        *self.next_error.write().await = Some(class);
    }

    async fn take_error(&self) -> Option<OpError> {
        self.next_error
            .write()
            .await
            .take()
            .map(|class| OpError::new(class, "injected mock storage error"))
    }

    fn expired(entry: &Entry) -> bool {
        entry.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

#[async_trait]
impl StorageAdapter for MockStorage {
    async fn get(&self, cache_type: CacheType, key: &str) -> Result<Option<Vec<u8>>, OpError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        let mut entries = self.entries.write().await;
        let map_key = (cache_type, key.to_string());
        if entries.get(&map_key).is_some_and(Self::expired) {
            entries.remove(&map_key);
            return Ok(None);
        }
        Ok(entries.get(&map_key).map(|entry| entry.value.clone()))
    }

    async fn set(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), OpError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.entries.write().await.insert(
            (cache_type, key.to_string()),
            Entry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, cache_type: CacheType, key: &str) -> Result<(), OpError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        self.entries.write().await.remove(&(cache_type, key.to_string()));
        Ok(())
    }

    async fn exists(&self, cache_type: CacheType, key: &str) -> Result<bool, OpError> {
        Ok(self.get(cache_type, key).await?.is_some())
    }

    async fn list(&self, cache_type: CacheType, prefix: &str) -> Result<Vec<String>, OpError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        let entries = self.entries.read().await;
        Ok(entries
            .keys()
            .filter(|(ct, key)| *ct == cache_type && key.starts_with(prefix))
            .map(|(_, key)| key.clone())
            .collect())
    }

    async fn size(&self, cache_type: CacheType) -> Result<u64, OpError> {
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|((ct, _), _)| *ct == cache_type)
            .map(|(_, entry)| entry.value.len() as u64)
            .sum())
    }

    async fn compare_and_swap(
        &self,
        cache_type: CacheType,
        key: &str,
        expected: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, OpError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        let mut entries = self.entries.write().await;
        let map_key = (cache_type, key.to_string());
        let matches = entries
            .get(&map_key)
            .filter(|entry| !Self::expired(entry))
            .is_some_and(|entry| entry.value == expected);
        if matches {
            entries.insert(
                map_key,
                Entry {
                    value: value.to_vec(),
                    expires_at: Some(Instant::now() + ttl),
                },
            );
        }
        Ok(matches)
    }

    async fn set_if_absent(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, OpError> {
        if let Some(error) = self.take_error().await {
            return Err(error);
        }
        let mut entries = self.entries.write().await;
        let map_key = (cache_type, key.to_string());
        if entries.get(&map_key).is_some_and(|entry| !Self::expired(entry)) {
            return Ok(false);
        }
        entries.insert(
            map_key,
            Entry {
                value: value.to_vec(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn ttl_millis(&self, cache_type: CacheType, key: &str) -> Result<Option<u64>, OpError> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&(cache_type, key.to_string()))
            .filter(|entry| !Self::expired(entry))
            .and_then(|entry| entry.expires_at)
            .map(|at| at.saturating_duration_since(Instant::now()).as_millis() as u64))
    }
}
