//! Translation cache wrapping the generic `StorageAdapter` with the permanent/bypass TTL
//! split (spec §6: "translation 90 d permanent / 7 d bypass").

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::storage::{CacheType, StorageAdapter};
use crate::translate::types::{TranslateError, TranslationEntry, TranslationStatus};

const PERMANENT_TTL: Duration = Duration::from_secs(90 * 24 * 3600);
const BYPASS_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

pub struct TranslationCache {
    storage: Arc<dyn StorageAdapter>,
}

impl TranslationCache {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Self {
        Self { storage }
    }

    pub async fn get(&self, key: &str) -> Result<Option<TranslationEntry>, TranslateError> {
        let bytes = self
            .storage
            .get(CacheType::Translation, key)
            .await
            .map_err(|e| TranslateError::Storage(e.to_string()))?;
        match bytes {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .map_err(|e| TranslateError::Storage(e.to_string())),
            None => Ok(None),
        }
    }

    pub async fn put(&self, key: &str, entry: &TranslationEntry, bypass: bool) -> Result<(), TranslateError> {
        let bytes = serde_json::to_vec(entry).map_err(|e| TranslateError::Storage(e.to_string()))?;
        let ttl = if bypass { BYPASS_TTL } else { PERMANENT_TTL };
        self.storage
            .set(CacheType::Translation, key, &bytes, ttl)
            .await
            .map_err(|e| TranslateError::Storage(e.to_string()))
    }

    pub async fn delete(&self, key: &str) -> Result<(), TranslateError> {
        self.storage
            .delete(CacheType::Translation, key)
            .await
            .map_err(|e| TranslateError::Storage(e.to_string()))
    }

    /// Builds a fresh in-flight entry, used when starting a new singleflight build.
    pub fn new_entry(
        base_key: &str,
        scoped_key: &str,
        runtime_key: &str,
        total_batches: u32,
        owner_config_hash: Option<String>,
    ) -> TranslationEntry {
        let now = Utc::now();
        TranslationEntry {
            base_key: base_key.to_string(),
            scoped_key: scoped_key.to_string(),
            runtime_key: runtime_key.to_string(),
            segments: vec![],
            status: TranslationStatus::InFlight,
            completed_batches: 0,
            total_batches,
            created_at: now,
            updated_at: now,
            owner_config_hash,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FilesystemStorage;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FilesystemStorage::new(dir.path(), "iso"));
        let cache = TranslationCache::new(storage);
        let entry = TranslationCache::new_entry("file_eng", "file_eng", "file_eng", 3, None);
        cache.put("file_eng", &entry, false).await.unwrap();
        let fetched = cache.get("file_eng").await.unwrap().unwrap();
        assert_eq!(fetched.total_batches, 3);
        assert_eq!(fetched.status, TranslationStatus::InFlight);
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FilesystemStorage::new(dir.path(), "iso"));
        let cache = TranslationCache::new(storage);
        assert!(cache.get("nope").await.unwrap().is_none());
    }
}
