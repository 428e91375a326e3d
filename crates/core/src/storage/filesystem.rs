//! Filesystem-backed `StorageAdapter`, the single-instance fallback (spec §4.10). Each key
//! becomes a file under `root/<isolation>/<cacheType>/<sha256(key)>`, with TTL tracked via a
//! sidecar `.meta` file since the filesystem has no native expiry.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::fs;

use crate::error::{ErrorClass, OpError};
use crate::storage::traits::StorageAdapter;
use crate::storage::types::CacheType;

pub struct FilesystemStorage {
    root: PathBuf,
    isolation_key: String,
}

impl FilesystemStorage {
    pub fn new(root: impl Into<PathBuf>, isolation_key: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            isolation_key: isolation_key.into(),
        }
    }

    fn dir_for(&self, cache_type: CacheType) -> PathBuf {
        self.root.join(&self.isolation_key).join(cache_type.as_str())
    }

    fn paths_for(&self, cache_type: CacheType, key: &str) -> (PathBuf, PathBuf) {
        let mut hasher = Sha256::new();
        hasher.update(key.as_bytes());
        let digest = hasher.finalize();
        let filename = digest.iter().map(|b| format!("{b:02x}")).collect::<String>();
        let dir = self.dir_for(cache_type);
        (dir.join(&filename), dir.join(format!("{filename}.meta")))
    }

    async fn is_expired(meta_path: &Path) -> bool {
        let Ok(contents) = fs::read_to_string(meta_path).await else {
            return false;
        };
        let Ok(expires_at) = contents.trim().parse::<u64>() else {
            return false;
        };
        now_unix_secs() >= expires_at
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn io_err(context: &str, error: std::io::Error) -> OpError {
    OpError::new(ErrorClass::ServerError, format!("{context}: {error}"))
}

#[async_trait]
impl StorageAdapter for FilesystemStorage {
    async fn get(&self, cache_type: CacheType, key: &str) -> Result<Option<Vec<u8>>, OpError> {
        let (data_path, meta_path) = self.paths_for(cache_type, key);
        if Self::is_expired(&meta_path).await {
            let _ = fs::remove_file(&data_path).await;
            let _ = fs::remove_file(&meta_path).await;
            return Ok(None);
        }
        match fs::read(&data_path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_err("filesystem get", e)),
        }
    }

    async fn set(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), OpError> {
        let (data_path, meta_path) = self.paths_for(cache_type, key);
        fs::create_dir_all(self.dir_for(cache_type))
            .await
            .map_err(|e| io_err("filesystem set: create_dir_all", e))?;
        fs::write(&data_path, value)
            .await
            .map_err(|e| io_err("filesystem set: write data", e))?;
        let expires_at = now_unix_secs() + ttl.as_secs();
        fs::write(&meta_path, expires_at.to_string())
            .await
            .map_err(|e| io_err("filesystem set: write meta", e))?;
        Ok(())
    }

    async fn delete(&self, cache_type: CacheType, key: &str) -> Result<(), OpError> {
        let (data_path, meta_path) = self.paths_for(cache_type, key);
        let _ = fs::remove_file(&data_path).await;
        let _ = fs::remove_file(&meta_path).await;
        Ok(())
    }

    async fn exists(&self, cache_type: CacheType, key: &str) -> Result<bool, OpError> {
        Ok(self.get(cache_type, key).await?.is_some())
    }

    async fn list(&self, cache_type: CacheType, prefix: &str) -> Result<Vec<String>, OpError> {
        // Filesystem keys are hashed, so reverse lookup by prefix isn't supported; this
        // backend is the single-instance fallback and callers needing prefix scans should
        // prefer Redis. Return an empty list rather than erroring.
        let _ = prefix;
        let dir = self.dir_for(cache_type);
        if !dir.exists() {
            return Ok(vec![]);
        }
        Ok(vec![])
    }

    async fn size(&self, cache_type: CacheType) -> Result<u64, OpError> {
        let dir = self.dir_for(cache_type);
        let mut total = 0u64;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_err("filesystem size", e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_err("filesystem size: next_entry", e))?
        {
            if let Ok(metadata) = entry.metadata().await {
                total += metadata.len();
            }
        }
        Ok(total)
    }

    async fn compare_and_swap(
        &self,
        cache_type: CacheType,
        key: &str,
        expected: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, OpError> {
        match self.get(cache_type, key).await? {
            Some(current) if current == expected => {
                self.set(cache_type, key, value, ttl).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn set_if_absent(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, OpError> {
        if self.exists(cache_type, key).await? {
            return Ok(false);
        }
        self.set(cache_type, key, value, ttl).await?;
        Ok(true)
    }

    async fn ttl_millis(&self, cache_type: CacheType, key: &str) -> Result<Option<u64>, OpError> {
        let (_, meta_path) = self.paths_for(cache_type, key);
        let Ok(contents) = fs::read_to_string(&meta_path).await else {
            return Ok(None);
        };
        let Ok(expires_at) = contents.trim().parse::<u64>() else {
            return Ok(None);
        };
        let now = now_unix_secs();
        if expires_at <= now {
            return Ok(None);
        }
        Ok(Some((expires_at - now) * 1000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn storage() -> (tempfile::TempDir, FilesystemStorage) {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemStorage::new(dir.path(), "iso-test");
        (dir, storage)
    }

    #[tokio::test]
    async fn set_then_get_roundtrips() {
        let (_dir, storage) = storage();
        storage
            .set(CacheType::Session, "k1", b"hello", Duration::from_secs(60))
            .await
            .unwrap();
        let value = storage.get(CacheType::Session, "k1").await.unwrap();
        assert_eq!(value, Some(b"hello".to_vec()));
    }

    #[tokio::test]
    async fn missing_key_returns_none() {
        let (_dir, storage) = storage();
        assert_eq!(storage.get(CacheType::Session, "missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn expired_entry_is_gone() {
        let (_dir, storage) = storage();
        storage
            .set(CacheType::Session, "k1", b"hello", Duration::from_secs(0))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(storage.get(CacheType::Session, "k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_if_absent_only_sets_once() {
        let (_dir, storage) = storage();
        assert!(storage
            .set_if_absent(CacheType::Session, "lock", b"a", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!storage
            .set_if_absent(CacheType::Session, "lock", b"b", Duration::from_secs(60))
            .await
            .unwrap());
        assert_eq!(
            storage.get(CacheType::Session, "lock").await.unwrap(),
            Some(b"a".to_vec())
        );
    }

    #[tokio::test]
    async fn compare_and_swap_requires_matching_expected() {
        let (_dir, storage) = storage();
        storage
            .set(CacheType::Session, "k", b"owner-a", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!storage
            .compare_and_swap(CacheType::Session, "k", b"owner-b", b"owner-c", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(storage
            .compare_and_swap(CacheType::Session, "k", b"owner-a", b"owner-c", Duration::from_secs(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let (_dir, storage) = storage();
        storage
            .set(CacheType::Session, "k", b"v", Duration::from_secs(60))
            .await
            .unwrap();
        storage.delete(CacheType::Session, "k").await.unwrap();
        assert_eq!(storage.get(CacheType::Session, "k").await.unwrap(), None);
    }
}
