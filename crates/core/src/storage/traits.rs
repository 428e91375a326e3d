use async_trait::async_trait;
use std::time::Duration;

use crate::error::OpError;
use crate::storage::types::CacheType;

/// Uniform key/value interface over Redis or filesystem (spec §4.10), isolated by
/// `cacheType` and a deployment-wide isolation prefix applied by the implementation.
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    async fn get(&self, cache_type: CacheType, key: &str) -> Result<Option<Vec<u8>>, OpError>;

    async fn set(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), OpError>;

    async fn delete(&self, cache_type: CacheType, key: &str) -> Result<(), OpError>;

    async fn exists(&self, cache_type: CacheType, key: &str) -> Result<bool, OpError>;

    async fn list(&self, cache_type: CacheType, prefix: &str) -> Result<Vec<String>, OpError>;

    /// Total bytes stored under `cache_type`, used to enforce the per-type size cap.
    async fn size(&self, cache_type: CacheType) -> Result<u64, OpError>;

    /// Atomically sets `key` to `value` only if it currently holds `expected`, used by the
    /// login coordinator's CAS lock refresh (spec §4.5 step 6). Returns whether the swap
    /// happened.
    async fn compare_and_swap(
        &self,
        cache_type: CacheType,
        key: &str,
        expected: &[u8],
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, OpError>;

    /// Sets `key` to `value` only if it does not already exist, used by the login
    /// coordinator's `SET ... NX` lock acquisition. Returns whether the set happened.
    async fn set_if_absent(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, OpError>;

    /// Remaining TTL in milliseconds, if the key exists.
    async fn ttl_millis(&self, cache_type: CacheType, key: &str) -> Result<Option<u64>, OpError>;
}
