//! Redis-backed `StorageAdapter`, the shared-across-instances backend (spec §4.10). Keys are
//! namespaced `<isolation>:<cacheType>:<key>` (spec §6). The compare-and-swap used by the
//! login coordinator's lock refresh is implemented as a Lua script so the read-compare-write
//! is atomic from Redis's perspective.

use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::error::{ErrorClass, OpError};
use crate::storage::traits::StorageAdapter;
use crate::storage::types::CacheType;

/// `if redis.call('get', KEYS[1]) == ARGV[1] then
///    redis.call('set', KEYS[1], ARGV[2], 'PX', ARGV[3]); return 1
///  else return 0 end`
const CAS_SCRIPT: &str = r#"
if redis.call('get', KEYS[1]) == ARGV[1] then
  redis.call('set', KEYS[1], ARGV[2], 'PX', ARGV[3])
  return 1
else
  return 0
end
"#;

pub struct RedisStorage {
    manager: ConnectionManager,
    isolation_key: String,
}

impl RedisStorage {
    pub async fn connect(url: &str, isolation_key: impl Into<String>) -> Result<Self, OpError> {
        let client = redis::Client::open(url)
            .map_err(|e| OpError::new(ErrorClass::ServerError, format!("redis url invalid: {e}")))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| OpError::new(ErrorClass::ServiceUnavailable, format!("redis connect failed: {e}")))?;
        Ok(Self {
            manager,
            isolation_key: isolation_key.into(),
        })
    }

    fn namespaced(&self, cache_type: CacheType, key: &str) -> String {
        format!("{}:{}:{}", self.isolation_key, cache_type.as_str(), key)
    }

    fn map_err(context: &str, error: redis::RedisError) -> OpError {
        let class = if error.is_timeout() || error.is_connection_dropped() {
            ErrorClass::Timeout
        } else if error.is_io_error() {
            ErrorClass::Network
        } else {
            ErrorClass::DatabaseError
        };
        OpError::new(class, format!("{context}: {error}"))
    }
}

#[async_trait]
impl StorageAdapter for RedisStorage {
    async fn get(&self, cache_type: CacheType, key: &str) -> Result<Option<Vec<u8>>, OpError> {
        let mut conn = self.manager.clone();
        conn.get(self.namespaced(cache_type, key))
            .await
            .map_err(|e| Self::map_err("redis get", e))
    }

    async fn set(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<(), OpError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .set_ex(
                self.namespaced(cache_type, key),
                value,
                ttl.as_secs().max(1),
            )
            .await
            .map_err(|e| Self::map_err("redis set", e))?;
        Ok(())
    }

    async fn delete(&self, cache_type: CacheType, key: &str) -> Result<(), OpError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .del(self.namespaced(cache_type, key))
            .await
            .map_err(|e| Self::map_err("redis delete", e))?;
        Ok(())
    }

    async fn exists(&self, cache_type: CacheType, key: &str) -> Result<bool, OpError> {
        let mut conn = self.manager.clone();
        conn.exists(self.namespaced(cache_type, key))
            .await
            .map_err(|e| Self::map_err("redis exists", e))
    }

    async fn list(&self, cache_type: CacheType, prefix: &str) -> Result<Vec<String>, OpError> {
        let mut conn = self.manager.clone();
        let pattern = self.namespaced(cache_type, &format!("{prefix}*"));
        let prefix_len = self.namespaced(cache_type, "").len();
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| Self::map_err("redis list", e))?;
        Ok(keys.into_iter().map(|k| k[prefix_len..].to_string()).collect())
    }

    async fn size(&self, cache_type: CacheType) -> Result<u64, OpError> {
        let mut conn = self.manager.clone();
        let pattern = self.namespaced(cache_type, "*");
        let keys: Vec<String> = conn
            .keys(pattern)
            .await
            .map_err(|e| Self::map_err("redis size: keys", e))?;
        let mut total = 0u64;
        for key in keys {
            let len: Option<u64> = conn
                .strlen(&key)
                .await
                .map_err(|e| Self::map_err("redis size: strlen", e))?;
            total += len.unwrap_or(0);
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
        let mut conn = self.manager.clone();
        let result: i32 = Script::new(CAS_SCRIPT)
            .key(self.namespaced(cache_type, key))
            .arg(expected)
            .arg(value)
            .arg(ttl.as_millis() as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("redis compare_and_swap", e))?;
        Ok(result == 1)
    }

    async fn set_if_absent(
        &self,
        cache_type: CacheType,
        key: &str,
        value: &[u8],
        ttl: Duration,
    ) -> Result<bool, OpError> {
        let mut conn = self.manager.clone();
        let result: Option<String> = redis::cmd("SET")
            .arg(self.namespaced(cache_type, key))
            .arg(value)
            .arg("PX")
            .arg(ttl.as_millis() as u64)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("redis set_if_absent", e))?;
        Ok(result.is_some())
    }

    async fn ttl_millis(&self, cache_type: CacheType, key: &str) -> Result<Option<u64>, OpError> {
        let mut conn = self.manager.clone();
        let ttl: i64 = conn
            .pttl(self.namespaced(cache_type, key))
            .await
            .map_err(|e| Self::map_err("redis ttl_millis", e))?;
        Ok(if ttl >= 0 { Some(ttl as u64) } else { None })
    }
}

// Exercised against a real Redis instance in integration tests (requires a live server, so
// it isn't part of the unit suite here); `FilesystemStorage`'s tests cover the shared
// `StorageAdapter` contract in-process.
