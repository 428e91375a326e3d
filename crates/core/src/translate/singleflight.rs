//! At-most-one in-flight builder per `runtimeKey`, deployment-wide (spec §5: "Redis locks
//! and translation cache entries are deployment-global"). Ownership is a `StorageAdapter`
//! lock keyed like the login coordinator's (`set_if_absent`/`compare_and_swap`), with a TTL
//! that acts as the liveness marker for a crashed builder's half-written entry (spec §4.8
//! Invalidation) — if the owning instance dies mid-build, the lock simply expires and the
//! next caller on any instance becomes the new owner. Progress events (`TranslationEvent`)
//! stay a purely local `broadcast` channel, the same split the audit bus uses: only a caller
//! on the *same* instance as the owner can subscribe to its live events; a caller on another
//! instance is a `RemoteFollower` and polls the cache instead.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tracing::warn;

use crate::storage::{CacheType, StorageAdapter};

/// How long a build's ownership lock lives before it's considered abandoned.
const LOCK_TTL: Duration = Duration::from_secs(90);
/// How often the owner refreshes the lock's TTL while still building, so a translation that
/// legitimately runs longer than `LOCK_TTL` doesn't lose ownership out from under it.
const LOCK_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

fn lock_key(runtime_key: &str) -> String {
    format!("lock:translate:{runtime_key}")
}

#[derive(Debug, Clone)]
pub enum TranslationEvent {
    Partial { completed_batches: u64, total_batches: u32 },
    Complete,
    Failed(String),
}

pub enum BuildRole {
    /// This caller holds the distributed lock and is the sole builder; publish progress on
    /// the sender as batches land.
    Owner(broadcast::Sender<TranslationEvent>),
    /// Another caller on this same instance already owns the build; subscribe and wait.
    Follower(broadcast::Receiver<TranslationEvent>),
    /// Another instance owns the build. No local channel to subscribe to — the caller must
    /// poll the cache for progress instead.
    RemoteFollower,
}

pub struct Singleflight {
    storage: Arc<dyn StorageAdapter>,
    owner_id: String,
    local: RwLock<HashMap<String, broadcast::Sender<TranslationEvent>>>,
}

impl Singleflight {
    pub fn new(storage: Arc<dyn StorageAdapter>) -> Arc<Self> {
        Arc::new(Self {
            storage,
            owner_id: format!("{}-{}", std::process::id(), uuid::Uuid::new_v4()),
            local: RwLock::new(HashMap::new()),
        })
    }

    /// Joins or starts a build for `runtime_key`. Exactly one caller deployment-wide
    /// receives `BuildRole::Owner`; every other caller on the owning instance receives
    /// `Follower`, and callers on any other instance receive `RemoteFollower`.
    pub async fn acquire(&self, runtime_key: &str) -> BuildRole {
        {
            let map = self.local.read().await;
            if let Some(sender) = map.get(runtime_key) {
                return BuildRole::Follower(sender.subscribe());
            }
        }

        let key = lock_key(runtime_key);
        let acquired = match self
            .storage
            .set_if_absent(CacheType::Session, &key, self.owner_id.as_bytes(), LOCK_TTL)
            .await
        {
            Ok(acquired) => acquired,
            Err(error) => {
                warn!(
                    runtime_key,
                    error = %error,
                    "singleflight lost shared store, degrading to local-only ownership"
                );
                true
            }
        };

        if !acquired {
            return BuildRole::RemoteFollower;
        }

        let mut map = self.local.write().await;
        if let Some(sender) = map.get(runtime_key) {
            return BuildRole::Follower(sender.subscribe());
        }
        let (sender, _receiver) = broadcast::channel(64);
        map.insert(runtime_key.to_string(), sender.clone());
        BuildRole::Owner(sender)
    }

    /// Refreshes the distributed lock's TTL at `LOCK_REFRESH_INTERVAL` until cancelled.
    /// Spawned by the owner alongside the build and aborted once it finishes.
    pub fn spawn_lock_refresh(self: &Arc<Self>, runtime_key: &str) -> tokio::task::JoinHandle<()> {
        let this = self.clone();
        let runtime_key = runtime_key.to_string();
        tokio::spawn(async move {
            let key = lock_key(&runtime_key);
            loop {
                tokio::time::sleep(LOCK_REFRESH_INTERVAL).await;
                let refreshed = this
                    .storage
                    .compare_and_swap(
                        CacheType::Session,
                        &key,
                        this.owner_id.as_bytes(),
                        this.owner_id.as_bytes(),
                        LOCK_TTL,
                    )
                    .await;
                if matches!(refreshed, Ok(false)) {
                    warn!(runtime_key, "singleflight lock refresh lost ownership");
                    break;
                }
            }
        })
    }

    /// Releases ownership of `runtime_key` once the build finishes (success or failure),
    /// allowing a subsequent caller to start a fresh build.
    pub async fn release(&self, runtime_key: &str) {
        self.local.write().await.remove(runtime_key);
        let key = lock_key(runtime_key);
        let _ = self.storage.delete(CacheType::Session, &key).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FilesystemStorage;

    fn singleflight() -> (tempfile::TempDir, Arc<Singleflight>) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FilesystemStorage::new(dir.path(), "iso"));
        (dir, Singleflight::new(storage))
    }

    #[tokio::test]
    async fn first_caller_is_owner_second_is_follower() {
        let (_dir, sf) = singleflight();
        let first = sf.acquire("key1").await;
        assert!(matches!(first, BuildRole::Owner(_)));
        let second = sf.acquire("key1").await;
        assert!(matches!(second, BuildRole::Follower(_)));
    }

    #[tokio::test]
    async fn release_allows_a_new_owner() {
        let (_dir, sf) = singleflight();
        let _first = sf.acquire("key1").await;
        sf.release("key1").await;
        let second = sf.acquire("key1").await;
        assert!(matches!(second, BuildRole::Owner(_)));
    }

    #[tokio::test]
    async fn followers_receive_owner_broadcast_events() {
        let (_dir, sf) = singleflight();
        let owner = sf.acquire("key1").await;
        let BuildRole::Owner(sender) = owner else {
            panic!("expected owner role");
        };
        let follower = sf.acquire("key1").await;
        let BuildRole::Follower(mut receiver) = follower else {
            panic!("expected follower role");
        };

        sender
            .send(TranslationEvent::Partial {
                completed_batches: 1,
                total_batches: 3,
            })
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert!(matches!(event, TranslationEvent::Partial { .. }));
    }

    #[tokio::test]
    async fn second_instance_is_a_remote_follower() {
        let dir = tempfile::tempdir().unwrap();
        let storage_a = Arc::new(FilesystemStorage::new(dir.path(), "iso"));
        let storage_b = Arc::new(FilesystemStorage::new(dir.path(), "iso"));
        let sf_a = Singleflight::new(storage_a);
        let sf_b = Singleflight::new(storage_b);

        let first = sf_a.acquire("key1").await;
        assert!(matches!(first, BuildRole::Owner(_)));

        // A different `Singleflight` (standing in for a different instance sharing the same
        // storage backend) sees the lock held and gets no local channel to subscribe to.
        let second = sf_b.acquire("key1").await;
        assert!(matches!(second, BuildRole::RemoteFollower));
    }
}
