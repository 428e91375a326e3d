//! Distributed cooldown lock for rate-limited provider logins (spec §4.5). One instance is
//! shared across all providers that require it; per-provider state (local throttle, FIFO
//! queue gate) is created lazily.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::warn;

use crate::config::LoginCoordinatorConfig;
use crate::login::types::LoginError;
use crate::storage::{CacheType, StorageAdapter};

fn lock_key(provider: &str) -> String {
    format!("lock:os_login:{provider}")
}

struct ProviderState {
    /// FIFO-ish gate: only one coroutine contends for the distributed lock per provider at
    /// a time (spec §4.5 "Concurrency").
    queue_gate: Mutex<()>,
    last_local_login: RwLock<Option<Instant>>,
}

impl ProviderState {
    fn new() -> Self {
        Self {
            queue_gate: Mutex::new(()),
            last_local_login: RwLock::new(None),
        }
    }
}

pub struct LoginCoordinator {
    storage: Arc<dyn StorageAdapter>,
    config: LoginCoordinatorConfig,
    owner_id: String,
    providers: RwLock<HashMap<String, Arc<ProviderState>>>,
}

impl LoginCoordinator {
    pub fn new(storage: Arc<dyn StorageAdapter>, config: LoginCoordinatorConfig) -> Self {
        let owner_id = format!("{}-{}", std::process::id(), uuid::Uuid::new_v4());
        Self {
            storage,
            config,
            owner_id,
            providers: RwLock::new(HashMap::new()),
        }
    }

    async fn state_for(&self, provider: &str) -> Arc<ProviderState> {
        if let Some(existing) = self.providers.read().await.get(provider) {
            return existing.clone();
        }
        let mut providers = self.providers.write().await;
        providers
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(ProviderState::new()))
            .clone()
    }

    fn cooldown(&self) -> Duration {
        Duration::from_millis(self.config.cooldown_ms)
    }

    /// Runs `do_login` under the distributed cooldown lock for `provider`, returning its
    /// result on success. Degrades to local-only throttling (with a warning) if the shared
    /// store is unreachable.
    pub async fn login<F, Fut, T>(&self, provider: &str, do_login: F) -> Result<T, LoginError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, LoginError>>,
    {
        let state = self.state_for(provider).await;
        let _queue_ticket = state.queue_gate.lock().await;

        self.local_throttle(&state).await;

        let deadline = Instant::now() + Duration::from_millis(self.config.total_timeout_ms);
        let key = lock_key(provider);
        let mut redis_reachable = true;

        for _cycle in 0..self.config.max_cycles {
            if Instant::now() >= deadline {
                break;
            }

            if !redis_reachable {
                break;
            }

            let acquired = match self
                .storage
                .set_if_absent(
                    CacheType::Session,
                    &key,
                    self.owner_id.as_bytes(),
                    self.cooldown(),
                )
                .await
            {
                Ok(acquired) => acquired,
                Err(error) => {
                    warn!(
                        provider,
                        error = %error,
                        "login coordinator lost shared store, degrading to local-only throttling"
                    );
                    redis_reachable = false;
                    true
                }
            };

            if acquired {
                let result = do_login().await;
                if result.is_ok() && redis_reachable {
                    // Refresh so the cooldown is measured from the end of the HTTP call,
                    // not from acquisition (spec §4.5 step 6).
                    let _ = self
                        .storage
                        .compare_and_swap(
                            CacheType::Session,
                            &key,
                            self.owner_id.as_bytes(),
                            self.owner_id.as_bytes(),
                            self.cooldown(),
                        )
                        .await;
                }
                *state.last_local_login.write().await = Some(Instant::now());
                return result;
            }

            let ttl_ms = self
                .storage
                .ttl_millis(CacheType::Session, &key)
                .await
                .ok()
                .flatten()
                .unwrap_or(50);
            let jitter_ms = rand::thread_rng().gen_range(50..=150);
            tokio::time::sleep(Duration::from_millis(ttl_ms.max(50) + jitter_ms)).await;
        }

        if !redis_reachable {
            // Local-only degrade path: we already hold the local throttle, just run the
            // login directly.
            let result = do_login().await;
            *state.last_local_login.write().await = Some(Instant::now());
            return result;
        }

        Err(LoginError::QueueCongestion {
            provider: provider.to_string(),
        })
    }

    async fn local_throttle(&self, state: &ProviderState) {
        let last = *state.last_local_login.read().await;
        if let Some(last) = last {
            let elapsed = last.elapsed();
            let cooldown = self.cooldown();
            if elapsed < cooldown {
                tokio::time::sleep(cooldown - elapsed).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FilesystemStorage;

    fn coordinator() -> (tempfile::TempDir, LoginCoordinator) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FilesystemStorage::new(dir.path(), "iso"));
        let config = LoginCoordinatorConfig {
            cooldown_ms: 100,
            max_cycles: 20,
            total_timeout_ms: 5000,
        };
        (dir, LoginCoordinator::new(storage, config))
    }

    #[tokio::test]
    async fn single_login_succeeds() {
        let (_dir, coordinator) = coordinator();
        let result = coordinator
            .login("opensubtitles-v3", || async { Ok::<_, LoginError>(42) })
            .await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn concurrent_logins_are_spaced_by_cooldown() {
        let (_dir, coordinator) = coordinator();
        let coordinator = Arc::new(coordinator);
        let mut handles = vec![];
        for _ in 0..3 {
            let coordinator = coordinator.clone();
            handles.push(tokio::spawn(async move {
                coordinator
                    .login("opensubtitles-v3", || async {
                        Ok::<_, LoginError>(Instant::now())
                    })
                    .await
                    .unwrap()
            }));
        }
        let mut timestamps = vec![];
        for handle in handles {
            timestamps.push(handle.await.unwrap());
        }
        timestamps.sort();
        for pair in timestamps.windows(2) {
            assert!(pair[1].duration_since(pair[0]) >= Duration::from_millis(90));
        }
    }

    #[tokio::test]
    async fn failed_login_does_not_refresh_lock_past_cooldown() {
        let (_dir, coordinator) = coordinator();
        let result = coordinator
            .login("opensubtitles-v3", || async {
                Err::<(), _>(LoginError::HttpFailure("bad credentials".into()))
            })
            .await;
        assert!(result.is_err());
    }
}
