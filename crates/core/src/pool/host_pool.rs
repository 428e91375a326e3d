//! Shared HTTP agents per host plus per-provider circuit breakers (spec §2 "Connection Pool
//! & Circuit Breaker"), modeled on the teacher's `RateLimiterPool`: one map behind an async
//! `RwLock`, keyed by provider name, lazily populated.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;

use crate::config::{CircuitBreakerConfig, ProviderKind};
use crate::pool::circuit_breaker::{BreakerState, CircuitBreaker};

/// Shared `reqwest::Client` + circuit breaker per provider. One client per host keeps
/// connection pooling and TLS session resumption effective across requests.
pub struct HostPool {
    config: CircuitBreakerConfig,
    entries: RwLock<HashMap<ProviderKind, Arc<PoolEntry>>>,
}

pub struct PoolEntry {
    pub client: reqwest::Client,
    pub breaker: CircuitBreaker,
}

impl HostPool {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, provider: ProviderKind) -> Arc<PoolEntry> {
        if let Some(existing) = self.entries.read().await.get(&provider) {
            return existing.clone();
        }
        let mut entries = self.entries.write().await;
        entries
            .entry(provider)
            .or_insert_with(|| {
                Arc::new(PoolEntry {
                    client: reqwest::Client::builder()
                        .timeout(Duration::from_secs(30))
                        .pool_idle_timeout(Duration::from_secs(90))
                        .build()
                        .expect("reqwest client build"),
                    breaker: CircuitBreaker::new(self.config),
                })
            })
            .clone()
    }

    pub async fn client(&self, provider: ProviderKind) -> reqwest::Client {
        self.entry(provider).await.client.clone()
    }

    pub async fn is_call_permitted(&self, provider: ProviderKind) -> bool {
        self.entry(provider).await.breaker.is_call_permitted().await
    }

    pub async fn record_success(&self, provider: ProviderKind) {
        self.entry(provider).await.breaker.record_success().await;
    }

    pub async fn record_failure(&self, provider: ProviderKind) {
        self.entry(provider).await.breaker.record_failure().await;
    }

    pub async fn breaker_state(&self, provider: ProviderKind) -> BreakerState {
        self.entry(provider).await.breaker.state().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            reset_timeout_ms: 1000,
            half_open_success_threshold: 1,
        }
    }

    #[tokio::test]
    async fn breaker_state_survives_across_lookups() {
        let pool = HostPool::new(config());
        pool.record_failure(ProviderKind::OpenSubtitles).await;
        pool.record_failure(ProviderKind::OpenSubtitles).await;
        assert!(!pool.is_call_permitted(ProviderKind::OpenSubtitles).await);
    }

    #[tokio::test]
    async fn breakers_are_independent_per_provider() {
        let pool = HostPool::new(config());
        pool.record_failure(ProviderKind::OpenSubtitles).await;
        pool.record_failure(ProviderKind::OpenSubtitles).await;
        assert!(!pool.is_call_permitted(ProviderKind::OpenSubtitles).await);
        assert!(pool.is_call_permitted(ProviderKind::Podnapisi).await);
    }
}
