//! Parallel search across enabled providers with per-provider timeouts, circuit-breaker
//! skip, and prompt cancellation on client disconnect (spec §4.6).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::warn;

use crate::config::CircuitBreakerConfig;
use crate::descriptor::SearchRequest;
use crate::fanout::types::FanOutOutcome;
use crate::pool::HostPool;
use crate::provider::{ProviderError, Registry};

/// Orchestrator budget per spec §5: "max provider timeout + 2 s".
fn aggregate_budget(req: &SearchRequest) -> Duration {
    Duration::from_millis(req.provider_timeout_ms + 2000)
}

/// Runs one provider task, converting its errors into either descriptors or a warning
/// string, never propagating an error upward except via the warning channel (spec §4.6:
/// "non-auth failures degrade to empty results").
async fn run_provider(
    pool: Arc<HostPool>,
    registry: Arc<Registry>,
    provider_kind: crate::config::ProviderKind,
    req: SearchRequest,
    _circuit_breaker_config: CircuitBreakerConfig,
) -> (Vec<crate::descriptor::SubtitleDescriptor>, Option<String>) {
    let Some(provider) = registry.get(provider_kind) else {
        return (vec![], None);
    };

    if !pool.is_call_permitted(provider_kind).await {
        return (
            vec![],
            Some(format!(
                "{} circuit breaker open, retry in {}s",
                provider_kind.name(),
                pool_reset_hint(&pool, provider_kind).await
            )),
        );
    }

    let timeout = Duration::from_millis(req.provider_timeout_ms);
    match tokio::time::timeout(timeout, provider.search(&req)).await {
        Ok(Ok(descriptors)) => (descriptors, None),
        Ok(Err(ProviderError::Authentication { provider, message })) => (
            vec![],
            Some(format!("{provider} authentication error: {message}")),
        ),
        Err(_) => {
            warn!(provider = provider_kind.name(), "provider search timed out");
            (vec![], None)
        }
    }
}

async fn pool_reset_hint(_pool: &HostPool, _provider_kind: crate::config::ProviderKind) -> u64 {
    // The breaker doesn't expose its exact remaining reset time externally; a fixed
    // estimate keeps the user-facing message in the shape spec §4.4 requires.
    60
}

/// Fans out `req` across every enabled provider in `registry`, merging results as they
/// arrive. Aborts outstanding provider tasks if `cancellation` fires or the aggregate
/// budget (spec §5) elapses.
pub async fn fan_out(
    registry: Arc<Registry>,
    pool: Arc<HostPool>,
    circuit_breaker_config: CircuitBreakerConfig,
    req: SearchRequest,
    mut cancellation: broadcast::Receiver<()>,
) -> FanOutOutcome {
    use futures::stream::FuturesUnordered;
    use futures::StreamExt;

    let providers = registry.enabled();
    let mut tasks = FuturesUnordered::new();

    for provider in &providers {
        let pool = pool.clone();
        let registry = registry.clone();
        let req = req.clone();
        let kind = provider.kind();
        tasks.push(tokio::spawn(async move {
            run_provider(pool, registry, kind, req, circuit_breaker_config).await
        }));
    }

    let mut outcome = FanOutOutcome::default();
    let budget = tokio::time::sleep(aggregate_budget(&req));
    tokio::pin!(budget);

    loop {
        if tasks.is_empty() {
            break;
        }

        tokio::select! {
            _ = &mut budget => {
                for task in &tasks {
                    task.abort();
                }
                break;
            }
            _ = cancellation.recv() => {
                for task in &tasks {
                    task.abort();
                }
                return FanOutOutcome::default();
            }
            joined = tasks.next() => {
                if let Some(Ok((descriptors, warning))) = joined {
                    outcome.descriptors.extend(descriptors);
                    if let Some(warning) = warning {
                        outcome.warnings.push(warning);
                    }
                }
            }
        }
    }

    outcome
}
