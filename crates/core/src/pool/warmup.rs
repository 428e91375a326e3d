//! Startup warm-up: TLS handshake + keep-alive ping against each enabled provider so the
//! first real request doesn't pay connection setup cost (spec §2 "Startup Validator +
//! Warm-Up"). §4.4 also calls for this to repeat every 45 s once the server is running, both
//! to keep TLS sessions warm and to feed ping outcomes back into the circuit breaker.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::config::ProviderConfig;
use crate::pool::host_pool::HostPool;

/// Interval between warm-up pings once the server is running (spec §4.4).
pub const WARM_UP_INTERVAL: Duration = Duration::from_secs(45);

/// Issues a cheap HEAD/GET against each enabled provider's base URL, logging failures but
/// never failing startup on a warm-up miss (a cold first request is a perf hit, not an
/// outage). Feeds each ping's outcome to the circuit breaker so a provider that's down before
/// its first real request is already reflected in `IsHealthy`.
pub async fn warm_up(pool: &HostPool, providers: &[ProviderConfig]) {
    for provider in providers {
        if !provider.enabled {
            continue;
        }
        let Some(base_url) = &provider.base_url else {
            continue;
        };
        let client = pool.client(provider.kind).await;
        match client.head(base_url).send().await {
            Ok(response) => {
                pool.record_success(provider.kind).await;
                info!(
                    provider = provider.kind.name(),
                    status = response.status().as_u16(),
                    "provider warm-up complete"
                );
            }
            Err(error) => {
                pool.record_failure(provider.kind).await;
                warn!(
                    provider = provider.kind.name(),
                    error = %error,
                    "provider warm-up failed, continuing startup"
                );
            }
        }
    }
}

/// Spawns the periodic warm-up loop (spec §4.4: "every 45 s, ping critical providers to keep
/// TLS warm and refresh health"), mirroring the shutdown-aware background loops of the
/// orchestrator (`TicketOrchestrator::spawn_acquisition_loop`): a `tokio::select!` between the
/// next tick and a shutdown broadcast.
pub fn spawn_periodic_warm_up(
    pool: Arc<HostPool>,
    providers: Vec<ProviderConfig>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    tokio::spawn(async move {
        info!("periodic provider warm-up started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("periodic provider warm-up received shutdown signal");
                    break;
                }
                _ = tokio::time::sleep(WARM_UP_INTERVAL) => {
                    warm_up(&pool, &providers).await;
                }
            }
        }
    });
}
