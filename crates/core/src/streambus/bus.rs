//! Per-config-hash SSE ring with a listener cap, heartbeat ticker, and stale-entry pruning
//! (spec §4.9), modeled on the teacher's broadcast-based WebSocket fan-out.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, RwLock};
use tokio::time::Instant;

use crate::config::StreamActivityConfig;
use crate::streambus::types::{StreamEvent, TooManyListeners};

struct ConfigChannel {
    sender: broadcast::Sender<StreamEvent>,
}

/// One subscriber's view of a config-hash ring, tagged with its own age so it can be pruned
/// independently of every other listener on the same channel (spec §4.9: prune "listeners
/// whose underlying connection ... exceeded MAX_CONNECTION_AGE", not whole channels).
pub struct Listener {
    pub receiver: broadcast::Receiver<StreamEvent>,
    pub deadline: Instant,
}

pub struct StreamActivityBus {
    config: StreamActivityConfig,
    channels: RwLock<HashMap<String, ConfigChannel>>,
}

impl StreamActivityBus {
    pub fn new(config: StreamActivityConfig) -> Arc<Self> {
        let bus = Arc::new(Self {
            config,
            channels: RwLock::new(HashMap::new()),
        });
        bus.clone().spawn_heartbeat();
        bus
    }

    fn spawn_heartbeat(self: Arc<Self>) {
        let heartbeat = Duration::from_secs(self.config.heartbeat_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(heartbeat);
            loop {
                ticker.tick().await;
                self.tick_heartbeat().await;
            }
        });
    }

    /// Drops channels with no live receivers (every listener on it has already disconnected
    /// or been pruned locally) and pings the rest so each listener's own connection can tell
    /// a live server from a dead one. Per-listener age pruning happens where each listener's
    /// receiver actually lives (`Listener::deadline`, enforced by the SSE stream consuming
    /// it), not here — a channel is shared by every listener on that config hash and has no
    /// single meaningful age of its own.
    async fn tick_heartbeat(&self) {
        let mut channels = self.channels.write().await;
        channels.retain(|_, channel| channel.sender.receiver_count() > 0);
        for channel in channels.values() {
            let _ = channel.sender.send(StreamEvent::Ping);
        }
    }

    async fn entry(&self, config_hash: &str) -> broadcast::Sender<StreamEvent> {
        if let Some(channel) = self.channels.read().await.get(config_hash) {
            return channel.sender.clone();
        }
        let mut channels = self.channels.write().await;
        channels
            .entry(config_hash.to_string())
            .or_insert_with(|| ConfigChannel {
                sender: broadcast::channel(256).0,
            })
            .sender
            .clone()
    }

    /// Subscribes to `config_hash`'s event ring, rejecting beyond
    /// `max_listeners_per_config` concurrent listeners. The returned `Listener` carries its
    /// own age deadline — the caller (the SSE handler) is responsible for ending its stream
    /// once `Instant::now() >= deadline`.
    pub async fn subscribe(&self, config_hash: &str) -> Result<Listener, TooManyListeners> {
        let sender = self.entry(config_hash).await;
        if sender.receiver_count() >= self.config.max_listeners_per_config {
            return Err(TooManyListeners);
        }
        Ok(Listener {
            receiver: sender.subscribe(),
            deadline: Instant::now() + Duration::from_secs(self.config.max_connection_age_secs),
        })
    }

    pub async fn publish(&self, config_hash: &str, event: StreamEvent) {
        let sender = self.entry(config_hash).await;
        let _ = sender.send(event);
    }

    pub async fn publish_partial(&self, config_hash: &str, completed_batches: u64, total_batches: u32) {
        self.publish(
            config_hash,
            StreamEvent::Partial {
                completed_batches,
                total_batches,
            },
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> StreamActivityConfig {
        StreamActivityConfig {
            heartbeat_secs: 3600,
            max_listeners_per_config: 4,
            max_connection_age_secs: 3600,
            entry_ttl_secs: 21_600,
        }
    }

    #[tokio::test]
    async fn allows_up_to_listener_cap() {
        let bus = StreamActivityBus::new(config());
        let mut receivers = vec![];
        for _ in 0..4 {
            receivers.push(bus.subscribe("cfg1").await.unwrap());
        }
        assert!(bus.subscribe("cfg1").await.is_err());
    }

    #[tokio::test]
    async fn independent_config_hashes_have_independent_caps() {
        let bus = StreamActivityBus::new(config());
        for _ in 0..4 {
            bus.subscribe("cfg1").await.unwrap();
        }
        assert!(bus.subscribe("cfg2").await.is_ok());
    }

    #[tokio::test]
    async fn publish_delivers_to_subscriber() {
        let bus = StreamActivityBus::new(config());
        let mut listener = bus.subscribe("cfg1").await.unwrap();
        bus.publish_partial("cfg1", 1, 3).await;
        let event = listener.receiver.recv().await.unwrap();
        assert_eq!(event.name(), "partial");
    }

    #[tokio::test]
    async fn each_listener_gets_its_own_deadline() {
        let bus = StreamActivityBus::new(config());
        let first = bus.subscribe("cfg1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = bus.subscribe("cfg1").await.unwrap();
        assert!(first.deadline < second.deadline);
    }
}
