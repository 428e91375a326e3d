//! Translation Cache & Singleflight (spec §4.8): key derivation, progressive batch
//! persistence, and fan-out of partial events to the Stream Activity Bus.

mod anthropic;
mod cache;
mod key;
mod singleflight;
mod srt;
mod translator;
mod types;

pub use anthropic::AnthropicTranslator;
pub use cache::TranslationCache;
pub use key::{generate_cache_keys, CacheKeys};
pub use singleflight::{BuildRole, Singleflight, TranslationEvent};
pub use srt::{parse_srt, render_srt, render_vtt};
pub use translator::Translator;
pub use types::{Cue, TranslateError, TranslationEntry, TranslationStatus};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tracing::warn;

use crate::language::LanguageCode;
use crate::streambus::StreamActivityBus;

/// Bound on how long a `RemoteFollower` (a caller whose build is owned by a different
/// instance) polls the cache before giving up, mirroring the login coordinator's
/// `MAX_CYCLES`/`TOTAL_TIMEOUT` pattern for a deployment-wide wait (spec §4.5 step 4, reused
/// here for singleflight's cross-instance follower wait).
const REMOTE_FOLLOWER_MAX_CYCLES: u32 = 20;
const REMOTE_FOLLOWER_POLL_MS: u64 = 250;

/// Coordinates cache lookup, singleflight build ownership, progressive persistence, and
/// Stream Activity Bus publication for one translation request (spec §4.8).
pub struct TranslationService {
    cache: TranslationCache,
    singleflight: Arc<Singleflight>,
    translator: Arc<dyn Translator>,
    stream_bus: Arc<StreamActivityBus>,
}

impl TranslationService {
    pub fn new(
        cache: TranslationCache,
        singleflight: Arc<Singleflight>,
        translator: Arc<dyn Translator>,
        stream_bus: Arc<StreamActivityBus>,
    ) -> Self {
        Self {
            cache,
            singleflight,
            translator,
            stream_bus,
        }
    }

    /// Read access to the underlying cache, for handlers that serve a snapshot directly
    /// (`GET /translation/<baseKey>`) without going through singleflight.
    pub fn cache(&self) -> &TranslationCache {
        &self.cache
    }

    /// Starts (or joins) a translation build for `source_file_id` → `target_lang`. Returns
    /// the entry observed immediately after the request is accepted — `complete` if the
    /// permanent cache already had it, otherwise `in_flight`/`partial` depending on whether
    /// this caller became the owner or a follower.
    ///
    /// `config_hash` is the *caller's own* configuration hash (spec Glossary: "a stable hash
    /// of the user's configuration"), never the server's. It both scopes bypass-mode cache
    /// entries to their owner and keys the Stream Activity Bus publish for this build,
    /// independent of whether bypass was requested — two different users translating the
    /// same file must never share a bus channel or a bypass slot.
    pub async fn request_translation(
        &self,
        source_file_id: &str,
        target_lang: LanguageCode,
        source_cues: Vec<Cue>,
        bypass_requested: bool,
        config_hash: &str,
        force_refresh: bool,
    ) -> Result<TranslationEntry, TranslateError> {
        let keys = generate_cache_keys(source_file_id, target_lang, bypass_requested, Some(config_hash));

        if force_refresh {
            self.cache.delete(&keys.runtime_key).await?;
            self.singleflight.release(&keys.runtime_key).await;
        } else if let Some(existing) = self.cache.get(&keys.runtime_key).await? {
            if existing.is_complete() {
                return Ok(existing);
            }
        }

        match self.singleflight.acquire(&keys.runtime_key).await {
            BuildRole::Owner(sender) => {
                let owner_config_hash = if keys.bypass_enabled {
                    Some(config_hash.to_string())
                } else {
                    None
                };
                self.run_build(&keys, source_cues, target_lang, sender, owner_config_hash, config_hash)
                    .await
            }
            BuildRole::Follower(mut receiver) => {
                // Wait for at least one event so the caller gets a meaningful snapshot, but
                // don't block indefinitely — the HTTP handler reads the cache afterward.
                let _ = receiver.recv().await;
                self.cache
                    .get(&keys.runtime_key)
                    .await?
                    .ok_or_else(|| TranslateError::Storage("singleflight entry vanished".into()))
            }
            BuildRole::RemoteFollower => self.poll_remote_build(&keys.runtime_key).await,
        }
    }

    /// Waits for another instance's owned build to produce a cache entry, since there's no
    /// local broadcast channel to subscribe to across instances (spec §5 "deployment-global").
    async fn poll_remote_build(&self, runtime_key: &str) -> Result<TranslationEntry, TranslateError> {
        for _cycle in 0..REMOTE_FOLLOWER_MAX_CYCLES {
            if let Some(entry) = self.cache.get(runtime_key).await? {
                return Ok(entry);
            }
            let jitter_ms = rand::thread_rng().gen_range(50..=150);
            tokio::time::sleep(Duration::from_millis(REMOTE_FOLLOWER_POLL_MS + jitter_ms)).await;
        }
        Err(TranslateError::Storage(
            "timed out waiting for remote singleflight owner".into(),
        ))
    }

    async fn run_build(
        &self,
        keys: &CacheKeys,
        source_cues: Vec<Cue>,
        target_lang: LanguageCode,
        sender: tokio::sync::broadcast::Sender<TranslationEvent>,
        owner_config_hash: Option<String>,
        publish_config_hash: &str,
    ) -> Result<TranslationEntry, TranslateError> {
        let lock_refresh = self.singleflight.spawn_lock_refresh(&keys.runtime_key);

        let batches = match self.translator.translate_batches(&source_cues, target_lang).await {
            Ok(batches) => batches,
            Err(error) => {
                lock_refresh.abort();
                let _ = sender.send(TranslationEvent::Failed(error.to_string()));
                self.singleflight.release(&keys.runtime_key).await;
                return Err(error);
            }
        };

        let total_batches = batches.len() as u32;
        let mut entry = TranslationCache::new_entry(
            &keys.base_key,
            &keys.scoped_key,
            &keys.runtime_key,
            total_batches,
            owner_config_hash,
        );

        for (index, batch) in batches.into_iter().enumerate() {
            entry.segments.extend(batch);
            entry.completed_batches |= 1u64 << index;
            entry.updated_at = Utc::now();
            entry.status = if entry.is_complete() {
                TranslationStatus::Complete
            } else {
                TranslationStatus::Partial
            };

            if let Err(error) = self.cache.put(&keys.runtime_key, &entry, keys.bypass_enabled).await {
                warn!(runtime_key = %keys.runtime_key, error = %error, "failed to persist translation batch");
            }

            self.stream_bus
                .publish_partial(publish_config_hash, entry.completed_batches, entry.total_batches)
                .await;

            let _ = sender.send(TranslationEvent::Partial {
                completed_batches: entry.completed_batches,
                total_batches: entry.total_batches,
            });
        }

        lock_refresh.abort();
        let _ = sender.send(TranslationEvent::Complete);
        self.singleflight.release(&keys.runtime_key).await;
        Ok(entry)
    }
}
