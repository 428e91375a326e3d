use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Discriminates key namespaces, each with its own TTL and size cap (spec §6 "Storage
/// layout").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheType {
    Session,
    Translation,
    Embedded,
    Autosub,
    ProviderMeta,
    StreamActivity,
}

impl CacheType {
    /// Default TTL for this cache type. Translation has a separate permanent/bypass split
    /// handled by the caller (`translate::cache`), so this returns the permanent TTL.
    pub fn default_ttl(self) -> Duration {
        match self {
            CacheType::Session => Duration::from_secs(30 * 24 * 3600),
            CacheType::Translation => Duration::from_secs(90 * 24 * 3600),
            CacheType::Embedded => Duration::from_secs(90 * 24 * 3600),
            CacheType::Autosub => Duration::from_secs(30 * 24 * 3600),
            CacheType::ProviderMeta => Duration::from_secs(30 * 24 * 3600),
            CacheType::StreamActivity => Duration::from_secs(6 * 3600),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CacheType::Session => "session",
            CacheType::Translation => "translation",
            CacheType::Embedded => "embedded",
            CacheType::Autosub => "autosub",
            CacheType::ProviderMeta => "provider_meta",
            CacheType::StreamActivity => "stream_activity",
        }
    }

    /// Default per-type size cap for the Redis backend (spec §6: "250 MB per type in
    /// Redis; 5 GB in filesystem").
    pub fn redis_size_cap_bytes(self) -> u64 {
        250 * 1024 * 1024
    }

    pub fn filesystem_size_cap_bytes(self) -> u64 {
        5 * 1024 * 1024 * 1024
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translation_ttl_is_90_days() {
        assert_eq!(
            CacheType::Translation.default_ttl(),
            Duration::from_secs(90 * 24 * 3600)
        );
    }

    #[test]
    fn stream_activity_ttl_is_6_hours() {
        assert_eq!(
            CacheType::StreamActivity.default_ttl(),
            Duration::from_secs(6 * 3600)
        );
    }
}
