#![allow(clippy::too_many_arguments)]

pub mod archive;
pub mod auth;
pub mod config;
pub mod dedup;
pub mod descriptor;
pub mod encoding;
pub mod error;
pub mod fanout;
pub mod language;
pub mod login;
pub mod metrics;
pub mod pool;
pub mod provider;
pub mod storage;
pub mod streambus;
pub mod translate;

/// Mock implementations of `Provider`, `StorageAdapter`, and `Translator`, exposed outside
/// unit tests so the server crate's integration tests can depend on them too.
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use archive::{extract, ExtractedEntry, ExtractionOutcome, ExtractionRequest};
pub use auth::{
    create_authenticator, ApiKeyAuthenticator, AuthError, AuthRequest, Authenticator, Identity,
    NoneAuthenticator,
};
pub use config::{
    load as load_config, load_from_env as load_config_from_env, validate as validate_config,
    AuthConfig, AuthMethod, CircuitBreakerConfig, Config, FilesystemConfig, IsolationConfig,
    LoginCoordinatorConfig, ProviderConfig, ProviderKind, RankingConfig, RedisConfig,
    SanitizedConfig, SanitizedProviderConfig, ServerConfig, StorageBackend, StorageConfig,
    StreamActivityConfig, TranslationConfig,
};
pub use dedup::{dedup_and_rank, normalize};
pub use descriptor::{MediaType, SearchRequest, SubtitleDescriptor, SubtitleFormat, TriState};
pub use encoding::decode_to_utf8;
pub use error::{telemetry_should_send, ErrorClass, OpError, TELEMETRY_SEND_CAP};
pub use fanout::{fan_out, FanOutOutcome};
pub use language::{LanguageCode, LanguageCodeError};
pub use login::{LoginCoordinator, LoginError};
pub use pool::{spawn_periodic_warm_up, warm_up, BreakerState, CircuitBreaker, HostPool};
pub use provider::{
    find_episode, find_range, DownloadOptions, DownloadedContent, EpisodeMatch, MatchKind,
    OpenSubtitlesProvider, PodnapisiProvider, Provider, ProviderError, Registry,
};
pub use storage::{isolation, CacheType, FilesystemStorage, RedisStorage, StorageAdapter};
pub use streambus::{StreamActivityBus, StreamEvent, TooManyListeners};
pub use translate::{
    generate_cache_keys, parse_srt, render_srt, render_vtt, AnthropicTranslator, BuildRole,
    CacheKeys, Cue, Singleflight, TranslateError, TranslationCache, TranslationEntry,
    TranslationEvent, TranslationService, TranslationStatus, Translator,
};
