use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
    #[serde(default)]
    pub login_coordinator: LoginCoordinatorConfig,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub stream_activity: StreamActivityConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    7000
}

/// Storage backend selection (spec §4.10).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    #[serde(default)]
    pub redis: Option<RedisConfig>,
    #[serde(default)]
    pub filesystem: Option<FilesystemConfig>,
    /// Where the deployment-wide isolation key comes from (spec §4.10, Open Question).
    #[serde(default)]
    pub isolation: IsolationConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Redis,
    Filesystem,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedisConfig {
    pub url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesystemConfig {
    pub root: String,
}

/// Source of the deployment-wide isolation key (spec §9 Open Question: we pick the
/// `.instance-id` location deterministically here rather than supporting both paths).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IsolationConfig {
    #[serde(default)]
    pub env_var: Option<String>,
    /// Directory the persisted `.instance-id` file lives under, relative to the filesystem
    /// storage root if filesystem-backed, or a standalone path otherwise. Resolved by
    /// `storage::isolation` under `data/.instance-id` by default (Open Question decided in
    /// DESIGN.md).
    #[serde(default = "default_instance_id_dir")]
    pub instance_id_dir: String,
}

impl Default for IsolationConfig {
    fn default() -> Self {
        Self {
            env_var: None,
            instance_id_dir: default_instance_id_dir(),
        }
    }
}

fn default_instance_id_dir() -> String {
    "data".to_string()
}

/// Per-provider configuration: API key, base URL, timeout, and the header template required
/// to look like a real client (spec §9 Design Notes).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default = "default_provider_timeout_ms")]
    pub timeout_ms: u64,
    /// Extra headers sent with every request (User-Agent overrides, browser-like headers
    /// some providers require to avoid rejecting generic HTTP clients).
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

fn default_provider_timeout_ms() -> u64 {
    20_000
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenSubtitles,
    Podnapisi,
}

impl ProviderKind {
    pub fn name(self) -> &'static str {
        match self {
            ProviderKind::OpenSubtitles => "opensubtitles-v3",
            ProviderKind::Podnapisi => "podnapisi",
        }
    }

    pub fn requires_login(self) -> bool {
        matches!(self, ProviderKind::OpenSubtitles)
    }
}

/// Distributed login cooldown configuration (spec §4.5).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoginCoordinatorConfig {
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,
    #[serde(default = "default_max_cycles")]
    pub max_cycles: u32,
    #[serde(default = "default_total_timeout_ms")]
    pub total_timeout_ms: u64,
}

impl Default for LoginCoordinatorConfig {
    fn default() -> Self {
        Self {
            cooldown_ms: default_cooldown_ms(),
            max_cycles: default_max_cycles(),
            total_timeout_ms: default_total_timeout_ms(),
        }
    }
}

fn default_cooldown_ms() -> u64 {
    1100
}

/// `MAX_CYCLES` from spec §9: "tuned empirically; adopt as the default and expose it as a
/// named constant."
fn default_max_cycles() -> u32 {
    20
}

fn default_total_timeout_ms() -> u64 {
    45_000
}

/// Circuit breaker defaults (spec §3).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_reset_timeout_ms")]
    pub reset_timeout_ms: u64,
    #[serde(default = "default_half_open_success_threshold")]
    pub half_open_success_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            reset_timeout_ms: default_reset_timeout_ms(),
            half_open_success_threshold: default_half_open_success_threshold(),
        }
    }
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_reset_timeout_ms() -> u64 {
    60_000
}

fn default_half_open_success_threshold() -> u32 {
    2
}

/// Ranking score weights (spec §4.7).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct RankingConfig {
    #[serde(default = "default_weight_filename")]
    pub filename_similarity_weight: f32,
    #[serde(default = "default_weight_release_type")]
    pub release_type_weight: f32,
    #[serde(default = "default_weight_rating")]
    pub rating_weight: f32,
    #[serde(default = "default_weight_downloads")]
    pub downloads_weight: f32,
    #[serde(default = "default_weight_provider")]
    pub provider_reputation_weight: f32,
    #[serde(default = "default_penalty_machine_translated")]
    pub machine_translated_penalty: f32,
    #[serde(default = "default_penalty_hi_mismatch")]
    pub hearing_impaired_mismatch_penalty: f32,
    #[serde(default = "default_penalty_season_pack")]
    pub season_pack_penalty: f32,
    #[serde(default = "default_per_language_cap")]
    pub per_language_cap: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            filename_similarity_weight: default_weight_filename(),
            release_type_weight: default_weight_release_type(),
            rating_weight: default_weight_rating(),
            downloads_weight: default_weight_downloads(),
            provider_reputation_weight: default_weight_provider(),
            machine_translated_penalty: default_penalty_machine_translated(),
            hearing_impaired_mismatch_penalty: default_penalty_hi_mismatch(),
            season_pack_penalty: default_penalty_season_pack(),
            per_language_cap: default_per_language_cap(),
        }
    }
}

fn default_weight_filename() -> f32 {
    3.0
}
fn default_weight_release_type() -> f32 {
    1.5
}
fn default_weight_rating() -> f32 {
    2.0
}
fn default_weight_downloads() -> f32 {
    1.0
}
fn default_weight_provider() -> f32 {
    1.0
}
fn default_penalty_machine_translated() -> f32 {
    4.0
}
fn default_penalty_hi_mismatch() -> f32 {
    2.0
}
fn default_penalty_season_pack() -> f32 {
    0.5
}

/// Per-language cap of 14 descriptors (spec §4.1, §4.7).
fn default_per_language_cap() -> usize {
    14
}

/// Stream Activity Bus configuration (spec §4.9).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct StreamActivityConfig {
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
    #[serde(default = "default_max_listeners")]
    pub max_listeners_per_config: usize,
    #[serde(default = "default_max_connection_age_secs")]
    pub max_connection_age_secs: u64,
    #[serde(default = "default_activity_ttl_secs")]
    pub entry_ttl_secs: u64,
}

impl Default for StreamActivityConfig {
    fn default() -> Self {
        Self {
            heartbeat_secs: default_heartbeat_secs(),
            max_listeners_per_config: default_max_listeners(),
            max_connection_age_secs: default_max_connection_age_secs(),
            entry_ttl_secs: default_activity_ttl_secs(),
        }
    }
}

fn default_heartbeat_secs() -> u64 {
    40
}

fn default_max_listeners() -> usize {
    4
}

fn default_max_connection_age_secs() -> u64 {
    3600
}

fn default_activity_ttl_secs() -> u64 {
    6 * 3600
}

/// Translation backend selection (spec §8.1: "a trait object constructed the same way
/// `SearcherBackend`/`TorrentClientBackend` pick a concrete implementation").
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_translation_model")]
    pub model: String,
    #[serde(default = "default_translation_batch_size")]
    pub batch_size: usize,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_translation_model(),
            batch_size: default_translation_batch_size(),
        }
    }
}

fn default_translation_model() -> String {
    "claude-3-5-haiku-latest".to_string()
}

fn default_translation_batch_size() -> usize {
    40
}

/// Authentication method guarding the addon's own HTTP API (distinct from provider/login
/// authentication in §4.5).
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    None,
    ApiKey,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    #[serde(default = "default_auth_method")]
    pub method: AuthMethod,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            method: default_auth_method(),
            api_key: None,
        }
    }
}

fn default_auth_method() -> AuthMethod {
    AuthMethod::None
}

/// Sanitized config for API responses (secrets redacted), following the teacher's
/// `SanitizedConfig` pattern.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub storage_backend: StorageBackend,
    pub providers: Vec<SanitizedProviderConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub kind: ProviderKind,
    pub enabled: bool,
    pub has_api_key: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            storage_backend: config.storage.backend,
            providers: config
                .providers
                .iter()
                .map(|p| SanitizedProviderConfig {
                    kind: p.kind,
                    enabled: p.enabled,
                    has_api_key: p.api_key.is_some(),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_minimal_config() {
        let toml = r#"
[storage]
backend = "filesystem"

[storage.filesystem]
root = "./data/cache"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.storage.backend, StorageBackend::Filesystem);
        assert_eq!(config.login_coordinator.max_cycles, 20);
        assert_eq!(config.circuit_breaker.failure_threshold, 3);
        assert_eq!(config.ranking.per_language_cap, 14);
    }

    #[test]
    fn deserialize_redis_storage() {
        let toml = r#"
[server]
port = 9000

[storage]
backend = "redis"

[storage.redis]
url = "redis://localhost:6379"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.backend, StorageBackend::Redis);
        assert_eq!(
            config.storage.redis.unwrap().url,
            "redis://localhost:6379"
        );
    }

    #[test]
    fn sanitized_config_hides_api_key_value() {
        let config = Config {
            server: ServerConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                redis: None,
                filesystem: Some(FilesystemConfig {
                    root: "./data".into(),
                }),
                isolation: IsolationConfig::default(),
            },
            providers: vec![ProviderConfig {
                kind: ProviderKind::OpenSubtitles,
                enabled: true,
                api_key: Some("secret".to_string()),
                base_url: None,
                timeout_ms: 20_000,
                headers: vec![],
            }],
            login_coordinator: LoginCoordinatorConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            ranking: RankingConfig::default(),
            stream_activity: StreamActivityConfig::default(),
            translation: TranslationConfig::default(),
            auth: AuthConfig::default(),
        };

        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.providers[0].has_api_key);
        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret"));
    }
}
