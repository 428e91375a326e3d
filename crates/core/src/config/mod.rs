mod loader;
mod types;
mod validate;

pub use loader::{load, load_from_env, ENV_PREFIX};
pub use types::{
    AuthConfig, AuthMethod, CircuitBreakerConfig, Config, FilesystemConfig, IsolationConfig,
    LoginCoordinatorConfig, ProviderConfig, ProviderKind, RankingConfig, RedisConfig,
    SanitizedConfig, SanitizedProviderConfig, ServerConfig, StorageBackend, StorageConfig,
    StreamActivityConfig, TranslationConfig,
};
pub use validate::validate;
