//! Cross-field validation that serde's `#[serde(default)]` machinery can't express, mirroring
//! the teacher's `config::validate` pass (checked once at startup, not on every access).

use super::types::{AuthMethod, Config, StorageBackend};
use crate::error::{ErrorClass, OpError};

pub fn validate(config: &Config) -> Result<(), OpError> {
    match config.storage.backend {
        StorageBackend::Redis => {
            if config.storage.redis.is_none() {
                return Err(OpError::new(
                    ErrorClass::ClientError,
                    "storage.backend is \"redis\" but storage.redis is not configured",
                ));
            }
        }
        StorageBackend::Filesystem => {
            if config.storage.filesystem.is_none() {
                return Err(OpError::new(
                    ErrorClass::ClientError,
                    "storage.backend is \"filesystem\" but storage.filesystem is not configured",
                ));
            }
        }
    }

    for provider in &config.providers {
        if provider.enabled && provider.kind.requires_login() && provider.api_key.is_none() {
            return Err(OpError::new(
                ErrorClass::ClientError,
                format!(
                    "provider {:?} is enabled and requires an api_key, but none was set",
                    provider.kind
                ),
            ));
        }
    }

    if config.circuit_breaker.failure_threshold == 0 {
        return Err(OpError::new(
            ErrorClass::ClientError,
            "circuit_breaker.failure_threshold must be >= 1",
        ));
    }

    if config.circuit_breaker.half_open_success_threshold == 0 {
        return Err(OpError::new(
            ErrorClass::ClientError,
            "circuit_breaker.half_open_success_threshold must be >= 1",
        ));
    }

    if config.login_coordinator.cooldown_ms == 0 {
        return Err(OpError::new(
            ErrorClass::ClientError,
            "login_coordinator.cooldown_ms must be >= 1",
        ));
    }

    if config.ranking.per_language_cap == 0 {
        return Err(OpError::new(
            ErrorClass::ClientError,
            "ranking.per_language_cap must be >= 1",
        ));
    }

    if config.server.port == 0 {
        return Err(OpError::new(ErrorClass::ClientError, "server.port must not be 0"));
    }

    if config.auth.method == AuthMethod::ApiKey && config.auth.api_key.is_none() {
        return Err(OpError::new(
            ErrorClass::ClientError,
            "auth.method is \"api_key\" but auth.api_key is not configured",
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::{
        AuthConfig, CircuitBreakerConfig, FilesystemConfig, IsolationConfig,
        LoginCoordinatorConfig, ProviderConfig, ProviderKind, RankingConfig, ServerConfig,
        StorageConfig, StreamActivityConfig, TranslationConfig,
    };

    fn base_config() -> Config {
        Config {
            server: ServerConfig::default(),
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                redis: None,
                filesystem: Some(FilesystemConfig {
                    root: "./data".into(),
                }),
                isolation: IsolationConfig::default(),
            },
            providers: vec![],
            login_coordinator: LoginCoordinatorConfig::default(),
            circuit_breaker: CircuitBreakerConfig::default(),
            ranking: RankingConfig::default(),
            stream_activity: StreamActivityConfig::default(),
            translation: TranslationConfig::default(),
            auth: AuthConfig::default(),
        }
    }

    #[test]
    fn valid_minimal_config_passes() {
        assert!(validate(&base_config()).is_ok());
    }

    #[test]
    fn redis_backend_without_redis_config_fails() {
        let mut config = base_config();
        config.storage.backend = StorageBackend::Redis;
        config.storage.redis = None;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn enabled_login_provider_without_api_key_fails() {
        let mut config = base_config();
        config.providers.push(ProviderConfig {
            kind: ProviderKind::OpenSubtitles,
            enabled: true,
            api_key: None,
            base_url: None,
            timeout_ms: 20_000,
            headers: vec![],
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn disabled_login_provider_without_api_key_passes() {
        let mut config = base_config();
        config.providers.push(ProviderConfig {
            kind: ProviderKind::OpenSubtitles,
            enabled: false,
            api_key: None,
            base_url: None,
            timeout_ms: 20_000,
            headers: vec![],
        });
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn zero_failure_threshold_fails() {
        let mut config = base_config();
        config.circuit_breaker.failure_threshold = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn zero_port_fails() {
        let mut config = base_config();
        config.server.port = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn api_key_auth_without_key_fails() {
        let mut config = base_config();
        config.auth.method = AuthMethod::ApiKey;
        config.auth.api_key = None;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn api_key_auth_with_key_passes() {
        let mut config = base_config();
        config.auth.method = AuthMethod::ApiKey;
        config.auth.api_key = Some("secret".into());
        assert!(validate(&config).is_ok());
    }
}
