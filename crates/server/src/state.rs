use std::sync::Arc;

use submaker_core::{
    Authenticator, Config, HostPool, LoginCoordinator, Registry, SanitizedConfig,
    StorageAdapter, StreamActivityBus, TranslationService,
};

/// Shared application state, handed to every axum handler via `State<Arc<AppState>>`.
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    storage: Arc<dyn StorageAdapter>,
    registry: Arc<Registry>,
    pool: Arc<HostPool>,
    login_coordinator: Arc<LoginCoordinator>,
    translation_service: Arc<TranslationService>,
    stream_bus: Arc<StreamActivityBus>,
    config_hash: String,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        storage: Arc<dyn StorageAdapter>,
        registry: Arc<Registry>,
        pool: Arc<HostPool>,
        login_coordinator: Arc<LoginCoordinator>,
        translation_service: Arc<TranslationService>,
        stream_bus: Arc<StreamActivityBus>,
        config_hash: String,
    ) -> Self {
        Self {
            config,
            authenticator,
            storage,
            registry,
            pool,
            login_coordinator,
            translation_service,
            stream_bus,
            config_hash,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn storage(&self) -> &Arc<dyn StorageAdapter> {
        &self.storage
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn pool(&self) -> &Arc<HostPool> {
        &self.pool
    }

    pub fn login_coordinator(&self) -> &Arc<LoginCoordinator> {
        &self.login_coordinator
    }

    pub fn translation_service(&self) -> &Arc<TranslationService> {
        &self.translation_service
    }

    pub fn stream_bus(&self) -> &Arc<StreamActivityBus> {
        &self.stream_bus
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Stable hash of the effective config, used to scope bypass-mode translation keys and
    /// the Stream Activity Bus per `?config=<hash>` (spec §4.8, §4.9).
    pub fn config_hash(&self) -> &str {
        &self.config_hash
    }
}
