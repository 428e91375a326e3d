mod api;
mod metrics;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use submaker_core::{
    create_authenticator, isolation, load_config, load_config_from_env, validate_config,
    AnthropicTranslator, Authenticator, FilesystemStorage, HostPool, LoginCoordinator,
    OpenSubtitlesProvider, PodnapisiProvider, ProviderKind, Registry, RedisStorage, Singleflight,
    StorageAdapter, StorageBackend, StreamActivityBus, TranslationCache, TranslationService,
};

use api::create_router;
use state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const CONFIG_PATH_ENV: &str = "SUBMAKER_CONFIG";

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("fatal error during startup: {error:?}");
        std::process::exit(2);
    }
}

async fn run() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    metrics::init();

    let config = match std::env::var(CONFIG_PATH_ENV) {
        Ok(path) => {
            info!("loading configuration from {path}");
            load_config(&path).with_context(|| format!("failed to load config from {path}"))?
        }
        Err(_) => {
            info!("{CONFIG_PATH_ENV} not set, loading configuration from environment");
            load_config_from_env().context("failed to load config from environment")?
        }
    };
    validate_config(&config).context("configuration validation failed")?;
    info!(version = VERSION, "configuration loaded");

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));

    let authenticator: Arc<dyn Authenticator> =
        create_authenticator(&config.auth).context("failed to create authenticator")?.into();
    info!(method = authenticator.method_name(), "authenticator ready");

    let storage: Arc<dyn StorageAdapter> = match config.storage.backend {
        StorageBackend::Redis => {
            let redis_config = config
                .storage
                .redis
                .as_ref()
                .context("storage.backend = redis requires [storage.redis]")?;
            let isolation_key = isolation::resolve(&config.storage.isolation, None)
                .context("failed to resolve isolation key")?;
            Arc::new(
                RedisStorage::connect(&redis_config.url, isolation_key)
                    .await
                    .context("failed to connect to redis")?,
            )
        }
        StorageBackend::Filesystem => {
            let fs_config = config
                .storage
                .filesystem
                .as_ref()
                .context("storage.backend = filesystem requires [storage.filesystem]")?;
            let isolation_key = isolation::resolve(&config.storage.isolation, None)
                .context("failed to resolve isolation key")?;
            Arc::new(FilesystemStorage::new(
                PathBuf::from(&fs_config.root),
                isolation_key,
            ))
        }
    };
    info!(backend = ?config.storage.backend, "storage adapter ready");

    let pool = Arc::new(HostPool::new(config.circuit_breaker));
    submaker_core::warm_up(&pool, &config.providers).await;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);
    submaker_core::spawn_periodic_warm_up(
        pool.clone(),
        config.providers.clone(),
        shutdown_tx.subscribe(),
    );

    let login_coordinator = Arc::new(LoginCoordinator::new(
        storage.clone(),
        config.login_coordinator.clone(),
    ));

    let mut registry = Registry::new();
    for provider_config in &config.providers {
        if !provider_config.enabled {
            continue;
        }
        match provider_config.kind {
            ProviderKind::OpenSubtitles => {
                registry.register(Arc::new(OpenSubtitlesProvider::new(
                    provider_config.clone(),
                    pool.clone(),
                    login_coordinator.clone(),
                )));
            }
            ProviderKind::Podnapisi => {
                registry.register(Arc::new(PodnapisiProvider::new(
                    provider_config.clone(),
                    pool.clone(),
                )));
            }
        }
        info!(provider = provider_config.kind.name(), "provider registered");
    }
    let registry = Arc::new(registry);

    let stream_bus = StreamActivityBus::new(config.stream_activity.clone());

    let translator = Arc::new(AnthropicTranslator::new(
        config.translation.api_key.clone().unwrap_or_default(),
        config.translation.model.clone(),
        config.translation.batch_size,
    ));
    let translation_service = Arc::new(TranslationService::new(
        TranslationCache::new(storage.clone()),
        Singleflight::new(storage.clone()),
        translator,
        stream_bus.clone(),
    ));

    let state = Arc::new(AppState::new(
        config.clone(),
        authenticator,
        storage,
        registry,
        pool,
        login_coordinator,
        translation_service,
        stream_bus,
        config_hash,
    ));

    let app = create_router(state);

    let addr = SocketAddr::new(config.server.host, config.server.port);
    info!("starting server on {addr}");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    let _ = shutdown_tx.send(());
    info!("server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
