//! Authentication and metrics middleware for the addon's own HTTP API, ported from the
//! teacher's `api::middleware` and generalized to `submaker_core`'s auth types.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{FromRequestParts, State};
use axum::http::{request::Parts, Request, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use submaker_core::{AuthError, AuthRequest, Identity};

use crate::metrics::{normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION};
use crate::state::AppState;

pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();
    let response = next.run(request).await;
    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authenticator = state.authenticator();

    if authenticator.method_name() == "none" {
        let mut request = request;
        request.extensions_mut().insert(Identity::anonymous());
        return Ok(next.run(request).await);
    }

    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or_else(|| std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match authenticator.authenticate(&auth_request).await {
        Ok(identity) => {
            let mut request = request;
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(AuthError::NotAuthenticated) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["not_authenticated"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(AuthError::InvalidCredentials(_)) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["invalid_credentials"]).inc();
            Err(StatusCode::UNAUTHORIZED)
        }
        Err(_) => {
            AUTH_FAILURES_TOTAL.with_label_values(&["internal_error"]).inc();
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

/// Extracts the authenticated identity's `user_id` for handlers that want it.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let user_id = parts
            .extensions
            .get::<Identity>()
            .map(|id| id.user_id.clone())
            .unwrap_or_else(|| "anonymous".to_string());
        std::future::ready(Ok(AuthUser(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;
    use axum::middleware;
    use axum::routing::get;
    use axum::Router;
    use std::sync::Arc;
    use submaker_core::{
        create_authenticator, AuthConfig, AuthMethod, FilesystemStorage, HostPool,
        LoginCoordinator, Registry, Singleflight, StorageAdapter, StreamActivityBus,
        TranslationCache, TranslationService,
    };
    use tower::ServiceExt;

    async fn dummy_handler() -> &'static str {
        "OK"
    }

    async fn test_state(auth: AuthConfig) -> Arc<AppState> {
        let dir = tempfile::tempdir().unwrap();
        let storage: Arc<dyn StorageAdapter> =
            Arc::new(FilesystemStorage::new(dir.path().to_path_buf(), "test"));
        let config = submaker_core::Config {
            server: Default::default(),
            storage: submaker_core::StorageConfig {
                backend: submaker_core::StorageBackend::Filesystem,
                redis: None,
                filesystem: Some(submaker_core::FilesystemConfig {
                    root: dir.path().to_str().unwrap().to_string(),
                }),
                isolation: Default::default(),
            },
            providers: vec![],
            login_coordinator: Default::default(),
            circuit_breaker: Default::default(),
            ranking: Default::default(),
            stream_activity: Default::default(),
            translation: Default::default(),
            auth,
        };
        let authenticator = create_authenticator(&config.auth).unwrap().into();
        let pool = Arc::new(HostPool::new(config.circuit_breaker));
        let login_coordinator = Arc::new(LoginCoordinator::new(
            storage.clone(),
            config.login_coordinator.clone(),
        ));
        let stream_bus = StreamActivityBus::new(config.stream_activity);
        let translation_service = Arc::new(TranslationService::new(
            TranslationCache::new(storage.clone()),
            Singleflight::new(storage.clone()),
            Arc::new(submaker_core::testing::MockTranslator::new(10)),
            stream_bus.clone(),
        ));
        std::mem::forget(dir);
        Arc::new(AppState::new(
            config,
            authenticator,
            storage,
            Arc::new(Registry::new()),
            pool,
            login_coordinator,
            translation_service,
            stream_bus,
            "test-hash".to_string(),
        ))
    }

    #[tokio::test]
    async fn none_auth_allows_all() {
        let state = test_state(AuthConfig {
            method: AuthMethod::None,
            api_key: None,
        })
        .await;

        let app = Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn api_key_auth_rejects_missing_credentials() {
        let state = test_state(AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret-key".to_string()),
        })
        .await;

        let app = Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn api_key_auth_accepts_bearer_token() {
        let state = test_state(AuthConfig {
            method: AuthMethod::ApiKey,
            api_key: Some("secret-key".to_string()),
        })
        .await;

        let app = Router::new()
            .route("/test", get(dummy_handler))
            .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state);

        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer secret-key")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
