use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};

use super::{
    activity, download, handlers, middleware::auth_middleware, middleware::metrics_middleware,
    stats, subtitles, translate,
};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/config", get(handlers::get_config))
        .route("/session-stats", get(stats::session_stats))
        .route("/subtitles/{media_type}/{id_params}", get(subtitles::search))
        .route("/subtitle/download", get(download::download))
        .route("/translate", post(translate::request_translation))
        .route("/translation/{base_key}", get(translate::get_translation))
        .route("/activity", get(activity::activity))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .layer(middleware::from_fn(metrics_middleware))
}
