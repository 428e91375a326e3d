use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use submaker_core::SanitizedConfig;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

pub async fn get_config(State(state): State<Arc<AppState>>) -> Json<SanitizedConfig> {
    Json(state.sanitized_config())
}

/// Merges the server's own HTTP metrics with `submaker_core`'s, since both register into the
/// default Prometheus registry.
pub async fn metrics() -> Result<String, StatusCode> {
    crate::metrics::gather().map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}
