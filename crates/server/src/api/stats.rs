//! `GET /session-stats` → `{version, limits}` (spec §6).

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Serialize)]
pub struct Limits {
    pub per_language_cap: usize,
    pub login_max_cycles: u32,
    pub login_cooldown_ms: u64,
    pub circuit_breaker_failure_threshold: u32,
    pub max_listeners_per_config: usize,
}

#[derive(Serialize)]
pub struct SessionStats {
    pub version: String,
    pub limits: Limits,
}

pub async fn session_stats(State(state): State<Arc<AppState>>) -> Json<SessionStats> {
    let config = state.config();
    Json(SessionStats {
        version: VERSION.to_string(),
        limits: Limits {
            per_language_cap: config.ranking.per_language_cap,
            login_max_cycles: config.login_coordinator.max_cycles,
            login_cooldown_ms: config.login_coordinator.cooldown_ms,
            circuit_breaker_failure_threshold: config.circuit_breaker.failure_threshold,
            max_listeners_per_config: config.stream_activity.max_listeners_per_config,
        },
    })
}
