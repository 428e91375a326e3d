//! `POST /translate` and `GET /translation/<baseKey>` (spec §6, §4.8): start or join a
//! singleflight translation build, and read back a snapshot by cache key.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use submaker_core::{CacheType, LanguageCode, StorageAdapter, TranslationEntry};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub source_file_id: String,
    pub target_lang: String,
    #[serde(default)]
    pub force_refresh: bool,
    #[serde(default)]
    pub bypass: bool,
    /// The caller's own configuration hash (spec Glossary), never the server's — scopes
    /// bypass entries to their owner and keys this build's Stream Activity Bus events.
    pub config_hash: String,
}

pub async fn request_translation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<TranslateRequest>,
) -> Result<Json<TranslationEntry>, StatusCode> {
    let target_lang =
        LanguageCode::parse(&body.target_lang).map_err(|_| StatusCode::BAD_REQUEST)?;

    let cached_cues = state
        .storage()
        .get(CacheType::Embedded, &body.source_file_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let source_cues = serde_json::from_slice(&cached_cues).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let entry = state
        .translation_service()
        .request_translation(
            &body.source_file_id,
            target_lang,
            source_cues,
            body.bypass,
            &body.config_hash,
            body.force_refresh,
        )
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?;

    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
pub struct TranslationScopeQuery {
    #[serde(default = "default_scope")]
    pub scope: String,
    /// Required when `scope=bypass` — the caller's own config hash, the same one a bypass
    /// build was created under (spec: bypass entries are "owner-scoped and never read by
    /// other users").
    #[serde(default)]
    pub config_hash: Option<String>,
}

fn default_scope() -> String {
    "permanent".to_string()
}

pub async fn get_translation(
    State(state): State<Arc<AppState>>,
    Path(base_key): Path<String>,
    Query(query): Query<TranslationScopeQuery>,
) -> Result<Json<TranslationEntry>, StatusCode> {
    let lookup_key = if query.scope == "bypass" {
        let config_hash = query.config_hash.ok_or(StatusCode::BAD_REQUEST)?;
        format!("{base_key}__u_{config_hash}")
    } else {
        base_key
    };

    state
        .translation_service()
        .cache()
        .get(&lookup_key)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}
