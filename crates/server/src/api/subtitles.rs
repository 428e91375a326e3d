//! `GET /subtitles/<type>/<id>:<season>:<episode>.json` — fan out across enabled providers,
//! then dedup/rank the merged results (spec §6, §4.6, §4.7).

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use submaker_core::{dedup_and_rank, fan_out, LanguageCode, MediaType, SearchRequest, SubtitleDescriptor};

use crate::state::AppState;

fn parse_media_type(raw: &str) -> Option<MediaType> {
    match raw {
        "movie" => Some(MediaType::Movie),
        "episode" => Some(MediaType::Episode),
        "anime" => Some(MediaType::Anime),
        "anime-episode" => Some(MediaType::AnimeEpisode),
        _ => None,
    }
}

/// Splits `<id>:<season>:<episode>.json` into its opaque id and optional season/episode.
fn parse_id_params(raw: &str) -> Option<(String, Option<u32>, Option<u32>)> {
    let stripped = raw.strip_suffix(".json")?;
    let mut parts = stripped.splitn(3, ':');
    let id = parts.next()?.to_string();
    if id.is_empty() {
        return None;
    }
    let season = parts.next().and_then(|s| s.parse().ok());
    let episode = parts.next().and_then(|s| s.parse().ok());
    Some((id, season, episode))
}

#[derive(Debug, Deserialize)]
pub struct SubtitlesQuery {
    #[serde(default)]
    pub languages: Option<String>,
    #[serde(default)]
    pub exclude_hi: bool,
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default = "default_provider_timeout_ms")]
    pub provider_timeout_ms: u64,
}

fn default_provider_timeout_ms() -> u64 {
    10_000
}

/// Sends on its `broadcast::Sender` when dropped. Held across a `fan_out` await so that a
/// client disconnect — which drops this handler's in-flight future — reaches the orchestrator
/// as a real cancellation instead of leaving its provider tasks to run to completion.
struct CancelOnDrop(broadcast::Sender<()>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

#[derive(Debug, Serialize)]
pub struct SubtitlesResponse {
    pub subtitles: Vec<SubtitleDescriptor>,
    pub warnings: Vec<String>,
}

pub async fn search(
    State(state): State<Arc<AppState>>,
    Path((media_type, id_params)): Path<(String, String)>,
    Query(query): Query<SubtitlesQuery>,
) -> Result<Json<SubtitlesResponse>, axum::http::StatusCode> {
    let media_type = parse_media_type(&media_type).ok_or(axum::http::StatusCode::NOT_FOUND)?;
    let (raw_id, season, episode) =
        parse_id_params(&id_params).ok_or(axum::http::StatusCode::NOT_FOUND)?;

    let languages: Vec<LanguageCode> = query
        .languages
        .as_deref()
        .unwrap_or("eng")
        .split(',')
        .filter_map(|code| LanguageCode::parse(code.trim()).ok())
        .collect();

    let (imdb_id, tmdb_id) = if raw_id.starts_with("tt") {
        (Some(raw_id), None)
    } else {
        (None, Some(raw_id))
    };

    let request = SearchRequest {
        imdb_id,
        tmdb_id,
        media_type,
        season,
        episode,
        languages,
        exclude_hi: query.exclude_hi,
        filename: query.filename.clone(),
        provider_timeout_ms: query.provider_timeout_ms,
    };

    // axum/hyper drops the handler's future (and everything it owns) the moment the client
    // disconnects before the response is written, the same way the connection-serving task
    // tears down on a closed socket. `_cancel_guard` rides along in that future; its `Drop`
    // fires exactly then and signals `fan_out` to abort outstanding provider tasks (spec
    // §4.6/§5 — provider sockets released within 100ms of disconnect).
    let (cancel_tx, cancel_rx) = broadcast::channel(1);
    let _cancel_guard = CancelOnDrop(cancel_tx);
    let outcome = fan_out(
        state.registry().clone(),
        state.pool().clone(),
        state.config().circuit_breaker,
        request,
        cancel_rx,
    )
    .await;

    let descriptors = if query.exclude_hi {
        outcome
            .descriptors
            .into_iter()
            .filter(|d| !d.hearing_impaired.is_true())
            .collect()
    } else {
        outcome.descriptors
    };

    let ranked = dedup_and_rank(
        descriptors,
        &state.config().ranking,
        query.filename.as_deref(),
        false,
    );

    Ok(Json(SubtitlesResponse {
        subtitles: ranked,
        warnings: outcome.warnings,
    }))
}
