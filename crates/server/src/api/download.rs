//! `GET /subtitle/download?id=<opaque>` — downloads, extracts, decodes, and caches a
//! subtitle's cues so a later `POST /translate` can find them by `sourceFileId` (spec §6,
//! §4.2, §4.3).

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use submaker_core::{
    decode_to_utf8, extract, parse_srt, render_srt, render_vtt, CacheType, DownloadOptions,
    DownloadedContent, ExtractionOutcome, ExtractionRequest, ProviderKind, StorageAdapter,
};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub id: String,
    #[serde(default)]
    pub skip_ass_conversion: bool,
}

fn provider_kind_from_id(id: &str) -> Option<ProviderKind> {
    let prefix = id.split(':').next()?;
    [ProviderKind::OpenSubtitles, ProviderKind::Podnapisi]
        .into_iter()
        .find(|kind| kind.name() == prefix)
}

pub async fn download(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DownloadQuery>,
) -> Result<Response, StatusCode> {
    let kind = provider_kind_from_id(&query.id).ok_or(StatusCode::NOT_FOUND)?;
    let provider = state.registry().get(kind).ok_or(StatusCode::NOT_FOUND)?;

    let opts = DownloadOptions {
        timeout_ms: None,
        language_hint: None,
        skip_ass_conversion: query.skip_ass_conversion,
    };

    let content = provider
        .download(&query.id, &opts)
        .await
        .map_err(|_| StatusCode::BAD_GATEWAY)?;

    let (text, is_srt_like) = match content {
        DownloadedContent::Informational(text) => (text, false),
        DownloadedContent::SubtitleBytes(bytes) => {
            let (text, _) = decode_to_utf8(&bytes);
            (text, true)
        }
        DownloadedContent::Archive(bytes) => {
            let extraction = extract(
                &bytes,
                &ExtractionRequest {
                    is_season_pack: false,
                    season: None,
                    episode: None,
                    requesting_filename: None,
                },
            );
            match extraction {
                ExtractionOutcome::Entry(entry) => {
                    let (text, _) = decode_to_utf8(&entry.bytes);
                    (text, true)
                }
                ExtractionOutcome::Informational(text) => (text, false),
            }
        }
    };

    if !is_srt_like {
        return Ok((
            [(header::CONTENT_TYPE, "application/x-subrip")],
            text,
        )
            .into_response());
    }

    let cues = parse_srt(&text);
    if !cues.is_empty() {
        if let Ok(payload) = serde_json::to_vec(&cues) {
            let _ = state
                .storage()
                .set(
                    CacheType::Embedded,
                    &query.id,
                    &payload,
                    CacheType::Embedded.default_ttl(),
                )
                .await;
        }
    }

    if query.skip_ass_conversion {
        return Ok((
            [(header::CONTENT_TYPE, "application/x-subrip")],
            render_srt(&cues),
        )
            .into_response());
    }

    Ok((
        [(header::CONTENT_TYPE, "text/vtt")],
        render_vtt(&cues),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_resolves_from_id_prefix() {
        assert_eq!(
            provider_kind_from_id("opensubtitles-v3:1234"),
            Some(ProviderKind::OpenSubtitles)
        );
        assert_eq!(
            provider_kind_from_id("podnapisi:5678"),
            Some(ProviderKind::Podnapisi)
        );
        assert_eq!(provider_kind_from_id("unknown:1"), None);
    }
}
