//! `GET /activity?config=<hash>` — Stream Activity Bus SSE fan-out (spec §4.9, §6).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::Instant;

use submaker_core::StreamEvent;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    pub config: String,
}

pub async fn activity(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ActivityQuery>,
) -> Result<Response, StatusCode> {
    let listener = match state.stream_bus().subscribe(&query.config).await {
        Ok(listener) => listener,
        Err(_) => {
            return Ok((StatusCode::NO_CONTENT, [("retry-after", "5")]).into_response());
        }
    };

    let sse = Sse::new(event_stream(listener.receiver, listener.deadline))
        .keep_alive(KeepAlive::new().interval(Duration::from_secs(15)));

    Ok((
        [
            ("cache-control", "no-store"),
            ("content-encoding", "identity"),
            ("x-accel-buffering", "no"),
        ],
        sse,
    )
        .into_response())
}

/// Ends the stream once `deadline` passes, pruning this one listener's connection (spec
/// §4.9) without touching any other listener sharing the same config-hash channel.
fn event_stream(
    receiver: broadcast::Receiver<StreamEvent>,
    deadline: Instant,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(Some(receiver), move |state| async move {
        let mut receiver = state?;
        loop {
            if Instant::now() >= deadline {
                return None;
            }
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return None,
                received = receiver.recv() => match received {
                    Ok(event) => {
                        let data = serde_json::to_string(&event).unwrap_or_default();
                        let sse_event = Event::default().event(event.name()).data(data);
                        return Some((Ok(sse_event), Some(receiver)));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
            }
        }
    })
}
