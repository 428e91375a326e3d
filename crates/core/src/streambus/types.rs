use serde::Serialize;

/// SSE event kinds published on the Stream Activity Bus (spec §4.9).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum StreamEvent {
    #[serde(rename = "ready")]
    Ready { video_id: String },
    #[serde(rename = "episode")]
    Episode {
        video_id: String,
        filename: Option<String>,
        video_hash: Option<String>,
    },
    #[serde(rename = "partial")]
    Partial {
        completed_batches: u64,
        total_batches: u32,
    },
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "ping")]
    Ping,
}

impl StreamEvent {
    pub fn name(&self) -> &'static str {
        match self {
            StreamEvent::Ready { .. } => "ready",
            StreamEvent::Episode { .. } => "episode",
            StreamEvent::Partial { .. } => "partial",
            StreamEvent::Complete => "complete",
            StreamEvent::Ping => "ping",
        }
    }
}

/// Returned when a config hash already has the maximum number of concurrent listeners
/// (spec §4.9: "additional subscribers receive HTTP 204 with Retry-After: 5").
#[derive(Debug, Clone, Copy)]
pub struct TooManyListeners;
