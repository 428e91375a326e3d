use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ErrorClass;

/// One subtitle cue (spec §3 Translation Cache Entry `segments`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    pub index: u32,
    pub start_time_ms: u64,
    pub end_time_ms: u64,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranslationStatus {
    InFlight,
    Partial,
    Complete,
    Failed,
}

/// Persisted translation cache entry (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationEntry {
    pub base_key: String,
    pub scoped_key: String,
    pub runtime_key: String,
    pub segments: Vec<Cue>,
    pub status: TranslationStatus,
    /// Bitset of completed batch indices.
    pub completed_batches: u64,
    pub total_batches: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner_config_hash: Option<String>,
}

impl TranslationEntry {
    /// A cache key MUST NOT be considered complete unless every batch bit is set (spec §3
    /// invariant).
    pub fn is_complete(&self) -> bool {
        if self.total_batches == 0 {
            return false;
        }
        let full_mask = if self.total_batches >= 64 {
            u64::MAX
        } else {
            (1u64 << self.total_batches) - 1
        };
        self.completed_batches == full_mask
    }
}

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("translation exceeded the model's maximum token budget")]
    MaxTokens,
    #[error("translation request was rejected as prohibited content")]
    ProhibitedContent,
    #[error("source subtitle could not be parsed: {0}")]
    InvalidSource(String),
    #[error("translation backend error: {0}")]
    BackendError(String),
    #[error("cache storage error: {0}")]
    Storage(String),
    #[error("bypass cache requested without a config hash")]
    BypassRequiresConfigHash,
}

impl TranslateError {
    pub fn class(&self) -> ErrorClass {
        match self {
            TranslateError::MaxTokens => ErrorClass::MaxTokens,
            TranslateError::ProhibitedContent => ErrorClass::ProhibitedContent,
            TranslateError::InvalidSource(_) => ErrorClass::InvalidSource,
            TranslateError::BackendError(_) => ErrorClass::ServerError,
            TranslateError::Storage(_) => ErrorClass::DatabaseError,
            TranslateError::BypassRequiresConfigHash => ErrorClass::ClientError,
        }
    }
}
