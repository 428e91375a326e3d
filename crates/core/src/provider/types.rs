use thiserror::Error;

use crate::error::ErrorClass;

/// Errors a provider is allowed to propagate upward (spec §4.1: "MUST NOT throw for expected
/// operational errors; MUST propagate only authentication-configuration errors").
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} authentication failed: {message}")]
    Authentication { provider: String, message: String },
}

impl ProviderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ProviderError::Authentication { .. } => ErrorClass::Authentication,
        }
    }
}

/// Options accepted by `Provider::download` (spec §4.1).
#[derive(Debug, Clone, Default)]
pub struct DownloadOptions {
    pub timeout_ms: Option<u64>,
    pub language_hint: Option<String>,
    pub skip_ass_conversion: bool,
}

/// Result of a download: either raw subtitle bytes ready for encoding detection, or an
/// archive buffer that still needs extraction.
#[derive(Debug, Clone)]
pub enum DownloadedContent {
    SubtitleBytes(Vec<u8>),
    Archive(Vec<u8>),
    /// Synthesized informational subtitle text (spec §4.1: error pages produce one instead
    /// of raw bytes).
    Informational(String),
}
