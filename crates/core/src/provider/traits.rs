use async_trait::async_trait;

use crate::config::ProviderKind;
use crate::descriptor::{SearchRequest, SubtitleDescriptor};
use crate::provider::types::{DownloadOptions, DownloadedContent, ProviderError};

/// Abstract contract every upstream subtitle source implements (spec §4.1).
#[async_trait]
pub trait Provider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// MUST honor `req.provider_timeout_ms` as an absolute budget, return `[]` on any
    /// non-fatal failure, and only propagate `ProviderError::Authentication`.
    async fn search(&self, req: &SearchRequest) -> Result<Vec<SubtitleDescriptor>, ProviderError>;

    async fn download(
        &self,
        id: &str,
        opts: &DownloadOptions,
    ) -> Result<DownloadedContent, ProviderError>;
}
