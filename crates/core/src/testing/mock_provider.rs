//! Mock provider for testing fan-out and dedup without real upstreams.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::config::ProviderKind;
use crate::descriptor::{SearchRequest, SubtitleDescriptor};
use crate::provider::traits::Provider;
use crate::provider::types::{DownloadOptions, DownloadedContent, ProviderError};

/// Controllable [`Provider`] impl: configure results, inject errors, or simulate latency.
pub struct MockProvider {
    kind: ProviderKind,
    results: RwLock<Vec<SubtitleDescriptor>>,
    next_search_error: RwLock<Option<ProviderError>>,
    search_delay: RwLock<Option<std::time::Duration>>,
    recorded_searches: RwLock<Vec<SearchRequest>>,
    download_content: RwLock<Option<DownloadedContent>>,
}

impl MockProvider {
    pub fn new(kind: ProviderKind) -> Self {
        Self {
            kind,
            results: RwLock::new(Vec::new()),
            next_search_error: RwLock::new(None),
            search_delay: RwLock::new(None),
            recorded_searches: RwLock::new(Vec::new()),
            download_content: RwLock::new(None),
        }
    }

    pub async fn set_results(&self, results: Vec<SubtitleDescriptor>) {
        *self.results.write().await = results;
    }

    pub async fn set_next_search_error(&self, error: ProviderError) {
        *self.next_search_error.write().await = Some(error);
    }

    pub async fn set_search_delay(&self, delay: std::time::Duration) {
        *self.search_delay.write().await = Some(delay);
    }

    pub async fn set_download_content(&self, content: DownloadedContent) {
        *self.download_content.write().await = Some(content);
    }

    pub async fn recorded_searches(&self) -> Vec<SearchRequest> {
        self.recorded_searches.read().await.clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    async fn search(&self, req: &SearchRequest) -> Result<Vec<SubtitleDescriptor>, ProviderError> {
        if let Some(delay) = *self.search_delay.read().await {
            tokio::time::sleep(delay).await;
        }
        self.recorded_searches.write().await.push(req.clone());
        if let Some(error) = self.next_search_error.write().await.take() {
            return Err(error);
        }
        Ok(self.results.read().await.clone())
    }

    async fn download(
        &self,
        _id: &str,
        _opts: &DownloadOptions,
    ) -> Result<DownloadedContent, ProviderError> {
        Ok(self
            .download_content
            .read()
            .await
            .clone()
            .unwrap_or_else(|| DownloadedContent::SubtitleBytes(Vec::new())))
    }
}
