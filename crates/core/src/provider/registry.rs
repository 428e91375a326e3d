use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProviderKind;
use crate::provider::traits::Provider;

/// Holds the enabled providers for this deployment, keyed by kind, mirroring the teacher's
/// searcher registry pattern (one entry per indexer, looked up by name).
#[derive(Default)]
pub struct Registry {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.providers.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.providers.get(&kind).cloned()
    }

    pub fn enabled(&self) -> Vec<Arc<dyn Provider>> {
        self.providers.values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{SearchRequest, SubtitleDescriptor};
    use crate::provider::types::{DownloadOptions, DownloadedContent, ProviderError};
    use async_trait::async_trait;

    struct StubProvider(ProviderKind);

    #[async_trait]
    impl Provider for StubProvider {
        fn kind(&self) -> ProviderKind {
            self.0
        }

        async fn search(
            &self,
            _req: &SearchRequest,
        ) -> Result<Vec<SubtitleDescriptor>, ProviderError> {
            Ok(vec![])
        }

        async fn download(
            &self,
            _id: &str,
            _opts: &DownloadOptions,
        ) -> Result<DownloadedContent, ProviderError> {
            Ok(DownloadedContent::SubtitleBytes(vec![]))
        }
    }

    #[test]
    fn registers_and_looks_up_by_kind() {
        let mut registry = Registry::new();
        registry.register(Arc::new(StubProvider(ProviderKind::OpenSubtitles)));
        assert!(registry.get(ProviderKind::OpenSubtitles).is_some());
        assert!(registry.get(ProviderKind::Podnapisi).is_none());
    }

    #[test]
    fn enabled_lists_all_registered() {
        let mut registry = Registry::new();
        registry.register(Arc::new(StubProvider(ProviderKind::OpenSubtitles)));
        registry.register(Arc::new(StubProvider(ProviderKind::Podnapisi)));
        assert_eq!(registry.enabled().len(), 2);
    }
}
