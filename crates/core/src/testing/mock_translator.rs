//! Mock [`Translator`] for exercising the singleflight builder without a real AI backend.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::language::LanguageCode;
use crate::translate::{Cue, TranslateError, Translator};

/// Splits cues into `batch_size`-sized chunks and echoes each cue's text with a
/// `[<lang>] ` prefix, standing in for a real translation backend.
pub struct MockTranslator {
    batch_size: usize,
    next_error: RwLock<Option<TranslateError>>,
    delay: RwLock<Option<std::time::Duration>>,
}

impl MockTranslator {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            next_error: RwLock::new(None),
            delay: RwLock::new(None),
        }
    }

    pub async fn set_next_error(&self, error: TranslateError) {
        *self.next_error.write().await = Some(error);
    }

    pub async fn set_delay(&self, delay: std::time::Duration) {
        *self.delay.write().await = Some(delay);
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate_batches(
        &self,
        cues: &[Cue],
        target_lang: LanguageCode,
    ) -> Result<Vec<Vec<Cue>>, TranslateError> {
        if let Some(delay) = *self.delay.read().await {
            tokio::time::sleep(delay).await;
        }
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }
        let lang: String = target_lang.into();
        Ok(cues
            .chunks(self.batch_size)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|cue| Cue {
                        text: format!("[{lang}] {}", cue.text),
                        ..cue.clone()
                    })
                    .collect()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[tokio::test]
    async fn splits_into_requested_batch_size() {
        let translator = MockTranslator::new(2);
        let cues = fixtures::cues(5);
        let batches = translator
            .translate_batches(&cues, LanguageCode::PORTUGUESE)
            .await
            .unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 2);
        assert_eq!(batches[2].len(), 1);
    }

    #[tokio::test]
    async fn prefixes_translated_text() {
        let translator = MockTranslator::new(10);
        let cues = fixtures::cues(1);
        let batches = translator
            .translate_batches(&cues, LanguageCode::PORTUGUESE)
            .await
            .unwrap();
        assert!(batches[0][0].text.starts_with("[por] "));
    }
}
