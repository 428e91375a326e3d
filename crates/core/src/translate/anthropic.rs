//! Anthropic-backed [`Translator`]: batches cues into a single prompt per batch and asks for
//! back a JSON array of translated strings, grounded on the teacher's `AnthropicClient`
//! (`textbrain::llm::AnthropicClient`) request/response shape.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::language::LanguageCode;
use crate::translate::types::{Cue, TranslateError};
use crate::translate::translator::Translator;

const DEFAULT_API_BASE: &str = "https://api.anthropic.com";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicTranslator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    api_base: String,
    batch_size: usize,
}

impl AnthropicTranslator {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, batch_size: usize) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            batch_size: batch_size.max(1),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    fn prompt_for(cues: &[Cue], target_lang: LanguageCode) -> String {
        let lines: Vec<String> = cues
            .iter()
            .map(|cue| format!("{}\t{}", cue.index, cue.text.replace('\n', " ⏎ ")))
            .collect();
        format!(
            "Translate each subtitle line below into the language with ISO 639-2 code \"{target_lang}\". \
             Reply with a JSON array of strings in the same order, one translation per line, no commentary.\n\n{}",
            lines.join("\n")
        )
    }
}

#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    #[serde(rename = "type")]
    content_type: String,
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorDetail {
    message: String,
}

fn classify_status(status: u16) -> TranslateError {
    match status {
        413 => TranslateError::MaxTokens,
        400 => TranslateError::InvalidSource("translator rejected the request".into()),
        _ => TranslateError::BackendError(format!("anthropic returned status {status}")),
    }
}

#[async_trait]
impl Translator for AnthropicTranslator {
    async fn translate_batches(
        &self,
        cues: &[Cue],
        target_lang: LanguageCode,
    ) -> Result<Vec<Vec<Cue>>, TranslateError> {
        let mut batches = Vec::new();
        for chunk in cues.chunks(self.batch_size) {
            let prompt = Self::prompt_for(chunk, target_lang);
            let request = AnthropicRequest {
                model: self.model.clone(),
                max_tokens: DEFAULT_MAX_TOKENS,
                messages: vec![AnthropicMessage {
                    role: "user".to_string(),
                    content: prompt,
                }],
            };

            let response = self
                .client
                .post(format!("{}/v1/messages", self.api_base))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&request)
                .send()
                .await
                .map_err(|e| TranslateError::BackendError(e.to_string()))?;

            let status = response.status().as_u16();
            if status != 200 {
                let body = response.text().await.unwrap_or_default();
                if let Ok(error) = serde_json::from_str::<AnthropicError>(&body) {
                    if error.error.message.to_lowercase().contains("prohibited") {
                        return Err(TranslateError::ProhibitedContent);
                    }
                }
                return Err(classify_status(status));
            }

            let parsed: AnthropicResponse = response
                .json()
                .await
                .map_err(|e| TranslateError::BackendError(e.to_string()))?;

            let text = parsed
                .content
                .into_iter()
                .filter(|c| c.content_type == "text")
                .map(|c| c.text)
                .collect::<Vec<_>>()
                .join("");

            let translations: Vec<String> = serde_json::from_str(text.trim()).map_err(|e| {
                TranslateError::BackendError(format!("could not parse translator response: {e}"))
            })?;

            if translations.len() != chunk.len() {
                return Err(TranslateError::BackendError(
                    "translator returned a different number of lines than requested".into(),
                ));
            }

            batches.push(
                chunk
                    .iter()
                    .zip(translations)
                    .map(|(cue, text)| Cue {
                        text,
                        ..cue.clone()
                    })
                    .collect(),
            );
        }
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_includes_target_language_and_lines() {
        let cues = vec![Cue {
            index: 0,
            start_time_ms: 0,
            end_time_ms: 1000,
            text: "hello".into(),
        }];
        let prompt = AnthropicTranslator::prompt_for(&cues, LanguageCode::PORTUGUESE);
        assert!(prompt.contains("por"));
        assert!(prompt.contains("hello"));
    }

    #[test]
    fn status_413_maps_to_max_tokens() {
        assert!(matches!(classify_status(413), TranslateError::MaxTokens));
    }
}
