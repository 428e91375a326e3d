//! OpenSubtitles v3 provider: authenticated via the Login Coordinator, CDN-first download
//! with a parallel details→CDN race started at the first retryable failure (spec §4.1).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::{ProviderConfig, ProviderKind};
use crate::descriptor::{SearchRequest, SubtitleDescriptor, TriState};
use crate::login::{LoginCoordinator, LoginError};
use crate::pool::HostPool;
use crate::provider::episode_match::{find_episode, MatchKind};
use crate::provider::traits::Provider;
use crate::provider::types::{DownloadOptions, DownloadedContent, ProviderError};

const PER_LANGUAGE_CAP: usize = 14;
const RETRY_BASE_MS: u64 = 800;
const MAX_ATTEMPTS: u32 = 3;
const CDN_TIMEOUT: Duration = Duration::from_secs(4);

pub struct OpenSubtitlesProvider {
    config: ProviderConfig,
    pool: Arc<HostPool>,
    login_coordinator: Arc<LoginCoordinator>,
    /// CDN-first cache: search results may carry a direct `downloadLink`, kept here so the
    /// download path can try it before the authenticated endpoint.
    direct_links: RwLock<HashMap<String, String>>,
}

impl OpenSubtitlesProvider {
    pub fn new(
        config: ProviderConfig,
        pool: Arc<HostPool>,
        login_coordinator: Arc<LoginCoordinator>,
    ) -> Self {
        Self {
            config,
            pool,
            login_coordinator,
            direct_links: RwLock::new(HashMap::new()),
        }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://api.opensubtitles.com/api/v1")
    }

    fn is_retryable_status(status: u16) -> bool {
        status == 429 || status == 503 || (500..=599).contains(&status)
    }

    async fn login(&self) -> Result<String, ProviderError> {
        let api_key = self.config.api_key.clone().ok_or_else(|| {
            ProviderError::Authentication {
                provider: self.config.kind.name().to_string(),
                message: "no api_key configured".to_string(),
            }
        })?;

        let client = self.pool.client(self.config.kind).await;
        let base_url = self.base_url().to_string();
        let result = self
            .login_coordinator
            .login("opensubtitles-v3", || async move {
                let response = client
                    .post(format!("{base_url}/login"))
                    .header("Api-Key", &api_key)
                    .send()
                    .await
                    .map_err(|e| LoginError::HttpFailure(e.to_string()))?;
                if !response.status().is_success() {
                    return Err(LoginError::HttpFailure(format!(
                        "login rejected with status {}",
                        response.status()
                    )));
                }
                let body: serde_json::Value = response
                    .json()
                    .await
                    .map_err(|e| LoginError::HttpFailure(e.to_string()))?;
                Ok(body["token"].as_str().unwrap_or_default().to_string())
            })
            .await;

        result.map_err(|e| ProviderError::Authentication {
            provider: self.config.kind.name().to_string(),
            message: e.to_string(),
        })
    }

    async fn fetch_cdn_link(&self, link: &str) -> Option<Vec<u8>> {
        let client = self.pool.client(self.config.kind).await;
        client
            .get(link)
            .timeout(CDN_TIMEOUT)
            .send()
            .await
            .ok()?
            .bytes()
            .await
            .ok()
            .map(|b| b.to_vec())
    }

    async fn fetch_authenticated(&self, id: &str, token: &str) -> Result<Vec<u8>, u16> {
        let client = self.pool.client(self.config.kind).await;
        let response = client
            .get(format!("{}/download/{id}", self.base_url()))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|_| 0u16)?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(status);
        }
        response.bytes().await.map(|b| b.to_vec()).map_err(|_| 0)
    }

    /// The "details" side of the details→CDN fallback (spec §4.1): asks the provider's
    /// download-details endpoint for a fresh direct link, independent of the one cached from
    /// search, then fetches that link like any other CDN URL.
    async fn fetch_details_then_cdn(&self, id: &str, token: &str) -> Option<Vec<u8>> {
        let client = self.pool.client(self.config.kind).await;
        let response = client
            .post(format!("{}/download", self.base_url()))
            .bearer_auth(token)
            .json(&serde_json::json!({ "file_id": id }))
            .send()
            .await
            .ok()?;
        if !response.status().is_success() {
            return None;
        }
        let body: serde_json::Value = response.json().await.ok()?;
        let link = body["link"].as_str()?;
        self.fetch_cdn_link(link).await
    }
}

#[async_trait]
impl Provider for OpenSubtitlesProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenSubtitles
    }

    async fn search(&self, req: &SearchRequest) -> Result<Vec<SubtitleDescriptor>, ProviderError> {
        if !self.pool.is_call_permitted(self.config.kind).await {
            return Ok(vec![]);
        }

        let token = match self.login().await {
            Ok(token) => token,
            Err(ProviderError::Authentication { .. }) if self.config.enabled => {
                return Err(ProviderError::Authentication {
                    provider: self.config.kind.name().to_string(),
                    message: "authentication configuration error".to_string(),
                })
            }
            Err(e) => return Err(e),
        };

        let client = self.pool.client(self.config.kind).await;
        let mut query = vec![("type", format!("{:?}", req.media_type))];
        if let Some(imdb) = &req.imdb_id {
            query.push(("imdb_id", imdb.clone()));
        }
        if let Some(season) = req.season {
            query.push(("season_number", season.to_string()));
        }
        if let Some(episode) = req.episode {
            query.push(("episode_number", episode.to_string()));
        }

        let response = client
            .get(format!("{}/subtitles", self.base_url()))
            .bearer_auth(&token)
            .timeout(Duration::from_millis(req.provider_timeout_ms))
            .query(&query)
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(_) => {
                self.pool.record_failure(self.config.kind).await;
                return Ok(vec![]);
            }
        };

        if !response.status().is_success() {
            self.pool.record_failure(self.config.kind).await;
            return Ok(vec![]);
        }
        self.pool.record_success(self.config.kind).await;

        let body: serde_json::Value = match response.json().await {
            Ok(body) => body,
            Err(_) => return Ok(vec![]),
        };

        let empty = vec![];
        let entries = body["data"].as_array().unwrap_or(&empty);
        let mut descriptors = Vec::new();
        let mut direct_links = self.direct_links.write().await;

        for entry in entries {
            let Some(descriptor) = parse_descriptor(entry) else {
                continue;
            };

            if req.season.is_some() && req.episode.is_some() && !descriptor.is_season_pack {
                if let Some(m) = find_episode(&descriptor.name) {
                    if m.kind == MatchKind::SeasonEpisode {
                        if m.episode != req.episode.unwrap() {
                            continue;
                        }
                    }
                }
            }

            if let Some(link) = &descriptor.download_link {
                direct_links.insert(descriptor.id.clone(), link.clone());
            }
            descriptors.push(descriptor);
        }
        drop(direct_links);

        Ok(cap_per_language(descriptors, PER_LANGUAGE_CAP))
    }

    async fn download(
        &self,
        id: &str,
        opts: &DownloadOptions,
    ) -> Result<DownloadedContent, ProviderError> {
        let cached_link = self.direct_links.read().await.get(id).cloned();

        if let Some(link) = &cached_link {
            if let Some(bytes) = self.fetch_cdn_link(link).await {
                return Ok(classify_download(bytes));
            }
        }

        let token = self.login().await?;
        let remaining_budget_ms = opts.timeout_ms.unwrap_or(20_000);
        let mut attempt = 0u32;
        let mut last_status = 0u16;
        // Started once, at the first retryable failure (spec §4.1); `None` after that either
        // because it hasn't started yet or because it already raced and lost.
        let mut details_race: Option<
            std::pin::Pin<Box<dyn std::future::Future<Output = Option<Vec<u8>>> + Send + '_>>,
        > = None;
        let mut details_race_used = false;

        while attempt < MAX_ATTEMPTS {
            attempt += 1;
            let auth_attempt = self.fetch_authenticated(id, &token);

            let result = match details_race.take() {
                Some(mut race) => {
                    tokio::select! {
                        result = auth_attempt => Some(result),
                        bytes = &mut race => {
                            match bytes {
                                Some(bytes) => return Ok(classify_download(bytes)),
                                // details→CDN side lost; fall through and retry the auth endpoint
                                None => None,
                            }
                        }
                    }
                }
                None => Some(auth_attempt.await),
            };

            let Some(result) = result else { continue };

            match result {
                Ok(bytes) => return Ok(classify_download(bytes)),
                Err(status) => last_status = status,
            }

            if !Self::is_retryable_status(last_status) {
                break;
            }

            if !details_race_used {
                debug!(attempt, status = last_status, "starting details→CDN race after first retryable failure");
                details_race = Some(Box::pin(self.fetch_details_then_cdn(id, &token)));
                details_race_used = true;
            }

            let backoff = (RETRY_BASE_MS * 2u64.pow(attempt - 1)).min(remaining_budget_ms / 3);
            debug!(attempt, status = last_status, backoff, "retrying OpenSubtitles download");
            tokio::time::sleep(Duration::from_millis(backoff)).await;
        }

        Ok(DownloadedContent::Informational(format!(
            "download failed after {attempt} attempts (status {last_status})"
        )))
    }
}

fn classify_download(bytes: Vec<u8>) -> DownloadedContent {
    if bytes.starts_with(b"PK\x03\x04") || bytes.starts_with(b"Rar!\x1a\x07") {
        DownloadedContent::Archive(bytes)
    } else {
        DownloadedContent::SubtitleBytes(bytes)
    }
}

fn cap_per_language(
    descriptors: Vec<SubtitleDescriptor>,
    cap: usize,
) -> Vec<SubtitleDescriptor> {
    let mut counts: HashMap<_, usize> = HashMap::new();
    descriptors
        .into_iter()
        .filter(|d| {
            let count = counts.entry(d.language_code).or_insert(0);
            *count += 1;
            *count <= cap
        })
        .collect()
}

fn parse_descriptor(entry: &serde_json::Value) -> Option<SubtitleDescriptor> {
    use crate::language::LanguageCode;
    use crate::descriptor::SubtitleFormat;

    let attrs = entry.get("attributes")?;
    let id = entry["id"].as_str()?.to_string();
    let language_raw = attrs["language"].as_str().unwrap_or("eng").to_string();
    let language_code = LanguageCode::parse(&language_raw).ok()?;
    let files = attrs["files"].as_array()?;
    let file = files.first()?;

    Some(SubtitleDescriptor {
        id: format!("opensubtitles-v3:{id}"),
        provider: ProviderKind::OpenSubtitles,
        language: language_raw,
        language_code,
        name: file["file_name"].as_str().unwrap_or("unknown").to_string(),
        format: SubtitleFormat::from_extension(
            attrs["format"].as_str().unwrap_or("srt"),
        )
        .unwrap_or(SubtitleFormat::Srt),
        downloads: attrs["download_count"].as_u64().unwrap_or(0),
        rating: attrs["ratings"].as_f64().unwrap_or(0.0) as f32,
        hearing_impaired: TriState::from_bool(attrs["hearing_impaired"].as_bool().unwrap_or(false)),
        foreign_parts_only: TriState::from_bool(
            attrs["foreign_parts_only"].as_bool().unwrap_or(false),
        ),
        machine_translated: TriState::from_bool(
            attrs["machine_translated"].as_bool().unwrap_or(false),
        ),
        is_season_pack: false,
        season_pack_season: None,
        season_pack_episode: None,
        download_link: attrs["url"].as_str().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_status_covers_spec_list() {
        assert!(OpenSubtitlesProvider::is_retryable_status(429));
        assert!(OpenSubtitlesProvider::is_retryable_status(503));
        assert!(OpenSubtitlesProvider::is_retryable_status(500));
        assert!(!OpenSubtitlesProvider::is_retryable_status(401));
        assert!(!OpenSubtitlesProvider::is_retryable_status(404));
    }

    #[test]
    fn classify_download_detects_zip_magic_bytes() {
        let bytes = b"PK\x03\x04rest-of-zip".to_vec();
        assert!(matches!(classify_download(bytes), DownloadedContent::Archive(_)));
    }

    #[test]
    fn classify_download_detects_rar_magic_bytes() {
        let bytes = b"Rar!\x1a\x07\x00rest".to_vec();
        assert!(matches!(classify_download(bytes), DownloadedContent::Archive(_)));
    }

    #[test]
    fn classify_download_passes_through_plain_text() {
        let bytes = b"1\n00:00:01,000 --> 00:00:02,000\nHello\n".to_vec();
        assert!(matches!(classify_download(bytes), DownloadedContent::SubtitleBytes(_)));
    }

    #[test]
    fn cap_per_language_enforces_14_limit() {
        use crate::language::LanguageCode;
        let mut descriptors = Vec::new();
        for i in 0..20 {
            descriptors.push(SubtitleDescriptor {
                id: format!("id-{i}"),
                provider: ProviderKind::OpenSubtitles,
                language: "English".into(),
                language_code: LanguageCode::ENGLISH,
                name: format!("Show.S01E0{i}"),
                format: crate::descriptor::SubtitleFormat::Srt,
                downloads: 0,
                rating: 0.0,
                hearing_impaired: TriState::False,
                foreign_parts_only: TriState::False,
                machine_translated: TriState::False,
                is_season_pack: false,
                season_pack_season: None,
                season_pack_episode: None,
                download_link: None,
            });
        }
        let capped = cap_per_language(descriptors, PER_LANGUAGE_CAP);
        assert_eq!(capped.len(), PER_LANGUAGE_CAP);
    }
}
