//! Podnapisi provider: unauthenticated HTML-scraping client, demonstrating a provider with
//! no login requirement and client-side episode filtering on season-wide results.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use crate::config::{ProviderConfig, ProviderKind};
use crate::descriptor::{SearchRequest, SubtitleDescriptor, SubtitleFormat, TriState};
use crate::language::LanguageCode;
use crate::pool::HostPool;
use crate::provider::episode_match::{find_episode, find_range, MatchKind};
use crate::provider::traits::Provider;
use crate::provider::types::{DownloadOptions, DownloadedContent, ProviderError};

const PER_LANGUAGE_CAP: usize = 14;

pub struct PodnapisiProvider {
    config: ProviderConfig,
    pool: Arc<HostPool>,
}

impl PodnapisiProvider {
    pub fn new(config: ProviderConfig, pool: Arc<HostPool>) -> Self {
        Self { config, pool }
    }

    fn base_url(&self) -> &str {
        self.config
            .base_url
            .as_deref()
            .unwrap_or("https://www.podnapisi.net")
    }

    /// Filters season-wide results down to the requested episode, tagging season packs
    /// rather than dropping them (spec §4.1 "Episode filtering").
    fn filter_to_episode(
        mut descriptors: Vec<SubtitleDescriptor>,
        requested_episode: Option<u32>,
    ) -> Vec<SubtitleDescriptor> {
        let Some(requested) = requested_episode else {
            return descriptors;
        };

        descriptors.retain_mut(|d| {
            if let Some((start, end)) = find_range(&d.name) {
                if (start..=end).contains(&requested) {
                    d.is_season_pack = true;
                    d.season_pack_episode = Some(requested);
                    return true;
                }
                return false;
            }

            match find_episode(&d.name) {
                Some(m) if m.kind == MatchKind::SeasonEpisode || m.kind == MatchKind::Anime => {
                    m.episode == requested
                }
                Some(m) => m.episode == requested,
                None => true,
            }
        });
        descriptors
    }
}

#[async_trait]
impl Provider for PodnapisiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Podnapisi
    }

    async fn search(&self, req: &SearchRequest) -> Result<Vec<SubtitleDescriptor>, ProviderError> {
        if !self.pool.is_call_permitted(self.config.kind).await {
            return Ok(vec![]);
        }

        let client = self.pool.client(self.config.kind).await;
        let mut query: Vec<(&str, String)> = vec![];
        if let Some(filename) = &req.filename {
            query.push(("keywords", filename.clone()));
        }
        if let Some(imdb) = &req.imdb_id {
            query.push(("movie_id", imdb.clone()));
        }

        let response = client
            .get(format!("{}/subtitles/search", self.base_url()))
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

        let html = match response.text().await {
            Ok(html) => html,
            Err(_) => return Ok(vec![]),
        };

        let descriptors = parse_result_rows(&html, req);
        let filtered = Self::filter_to_episode(descriptors, req.episode);
        Ok(cap_per_language(filtered, PER_LANGUAGE_CAP))
    }

    async fn download(
        &self,
        id: &str,
        _opts: &DownloadOptions,
    ) -> Result<DownloadedContent, ProviderError> {
        let client = self.pool.client(self.config.kind).await;
        let response = client
            .get(format!("{}/download/{id}", self.base_url()))
            .send()
            .await;

        let Ok(response) = response else {
            return Ok(DownloadedContent::Informational(
                "podnapisi download request failed".to_string(),
            ));
        };

        if !response.status().is_success() {
            return Ok(DownloadedContent::Informational(format!(
                "podnapisi returned status {}",
                response.status()
            )));
        }

        match response.bytes().await {
            Ok(bytes) if bytes.starts_with(b"PK\x03\x04") => {
                Ok(DownloadedContent::Archive(bytes.to_vec()))
            }
            Ok(bytes) => Ok(DownloadedContent::SubtitleBytes(bytes.to_vec())),
            Err(_) => Ok(DownloadedContent::Informational(
                "podnapisi body read failed".to_string(),
            )),
        }
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

/// Extracts `(id, language, release_name)` triples from the search result HTML. Podnapisi's
/// markup exposes these in `data-*` attributes on each result row.
fn parse_result_rows(html: &str, _req: &SearchRequest) -> Vec<SubtitleDescriptor> {
    let row_pattern = Regex::new(
        r#"data-id="(?P<id>[^"]+)"[^>]*data-lang="(?P<lang>[a-zA-Z]{3})"[^>]*data-name="(?P<name>[^"]+)""#,
    )
    .expect("valid result-row regex");

    row_pattern
        .captures_iter(html)
        .filter_map(|caps| {
            let language_code = LanguageCode::parse(&caps["lang"]).ok()?;
            Some(SubtitleDescriptor {
                id: format!("podnapisi:{}", &caps["id"]),
                provider: ProviderKind::Podnapisi,
                language: caps["lang"].to_string(),
                language_code,
                name: caps["name"].to_string(),
                format: SubtitleFormat::Srt,
                downloads: 0,
                rating: 0.0,
                hearing_impaired: TriState::Unknown,
                foreign_parts_only: TriState::Unknown,
                machine_translated: TriState::Unknown,
                is_season_pack: false,
                season_pack_season: None,
                season_pack_episode: None,
                download_link: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MediaType;

    fn sample_request(episode: Option<u32>) -> SearchRequest {
        SearchRequest {
            imdb_id: Some("tt1234567".into()),
            tmdb_id: None,
            media_type: MediaType::Episode,
            season: Some(1),
            episode,
            languages: vec![LanguageCode::ENGLISH],
            exclude_hi: false,
            filename: Some("Show.S01E02.WEB-DL".into()),
            provider_timeout_ms: 15_000,
        }
    }

    #[test]
    fn parses_rows_from_html() {
        let html = r#"<div data-id="123" data-lang="eng" data-name="Show.S01E02.WEB-DL"></div>
                       <div data-id="124" data-lang="eng" data-name="Show.S01E03.WEB-DL"></div>"#;
        let descriptors = parse_result_rows(html, &sample_request(Some(2)));
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0].id, "podnapisi:123");
    }

    #[test]
    fn filters_to_requested_episode() {
        let html = r#"<div data-id="123" data-lang="eng" data-name="Show.S01E02.WEB-DL"></div>
                       <div data-id="124" data-lang="eng" data-name="Show.S01E03.WEB-DL"></div>"#;
        let descriptors = parse_result_rows(html, &sample_request(Some(2)));
        let filtered = PodnapisiProvider::filter_to_episode(descriptors, Some(2));
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].name, "Show.S01E02.WEB-DL");
    }

    #[test]
    fn season_pack_range_is_tagged_not_dropped() {
        let html = r#"<div data-id="900" data-lang="eng" data-name="Show.S01.01-12.Batch"></div>"#;
        let descriptors = parse_result_rows(html, &sample_request(Some(5)));
        let filtered = PodnapisiProvider::filter_to_episode(descriptors, Some(5));
        assert_eq!(filtered.len(), 1);
        assert!(filtered[0].is_season_pack);
        assert_eq!(filtered[0].season_pack_episode, Some(5));
    }
}
