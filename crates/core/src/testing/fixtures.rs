//! Test fixtures shared by the mocks and by other modules' unit tests.

use crate::config::ProviderKind;
use crate::descriptor::{MediaType, SearchRequest, SubtitleDescriptor, SubtitleFormat, TriState};
use crate::language::LanguageCode;
use crate::translate::Cue;

pub fn descriptor(name: &str, provider: ProviderKind) -> SubtitleDescriptor {
    SubtitleDescriptor {
        id: format!("{}:{}", provider.name(), name),
        provider,
        language: "English".into(),
        language_code: LanguageCode::ENGLISH,
        name: name.to_string(),
        format: SubtitleFormat::Srt,
        downloads: 100,
        rating: 7.5,
        hearing_impaired: TriState::False,
        foreign_parts_only: TriState::False,
        machine_translated: TriState::False,
        is_season_pack: false,
        season_pack_season: None,
        season_pack_episode: None,
        download_link: None,
    }
}

pub fn search_request() -> SearchRequest {
    SearchRequest {
        imdb_id: Some("tt1234567".into()),
        tmdb_id: None,
        media_type: MediaType::Episode,
        season: Some(1),
        episode: Some(2),
        languages: vec![LanguageCode::ENGLISH],
        exclude_hi: false,
        filename: None,
        provider_timeout_ms: 5000,
    }
}

pub fn cues(count: usize) -> Vec<Cue> {
    (0..count)
        .map(|i| Cue {
            index: i as u32,
            start_time_ms: i as u64 * 1000,
            end_time_ms: i as u64 * 1000 + 900,
            text: format!("line {i}"),
        })
        .collect()
}
