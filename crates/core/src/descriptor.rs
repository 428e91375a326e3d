//! `SubtitleDescriptor`: the immutable record produced by a provider search (spec §3).

use serde::{Deserialize, Serialize};

use crate::config::ProviderKind;
use crate::language::LanguageCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubtitleFormat {
    Srt,
    Vtt,
    Ass,
    Ssa,
    Sub,
}

impl SubtitleFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "vtt" => Some(Self::Vtt),
            "ass" => Some(Self::Ass),
            "ssa" => Some(Self::Ssa),
            "sub" => Some(Self::Sub),
            _ => None,
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Srt => "srt",
            Self::Vtt => "vtt",
            Self::Ass => "ass",
            Self::Ssa => "ssa",
            Self::Sub => "sub",
        }
    }
}

/// Tri-state: providers sometimes don't report a field at all, which is different from
/// reporting it as false (spec §3 `hearingImpaired, foreignPartsOnly, machineTranslated` are
/// "tri/bool").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    True,
    False,
    Unknown,
}

impl TriState {
    pub fn from_bool(value: bool) -> Self {
        if value {
            Self::True
        } else {
            Self::False
        }
    }

    pub fn is_true(self) -> bool {
        matches!(self, Self::True)
    }
}

/// Immutable record produced by a provider client (spec §3 Subtitle Descriptor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleDescriptor {
    /// Opaque, globally unique. Encodes provider + provider-local id + optional
    /// season-pack hint, and is sufficient to re-download without further context.
    pub id: String,
    pub provider: ProviderKind,
    /// Raw language string as reported by the provider (for display/debugging).
    pub language: String,
    pub language_code: LanguageCode,
    /// Release name, cleaned of prefixes/extensions.
    pub name: String,
    pub format: SubtitleFormat,
    pub downloads: u64,
    /// Bayesian-smoothed rating when derived from good/bad votes (prior of 5 votes at 70%
    /// positive, see `dedup::rank`).
    pub rating: f32,
    pub hearing_impaired: TriState,
    pub foreign_parts_only: TriState,
    pub machine_translated: TriState,
    pub is_season_pack: bool,
    pub season_pack_season: Option<u32>,
    /// Target episode to extract from a season pack.
    pub season_pack_episode: Option<u32>,
    /// Optional direct URL for CDN-first download, bypassing the provider's own endpoint.
    pub download_link: Option<String>,
}

impl SubtitleDescriptor {
    /// `id` must be sufficient to re-download without further context (spec §3 invariant).
    pub fn is_valid(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaType {
    Movie,
    Episode,
    Anime,
    AnimeEpisode,
}

/// Search request passed to every provider (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub imdb_id: Option<String>,
    pub tmdb_id: Option<String>,
    #[serde(rename = "type")]
    pub media_type: MediaType,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub languages: Vec<LanguageCode>,
    pub exclude_hi: bool,
    pub filename: Option<String>,
    pub provider_timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SubtitleDescriptor {
        SubtitleDescriptor {
            id: "opensubtitles-v3:1234".into(),
            provider: ProviderKind::OpenSubtitles,
            language: "English".into(),
            language_code: LanguageCode::ENGLISH,
            name: "Show.S01E02.WEB-DL".into(),
            format: SubtitleFormat::Srt,
            downloads: 1000,
            rating: 8.5,
            hearing_impaired: TriState::False,
            foreign_parts_only: TriState::False,
            machine_translated: TriState::False,
            is_season_pack: false,
            season_pack_season: None,
            season_pack_episode: None,
            download_link: Some("https://example.test/dl/1234".into()),
        }
    }

    #[test]
    fn valid_descriptor_passes() {
        assert!(sample().is_valid());
    }

    #[test]
    fn empty_id_is_invalid() {
        let mut d = sample();
        d.id.clear();
        assert!(!d.is_valid());
    }

    #[test]
    fn format_extension_roundtrip() {
        for fmt in [
            SubtitleFormat::Srt,
            SubtitleFormat::Vtt,
            SubtitleFormat::Ass,
            SubtitleFormat::Ssa,
            SubtitleFormat::Sub,
        ] {
            assert_eq!(SubtitleFormat::from_extension(fmt.extension()), Some(fmt));
        }
    }

    #[test]
    fn tri_state_from_bool() {
        assert!(TriState::from_bool(true).is_true());
        assert!(!TriState::from_bool(false).is_true());
        assert!(!TriState::Unknown.is_true());
    }
}
