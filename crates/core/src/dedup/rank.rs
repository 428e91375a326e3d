//! Deduplication + ranking pipeline (spec §4.7): normalize, dedupe by
//! `(languageCode, normalizedName, hearingImpaired, format, isSeasonPack)`, rank, then cap
//! per language.

use std::collections::HashSet;

use crate::config::RankingConfig;
use crate::descriptor::{SubtitleDescriptor, TriState};
use crate::dedup::normalize::normalize;

/// Release-type / production-type tokens the ranker rewards when they also appear in the
/// requesting filename (spec §4.7).
const RELEASE_TYPE_TOKENS: &[&str] = &["web-dl", "webdl", "webrip", "bluray", "brrip", "hdtv", "dvdrip"];

/// Neither provider (`opensubtitles.rs`, `podnapisi.rs`) exposes a real good/bad vote count
/// alongside its rating, only an average `rating` and a separate `downloads` figure. Rather
/// than reuse `downloads` as a stand-in vote count — which double-counts it, since downloads
/// is also its own log-scaled scoring term below — the Bayesian smoothing uses this fixed
/// assumed vote count for every descriptor, per spec §9's fallback for a value the providers
/// don't supply.
const ASSUMED_VOTE_COUNT: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    language_code: crate::language::LanguageCode,
    normalized_name: String,
    hearing_impaired: bool,
    format: crate::descriptor::SubtitleFormat,
    is_season_pack: bool,
}

fn dedup_key(d: &SubtitleDescriptor) -> DedupKey {
    DedupKey {
        language_code: d.language_code,
        normalized_name: normalize(&d.name),
        hearing_impaired: d.hearing_impaired.is_true(),
        format: d.format,
        is_season_pack: d.is_season_pack,
    }
}

fn bayesian_rating(raw_rating: f32, vote_count: u32) -> f32 {
    const PRIOR_VOTES: f32 = 5.0;
    const PRIOR_POSITIVE_RATIO: f32 = 0.70;
    let prior_weight = PRIOR_VOTES * PRIOR_POSITIVE_RATIO * 10.0;
    let total_weight = vote_count as f32 + PRIOR_VOTES;
    (raw_rating * vote_count as f32 + prior_weight) / total_weight.max(1.0)
}

fn score(
    descriptor: &SubtitleDescriptor,
    config: &RankingConfig,
    requesting_filename: Option<&str>,
    prefer_hearing_impaired: bool,
) -> f32 {
    let mut score = 0.0f32;

    if let Some(filename) = requesting_filename {
        let similarity = filename_similarity(&normalize(filename), &normalize(&descriptor.name));
        score += similarity * config.filename_similarity_weight;

        let filename_lower = filename.to_ascii_lowercase();
        let name_lower = descriptor.name.to_ascii_lowercase();
        if RELEASE_TYPE_TOKENS
            .iter()
            .any(|token| filename_lower.contains(token) && name_lower.contains(token))
        {
            score += config.release_type_weight;
        }
    }

    score += bayesian_rating(descriptor.rating, ASSUMED_VOTE_COUNT) * config.rating_weight / 10.0;
    score += (descriptor.downloads as f32 + 1.0).ln() * config.downloads_weight;
    score += config.provider_reputation_weight;

    if descriptor.machine_translated.is_true() {
        score -= config.machine_translated_penalty;
    }
    if descriptor.hearing_impaired.is_true() != prefer_hearing_impaired {
        score -= config.hearing_impaired_mismatch_penalty;
    }
    if descriptor.is_season_pack {
        score -= config.season_pack_penalty;
    }

    score
}

/// Ratio of shared characters between two normalized strings, cheap stand-in for a proper
/// edit-distance similarity metric.
fn filename_similarity(a: &str, b: &str) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let a_tokens: HashSet<&str> = a.split_whitespace().collect();
    let b_tokens: HashSet<&str> = b.split_whitespace().collect();
    let intersection = a_tokens.intersection(&b_tokens).count();
    let union = a_tokens.union(&b_tokens).count().max(1);
    intersection as f32 / union as f32
}

/// Deduplicates, ranks, and caps `descriptors` at `per_language_cap` entries per language,
/// preserving rank order (spec §4.7).
pub fn dedup_and_rank(
    descriptors: Vec<SubtitleDescriptor>,
    config: &RankingConfig,
    requesting_filename: Option<&str>,
    prefer_hearing_impaired: bool,
) -> Vec<SubtitleDescriptor> {
    let mut scored: Vec<(f32, SubtitleDescriptor)> = descriptors
        .into_iter()
        .map(|d| {
            let s = score(&d, config, requesting_filename, prefer_hearing_impaired);
            (s, d)
        })
        .collect();

    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut seen = HashSet::new();
    let mut per_language_count: std::collections::HashMap<crate::language::LanguageCode, usize> =
        std::collections::HashMap::new();
    let mut result = Vec::new();

    for (_, descriptor) in scored {
        let key = dedup_key(&descriptor);
        if !seen.insert(key) {
            continue;
        }
        let count = per_language_count.entry(descriptor.language_code).or_insert(0);
        if *count >= config.per_language_cap {
            continue;
        }
        *count += 1;
        result.push(descriptor);
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderKind;
    use crate::descriptor::SubtitleFormat;
    use crate::language::LanguageCode;

    fn descriptor(name: &str, language: LanguageCode, hi: bool, is_pack: bool) -> SubtitleDescriptor {
        SubtitleDescriptor {
            id: format!("id-{name}"),
            provider: ProviderKind::OpenSubtitles,
            language: "English".into(),
            language_code: language,
            name: name.to_string(),
            format: SubtitleFormat::Srt,
            downloads: 100,
            rating: 8.0,
            hearing_impaired: TriState::from_bool(hi),
            foreign_parts_only: TriState::False,
            machine_translated: TriState::False,
            is_season_pack: is_pack,
            season_pack_season: None,
            season_pack_episode: None,
            download_link: None,
        }
    }

    fn config() -> RankingConfig {
        RankingConfig {
            filename_similarity_weight: 3.0,
            release_type_weight: 1.5,
            rating_weight: 2.0,
            downloads_weight: 1.0,
            provider_reputation_weight: 1.0,
            machine_translated_penalty: 4.0,
            hearing_impaired_mismatch_penalty: 2.0,
            season_pack_penalty: 0.5,
            per_language_cap: 14,
        }
    }

    #[test]
    fn dedup_is_idempotent() {
        let descriptors = vec![
            descriptor("Show.S01E02.WEB-DL", LanguageCode::ENGLISH, false, false),
            descriptor("Show.S01E02.WEB-DL", LanguageCode::ENGLISH, false, false),
        ];
        let once = dedup_and_rank(descriptors.clone(), &config(), None, false);
        let twice = dedup_and_rank(once.clone(), &config(), None, false);
        assert_eq!(once.len(), twice.len());
        assert_eq!(once.len(), 1);
    }

    #[test]
    fn never_merges_entries_differing_in_language_hi_format_or_pack() {
        let descriptors = vec![
            descriptor("Show.S01E02", LanguageCode::ENGLISH, false, false),
            descriptor("Show.S01E02", LanguageCode::parse("spa").unwrap(), false, false),
            descriptor("Show.S01E02", LanguageCode::ENGLISH, true, false),
            descriptor("Show.S01E02", LanguageCode::ENGLISH, false, true),
        ];
        let result = dedup_and_rank(descriptors, &config(), None, false);
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn caps_results_per_language_at_14() {
        let descriptors: Vec<_> = (0..20)
            .map(|i| descriptor(&format!("Show.S01E0{i}.WEB-DL"), LanguageCode::ENGLISH, false, false))
            .collect();
        let result = dedup_and_rank(descriptors, &config(), None, false);
        assert_eq!(result.len(), 14);
    }

    #[test]
    fn machine_translated_penalty_lowers_rank() {
        let mut mt = descriptor("Show.S01E02", LanguageCode::ENGLISH, false, false);
        mt.machine_translated = TriState::True;
        let clean = descriptor("Show.S01E03", LanguageCode::ENGLISH, false, false);
        let clean_id = clean.id.clone();
        let result = dedup_and_rank(vec![mt, clean], &config(), None, false);
        assert_eq!(result[0].id, clean_id);
    }
}
