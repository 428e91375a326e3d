//! Episode-matching regex family (spec §4.1): used to filter season-wide provider results
//! down to the requested episode, and by the archive extractor to pick the right entry out
//! of a season pack.

use once_cell::sync::Lazy;
use regex::Regex;

/// Relative confidence of a match, used to break ties (spec §4.2: "prefer S×E form over
/// bare episode numbers over anime forms").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Anime,
    Bare,
    SeasonEpisode,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpisodeMatch {
    pub season: Option<u32>,
    pub episode: u32,
    pub kind: MatchKind,
}

/// `S01E02`, `S01.E02`, `1x02`, `Season 1 Episode 2`.
static SEASON_EPISODE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bS(\d{1,2})[._ ]?E(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\b(\d{1,2})x(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\bSeason[ ._]?(\d{1,2})[ ._]?Episode[ ._]?(\d{1,3})\b").unwrap(),
    ]
});

/// Anime/subbed-release conventions: `E01`, `EP 01`, `Episode 01`, `Capitulo 01`,
/// `Episódio 01`, `第01話`, `01話`, `01集`, `01화`.
static ANIME_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\bEP?[._ ]?(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\bEpisode[ ._]?(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\bCap[ií]tulo[ ._]?(\d{1,3})\b").unwrap(),
        Regex::new(r"(?i)\bEpis[oó]dio[ ._]?(\d{1,3})\b").unwrap(),
        Regex::new(r"第(\d{1,3})話").unwrap(),
        Regex::new(r"(\d{1,3})(?:話|集|화)").unwrap(),
    ]
});

/// Bare episode number bounded by delimiters, e.g. `Show - 01 [1080p]`. Rejects tokens that
/// look like a resolution (`1080p`, `720p`) or a 4-digit year.
static BARE_NUMBER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|[\s._\-\[\(])(\d{1,3})(?:$|[\s._\-\]\)])").unwrap());

static RANGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{1,3})\s*-\s*(\d{1,3})\b").unwrap());

static RESOLUTION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(480|576|720|1080|2160|4320)p$").unwrap());

fn looks_like_resolution_or_year(raw: &str, number: u32) -> bool {
    if RESOLUTION_PATTERN.is_match(raw) {
        return true;
    }
    (1900..=2099).contains(&number) && raw.len() == 4
}

/// Finds the best episode match in `name`, in priority order S×E > bare > anime forms. A
/// range match (e.g. `01-12`) is treated as covering the whole range and returns its start
/// as `episode` with the season-pack caller expected to check containment separately via
/// [`find_range`].
pub fn find_episode(name: &str) -> Option<EpisodeMatch> {
    for pattern in SEASON_EPISODE_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(name) {
            let season: u32 = caps[1].parse().ok()?;
            let episode: u32 = caps[2].parse().ok()?;
            return Some(EpisodeMatch {
                season: Some(season),
                episode,
                kind: MatchKind::SeasonEpisode,
            });
        }
    }

    if let Some(caps) = BARE_NUMBER_PATTERN.captures(name) {
        let raw = &caps[1];
        let number: u32 = raw.parse().ok()?;
        if !looks_like_resolution_or_year(raw, number) {
            return Some(EpisodeMatch {
                season: None,
                episode: number,
                kind: MatchKind::Bare,
            });
        }
    }

    for pattern in ANIME_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(name) {
            let episode: u32 = caps[1].parse().ok()?;
            return Some(EpisodeMatch {
                season: None,
                episode,
                kind: MatchKind::Anime,
            });
        }
    }

    None
}

/// Returns `(start, end)` if `name` contains a numeric range like `01-12`.
pub fn find_range(name: &str) -> Option<(u32, u32)> {
    let caps = RANGE_PATTERN.captures(name)?;
    let start: u32 = caps[1].parse().ok()?;
    let end: u32 = caps[2].parse().ok()?;
    Some((start.min(end), start.max(end)))
}
