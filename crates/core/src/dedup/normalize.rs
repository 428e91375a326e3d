//! Release-name normalization for dedup comparison (spec §4.7).

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKET_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[[^\]]*\]").unwrap());
static EXTENSION_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(srt|vtt|ass|ssa|sub)$").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Lowercases, strips subtitle extensions and bracket tags, replaces `.`/`_` with spaces,
/// and collapses whitespace runs (spec §4.7 "Normalization for comparison").
pub fn normalize(name: &str) -> String {
    let lowered = name.to_ascii_lowercase();
    let without_extension = EXTENSION_SUFFIX.replace(&lowered, "");
    let without_brackets = BRACKET_TAG.replace_all(&without_extension, "");
    let spaced = without_brackets.replace(['.', '_'], " ");
    WHITESPACE_RUN.replace_all(&spaced, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_extension_brackets_and_collapses_separators() {
        assert_eq!(
            normalize("Show.S01E02.WEB-DL.[SCS].srt"),
            "show s01e02 web-dl"
        );
    }

    #[test]
    fn collapses_multiple_whitespace() {
        assert_eq!(normalize("Show   S01E02"), "show s01e02");
    }

    #[test]
    fn normalize_is_idempotent() {
        let once = normalize("Show.S01E02.[Group].srt");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }
}
