//! ZIP/RAR archive extraction and entry selection (spec §4.2).

use std::io::{Cursor, Read};

use crate::descriptor::SubtitleFormat;
use crate::provider::{find_episode, MatchKind};

const MAX_ARCHIVE_BYTES: usize = 25 * 1024 * 1024;

/// Extension preference when no other signal breaks a tie (spec §4.2 step 2).
const EXTENSION_PREFERENCE: [&str; 5] = ["srt", "vtt", "ass", "ssa", "sub"];

#[derive(Debug, Clone)]
pub struct ExtractedEntry {
    pub name: String,
    pub format: SubtitleFormat,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub enum ExtractionOutcome {
    Entry(ExtractedEntry),
    /// Synthesized single-cue informational subtitle (spec §4.2 steps 3-4).
    Informational(String),
}

pub struct ExtractionRequest<'a> {
    pub is_season_pack: bool,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub requesting_filename: Option<&'a str>,
}

struct CandidateEntry {
    name: String,
    format: SubtitleFormat,
    bytes: Vec<u8>,
}

/// Detects the archive kind from magic bytes and extracts the best-matching subtitle entry.
pub fn extract(archive_bytes: &[u8], req: &ExtractionRequest) -> ExtractionOutcome {
    if archive_bytes.len() > MAX_ARCHIVE_BYTES {
        return ExtractionOutcome::Informational("archive too large".to_string());
    }

    let candidates = if archive_bytes.starts_with(b"PK\x03\x04") {
        match list_zip_entries(archive_bytes) {
            Ok(entries) => entries,
            Err(_) => return ExtractionOutcome::Informational("failed to read zip archive".to_string()),
        }
    } else if archive_bytes.starts_with(b"Rar!\x1a\x07") {
        match list_rar_entries(archive_bytes) {
            Ok(entries) => entries,
            Err(_) => return ExtractionOutcome::Informational("failed to read rar archive".to_string()),
        }
    } else {
        return ExtractionOutcome::Informational("not a recognized archive format".to_string());
    };

    select_entry(candidates, req)
}

fn list_zip_entries(bytes: &[u8]) -> Result<Vec<CandidateEntry>, zip::result::ZipError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i)?;
        let name = file.name().to_string();
        let Some(format) = extension_of(&name).and_then(SubtitleFormat::from_extension) else {
            continue;
        };
        let mut bytes = Vec::new();
        if file.read_to_end(&mut bytes).is_ok() {
            entries.push(CandidateEntry { name, format, bytes });
        }
    }
    Ok(entries)
}

fn list_rar_entries(bytes: &[u8]) -> Result<Vec<CandidateEntry>, std::io::Error> {
    // The `unrar` crate only exposes a filesystem-path API, so archive bytes are spilled to
    // a temp file for extraction (spec §4.2 only requires correctness, not zero-copy).
    let temp_dir = tempfile::tempdir()?;
    let archive_path = temp_dir.path().join("input.rar");
    std::fs::write(&archive_path, bytes)?;

    let mut entries = Vec::new();
    let archive = unrar::Archive::new(&archive_path)
        .open_for_processing()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
    let mut cursor = archive;
    loop {
        match cursor.read_header() {
            Ok(Some(open)) => {
                let name = open.entry().filename.to_string_lossy().to_string();
                let format = extension_of(&name).and_then(SubtitleFormat::from_extension);
                let (out_dir, cursor_next) = open
                    .extract_with_base(temp_dir.path())
                    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
                if let Some(format) = format {
                    if let Ok(bytes) = std::fs::read(out_dir) {
                        entries.push(CandidateEntry { name, format, bytes });
                    }
                }
                cursor = cursor_next;
            }
            Ok(None) => break,
            Err(e) => {
                return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))
            }
        }
    }
    Ok(entries)
}

fn extension_of(name: &str) -> Option<&str> {
    name.rsplit('.').next()
}

fn select_entry(candidates: Vec<CandidateEntry>, req: &ExtractionRequest) -> ExtractionOutcome {
    if candidates.is_empty() {
        return ExtractionOutcome::Informational("no subtitle entry found in archive".to_string());
    }

    if req.is_season_pack {
        if let Some(episode) = req.episode {
            let best = candidates
                .iter()
                .filter_map(|c| find_episode(&c.name).map(|m| (c, m)))
                .filter(|(_, m)| m.episode == episode)
                .max_by_key(|(_, m)| match m.kind {
                    MatchKind::SeasonEpisode => 2,
                    MatchKind::Bare => 1,
                    MatchKind::Anime => 0,
                });

            return match best {
                Some((candidate, _)) => ExtractionOutcome::Entry(ExtractedEntry {
                    name: candidate.name.clone(),
                    format: candidate.format,
                    bytes: candidate.bytes.clone(),
                }),
                None => ExtractionOutcome::Informational(format!(
                    "episode {episode} not found in pack"
                )),
            };
        }
    }

    if let Some(requesting_filename) = req.requesting_filename {
        let base = normalize_for_comparison(requesting_filename);
        let best = candidates.iter().max_by_key(|c| {
            let candidate_base = normalize_for_comparison(&c.name);
            let lcs = longest_common_substring_len(&base, &candidate_base);
            (lcs, extension_rank(c.format))
        });
        if let Some(best) = best {
            return ExtractionOutcome::Entry(ExtractedEntry {
                name: best.name.clone(),
                format: best.format,
                bytes: best.bytes.clone(),
            });
        }
    }

    let best = candidates
        .iter()
        .max_by_key(|c| extension_rank(c.format))
        .expect("candidates is non-empty");
    ExtractionOutcome::Entry(ExtractedEntry {
        name: best.name.clone(),
        format: best.format,
        bytes: best.bytes.clone(),
    })
}

fn extension_rank(format: SubtitleFormat) -> usize {
    EXTENSION_PREFERENCE
        .iter()
        .position(|ext| *ext == format.extension())
        .map(|pos| EXTENSION_PREFERENCE.len() - pos)
        .unwrap_or(0)
}

fn normalize_for_comparison(name: &str) -> String {
    name.to_ascii_lowercase()
}

fn longest_common_substring_len(a: &str, b: &str) -> usize {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();
    let mut table = vec![vec![0usize; b_bytes.len() + 1]; a_bytes.len() + 1];
    let mut best = 0;
    for i in 1..=a_bytes.len() {
        for j in 1..=b_bytes.len() {
            if a_bytes[i - 1] == b_bytes[j - 1] {
                table[i][j] = table[i - 1][j - 1] + 1;
                best = best.max(table[i][j]);
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(is_season_pack: bool, episode: Option<u32>, filename: Option<&str>) -> ExtractionRequest {
        ExtractionRequest {
            is_season_pack,
            season: Some(1),
            episode,
            requesting_filename: filename,
        }
    }

    fn build_zip(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        {
            let mut writer = zip::ZipWriter::new(&mut buffer);
            let options = zip::write::FileOptions::default();
            for (name, data) in entries {
                writer.start_file(*name, options).unwrap();
                std::io::Write::write_all(&mut writer, data).unwrap();
            }
            writer.finish().unwrap();
        }
        buffer.into_inner()
    }

    #[test]
    fn rejects_oversized_archive() {
        let huge = vec![b'P'; MAX_ARCHIVE_BYTES + 1];
        match extract(&huge, &req(false, None, None)) {
            ExtractionOutcome::Informational(msg) => assert!(msg.contains("too large")),
            _ => panic!("expected informational outcome"),
        }
    }

    #[test]
    fn picks_exact_episode_from_season_pack() {
        let zip = build_zip(&[
            ("Show.S01E01.srt", b"one"),
            ("Show.S01E02.srt", b"two"),
            ("Show.S01.Complete.srt", b"complete"),
        ]);
        let outcome = extract(&zip, &req(true, Some(2), None));
        match outcome {
            ExtractionOutcome::Entry(entry) => {
                assert_eq!(entry.name, "Show.S01E02.srt");
                assert_eq!(entry.bytes, b"two");
            }
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[test]
    fn synthesizes_not_found_when_episode_missing_from_pack() {
        let zip = build_zip(&[("Show.S01E01.srt", b"one")]);
        let outcome = extract(&zip, &req(true, Some(5), None));
        match outcome {
            ExtractionOutcome::Informational(msg) => assert!(msg.contains("not found in pack")),
            other => panic!("expected informational, got {other:?}"),
        }
    }

    #[test]
    fn picks_closest_filename_match_when_not_a_season_pack() {
        let zip = build_zip(&[
            ("Show.S01E02.WEB-DL.srt", b"match"),
            ("Random.Other.Release.srt", b"nomatch"),
        ]);
        let outcome = extract(&zip, &req(false, None, Some("Show.S01E02.WEB-DL.mkv")));
        match outcome {
            ExtractionOutcome::Entry(entry) => assert_eq!(entry.bytes, b"match"),
            other => panic!("expected entry, got {other:?}"),
        }
    }

    #[test]
    fn no_subtitle_entries_synthesizes_informational() {
        let zip = build_zip(&[("readme.txt", b"hello")]);
        let outcome = extract(&zip, &req(false, None, None));
        match outcome {
            ExtractionOutcome::Informational(_) => {}
            other => panic!("expected informational, got {other:?}"),
        }
    }

    #[test]
    fn unrecognized_bytes_are_informational() {
        let outcome = extract(b"not an archive", &req(false, None, None));
        assert!(matches!(outcome, ExtractionOutcome::Informational(_)));
    }
}
