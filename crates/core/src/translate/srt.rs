//! SubRip (.srt) cue parsing and WebVTT rendering, needed to turn a provider's downloaded
//! subtitle bytes into `Cue`s for translation and back into a servable document (spec §6
//! "Content-Type: text/vtt when converted, application/x-subrip otherwise"). Grounded on
//! `jim60105-subx-cli`'s `core::formats::srt` block-splitting approach.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::translate::types::Cue;

static TIME_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("valid srt time range regex")
});

fn parse_timestamp(h: &str, m: &str, s: &str, ms: &str) -> u64 {
    let h: u64 = h.parse().unwrap_or(0);
    let m: u64 = m.parse().unwrap_or(0);
    let s: u64 = s.parse().unwrap_or(0);
    let ms: u64 = ms.parse().unwrap_or(0);
    h * 3_600_000 + m * 60_000 + s * 1000 + ms
}

/// Parses SubRip text into cues, tolerating a missing leading index line and CRLF line
/// endings the way providers and re-encoders commonly emit them.
pub fn parse_srt(text: &str) -> Vec<Cue> {
    let normalized = text.replace("\r\n", "\n");
    let mut cues = Vec::new();

    for (block_index, block) in normalized.split("\n\n").enumerate() {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let lines: Vec<&str> = block.lines().collect();
        let Some(time_line_idx) = lines.iter().position(|l| TIME_RANGE.is_match(l)) else {
            continue;
        };

        let Some(caps) = TIME_RANGE.captures(lines[time_line_idx]) else {
            continue;
        };

        let start_time_ms = parse_timestamp(&caps[1], &caps[2], &caps[3], &caps[4]);
        let end_time_ms = parse_timestamp(&caps[5], &caps[6], &caps[7], &caps[8]);
        let text_lines = &lines[time_line_idx + 1..];
        if text_lines.is_empty() {
            continue;
        }

        cues.push(Cue {
            index: block_index as u32,
            start_time_ms,
            end_time_ms,
            text: text_lines.join("\n"),
        });
    }

    cues
}

fn format_srt_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

fn format_vtt_timestamp(ms: u64) -> String {
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}

/// Renders cues back to SubRip text.
pub fn render_srt(cues: &[Cue]) -> String {
    let mut out = String::new();
    for (i, cue) in cues.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!(
            "{} --> {}\n",
            format_srt_timestamp(cue.start_time_ms),
            format_srt_timestamp(cue.end_time_ms)
        ));
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }
    out
}

/// Renders cues as WebVTT.
pub fn render_vtt(cues: &[Cue]) -> String {
    let mut out = String::from("WEBVTT\n\n");
    for cue in cues {
        out.push_str(&format!(
            "{} --> {}\n",
            format_vtt_timestamp(cue.start_time_ms),
            format_vtt_timestamp(cue.end_time_ms)
        ));
        out.push_str(&cue.text);
        out.push_str("\n\n");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:01,000 --> 00:00:03,500\nHello there\n\n2\n00:00:04,000 --> 00:00:06,000\nSecond line\n";

    #[test]
    fn parses_basic_srt() {
        let cues = parse_srt(SAMPLE);
        assert_eq!(cues.len(), 2);
        assert_eq!(cues[0].text, "Hello there");
        assert_eq!(cues[0].start_time_ms, 1000);
        assert_eq!(cues[0].end_time_ms, 3500);
        assert_eq!(cues[1].text, "Second line");
    }

    #[test]
    fn render_srt_roundtrips_timestamps() {
        let cues = parse_srt(SAMPLE);
        let rendered = render_srt(&cues);
        assert!(rendered.contains("00:00:01,000 --> 00:00:03,500"));
    }

    #[test]
    fn render_vtt_uses_dot_separated_millis() {
        let cues = parse_srt(SAMPLE);
        let rendered = render_vtt(&cues);
        assert!(rendered.starts_with("WEBVTT\n\n"));
        assert!(rendered.contains("00:00:01.000 --> 00:00:03.500"));
    }

    #[test]
    fn ignores_malformed_blocks() {
        let cues = parse_srt("not a subtitle\njust text");
        assert!(cues.is_empty());
    }
}
