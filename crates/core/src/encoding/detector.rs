//! Bytes → UTF-8 pipeline: BOM sniff, then chardet, validated by replacement-character
//! count, falling back through a regional-likelihood-ordered encoding list (spec §4.3).

use encoding_rs::{Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// Fallback list ordered by regional likelihood, tried only if the BOM/chardet guess
/// produces too many replacement characters.
const FALLBACK_ENCODINGS: &[&Encoding] = &[
    encoding_rs::UTF_8,
    encoding_rs::WINDOWS_1252,
    encoding_rs::WINDOWS_1252, // ISO-8859-1 alias not exposed separately by encoding_rs
    encoding_rs::ISO_8859_15,
    encoding_rs::WINDOWS_1250,
    encoding_rs::WINDOWS_1251,
    encoding_rs::WINDOWS_1256,
    encoding_rs::WINDOWS_1255,
    encoding_rs::WINDOWS_1253,
    encoding_rs::WINDOWS_1254,
    encoding_rs::WINDOWS_1258,
    encoding_rs::WINDOWS_874,
    encoding_rs::KOI8_R,
];

const REPLACEMENT_CHAR_THRESHOLD: f64 = 0.10;

/// Decodes `bytes` to UTF-8, returning the text and the encoding ultimately used.
pub fn decode_to_utf8(bytes: &[u8]) -> (String, &'static Encoding) {
    if let Some((text, encoding)) = try_bom(bytes) {
        return (text, encoding);
    }

    let guessed = guess_with_chardet(bytes);
    let (text, replacement_ratio) = decode_and_measure(bytes, guessed);
    if replacement_ratio <= REPLACEMENT_CHAR_THRESHOLD {
        return (text, guessed);
    }

    let mut best = (text, guessed, replacement_ratio);
    for encoding in FALLBACK_ENCODINGS {
        let (candidate_text, candidate_ratio) = decode_and_measure(bytes, encoding);
        if candidate_ratio < best.2 {
            best = (candidate_text, encoding, candidate_ratio);
        }
        if best.2 == 0.0 {
            break;
        }
    }
    (best.0, best.1)
}

fn try_bom(bytes: &[u8]) -> Option<(String, &'static Encoding)> {
    if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
        let (text, _, _) = UTF_8.decode(&bytes[3..]);
        return Some((text.into_owned(), UTF_8));
    }
    if bytes.starts_with(&[0xFF, 0xFE]) {
        let (text, _, _) = UTF_16LE.decode(&bytes[2..]);
        return Some((text.into_owned(), UTF_16LE));
    }
    if bytes.starts_with(&[0xFE, 0xFF]) {
        let (text, _, _) = UTF_16BE.decode(&bytes[2..]);
        return Some((text.into_owned(), UTF_16BE));
    }
    None
}

fn guess_with_chardet(bytes: &[u8]) -> &'static Encoding {
    let sample_len = bytes.len().min(4096);
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(&bytes[..sample_len], sample_len == bytes.len());
    detector.guess(None, true)
}

fn decode_and_measure(bytes: &[u8], encoding: &'static Encoding) -> (String, f64) {
    let (text, _, _) = encoding.decode(bytes);
    let text = text.into_owned();
    if text.is_empty() {
        return (text, 0.0);
    }
    let replacement_count = text.chars().filter(|c| *c == '\u{FFFD}').count();
    let ratio = replacement_count as f64 / text.chars().count() as f64;
    (text, ratio)
}
