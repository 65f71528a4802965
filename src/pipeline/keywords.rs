//! Local keyword heuristics used when the extraction service is unavailable.

use lazy_static::lazy_static;
use regex::Regex;

use crate::project::types::Keyword;

pub const MAX_KEYWORDS: usize = 10;

/// Used when b-roll is wanted but no transcript exists.
pub const DEFAULT_KEYWORDS: [&str; 5] = [
    "technology",
    "innovation",
    "business",
    "development",
    "digital",
];

/// Appended, in order, when the transcript yields fewer than [`MAX_KEYWORDS`].
pub const FALLBACK_PADDING: [&str; 5] = [
    "business",
    "technology",
    "innovation",
    "digital",
    "solution",
];

const MIN_WORD_CHARS: usize = 5;

lazy_static! {
    /// Anything but ASCII word characters and whitespace, so accented
    /// letters are stripped along with punctuation.
    static ref PUNCTUATION: Regex =
        Regex::new(r"[^A-Za-z0-9_\s]").expect("valid punctuation pattern");
}

pub fn default_keywords() -> Vec<Keyword> {
    DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect()
}

/// Lower-cases the transcript, strips punctuation, keeps words longer than
/// four characters in first-seen order, then pads from [`FALLBACK_PADDING`].
pub fn fallback_keywords(transcript: &str) -> Vec<Keyword> {
    let lowered = transcript.to_lowercase();
    let cleaned = PUNCTUATION.replace_all(&lowered, "");

    let mut keywords: Vec<Keyword> = Vec::with_capacity(MAX_KEYWORDS);
    for word in cleaned.split_whitespace() {
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
        if word.chars().count() >= MIN_WORD_CHARS && !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }

    for pad in FALLBACK_PADDING {
        if keywords.len() == MAX_KEYWORDS {
            break;
        }
        if !keywords.iter().any(|k| k == pad) {
            keywords.push(pad.to_string());
        }
    }

    keywords
}

/// Trims, drops empties and removes duplicates while keeping order.
pub fn normalize_keywords(keywords: Vec<Keyword>) -> Vec<Keyword> {
    let mut seen: Vec<Keyword> = Vec::with_capacity(keywords.len());
    for keyword in keywords {
        let keyword = keyword.trim();
        if !keyword.is_empty() && !seen.iter().any(|k| k == keyword) {
            seen.push(keyword.to_string());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_words_in_first_seen_order() {
        let keywords = fallback_keywords("Cloud computing, cloud STORAGE and the cloud computing era!");
        assert_eq!(
            keywords[..3],
            ["cloud".to_string(), "computing".to_string(), "storage".to_string()]
        );
        // "and", "the", "era" are too short
        assert!(!keywords.contains(&"era".to_string()));
    }

    #[test]
    fn non_ascii_letters_are_stripped() {
        let keywords = fallback_keywords("Überall cafés");
        assert_eq!(keywords[0], "berall");
        // "cafés" shrinks to "cafs", which is too short
        assert!(!keywords.iter().any(|k| k.starts_with("caf")));
    }

    #[test]
    fn pads_with_defaults_skipping_duplicates() {
        let keywords = fallback_keywords("business growth");
        assert_eq!(
            keywords,
            vec!["business", "growth", "technology", "innovation", "digital", "solution"]
        );
    }

    #[test]
    fn caps_at_ten() {
        let transcript = (0..30)
            .map(|i| format!("keyword{}", i))
            .collect::<Vec<_>>()
            .join(" ");
        let keywords = fallback_keywords(&transcript);
        assert_eq!(keywords.len(), MAX_KEYWORDS);
        assert_eq!(keywords[0], "keyword0");
        assert_eq!(keywords[9], "keyword9");
    }

    #[test]
    fn empty_transcript_still_yields_keywords() {
        let keywords = fallback_keywords("");
        assert_eq!(keywords.len(), FALLBACK_PADDING.len());
    }

    #[test]
    fn normalize_dedupes_and_trims() {
        let keywords = normalize_keywords(vec![
            " cloud ".to_string(),
            "data".to_string(),
            "cloud".to_string(),
            "".to_string(),
        ]);
        assert_eq!(keywords, vec!["cloud", "data"]);
    }
}
