//! Locates the instant a highlighted keyword is spoken inside a subtitle
//! chunk and derives the b-roll display window from it.

use super::{TimeWindow, find_ignore_case};
use crate::project::types::SegmentEntity;

/// B-roll stays on screen this long after its keyword is spoken.
pub const BROLL_DISPLAY_SECONDS: f64 = 3.0;

/// Estimates when `keyword` is spoken inside `text` spanning `window`.
///
/// The estimate is positional: `start + (words_before / total_words) * duration`,
/// where `words_before` counts the space-separated tokens preceding the first
/// case-insensitive substring match. Returns `None` if the keyword is absent.
pub fn estimate_keyword_time(text: &str, keyword: &str, window: TimeWindow) -> Option<f64> {
    if keyword.trim().is_empty() {
        return None;
    }
    let position = find_ignore_case(text, keyword)?;
    let words_before = text[..position].split(' ').count() - 1;
    let total_words = text.split(' ').count();
    Some(window.start + (words_before as f64 / total_words as f64) * window.duration())
}

/// Resolves the keyword instant for a subtitle chunk.
///
/// An explicit `keyword_timestamp` on the paired b-roll entity wins; otherwise
/// the chunk's highlighted keyword is located positionally.
pub fn resolve_keyword_time(chunk: &SegmentEntity, broll: Option<&SegmentEntity>) -> Option<f64> {
    if let Some(explicit) = broll.and_then(|b| b.keyword_timestamp) {
        return Some(explicit);
    }
    let keyword = chunk.highlighted_keyword.as_deref()?;
    estimate_keyword_time(&chunk.content, keyword, chunk.window())
}

/// `[keyword_time, keyword_time + BROLL_DISPLAY_SECONDS)` for the pair, if
/// the keyword can be located.
pub fn broll_window(chunk: &SegmentEntity, broll: &SegmentEntity) -> Option<TimeWindow> {
    resolve_keyword_time(chunk, Some(broll))
        .map(|at| TimeWindow::new(at, at + BROLL_DISPLAY_SECONDS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimates_from_word_position() {
        let chunk = SegmentEntity::subtitle("s", "word1 word2 keyword word4", 0.0, 4.0)
            .with_keyword("keyword");
        assert_eq!(resolve_keyword_time(&chunk, None), Some(2.0));

        let broll = SegmentEntity::broll("b", "keyword", 0.0, 4.0);
        assert_eq!(broll_window(&chunk, &broll), Some(TimeWindow::new(2.0, 5.0)));
    }

    #[test]
    fn explicit_timestamp_is_authoritative() {
        let chunk = SegmentEntity::subtitle("s", "word1 word2 keyword word4", 0.0, 4.0)
            .with_keyword("keyword");
        let mut broll = SegmentEntity::broll("b", "keyword", 0.0, 4.0);
        broll.keyword_timestamp = Some(0.5);
        assert_eq!(resolve_keyword_time(&chunk, Some(&broll)), Some(0.5));
        assert_eq!(broll_window(&chunk, &broll), Some(TimeWindow::new(0.5, 3.5)));
    }

    #[test]
    fn missing_keyword_resolves_to_none() {
        let chunk = SegmentEntity::subtitle("s", "nothing to see here", 0.0, 4.0)
            .with_keyword("cloud");
        assert_eq!(resolve_keyword_time(&chunk, None), None);

        let unhighlighted = SegmentEntity::subtitle("s", "cloud", 0.0, 4.0);
        assert_eq!(resolve_keyword_time(&unhighlighted, None), None);
    }

    #[test]
    fn matching_is_case_insensitive_and_offsets_the_chunk_start() {
        let at = estimate_keyword_time("Build THE Cloud", "cloud", TimeWindow::new(10.0, 13.0))
            .unwrap();
        assert!((at - 12.0).abs() < 1e-9);
    }

    #[test]
    fn substring_matches_count_the_enclosing_word() {
        // "cloud" first matches inside "clouds" at word 1.
        let at = estimate_keyword_time("many clouds and a cloud", "cloud", TimeWindow::new(0.0, 5.0))
            .unwrap();
        assert!((at - 1.0).abs() < 1e-9);
    }
}
