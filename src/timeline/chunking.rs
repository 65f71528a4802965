//! Splits subtitle spans into fixed-size word groups.

use serde::{Deserialize, Serialize};

use super::{TimeWindow, contains_ignore_case};
use crate::project::types::{ChunkKey, SegmentEntity, Word};

/// How a span's duration is divided between its chunks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkTiming {
    /// Every chunk gets `duration / chunk_count`, regardless of word timing.
    #[default]
    Uniform,
    /// Chunk boundaries snap to the start of the first word of each chunk,
    /// using transcript word timings. Falls back to `Uniform` when the words
    /// spoken inside the span do not line up with the span's text.
    WordAligned,
}

/// One word group with its interpolated window.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub index: usize,
    pub text: String,
    pub window: TimeWindow,
    pub keyword: Option<String>,
}

/// Groups whitespace-separated words into runs of `words_per_chunk`.
///
/// The last group may be shorter. A size of zero keeps all words together.
pub fn split_words(text: &str, words_per_chunk: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }
    let size = if words_per_chunk == 0 {
        words.len()
    } else {
        words_per_chunk
    };
    words.chunks(size).map(|group| group.join(" ")).collect()
}

/// Chunks `text` with uniform time allocation across `window`.
pub fn chunk_text(
    text: &str,
    words_per_chunk: usize,
    window: TimeWindow,
    keyword: Option<&str>,
) -> Vec<Chunk> {
    let groups = split_words(text, words_per_chunk);
    let bounds = uniform_bounds(window, groups.len());
    assemble(groups, &bounds, keyword)
}

/// Chunks `text`, placing boundaries on real word onsets when `words` allows.
pub fn chunk_text_aligned(
    text: &str,
    words_per_chunk: usize,
    window: TimeWindow,
    keyword: Option<&str>,
    words: &[Word],
) -> Vec<Chunk> {
    let groups = split_words(text, words_per_chunk);
    let bounds = word_aligned_bounds(window, &groups, words_per_chunk, words)
        .unwrap_or_else(|| uniform_bounds(window, groups.len()));
    assemble(groups, &bounds, keyword)
}

/// Derives the rendered chunk entities for one source entity.
///
/// B-roll entities and subtitles with no words pass through unchanged. The
/// first chunk keeps the source id; later chunks get `<id>-chunk-<n>`.
pub fn chunk_segment(
    source: &SegmentEntity,
    words_per_chunk: usize,
    timing: ChunkTiming,
    words: &[Word],
) -> Vec<SegmentEntity> {
    if !source.is_subtitle() {
        return vec![source.clone()];
    }

    let keyword = source.highlighted_keyword.as_deref();
    let chunks = match timing {
        ChunkTiming::Uniform => chunk_text(&source.content, words_per_chunk, source.window(), keyword),
        ChunkTiming::WordAligned => chunk_text_aligned(
            &source.content,
            words_per_chunk,
            source.window(),
            keyword,
            words,
        ),
    };

    if chunks.is_empty() {
        return vec![source.clone()];
    }

    chunks
        .into_iter()
        .map(|chunk| SegmentEntity {
            id: if chunk.index == 0 {
                source.id.clone()
            } else {
                format!("{}-chunk-{}", source.id, chunk.index)
            },
            start: chunk.window.start,
            end: chunk.window.end,
            content: chunk.text,
            highlighted_keyword: chunk.keyword,
            is_selected: source.is_selected && chunk.index == 0,
            key: ChunkKey::new(source.key.source_id.clone(), chunk.index),
            ..source.clone()
        })
        .collect()
}

fn assemble(groups: Vec<String>, bounds: &[f64], keyword: Option<&str>) -> Vec<Chunk> {
    let keyword = keyword.filter(|k| !k.trim().is_empty());
    let keyword_index =
        keyword.and_then(|k| groups.iter().position(|group| contains_ignore_case(group, k)));

    groups
        .into_iter()
        .enumerate()
        .map(|(index, text)| Chunk {
            index,
            text,
            window: TimeWindow::new(bounds[index], bounds[index + 1]),
            keyword: if keyword_index == Some(index) {
                keyword.map(str::to_string)
            } else {
                None
            },
        })
        .collect()
}

/// `count + 1` boundaries. The final boundary is pinned to `window.end` so
/// the chunks tile the window exactly.
fn uniform_bounds(window: TimeWindow, count: usize) -> Vec<f64> {
    if count == 0 {
        return vec![window.start];
    }
    let step = window.duration() / count as f64;
    (0..=count)
        .map(|i| {
            if i == count {
                window.end
            } else {
                window.start + i as f64 * step
            }
        })
        .collect()
}

const ONSET_TOLERANCE_SECS: f64 = 0.05;

fn word_aligned_bounds(
    window: TimeWindow,
    groups: &[String],
    words_per_chunk: usize,
    words: &[Word],
) -> Option<Vec<f64>> {
    if groups.is_empty() {
        return None;
    }

    let spoken: Vec<&Word> = words
        .iter()
        .filter(|w| w.start >= window.start - ONSET_TOLERANCE_SECS && w.start < window.end)
        .collect();
    let total_words: usize = groups.iter().map(|g| g.split(' ').count()).sum();
    if spoken.len() != total_words {
        return None;
    }

    let size = if words_per_chunk == 0 {
        total_words
    } else {
        words_per_chunk
    };

    let mut bounds = Vec::with_capacity(groups.len() + 1);
    bounds.push(window.start);
    for i in 1..groups.len() {
        let previous = bounds[i - 1];
        bounds.push(spoken[i * size].start.clamp(previous, window.end));
    }
    bounds.push(window.end);
    Some(bounds)
}
