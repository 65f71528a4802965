//! Timeline synchronization engine.
//!
//! Turns transcript segments into re-chunkable subtitle intervals and answers,
//! for any playback instant, which subtitle chunk and which b-roll image are
//! on screen:
//! 1. `chunking` splits a subtitle span into fixed-size word groups
//! 2. `keyword_time` locates the spoken keyword inside a chunk
//! 3. `query` resolves the active subtitle / b-roll for an instant
//!
//! All values passed between these stages are seconds (`f64`). The `MM:SS`
//! form produced by `timecode` is for display only.

pub mod chunking;
pub mod keyword_time;
pub mod query;
pub mod srt;
pub mod timecode;

pub use chunking::{ChunkTiming, chunk_segment};
pub use query::{ActiveSegments, active_at};

use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` interval in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Byte offset of the first case-insensitive occurrence of `needle`.
///
/// Compares lowercase char streams in place so callers on the playback tick
/// path do not allocate.
pub(crate) fn find_ignore_case(haystack: &str, needle: &str) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    haystack.char_indices().map(|(i, _)| i).find(|&i| {
        let mut rest = haystack[i..].chars().flat_map(char::to_lowercase);
        needle
            .chars()
            .flat_map(char::to_lowercase)
            .all(|c| rest.next() == Some(c))
    })
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    find_ignore_case(haystack, needle).is_some()
}

pub(crate) fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}
