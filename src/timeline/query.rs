//! Playback-time lookup of the active subtitle chunk and b-roll image.
//!
//! Called on every playback tick, so it is a single linear scan over borrowed
//! segments and never allocates.

use super::keyword_time::broll_window;
use super::eq_ignore_case;
use crate::project::types::SegmentEntity;

/// What should be on screen at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ActiveSegments<'a> {
    pub subtitle: Option<&'a SegmentEntity>,
    pub broll: Option<&'a SegmentEntity>,
}

/// Resolves the active subtitle and b-roll at `t` seconds.
///
/// The active subtitle is the first subtitle, in slice order, whose `[start, end)`
/// contains `t`. The active b-roll is the first b-roll entity whose content
/// matches that subtitle's highlighted keyword and whose display window
/// contains `t`.
pub fn active_at(segments: &[SegmentEntity], t: f64) -> ActiveSegments<'_> {
    let subtitle = segments
        .iter()
        .find(|segment| segment.is_subtitle() && segment.window().contains(t));

    let broll = subtitle.and_then(|chunk| {
        let keyword = chunk.highlighted_keyword.as_deref()?;
        segments.iter().find(|segment| {
            segment.is_broll()
                && eq_ignore_case(&segment.content, keyword)
                && broll_window(chunk, segment).is_some_and(|window| window.contains(t))
        })
    });

    ActiveSegments { subtitle, broll }
}
