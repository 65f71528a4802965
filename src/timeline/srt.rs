use crate::project::types::SegmentEntity;

/// Renders the subtitle entities of a timeline as an SRT document.
///
/// B-roll entities are skipped; cues are numbered from 1 in slice order.
pub fn render_srt(segments: &[SegmentEntity]) -> String {
    let mut out = String::new();
    for (index, cue) in segments.iter().filter(|s| s.is_subtitle()).enumerate() {
        out.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            format_timestamp(cue.start),
            format_timestamp(cue.end),
            cue.content
        ));
    }
    out
}

/// `HH:MM:SS,mmm`
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };
    let millis = total_millis % 1000;
    let total_seconds = total_millis / 1000;
    format!(
        "{:02}:{:02}:{:02},{:03}",
        total_seconds / 3600,
        (total_seconds % 3600) / 60,
        total_seconds % 60,
        millis
    )
}
