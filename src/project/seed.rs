use crate::project::types::{ProjectMetadata, SegmentEntity};
use crate::timeline::contains_ignore_case;

/// Builds the editable source entities for a finished pipeline run.
///
/// Subtitles: one per raw segment, highlighting the first keyword (in
/// keyword order) the segment mentions. B-roll: one per keyword with a
/// resolved image, spanning the first raw segment that mentions it.
pub fn seed_segments(metadata: &ProjectMetadata) -> Vec<SegmentEntity> {
    let mut entities = Vec::new();

    if metadata.subtitles_enabled {
        for (i, segment) in metadata.segments.iter().enumerate() {
            let mut entity = SegmentEntity::subtitle(
                format!("subtitle-{}", i + 1),
                segment.text.trim(),
                segment.start,
                segment.end,
            );
            if let Some(keyword) = metadata
                .keywords
                .iter()
                .find(|k| contains_ignore_case(&segment.text, k))
            {
                entity = entity.with_keyword(keyword.clone());
            }
            entities.push(entity);
        }
    }

    if metadata.brolls_enabled {
        let mut count = 0;
        for keyword in &metadata.keywords {
            let Some(Some(url)) = metadata.broll_images.get(keyword) else {
                continue;
            };
            let Some(segment) = metadata
                .segments
                .iter()
                .find(|s| contains_ignore_case(&s.text, keyword))
            else {
                continue;
            };
            count += 1;
            entities.push(
                SegmentEntity::broll(format!("broll-{}", count), keyword.clone(), segment.start, segment.end)
                    .with_image(url.clone()),
            );
        }
    }

    entities
}
