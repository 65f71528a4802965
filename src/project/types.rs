//! Data model shared by the pipeline, the timeline engine and the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::timeline::TimeWindow;
use crate::timeline::timecode::format_mmss;

/// One recognized token with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    #[serde(alias = "word")]
    pub text: String,
    pub start: f64,
    pub end: f64,
}

/// A sentence or phrase grouping of words.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawSegment {
    pub text: String,
    pub start: f64,
    pub end: f64,
}

pub type Keyword = String;

/// Keyword to image URL. `None` means no image was found for the keyword.
pub type BrollMap = BTreeMap<Keyword, Option<String>>;

/// Output of the transcription collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Subtitle,
    Broll,
}

impl std::fmt::Display for SegmentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SegmentKind::Subtitle => write!(f, "subtitle"),
            SegmentKind::Broll => write!(f, "broll"),
        }
    }
}

/// Stable identity of a rendered chunk: the entity it was derived from and
/// its position within that entity's chunk list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkKey {
    pub source_id: String,
    pub chunk_index: usize,
}

impl ChunkKey {
    pub fn new(source_id: impl Into<String>, chunk_index: usize) -> Self {
        Self {
            source_id: source_id.into(),
            chunk_index,
        }
    }
}

/// The unit the timeline engine and the store operate on.
///
/// Timing is kept in seconds; [`SegmentEntity::start_time`] and
/// [`SegmentEntity::end_time`] give the `MM:SS` display form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentEntity {
    pub id: String,
    pub kind: SegmentKind,
    pub start: f64,
    pub end: f64,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlighted_keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Explicit instant (seconds) at which a b-roll keyword is spoken.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword_timestamp: Option<f64>,
    #[serde(default)]
    pub is_selected: bool,
    pub key: ChunkKey,
}

impl SegmentEntity {
    pub fn subtitle(id: impl Into<String>, text: impl Into<String>, start: f64, end: f64) -> Self {
        Self::new(id.into(), SegmentKind::Subtitle, text.into(), start, end)
    }

    pub fn broll(id: impl Into<String>, keyword: impl Into<String>, start: f64, end: f64) -> Self {
        Self::new(id.into(), SegmentKind::Broll, keyword.into(), start, end)
    }

    fn new(id: String, kind: SegmentKind, content: String, start: f64, end: f64) -> Self {
        let key = ChunkKey::new(id.clone(), 0);
        Self {
            id,
            kind,
            start,
            end,
            content,
            highlighted_keyword: None,
            image_url: None,
            keyword_timestamp: None,
            is_selected: false,
            key,
        }
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.highlighted_keyword = Some(keyword.into());
        self
    }

    pub fn with_image(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn is_subtitle(&self) -> bool {
        self.kind == SegmentKind::Subtitle
    }

    pub fn is_broll(&self) -> bool {
        self.kind == SegmentKind::Broll
    }

    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start, self.end)
    }

    pub fn start_time(&self) -> String {
        format_mmss(self.start)
    }

    pub fn end_time(&self) -> String {
        format_mmss(self.end)
    }

    /// Re-keys an entity as a fresh source (chunk 0 of itself).
    pub(crate) fn rekey(&mut self, id: String) {
        self.key = ChunkKey::new(id.clone(), 0);
        self.id = id;
    }
}

/// Snapshot of one pipeline run, sufficient to regenerate the final video
/// without repeating transcription, keyword extraction or image lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub source_file: PathBuf,
    pub transcript: String,
    #[serde(default)]
    pub language: String,
    pub words: Vec<Word>,
    pub segments: Vec<RawSegment>,
    pub keywords: Vec<Keyword>,
    pub broll_images: BrollMap,
    pub subtitles_enabled: bool,
    pub brolls_enabled: bool,
    pub words_per_subtitle: usize,
    /// Empty when final video generation failed.
    #[serde(default)]
    pub video_filename: String,
    pub created_at: DateTime<Utc>,
}

impl ProjectMetadata {
    pub fn has_video(&self) -> bool {
        !self.video_filename.is_empty()
    }

    pub fn resolved_image_count(&self) -> usize {
        self.broll_images.values().filter(|url| url.is_some()).count()
    }

    pub fn project_name(&self) -> String {
        self.source_file
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled project".to_string())
    }
}
