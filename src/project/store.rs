//! Editable segment collection for one project.
//!
//! The store keeps source entities (one per seeded raw segment, b-roll entry
//! or user-added segment) and renders subtitle chunks from them on every
//! read. Selection and per-segment style overrides are keyed by
//! [`ChunkKey`], so they survive a change of the words-per-subtitle setting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::generate_id;
use super::seed::seed_segments;
use super::style::{DEFAULT_WORDS_PER_SUBTITLE, EditorSettings, SettingsPatch, StylePatch, StyleSettings};
use super::types::{ChunkKey, ProjectMetadata, SegmentEntity, SegmentKind, Word};
use crate::timeline::chunking::split_words;
use crate::timeline::{ActiveSegments, active_at, chunk_segment};

#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("segment {0} not found")]
    NotFound(String),
    #[error("words per subtitle must be at least 1, got {0}")]
    InvalidWordCount(usize),
    #[error("position {0} is out of range")]
    InvalidPosition(usize),
}

/// A segment the user adds by hand.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDraft {
    pub kind: SegmentKind,
    pub content: String,
    pub start: f64,
    pub end: f64,
    pub highlighted_keyword: Option<String>,
    pub image_url: Option<String>,
    pub keyword_timestamp: Option<f64>,
}

impl SegmentDraft {
    pub fn subtitle(text: impl Into<String>, start: f64, end: f64) -> Self {
        Self::new(SegmentKind::Subtitle, text.into(), start, end)
    }

    pub fn broll(keyword: impl Into<String>, start: f64, end: f64) -> Self {
        Self::new(SegmentKind::Broll, keyword.into(), start, end)
    }

    fn new(kind: SegmentKind, content: String, start: f64, end: f64) -> Self {
        Self {
            kind,
            content,
            start,
            end,
            highlighted_keyword: None,
            image_url: None,
            keyword_timestamp: None,
        }
    }
}

/// Partial update. `content` on a later chunk rewrites only that chunk's
/// words inside its source; every other field applies to the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentPatch {
    pub content: Option<String>,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub highlighted_keyword: Option<String>,
    pub image_url: Option<String>,
    pub keyword_timestamp: Option<f64>,
}

/// Serializable editor state: the store without its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSnapshot {
    pub name: String,
    pub sources: Vec<SegmentEntity>,
    #[serde(default)]
    pub selection: Option<ChunkKey>,
    #[serde(default)]
    pub style: StyleSettings,
    #[serde(default)]
    pub settings: EditorSettings,
    #[serde(default)]
    pub overrides: Vec<StyleOverride>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleOverride {
    pub key: ChunkKey,
    pub style: StyleSettings,
}

#[derive(Debug, Clone)]
pub struct ProjectStore {
    name: String,
    metadata: Option<ProjectMetadata>,
    sources: Vec<SegmentEntity>,
    selection: Option<ChunkKey>,
    style: StyleSettings,
    settings: EditorSettings,
    overrides: BTreeMap<ChunkKey, StyleSettings>,
}

impl Default for ProjectStore {
    fn default() -> Self {
        Self::new("Untitled project")
    }
}

impl ProjectStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metadata: None,
            sources: Vec::new(),
            selection: None,
            style: StyleSettings::default(),
            settings: EditorSettings::default(),
            overrides: BTreeMap::new(),
        }
    }

    /// Starts a project from a finished pipeline run.
    pub fn from_metadata(metadata: ProjectMetadata) -> Self {
        let mut store = Self::new(metadata.project_name());
        store.load_metadata(metadata);
        store
    }

    /// Replaces all segments with the ones seeded from `metadata`.
    pub fn load_metadata(&mut self, metadata: ProjectMetadata) {
        self.sources = seed_segments(&metadata);
        if metadata.words_per_subtitle > 0 {
            self.settings.words_per_subtitle = metadata.words_per_subtitle;
        }
        self.metadata = Some(metadata);
        self.selection = None;
        self.overrides.clear();
    }

    /// Rebuilds a store from saved editor state. A selection that no longer
    /// matches a rendered chunk is clamped like after a settings change.
    pub fn restore(metadata: Option<ProjectMetadata>, snapshot: EditorSnapshot) -> Self {
        let mut store = Self {
            name: snapshot.name,
            metadata,
            sources: snapshot.sources,
            selection: snapshot.selection,
            style: snapshot.style,
            settings: snapshot.settings,
            overrides: snapshot
                .overrides
                .into_iter()
                .map(|o| (o.key, o.style))
                .collect(),
        };
        if store.settings.words_per_subtitle == 0 {
            store.settings.words_per_subtitle = DEFAULT_WORDS_PER_SUBTITLE;
        }
        store.clamp_selection();
        store
    }

    pub fn snapshot(&self) -> EditorSnapshot {
        EditorSnapshot {
            name: self.name.clone(),
            sources: self.sources.clone(),
            selection: self.selection.clone(),
            style: self.style.clone(),
            settings: self.settings.clone(),
            overrides: self
                .overrides
                .iter()
                .map(|(key, style)| StyleOverride {
                    key: key.clone(),
                    style: style.clone(),
                })
                .collect(),
        }
    }

    /// Clears everything and renames the project.
    pub fn new_project(&mut self, name: impl Into<String>) {
        self.reset();
        self.name = name.into();
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> Option<&ProjectMetadata> {
        self.metadata.as_ref()
    }

    pub fn settings(&self) -> &EditorSettings {
        &self.settings
    }

    pub fn style(&self) -> &StyleSettings {
        &self.style
    }

    /// Editable entities before chunking.
    pub fn sources(&self) -> &[SegmentEntity] {
        &self.sources
    }

    fn words(&self) -> &[Word] {
        self.metadata
            .as_ref()
            .map(|m| m.words.as_slice())
            .unwrap_or(&[])
    }

    fn render_source(&self, source: &SegmentEntity) -> Vec<SegmentEntity> {
        chunk_segment(
            source,
            self.settings.words_per_subtitle,
            self.settings.chunk_timing,
            self.words(),
        )
    }

    /// The rendered segment list for the current settings.
    pub fn segments(&self) -> Vec<SegmentEntity> {
        self.sources
            .iter()
            .flat_map(|source| self.render_source(source))
            .map(|mut segment| {
                segment.is_selected = self.selection.as_ref() == Some(&segment.key);
                segment
            })
            .collect()
    }

    /// Rendered subtitle and b-roll active at `t`, as owned values.
    pub fn active_at(&self, t: f64) -> (Option<SegmentEntity>, Option<SegmentEntity>) {
        let segments = self.segments();
        let ActiveSegments { subtitle, broll } = active_at(&segments, t);
        (subtitle.cloned(), broll.cloned())
    }

    fn find_rendered(&self, id: &str) -> Option<SegmentEntity> {
        self.sources
            .iter()
            .flat_map(|source| self.render_source(source))
            .find(|segment| segment.id == id)
    }

    fn source_index(&self, source_id: &str) -> Option<usize> {
        self.sources.iter().position(|s| s.id == source_id)
    }

    fn resolve(&self, id: &str) -> Result<(usize, SegmentEntity), StoreError> {
        let segment = self
            .find_rendered(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        let index = self
            .source_index(&segment.key.source_id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok((index, segment))
    }

    /// Appends a segment and selects it. Returns the new id.
    pub fn add_segment(&mut self, draft: SegmentDraft) -> String {
        let prefix = match draft.kind {
            SegmentKind::Subtitle => "subtitle",
            SegmentKind::Broll => "broll",
        };
        let id = generate_id(prefix);
        let mut entity = match draft.kind {
            SegmentKind::Subtitle => SegmentEntity::subtitle(id.clone(), draft.content, draft.start, draft.end),
            SegmentKind::Broll => SegmentEntity::broll(id.clone(), draft.content, draft.start, draft.end),
        };
        entity.highlighted_keyword = draft.highlighted_keyword;
        entity.image_url = draft.image_url;
        entity.keyword_timestamp = draft.keyword_timestamp;

        self.sources.push(entity);
        self.selection = Some(ChunkKey::new(id.clone(), 0));
        id
    }

    pub fn update_segment(&mut self, id: &str, patch: SegmentPatch) -> Result<(), StoreError> {
        let (index, rendered) = self.resolve(id)?;
        let words_per_chunk = self.settings.words_per_subtitle;
        let source = &mut self.sources[index];

        if let Some(content) = patch.content {
            let mut groups = split_words(&source.content, words_per_chunk);
            let chunk_index = rendered.key.chunk_index;
            if source.is_subtitle() && chunk_index < groups.len() {
                groups[chunk_index] = content.trim().to_string();
                source.content = groups
                    .into_iter()
                    .filter(|g| !g.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
            } else {
                source.content = content;
            }
        }
        if let Some(start) = patch.start {
            source.start = start;
        }
        if let Some(end) = patch.end {
            source.end = end;
        }
        if let Some(keyword) = patch.highlighted_keyword {
            source.highlighted_keyword = Some(keyword).filter(|k| !k.is_empty());
        }
        if let Some(url) = patch.image_url {
            source.image_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(at) = patch.keyword_timestamp {
            source.keyword_timestamp = Some(at);
        }
        self.clamp_selection();
        Ok(())
    }

    /// Deletes the entity `id` was rendered from, with all of its chunks.
    pub fn delete_segment(&mut self, id: &str) -> Result<(), StoreError> {
        let (index, _) = self.resolve(id)?;
        let removed = self.sources.remove(index);
        let source_id = removed.key.source_id;
        if self
            .selection
            .as_ref()
            .is_some_and(|key| key.source_id == source_id)
        {
            self.selection = None;
        }
        self.overrides.retain(|key, _| key.source_id != source_id);
        Ok(())
    }

    /// Selects `id`, or clears the selection with `None`.
    pub fn select_segment(&mut self, id: Option<&str>) -> Result<(), StoreError> {
        match id {
            None => self.selection = None,
            Some(id) => {
                let (_, segment) = self.resolve(id)?;
                self.selection = Some(segment.key);
            }
        }
        Ok(())
    }

    pub fn selected_segment(&self) -> Option<SegmentEntity> {
        self.selection.as_ref()?;
        self.segments().into_iter().find(|s| s.is_selected)
    }

    /// Copies the rendered segment `id` into a new, unselected source
    /// placed right after the original source. Returns the copy's id.
    pub fn duplicate_segment(&mut self, id: &str) -> Result<String, StoreError> {
        let (index, mut copy) = self.resolve(id)?;
        let new_id = generate_id(&copy.kind.to_string());
        copy.rekey(new_id.clone());
        copy.is_selected = false;
        self.sources.insert(index + 1, copy);
        Ok(new_id)
    }

    /// Moves the source at `from` to position `to`.
    pub fn reorder_segments(&mut self, from: usize, to: usize) -> Result<(), StoreError> {
        if from >= self.sources.len() {
            return Err(StoreError::InvalidPosition(from));
        }
        if to >= self.sources.len() {
            return Err(StoreError::InvalidPosition(to));
        }
        let moved = self.sources.remove(from);
        self.sources.insert(to, moved);
        Ok(())
    }

    pub fn update_settings(&mut self, patch: SettingsPatch) -> Result<(), StoreError> {
        if let Some(words) = patch.words_per_subtitle {
            if words == 0 {
                return Err(StoreError::InvalidWordCount(words));
            }
            self.settings.words_per_subtitle = words;
        }
        if let Some(timing) = patch.chunk_timing {
            self.settings.chunk_timing = timing;
        }
        if let Some(auto_save) = patch.auto_save {
            self.settings.auto_save = auto_save;
        }
        if let Some(preview_mode) = patch.preview_mode {
            self.settings.preview_mode = preview_mode;
        }
        if let Some(show_timestamps) = patch.show_timestamps {
            self.settings.show_timestamps = show_timestamps;
        }
        if let Some(snap_to_grid) = patch.snap_to_grid {
            self.settings.snap_to_grid = snap_to_grid;
        }
        self.clamp_selection();
        Ok(())
    }

    /// Keeps the selection on the same source when re-chunking leaves fewer
    /// chunks than the selected index.
    fn clamp_selection(&mut self) {
        let Some(key) = self.selection.clone() else {
            return;
        };
        let Some(index) = self.source_index(&key.source_id) else {
            self.selection = None;
            return;
        };
        let chunk_count = self.render_source(&self.sources[index]).len();
        if key.chunk_index >= chunk_count {
            self.selection = Some(ChunkKey::new(
                key.source_id,
                chunk_count.saturating_sub(1),
            ));
        }
    }

    pub fn update_style(&mut self, patch: &StylePatch) {
        self.style.apply(patch);
    }

    pub fn set_style(&mut self, style: StyleSettings) {
        self.style = style;
    }

    pub fn reset_style(&mut self) {
        self.style = StyleSettings::default();
        self.overrides.clear();
    }

    /// Overrides the global style for one rendered segment.
    pub fn apply_style_to_segment(&mut self, id: &str, patch: &StylePatch) -> Result<(), StoreError> {
        let (_, segment) = self.resolve(id)?;
        let base = self
            .overrides
            .get(&segment.key)
            .unwrap_or(&self.style)
            .clone();
        self.overrides.insert(segment.key, base.patched(patch));
        Ok(())
    }

    /// Effective style of a rendered segment.
    pub fn segment_style(&self, segment: &SegmentEntity) -> &StyleSettings {
        self.overrides.get(&segment.key).unwrap_or(&self.style)
    }
}
