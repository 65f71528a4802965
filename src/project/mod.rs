//! Project state: the data model, the editable segment store, styling and
//! re-export of cached pipeline results.

pub mod export;
pub mod seed;
pub mod store;
pub mod style;
pub mod types;

use anyhow::{Context, Result};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fs;
use std::path::{Path, PathBuf};

use types::ProjectMetadata;

pub use export::Exporter;
pub use store::{EditorSnapshot, ProjectStore};

const EDITOR_STATE_FILE: &str = "editor.json";

/// `<prefix>-<unix millis>-<9 random chars>`
pub fn generate_id(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect();
    format!(
        "{}-{}-{}",
        prefix,
        chrono::Utc::now().timestamp_millis(),
        suffix
    )
}

pub fn save_metadata(metadata: &ProjectMetadata, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating project directory {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(metadata).context("serializing project metadata")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_metadata(path: &Path) -> Result<ProjectMetadata> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing project metadata at {}", path.display()))
}

/// Editor state is kept next to the metadata it was seeded from.
pub fn editor_state_path(metadata_path: &Path) -> PathBuf {
    metadata_path.with_file_name(EDITOR_STATE_FILE)
}

pub fn save_editor_state(snapshot: &EditorSnapshot, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("serializing editor state")?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn load_editor_state(path: &Path) -> Result<EditorSnapshot> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing editor state at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::types::{RawSegment, Word};
    use chrono::Utc;

    #[test]
    fn generated_ids_are_unique_and_prefixed() {
        let a = generate_id("segment");
        let b = generate_id("segment");
        assert!(a.starts_with("segment-"));
        assert_ne!(a, b);
        assert_eq!(a.rsplit('-').next().map(str::len), Some(9));
    }

    #[test]
    fn metadata_survives_disk_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc").join("metadata.json");
        let mut broll_images = types::BrollMap::new();
        broll_images.insert("cloud".to_string(), None);
        let metadata = ProjectMetadata {
            source_file: "talk.mp4".into(),
            transcript: "cloud talk".to_string(),
            language: "en".to_string(),
            words: vec![Word {
                text: "cloud".to_string(),
                start: 0.25,
                end: 0.75,
            }],
            segments: vec![RawSegment {
                text: "cloud talk".to_string(),
                start: 0.25,
                end: 1.5,
            }],
            keywords: vec!["cloud".to_string()],
            broll_images,
            subtitles_enabled: true,
            brolls_enabled: true,
            words_per_subtitle: 3,
            video_filename: String::new(),
            created_at: Utc::now(),
        };

        save_metadata(&metadata, &path).unwrap();
        assert_eq!(load_metadata(&path).unwrap(), metadata);
    }

    #[test]
    fn editor_state_sits_next_to_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let metadata_path = dir.path().join("metadata.json");
        let path = editor_state_path(&metadata_path);
        assert_eq!(path, dir.path().join("editor.json"));

        let mut store = ProjectStore::new("Launch video");
        store.add_segment(store::SegmentDraft::subtitle("hello world", 0.0, 2.0));
        save_editor_state(&store.snapshot(), &path).unwrap();
        assert_eq!(load_editor_state(&path).unwrap(), store.snapshot());
    }

    #[test]
    fn corrupt_editor_state_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("editor.json");
        fs::write(&path, "{").unwrap();
        let err = load_editor_state(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("editor.json"));
    }
}
