//! Collaborating services the pipeline delegates to.
//!
//! Transcription, keyword extraction, image lookup and video generation all
//! live behind [`ProcessingBackend`]. The core only orchestrates and times
//! these calls.

pub mod http;
#[cfg(test)]
pub mod mock;
pub mod types;

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::project::style::StyleSettings;
use crate::project::types::{BrollMap, Keyword, Transcription, Word};

pub use http::HttpBackend;
pub use types::HealthStatus;

/// A media file submitted for processing.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInput {
    path: PathBuf,
}

impl MediaInput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Fails if the file does not exist or is not a regular file.
    pub fn existing(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            bail!("{} does not exist or is not a file", path.display());
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string())
    }
}

/// Result of an image lookup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrollLookup {
    pub images: BrollMap,
    /// Keywords the service could not resolve.
    pub errors: Vec<String>,
    /// The image provider rejected the service's access credential.
    pub access_token_invalid: bool,
}

/// Everything the video generator needs to compose the final artifact.
#[derive(Debug, Clone)]
pub struct GenerateVideoRequest<'a> {
    pub media: &'a MediaInput,
    pub transcript: &'a str,
    pub words: &'a [Word],
    pub keywords: &'a [Keyword],
    pub broll_images: &'a BrollMap,
    pub words_per_subtitle: usize,
    pub style: Option<&'a StyleSettings>,
}

/// Trait for processing service backends
#[async_trait]
pub trait ProcessingBackend: Send + Sync {
    /// Human-readable name of the backend for logging
    fn name(&self) -> &'static str;

    async fn health(&self) -> Result<HealthStatus>;

    /// Speech to text with word and segment timings
    async fn transcribe(&self, media: &MediaInput, language: Option<&str>) -> Result<Transcription>;

    async fn extract_keywords(&self, transcript: &str) -> Result<Vec<Keyword>>;

    async fn fetch_broll(&self, keywords: &[Keyword]) -> Result<BrollLookup>;

    /// Renders the composed video and returns its filename on the service
    async fn generate_video(&self, request: &GenerateVideoRequest<'_>) -> Result<String>;

    /// Streams a rendered video to `dest`, returning the number of bytes written
    async fn download_video(&self, filename: &str, dest: &Path) -> Result<u64>;
}
