use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::paths;
use crate::project::style::{DEFAULT_WORDS_PER_SUBTITLE, StyleSettings};
use crate::services::http::DEFAULT_API_URL;
use crate::timeline::ChunkTiming;

pub const API_URL_ENV: &str = "BROLLCUT_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the processing service
    pub api_url: String,
    /// Timeout for uploads and JSON calls. Video generation and downloads
    /// are not limited by it.
    pub request_timeout_secs: u64,
    pub words_per_subtitle: usize,
    pub subtitles_enabled: bool,
    pub brolls_enabled: bool,
    /// Language hint passed to transcription
    pub language: Option<String>,
    pub chunk_timing: ChunkTiming,
    pub style: StyleSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: Self::DEFAULT_TIMEOUT_SECS,
            words_per_subtitle: DEFAULT_WORDS_PER_SUBTITLE,
            subtitles_enabled: true,
            brolls_enabled: true,
            language: None,
            chunk_timing: ChunkTiming::default(),
            style: StyleSettings::default(),
        }
    }
}

impl AppConfig {
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Loads the user config, then applies environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from_path(paths::config_file()?)?;
        config.apply_env();
        Ok(config)
    }

    /// Reads `path`, writing the defaults there first if it does not exist.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config at {}", path.display()))?;
        config.sanitize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml).with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV)
            && !url.trim().is_empty()
        {
            self.api_url = url.trim().to_string();
        }
    }

    fn sanitize(&mut self) {
        if self.api_url.trim().is_empty() {
            self.api_url = DEFAULT_API_URL.to_string();
        }
        if self.request_timeout_secs == 0 {
            self.request_timeout_secs = Self::DEFAULT_TIMEOUT_SECS;
        }
        if self.words_per_subtitle == 0 {
            self.words_per_subtitle = DEFAULT_WORDS_PER_SUBTITLE;
        }
        if self.language.as_deref().is_some_and(|l| l.trim().is_empty()) {
            self.language = None;
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Cache layout: `<cache_dir>/brollcut/<media-hash>/metadata.json`.
pub struct ProjectDirectories {
    cache_root: PathBuf,
}

impl ProjectDirectories {
    pub fn new() -> Result<Self> {
        Ok(Self::with_root(paths::cache_dir()?))
    }

    pub fn with_root(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
        }
    }

    pub fn project_dir(&self, media_hash: &str) -> PathBuf {
        self.cache_root.join(media_hash)
    }

    pub fn metadata_path(&self, media_hash: &str) -> PathBuf {
        self.project_dir(media_hash).join("metadata.json")
    }

    /// Metadata location for a media file, keyed by its content hash.
    pub fn metadata_for_media(&self, media: &Path) -> Result<PathBuf> {
        let hash = compute_file_hash(media)?;
        Ok(self.metadata_path(&hash))
    }
}

pub fn compute_file_hash(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("Failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let read = file
            .read(&mut buffer)
            .with_context(|| format!("Failed to read {} for hashing", path.display()))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
