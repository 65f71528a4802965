use anyhow::Result;
use serde_json::json;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Sandbox with its own config and cache directories.
pub struct TestEnvironment {
    temp_dir: TempDir,
    api_url: String,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        // Nothing listens on the discard port, so stray service calls fail fast
        Self::with_api_url("http://127.0.0.1:9")
    }

    pub fn with_api_url(api_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            temp_dir: tempfile::tempdir()?,
            api_url: api_url.into(),
        })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn cache_root(&self) -> PathBuf {
        self.path().join("cache").join("brollcut")
    }

    pub fn write_file(&self, name: &str, contents: &[u8]) -> Result<PathBuf> {
        let path = self.path().join(name);
        std::fs::write(&path, contents)?;
        Ok(path)
    }

    /// Cached project for a 9 second clip saying the quick brown fox sentence.
    pub fn write_fox_project(&self) -> Result<PathBuf> {
        let metadata = json!({
            "source_file": self.path().join("fox.mp4"),
            "transcript": "the quick brown fox jumps over the lazy dog",
            "language": "en",
            "words": [],
            "segments": [
                {"text": "the quick brown fox jumps over the lazy dog", "start": 0.0, "end": 9.0}
            ],
            "keywords": ["fox"],
            "broll_images": {"fox": "https://img.example/fox.jpg"},
            "subtitles_enabled": true,
            "brolls_enabled": true,
            "words_per_subtitle": 3,
            "video_filename": "fox_final.mp4",
            "created_at": "2026-01-05T10:00:00Z"
        });
        let path = self.path().join("metadata.json");
        std::fs::write(&path, serde_json::to_vec_pretty(&metadata)?)?;
        Ok(path)
    }

    pub async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = tokio::process::Command::new(env!("CARGO_BIN_EXE_brollcut"))
            .args(args)
            .current_dir(self.path())
            .env("HOME", self.path())
            .env("XDG_CONFIG_HOME", self.path().join("config"))
            .env("XDG_CACHE_HOME", self.path().join("cache"))
            .env("BROLLCUT_API_URL", &self.api_url)
            .env("NO_COLOR", "1")
            .output()
            .await?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }
}

/// Parses every stdout line as a JSON event.
pub fn json_events(stdout: &str) -> Vec<serde_json::Value> {
    stdout
        .lines()
        .filter(|line| line.starts_with('{'))
        .filter_map(|line| serde_json::from_str(line).ok())
        .collect()
}
