//! In-memory backend with scripted replies, for tests.

use anyhow::{Result, bail};
use async_trait::async_trait;
use std::path::Path;
use std::sync::Mutex;

use super::types::HealthStatus;
use super::{BrollLookup, GenerateVideoRequest, MediaInput, ProcessingBackend};
use crate::project::types::{BrollMap, Keyword, RawSegment, Transcription, Word};

pub struct ScriptedBackend {
    pub transcription: Transcription,
    pub keywords: Vec<Keyword>,
    pub images: BrollMap,
    pub video_filename: String,
    pub fail_transcription: bool,
    pub fail_keywords: bool,
    pub fail_broll: bool,
    pub fail_generation: bool,
    /// Never resolves the transcription call.
    pub hang_transcription: bool,
    pub(crate) calls: Mutex<Vec<&'static str>>,
    pub(crate) last_keywords_requested: Mutex<Vec<Keyword>>,
    pub(crate) last_words_per_subtitle: Mutex<Option<usize>>,
}

impl Default for ScriptedBackend {
    fn default() -> Self {
        let text = "Cloud computing changes how every business stores data";
        let words = text
            .split(' ')
            .enumerate()
            .map(|(i, w)| Word {
                text: w.to_string(),
                start: i as f64,
                end: i as f64 + 0.9,
            })
            .collect();
        let mut images = BrollMap::new();
        images.insert("cloud".to_string(), Some("https://img.example/cloud.jpg".to_string()));
        images.insert("data".to_string(), None);

        Self {
            transcription: Transcription {
                text: text.to_string(),
                language: "en".to_string(),
                words,
                segments: vec![RawSegment {
                    text: text.to_string(),
                    start: 0.0,
                    end: 8.0,
                }],
            },
            keywords: vec!["cloud".to_string(), "data".to_string()],
            images,
            video_filename: "final_video.mp4".to_string(),
            fail_transcription: false,
            fail_keywords: false,
            fail_broll: false,
            fail_generation: false,
            hang_transcription: false,
            calls: Mutex::new(Vec::new()),
            last_keywords_requested: Mutex::new(Vec::new()),
            last_words_per_subtitle: Mutex::new(None),
        }
    }
}

impl ScriptedBackend {
    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn keywords_requested(&self) -> Vec<Keyword> {
        self.last_keywords_requested.lock().unwrap().clone()
    }

    pub fn words_per_subtitle_sent(&self) -> Option<usize> {
        *self.last_words_per_subtitle.lock().unwrap()
    }
}

#[async_trait]
impl ProcessingBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.record("health");
        Ok(HealthStatus {
            status: "healthy".to_string(),
            service: "scripted".to_string(),
            version: "0.0.0".to_string(),
        })
    }

    async fn transcribe(&self, _media: &MediaInput, _language: Option<&str>) -> Result<Transcription> {
        self.record("transcribe");
        if self.hang_transcription {
            std::future::pending::<()>().await;
        }
        if self.fail_transcription {
            bail!("speech model unavailable");
        }
        Ok(self.transcription.clone())
    }

    async fn extract_keywords(&self, _transcript: &str) -> Result<Vec<Keyword>> {
        self.record("extract_keywords");
        if self.fail_keywords {
            bail!("keyword service timed out");
        }
        Ok(self.keywords.clone())
    }

    async fn fetch_broll(&self, keywords: &[Keyword]) -> Result<BrollLookup> {
        self.record("fetch_broll");
        *self.last_keywords_requested.lock().unwrap() = keywords.to_vec();
        if self.fail_broll {
            bail!("image provider rejected request");
        }
        let errors = self
            .images
            .iter()
            .filter(|(_, url)| url.is_none())
            .map(|(k, _)| k.clone())
            .collect();
        Ok(BrollLookup {
            images: self.images.clone(),
            errors,
            access_token_invalid: false,
        })
    }

    async fn generate_video(&self, request: &GenerateVideoRequest<'_>) -> Result<String> {
        self.record("generate_video");
        *self.last_words_per_subtitle.lock().unwrap() = Some(request.words_per_subtitle);
        if self.fail_generation {
            bail!("ffmpeg exited with status 1");
        }
        Ok(self.video_filename.clone())
    }

    async fn download_video(&self, _filename: &str, dest: &Path) -> Result<u64> {
        self.record("download_video");
        std::fs::write(dest, b"video")?;
        Ok(5)
    }
}
