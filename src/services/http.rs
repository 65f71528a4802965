//! HTTP client for the processing service.
//!
//! Endpoints:
//! - `GET  /health`
//! - `POST /transcribe` (multipart: file, language)
//! - `POST /extract-keywords` (JSON)
//! - `POST /broll-images` (JSON)
//! - `POST /generate-video` (multipart: file plus control fields)
//! - `GET  /download-video/<filename>`

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;

use super::types::{
    ApiError, BrollRequest, BrollResponse, HealthStatus, KeywordsRequest, KeywordsResponse,
    TranscriptionResponse, VideoGenerationResponse,
};
use super::{BrollLookup, GenerateVideoRequest, MediaInput, ProcessingBackend};
use crate::common::progress::{create_download_bar, create_spinner};
use crate::project::types::{Keyword, Transcription};
use crate::ui::prelude::{Level, emit};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Processing service reached over HTTP
pub struct HttpBackend {
    client: Client,
    base_url: String,
    /// Applies to health, transcription, keyword and image calls. Video
    /// generation and downloads run as long as the service needs.
    request_timeout: Duration,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            request_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn download_url(&self, filename: &str) -> String {
        self.url(&format!("download-video/{}", urlencoding::encode(filename)))
    }

    async fn file_part(media: &MediaInput) -> Result<Part> {
        let content = tokio::fs::read(media.path())
            .await
            .with_context(|| format!("Failed to read {}", media.path().display()))?;
        Ok(Part::bytes(content).file_name(media.file_name()))
    }
}

/// Turns a non-2xx response into an error carrying the service's message.
async fn ensure_success(resp: Response, action: &str) -> Result<Response> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status();
    let text = resp.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiError>(&text) {
        Ok(api_error) if api_error.retry_suggested => {
            format!("{} (retry suggested)", api_error.message())
        }
        Ok(api_error) => api_error.message().to_string(),
        Err(_) => format!(
            "HTTP {}: {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        ),
    };
    anyhow::bail!("{} failed: {}", action, message)
}

async fn parse_json<T: DeserializeOwned>(resp: Response, action: &str) -> Result<T> {
    let resp = ensure_success(resp, action).await?;
    resp.json::<T>()
        .await
        .with_context(|| format!("Failed to parse {} response", action))
}

#[async_trait]
impl ProcessingBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn health(&self) -> Result<HealthStatus> {
        let resp = self
            .client
            .get(self.url("health"))
            .timeout(self.request_timeout)
            .send()
            .await
            .with_context(|| format!("Failed to connect to {}", self.base_url))?;
        parse_json(resp, "Health check").await
    }

    async fn transcribe(&self, media: &MediaInput, language: Option<&str>) -> Result<Transcription> {
        let mut form = Form::new().part("file", Self::file_part(media).await?);
        if let Some(language) = language {
            form = form.text("language", language.to_string());
        }

        emit(
            Level::Debug,
            "services.http.transcribe",
            &format!("Uploading {} for transcription", media.path().display()),
            None,
        );

        let resp = self
            .client
            .post(self.url("transcribe"))
            .timeout(self.request_timeout)
            .multipart(form)
            .send()
            .await
            .context("Failed to reach transcription service")?;
        let body: TranscriptionResponse = parse_json(resp, "Transcription").await?;
        if let Some(info) = &body.file_info {
            emit(
                Level::Debug,
                "services.http.transcribed",
                &format!("Service transcribed {} ({:.1} MB)", info.filename, info.size_mb),
                None,
            );
        }

        Ok(Transcription {
            text: body.text,
            language: body.language,
            words: body.words,
            segments: body.segments,
        })
    }

    async fn extract_keywords(&self, transcript: &str) -> Result<Vec<Keyword>> {
        let resp = self
            .client
            .post(self.url("extract-keywords"))
            .timeout(self.request_timeout)
            .json(&KeywordsRequest { transcript })
            .send()
            .await
            .context("Failed to reach keyword extraction service")?;
        let body: KeywordsResponse = parse_json(resp, "Keyword extraction").await?;
        Ok(body.keywords)
    }

    async fn fetch_broll(&self, keywords: &[Keyword]) -> Result<BrollLookup> {
        let resp = self
            .client
            .post(self.url("broll-images"))
            .timeout(self.request_timeout)
            .json(&BrollRequest { keywords })
            .send()
            .await
            .context("Failed to reach image lookup service")?;
        let body: BrollResponse = parse_json(resp, "B-roll lookup").await?;
        Ok(BrollLookup {
            images: body.images,
            errors: body.errors,
            access_token_invalid: body.access_token_invalid,
        })
    }

    async fn generate_video(&self, request: &GenerateVideoRequest<'_>) -> Result<String> {
        let mut form = Form::new()
            .part("file", Self::file_part(request.media).await?)
            .text("transcript", request.transcript.to_string())
            .text(
                "words",
                serde_json::to_string(request.words).context("Failed to encode words")?,
            )
            .text(
                "keywords",
                serde_json::to_string(request.keywords).context("Failed to encode keywords")?,
            )
            .text(
                "broll_images",
                serde_json::to_string(request.broll_images)
                    .context("Failed to encode b-roll images")?,
            )
            .text("words_per_subtitle", request.words_per_subtitle.to_string());

        if let Some(style) = request.style {
            form = form
                .text("font_family", style.font_family.clone())
                .text("font_size", style.font_size.clone())
                .text("font_weight", style.font_weight.clone())
                .text("font_color", style.color.css())
                .text("text_align", style.text_align.to_string());
            if let Some(background) = style.background_color {
                form = form.text("background_color", background.css());
            }
        }

        let resp = self
            .client
            .post(self.url("generate-video"))
            .multipart(form)
            .send()
            .await
            .context("Failed to reach video generation service")?;
        let body: VideoGenerationResponse = parse_json(resp, "Video generation").await?;
        Ok(body.video_filename)
    }

    async fn download_video(&self, filename: &str, dest: &Path) -> Result<u64> {
        let url = self.download_url(filename);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;
        let resp = ensure_success(resp, "Video download").await?;

        let pb = match resp.content_length() {
            Some(total) => create_download_bar(total, filename),
            None => create_spinner(format!("Downloading {}", filename)),
        };

        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let mut file = tokio::fs::File::create(dest)
            .await
            .with_context(|| format!("Failed to create {}", dest.display()))?;

        let mut written = 0u64;
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed while streaming video")?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
            written += chunk.len() as u64;
            pb.set_position(written);
        }
        file.flush().await?;
        pb.finish_and_clear();

        Ok(written)
    }
}
