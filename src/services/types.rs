//! Wire formats of the processing service.

use serde::{Deserialize, Serialize};

use crate::project::types::{BrollMap, Keyword, RawSegment, Word};

#[derive(Debug, Clone, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub size_mb: f64,
}

#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<RawSegment>,
    #[serde(default)]
    pub words: Vec<Word>,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub file_info: Option<FileInfo>,
}

#[derive(Debug, Serialize)]
pub struct KeywordsRequest<'a> {
    pub transcript: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct KeywordsResponse {
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Serialize)]
pub struct BrollRequest<'a> {
    pub keywords: &'a [Keyword],
}

#[derive(Debug, Deserialize)]
pub struct BrollResponse {
    #[serde(default)]
    pub images: BrollMap,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub access_token_invalid: bool,
}

#[derive(Debug, Deserialize)]
pub struct VideoGenerationResponse {
    pub video_filename: String,
}

/// Error body returned by the service on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub retry_suggested: bool,
}

impl ApiError {
    pub fn message(&self) -> &str {
        self.details
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(&self.error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub version: String,
}
