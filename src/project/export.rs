//! Regenerates the final video from cached project metadata.
//!
//! Export never re-runs transcription, keyword extraction or image lookup.
//! Its state is tracked separately from the pipeline run that produced the
//! metadata.

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::style::StyleSettings;
use super::types::ProjectMetadata;
use crate::pipeline::{PipelineError, Stage};
use crate::services::{GenerateVideoRequest, MediaInput, ProcessingBackend};
use crate::ui::prelude::{Level, emit};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportStatus {
    #[default]
    Idle,
    Exporting,
    Complete,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExportState {
    pub status: ExportStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_filename: Option<String>,
}

pub struct Exporter<B: ProcessingBackend> {
    backend: B,
    state: ExportState,
}

impl<B: ProcessingBackend> Exporter<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ExportState::default(),
        }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn fail(&mut self, error: PipelineError) -> PipelineError {
        self.state.status = ExportStatus::Error;
        self.state.error = Some(error.to_string());
        emit(Level::Debug, "export.failed", &error.to_string(), None);
        error
    }

    /// Sends the cached run plus the current style to the video generator
    /// and returns the rendered filename.
    pub async fn export(
        &mut self,
        metadata: Option<&ProjectMetadata>,
        style: &StyleSettings,
        words_per_subtitle: usize,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        let Some(metadata) = metadata else {
            return Err(self.fail(PipelineError::Validation(
                "No processed project to export; run processing first".to_string(),
            )));
        };
        let media = match MediaInput::existing(&metadata.source_file) {
            Ok(media) => media,
            Err(err) => return Err(self.fail(PipelineError::Validation(format!("{:#}", err)))),
        };

        self.state = ExportState {
            status: ExportStatus::Exporting,
            ..ExportState::default()
        };
        emit(
            Level::Debug,
            "export.start",
            &format!(
                "Exporting {} with {} words per subtitle",
                media.path().display(),
                words_per_subtitle
            ),
            None,
        );

        let request = GenerateVideoRequest {
            media: &media,
            transcript: &metadata.transcript,
            words: &metadata.words,
            keywords: &metadata.keywords,
            broll_images: &metadata.broll_images,
            words_per_subtitle,
            style: Some(style),
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            out = self.backend.generate_video(&request) => Some(out),
        };

        match result {
            None => Err(self.fail(PipelineError::Cancelled)),
            Some(Err(err)) => Err(self.fail(PipelineError::Fatal {
                stage: Stage::VideoGeneration,
                message: format!("{:#}", err),
            })),
            Some(Ok(filename)) if filename.is_empty() => Err(self.fail(PipelineError::Fatal {
                stage: Stage::VideoGeneration,
                message: "service returned no video".to_string(),
            })),
            Some(Ok(filename)) => {
                self.state.status = ExportStatus::Complete;
                self.state.video_filename = Some(filename.clone());
                Ok(filename)
            }
        }
    }
}
