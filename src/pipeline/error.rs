use thiserror::Error;

/// Named phase of a pipeline run, each backed by one collaborator call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Transcription,
    KeywordExtraction,
    BrollFetch,
    VideoGeneration,
}

impl Stage {
    pub fn code(self) -> &'static str {
        match self {
            Stage::Transcription => "transcription",
            Stage::KeywordExtraction => "keywords",
            Stage::BrollFetch => "broll",
            Stage::VideoGeneration => "generation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Transcription => write!(f, "transcription"),
            Stage::KeywordExtraction => write!(f, "keyword extraction"),
            Stage::BrollFetch => write!(f, "b-roll lookup"),
            Stage::VideoGeneration => write!(f, "video generation"),
        }
    }
}

/// Failures that stop a pipeline run.
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("{stage} failed: {message}")]
    Fatal { stage: Stage, message: String },
    #[error("{0}")]
    Validation(String),
    #[error("Processing cancelled")]
    Cancelled,
}

/// A stage failure that was absorbed by its fallback.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{stage} failed, continuing with fallback: {message}")]
pub struct RecoverableStageError {
    pub stage: Stage,
    pub message: String,
}

impl RecoverableStageError {
    pub fn new(stage: Stage, err: &anyhow::Error) -> Self {
        Self {
            stage,
            message: format!("{:#}", err),
        }
    }
}
