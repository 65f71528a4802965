use serde::Serialize;

use crate::project::types::{BrollMap, Keyword, Transcription};

/// Progress floors reached at each point of a run.
pub mod progress {
    pub const TRANSCRIBING: u8 = 10;
    pub const TRANSCRIBED: u8 = 30;
    pub const EXTRACTING: u8 = 40;
    pub const KEYWORDS_DONE: u8 = 60;
    pub const FETCHING: u8 = 70;
    pub const BROLL_DONE: u8 = 80;
    /// B-roll finished on a run that never transcribed.
    pub const BROLL_DONE_NO_TRANSCRIPT: u8 = 90;
    pub const BROLL_SKIPPED: u8 = 70;
    pub const GENERATING: u8 = 85;
    pub const COMPLETE: u8 = 100;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    #[default]
    Idle,
    Transcribing,
    ExtractingKeywords,
    FetchingBroll,
    GeneratingVideo,
    Complete,
    Error,
}

impl Step {
    pub fn is_terminal(self) -> bool {
        matches!(self, Step::Complete | Step::Error)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Step::Idle => "idle",
            Step::Transcribing => "transcribing",
            Step::ExtractingKeywords => "extracting-keywords",
            Step::FetchingBroll => "fetching-broll",
            Step::GeneratingVideo => "generating-video",
            Step::Complete => "complete",
            Step::Error => "error",
        };
        f.write_str(name)
    }
}

/// Observable state of a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessingState {
    pub step: Step,
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcription: Option<Transcription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<Keyword>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub broll_images: Option<BrollMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_filename: Option<String>,
}

impl ProcessingState {
    /// Moves to `step`, never letting progress go backwards.
    pub(crate) fn advance(&mut self, step: Step, progress: u8) {
        self.step = step;
        self.progress = self.progress.max(progress.min(progress::COMPLETE));
    }

    pub(crate) fn fail(&mut self, message: impl Into<String>) {
        self.step = Step::Error;
        self.error = Some(message.into());
    }

    pub fn is_processing(&self) -> bool {
        !matches!(self.step, Step::Idle) && !self.step.is_terminal()
    }

    pub fn status_message(&self) -> String {
        match self.step {
            Step::Idle => "Ready to process".to_string(),
            Step::Transcribing => "Transcribing audio...".to_string(),
            Step::ExtractingKeywords => "Extracting keywords for B-roll...".to_string(),
            Step::FetchingBroll => "Fetching B-roll images...".to_string(),
            Step::GeneratingVideo => "Generating final video...".to_string(),
            Step::Complete => "Processing complete!".to_string(),
            Step::Error => format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("Unknown error")
            ),
        }
    }
}
