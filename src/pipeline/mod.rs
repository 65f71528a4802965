//! Multi-stage processing pipeline.
//!
//! A run walks `transcribe -> extract keywords -> fetch b-roll -> generate
//! video`, strictly in sequence, reporting progress after every transition.
//! Only transcription failures abort the run; every later stage has a
//! fallback and the run still reaches [`Step::Complete`].

pub mod error;
pub mod keywords;
pub mod state;

use chrono::Utc;
use std::future::Future;
use tokio_util::sync::CancellationToken;

use crate::project::style::{DEFAULT_WORDS_PER_SUBTITLE, StyleSettings};
use crate::project::types::{BrollMap, Keyword, ProjectMetadata, Transcription};
use crate::services::{GenerateVideoRequest, MediaInput, ProcessingBackend};
use crate::timeline::eq_ignore_case;
use crate::ui::prelude::{Level, emit};

pub use error::{PipelineError, RecoverableStageError, Stage};
pub use state::{ProcessingState, Step, progress};

use keywords::{default_keywords, fallback_keywords, normalize_keywords};

/// Per-run switches supplied by the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessingOptions {
    pub subtitles_enabled: bool,
    pub brolls_enabled: bool,
    pub words_per_subtitle: usize,
    pub language: Option<String>,
    pub style: Option<StyleSettings>,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            subtitles_enabled: true,
            brolls_enabled: true,
            words_per_subtitle: DEFAULT_WORDS_PER_SUBTITLE,
            language: None,
            style: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub metadata: ProjectMetadata,
    /// Stage failures that were replaced by their fallback.
    pub warnings: Vec<RecoverableStageError>,
}

pub type StateObserver = Box<dyn Fn(&ProcessingState) + Send + Sync>;

pub struct Orchestrator<B: ProcessingBackend> {
    backend: B,
    state: ProcessingState,
    observer: Option<StateObserver>,
}

/// Resolves to `None` if `cancel` fires before `fut` completes.
async fn until_cancelled<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

impl<B: ProcessingBackend> Orchestrator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: ProcessingState::default(),
            observer: None,
        }
    }

    /// Calls `observer` after every state change.
    pub fn with_observer(mut self, observer: impl Fn(&ProcessingState) + Send + Sync + 'static) -> Self {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> &ProcessingState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn reset(&mut self) {
        self.state = ProcessingState::default();
        self.notify();
    }

    fn notify(&self) {
        if let Some(observer) = &self.observer {
            observer(&self.state);
        }
    }

    fn transition(&mut self, step: Step, progress: u8) {
        self.state.advance(step, progress);
        emit(
            Level::Debug,
            "pipeline.step",
            &format!("[{:>3}%] {}", self.state.progress, self.state.status_message()),
            None,
        );
        self.notify();
    }

    fn recover(&self, warnings: &mut Vec<RecoverableStageError>, stage: Stage, err: &anyhow::Error) {
        let warning = RecoverableStageError::new(stage, err);
        emit(
            Level::Warn,
            &format!("pipeline.{}.fallback", stage.code()),
            &warning.to_string(),
            None,
        );
        warnings.push(warning);
    }

    fn abort(&mut self, error: PipelineError) -> PipelineError {
        self.state.fail(error.to_string());
        // Callers report the returned error themselves
        emit(Level::Debug, "pipeline.aborted", &self.state.status_message(), None);
        self.notify();
        error
    }

    /// Runs every enabled stage for `media`.
    ///
    /// Returns a validation error without touching the state when no media
    /// is given.
    pub async fn run(
        &mut self,
        media: Option<&MediaInput>,
        options: &ProcessingOptions,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let Some(media) = media else {
            return Err(PipelineError::Validation(
                "No file selected for processing".to_string(),
            ));
        };

        self.state = ProcessingState::default();
        if cancel.is_cancelled() {
            return Err(self.abort(PipelineError::Cancelled));
        }

        emit(
            Level::Debug,
            "pipeline.start",
            &format!(
                "Processing {} with {} backend (subtitles: {}, b-roll: {})",
                media.path().display(),
                self.backend.name(),
                options.subtitles_enabled,
                options.brolls_enabled
            ),
            None,
        );

        let mut warnings = Vec::new();
        let transcription = self.transcribe_stage(media, options, cancel).await?;
        let keywords = self
            .keyword_stage(transcription.as_ref(), options, cancel, &mut warnings)
            .await?;
        let broll_images = self
            .broll_stage(&keywords, transcription.is_some(), options, cancel, &mut warnings)
            .await?;

        let video_filename = if options.subtitles_enabled || options.brolls_enabled {
            self.transition(Step::GeneratingVideo, progress::GENERATING);
            let transcription = transcription.clone().unwrap_or_default();
            let request = GenerateVideoRequest {
                media,
                transcript: &transcription.text,
                words: &transcription.words,
                keywords: &keywords,
                broll_images: &broll_images,
                words_per_subtitle: options.words_per_subtitle,
                style: options.style.as_ref(),
            };
            let Some(result) = until_cancelled(cancel, self.backend.generate_video(&request)).await
            else {
                return Err(self.abort(PipelineError::Cancelled));
            };
            match result {
                Ok(filename) => filename,
                Err(err) => {
                    self.recover(&mut warnings, Stage::VideoGeneration, &err);
                    String::new()
                }
            }
        } else {
            String::new()
        };

        self.state.video_filename = Some(video_filename.clone());
        self.transition(Step::Complete, progress::COMPLETE);

        let transcription = transcription.unwrap_or_default();
        let metadata = ProjectMetadata {
            source_file: media.path().to_path_buf(),
            transcript: transcription.text,
            language: transcription.language,
            words: transcription.words,
            segments: transcription.segments,
            keywords,
            broll_images,
            subtitles_enabled: options.subtitles_enabled,
            brolls_enabled: options.brolls_enabled,
            words_per_subtitle: options.words_per_subtitle,
            video_filename,
            created_at: Utc::now(),
        };

        Ok(PipelineOutcome { metadata, warnings })
    }

    async fn transcribe_stage(
        &mut self,
        media: &MediaInput,
        options: &ProcessingOptions,
        cancel: &CancellationToken,
    ) -> Result<Option<Transcription>, PipelineError> {
        if !options.subtitles_enabled {
            self.transition(Step::Idle, progress::TRANSCRIBED);
            return Ok(None);
        }

        self.transition(Step::Transcribing, progress::TRANSCRIBING);
        let Some(result) = until_cancelled(
            cancel,
            self.backend.transcribe(media, options.language.as_deref()),
        )
        .await
        else {
            return Err(self.abort(PipelineError::Cancelled));
        };

        match result {
            Ok(transcription) => {
                emit(
                    Level::Debug,
                    "pipeline.transcription.done",
                    &format!(
                        "Transcribed {} words in {} segments",
                        transcription.words.len(),
                        transcription.segments.len()
                    ),
                    None,
                );
                self.state.transcription = Some(transcription.clone());
                self.transition(Step::Transcribing, progress::TRANSCRIBED);
                Ok(Some(transcription))
            }
            Err(err) => Err(self.abort(PipelineError::Fatal {
                stage: Stage::Transcription,
                message: format!("{:#}", err),
            })),
        }
    }

    async fn keyword_stage(
        &mut self,
        transcription: Option<&Transcription>,
        options: &ProcessingOptions,
        cancel: &CancellationToken,
        warnings: &mut Vec<RecoverableStageError>,
    ) -> Result<Vec<Keyword>, PipelineError> {
        if !options.brolls_enabled {
            return Ok(Vec::new());
        }

        self.transition(Step::ExtractingKeywords, progress::EXTRACTING);
        let keywords = match transcription {
            Some(transcription) => {
                let Some(result) =
                    until_cancelled(cancel, self.backend.extract_keywords(&transcription.text)).await
                else {
                    return Err(self.abort(PipelineError::Cancelled));
                };
                match result {
                    Ok(keywords) => normalize_keywords(keywords),
                    Err(err) => {
                        self.recover(warnings, Stage::KeywordExtraction, &err);
                        fallback_keywords(&transcription.text)
                    }
                }
            }
            None => {
                emit(
                    Level::Debug,
                    "pipeline.keywords.defaults",
                    "No transcript available, using default keywords",
                    None,
                );
                default_keywords()
            }
        };

        self.state.keywords = Some(keywords.clone());
        self.transition(Step::ExtractingKeywords, progress::KEYWORDS_DONE);
        Ok(keywords)
    }

    async fn broll_stage(
        &mut self,
        keywords: &[Keyword],
        transcribed: bool,
        options: &ProcessingOptions,
        cancel: &CancellationToken,
        warnings: &mut Vec<RecoverableStageError>,
    ) -> Result<BrollMap, PipelineError> {
        if !options.brolls_enabled {
            self.transition(self.state.step, progress::BROLL_SKIPPED);
            return Ok(BrollMap::new());
        }

        self.transition(Step::FetchingBroll, progress::FETCHING);
        let images = if keywords.is_empty() {
            BrollMap::new()
        } else {
            let Some(result) = until_cancelled(cancel, self.backend.fetch_broll(keywords)).await
            else {
                return Err(self.abort(PipelineError::Cancelled));
            };
            match result {
                Ok(lookup) => {
                    if lookup.access_token_invalid {
                        emit(
                            Level::Warn,
                            "pipeline.broll.token_invalid",
                            "Image provider rejected the service's access token; b-roll will be missing",
                            None,
                        );
                    }
                    if !lookup.errors.is_empty() {
                        emit(
                            Level::Debug,
                            "pipeline.broll.unresolved",
                            &format!("No images for: {}", lookup.errors.join(", ")),
                            None,
                        );
                    }
                    restrict_to_keywords(lookup.images, keywords)
                }
                Err(err) => {
                    self.recover(warnings, Stage::BrollFetch, &err);
                    BrollMap::new()
                }
            }
        };

        self.state.broll_images = Some(images.clone());
        let done = if transcribed {
            progress::BROLL_DONE
        } else {
            progress::BROLL_DONE_NO_TRANSCRIPT
        };
        self.transition(Step::FetchingBroll, done);
        Ok(images)
    }
}

/// Keys the lookup result by exactly the requested keywords. Keywords the
/// service left out map to "no image".
fn restrict_to_keywords(images: BrollMap, keywords: &[Keyword]) -> BrollMap {
    keywords
        .iter()
        .map(|keyword| {
            let url = images
                .get(keyword)
                .or_else(|| {
                    images
                        .iter()
                        .find(|(k, _)| eq_ignore_case(k, keyword))
                        .map(|(_, url)| url)
                })
                .cloned()
                .flatten();
            (keyword.clone(), url)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::mock::ScriptedBackend;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn media() -> MediaInput {
        MediaInput::new("talk.mp4")
    }

    fn orchestrator(backend: ScriptedBackend) -> (Orchestrator<ScriptedBackend>, Arc<Mutex<Vec<ProcessingState>>>) {
        let history = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&history);
        let orchestrator =
            Orchestrator::new(backend).with_observer(move |state| sink.lock().unwrap().push(state.clone()));
        (orchestrator, history)
    }

    fn options(subtitles: bool, brolls: bool) -> ProcessingOptions {
        ProcessingOptions {
            subtitles_enabled: subtitles,
            brolls_enabled: brolls,
            ..ProcessingOptions::default()
        }
    }

    fn assert_monotonic(history: &[ProcessingState]) {
        for pair in history.windows(2) {
            assert!(
                pair[1].progress >= pair[0].progress,
                "progress went from {} to {}",
                pair[0].progress,
                pair[1].progress
            );
        }
    }

    #[tokio::test]
    async fn full_run_calls_each_stage_once_in_order() {
        let (mut orch, history) = orchestrator(ScriptedBackend::default());
        let outcome = orch
            .run(Some(&media()), &options(true, true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            orch.backend().calls(),
            vec!["transcribe", "extract_keywords", "fetch_broll", "generate_video"]
        );
        assert_eq!(orch.state().step, Step::Complete);
        assert_eq!(orch.state().progress, 100);
        assert_eq!(orch.state().video_filename.as_deref(), Some("final_video.mp4"));
        assert!(outcome.warnings.is_empty());

        let metadata = outcome.metadata;
        assert_eq!(metadata.keywords, vec!["cloud", "data"]);
        assert_eq!(metadata.segments.len(), 1);
        assert_eq!(metadata.words_per_subtitle, 3);
        assert!(metadata.has_video());

        let history = history.lock().unwrap();
        assert_monotonic(&history);
        let progresses: Vec<u8> = history.iter().map(|s| s.progress).collect();
        assert_eq!(progresses, vec![10, 30, 40, 60, 70, 80, 85, 100]);
    }

    #[tokio::test]
    async fn both_features_disabled_completes_without_calls() {
        let (mut orch, history) = orchestrator(ScriptedBackend::default());
        let outcome = orch
            .run(Some(&media()), &options(false, false), &CancellationToken::new())
            .await
            .unwrap();

        assert!(orch.backend().calls().is_empty());
        assert_eq!(orch.state().step, Step::Complete);
        assert_eq!(orch.state().progress, 100);
        assert!(orch.state().error.is_none());
        assert!(!outcome.metadata.has_video());
        assert_monotonic(&history.lock().unwrap());
    }

    #[tokio::test]
    async fn keyword_failure_falls_back_locally() {
        let backend = ScriptedBackend {
            fail_keywords: true,
            ..ScriptedBackend::default()
        };
        let (mut orch, _) = orchestrator(backend);
        let outcome = orch
            .run(Some(&media()), &options(true, true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(orch.state().step, Step::Complete);
        let keywords = orch.state().keywords.clone().unwrap();
        assert!(!keywords.is_empty());
        assert!(keywords.len() <= 10);
        assert_eq!(keywords[0], "cloud");
        assert_eq!(orch.backend().keywords_requested(), keywords);
        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.warnings[0].stage, Stage::KeywordExtraction);
    }

    #[tokio::test]
    async fn generation_failure_keeps_gathered_data() {
        let backend = ScriptedBackend {
            fail_generation: true,
            ..ScriptedBackend::default()
        };
        let (mut orch, _) = orchestrator(backend);
        let outcome = orch
            .run(Some(&media()), &options(true, true), &CancellationToken::new())
            .await
            .unwrap();

        let state = orch.state();
        assert_eq!(state.step, Step::Complete);
        assert_eq!(state.video_filename.as_deref(), Some(""));
        assert!(state.transcription.is_some());
        assert!(!state.keywords.as_ref().unwrap().is_empty());
        assert!(!state.broll_images.as_ref().unwrap().is_empty());

        assert!(!outcome.metadata.has_video());
        assert!(!outcome.metadata.transcript.is_empty());
        assert_eq!(outcome.warnings[0].stage, Stage::VideoGeneration);
    }

    #[tokio::test]
    async fn transcription_failure_is_fatal() {
        let backend = ScriptedBackend {
            fail_transcription: true,
            ..ScriptedBackend::default()
        };
        let (mut orch, _) = orchestrator(backend);
        let err = orch
            .run(Some(&media()), &options(true, true), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            PipelineError::Fatal {
                stage: Stage::Transcription,
                message: "speech model unavailable".to_string()
            }
        );
        assert_eq!(orch.state().step, Step::Error);
        assert_eq!(
            orch.state().status_message(),
            "Error: transcription failed: speech model unavailable"
        );
        assert_eq!(orch.backend().calls(), vec!["transcribe"]);
    }

    #[tokio::test]
    async fn broll_failure_continues_with_no_images() {
        let backend = ScriptedBackend {
            fail_broll: true,
            ..ScriptedBackend::default()
        };
        let (mut orch, _) = orchestrator(backend);
        let outcome = orch
            .run(Some(&media()), &options(true, true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(orch.state().step, Step::Complete);
        assert!(outcome.metadata.broll_images.is_empty());
        assert!(outcome.metadata.has_video());
    }

    #[tokio::test]
    async fn broll_without_subtitles_uses_default_keywords() {
        let (mut orch, history) = orchestrator(ScriptedBackend::default());
        orch.run(Some(&media()), &options(false, true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(orch.backend().calls(), vec!["fetch_broll", "generate_video"]);
        assert_eq!(
            orch.backend().keywords_requested(),
            vec!["technology", "innovation", "business", "development", "digital"]
        );
        let history = history.lock().unwrap();
        assert_monotonic(&history);
        assert!(history.iter().any(|s| s.progress == progress::BROLL_DONE_NO_TRANSCRIPT));
        assert_eq!(history.first().map(|s| (s.step, s.progress)), Some((Step::Idle, 30)));
    }

    #[tokio::test]
    async fn subtitles_only_skips_keyword_and_broll_calls() {
        let (mut orch, history) = orchestrator(ScriptedBackend::default());
        let outcome = orch
            .run(Some(&media()), &options(true, false), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(orch.backend().calls(), vec!["transcribe", "generate_video"]);
        assert!(orch.state().keywords.is_none());
        assert!(outcome.metadata.keywords.is_empty());
        assert_monotonic(&history.lock().unwrap());
    }

    #[tokio::test]
    async fn broll_map_keys_match_keywords() {
        let mut backend = ScriptedBackend::default();
        backend
            .images
            .insert("unrequested".to_string(), Some("https://img.example/x.jpg".to_string()));
        backend.images.remove("data");
        let (mut orch, _) = orchestrator(backend);
        let outcome = orch
            .run(Some(&media()), &options(true, true), &CancellationToken::new())
            .await
            .unwrap();

        let keys: Vec<&String> = outcome.metadata.broll_images.keys().collect();
        assert_eq!(keys, vec!["cloud", "data"]);
        assert_eq!(outcome.metadata.broll_images["data"], None);
        assert_eq!(outcome.metadata.resolved_image_count(), 1);
    }

    #[tokio::test]
    async fn missing_media_is_a_validation_error() {
        let (mut orch, history) = orchestrator(ScriptedBackend::default());
        let err = orch
            .run(None, &options(true, true), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation(_)));
        assert_eq!(orch.state().step, Step::Idle);
        assert!(history.lock().unwrap().is_empty());
        assert!(orch.backend().calls().is_empty());
    }

    #[tokio::test]
    async fn cancellation_aborts_in_flight_stage() {
        let backend = ScriptedBackend {
            hang_transcription: true,
            ..ScriptedBackend::default()
        };
        let (mut orch, _) = orchestrator(backend);
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orch
            .run(Some(&media()), &options(true, true), &token)
            .await
            .unwrap_err();

        assert_eq!(err, PipelineError::Cancelled);
        assert_eq!(orch.state().step, Step::Error);
        assert_eq!(orch.state().error.as_deref(), Some("Processing cancelled"));
        assert_eq!(orch.backend().calls(), vec!["transcribe"]);
    }

    #[tokio::test]
    async fn reset_returns_to_idle() {
        let (mut orch, _) = orchestrator(ScriptedBackend::default());
        orch.run(Some(&media()), &options(true, true), &CancellationToken::new())
            .await
            .unwrap();
        orch.reset();
        assert_eq!(orch.state(), &ProcessingState::default());
    }

    #[tokio::test]
    async fn words_per_subtitle_reaches_generation() {
        let (mut orch, _) = orchestrator(ScriptedBackend::default());
        let options = ProcessingOptions {
            words_per_subtitle: 5,
            ..ProcessingOptions::default()
        };
        orch.run(Some(&media()), &options, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(orch.backend().words_per_subtitle_sent(), Some(5));
    }
}
