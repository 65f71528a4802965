use anyhow::{Context, Result, bail};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use indicatif::ProgressBar;
use serde_json::json;
use std::path::{Path, PathBuf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::{
    AddSegmentArgs, AtArgs, Commands, DownloadArgs, EditAction, EditArgs, ExportArgs, ProcessArgs,
    ProjectArgs, SegmentsArgs, StyleArgs, SubtitlesArgs, UpdateSegmentArgs,
};
use crate::common::progress::{create_pipeline_bar, create_spinner, finish_spinner_with_success};
use crate::config::{AppConfig, ProjectDirectories};
use crate::pipeline::{Orchestrator, PipelineOutcome, ProcessingOptions, ProcessingState};
use crate::project::store::{SegmentDraft, SegmentPatch};
use crate::project::style::{SettingsPatch, StylePatch};
use crate::project::types::SegmentEntity;
use crate::project::{
    Exporter, ProjectStore, editor_state_path, load_editor_state, load_metadata,
    save_editor_state, save_metadata,
};
use crate::services::{HttpBackend, MediaInput, ProcessingBackend};
use crate::timeline::srt::render_srt;
use crate::timeline::timecode::{format_mmss, parse_instant};
use crate::ui::prelude::{Level, OutputFormat, emit, get_output_format, separator};

pub async fn dispatch(command: Commands) -> Result<()> {
    let config = AppConfig::load()?;
    match command {
        Commands::Process(args) => handle_process(args, &config).await,
        Commands::Export(args) => handle_export(args, &config).await,
        Commands::Download(args) => handle_download(args, &config).await,
        Commands::Segments(args) => handle_segments(args, &config),
        Commands::At(args) => handle_at(args, &config),
        Commands::Subtitles(args) => handle_subtitles(args, &config),
        Commands::Edit(args) => handle_edit(args, &config),
        Commands::Health => handle_health(&config).await,
    }
}

fn backend(config: &AppConfig) -> Result<HttpBackend> {
    HttpBackend::new(config.api_url.clone(), config.request_timeout())
}

fn is_json() -> bool {
    matches!(get_output_format(), OutputFormat::Json)
}

/// Cancels the returned token on Ctrl+C.
fn cancel_on_interrupt() -> (CancellationToken, JoinHandle<()>) {
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.cancel();
        }
    });
    (cancel, watcher)
}

async fn handle_process(args: ProcessArgs, config: &AppConfig) -> Result<()> {
    let inputs = args
        .media
        .iter()
        .map(MediaInput::existing)
        .collect::<Result<Vec<_>>>()?;
    let options = ProcessingOptions {
        subtitles_enabled: config.subtitles_enabled && !args.no_subtitles,
        brolls_enabled: config.brolls_enabled && !args.no_broll,
        words_per_subtitle: args.words.unwrap_or(config.words_per_subtitle).max(1),
        language: args.language.or_else(|| config.language.clone()),
        style: Some(config.style.clone()),
    };
    let dirs = ProjectDirectories::new()?;

    let bar = if is_json() {
        ProgressBar::hidden()
    } else {
        create_pipeline_bar()
    };
    let observer_bar = bar.clone();
    let json = is_json();
    let mut orchestrator = Orchestrator::new(backend(config)?).with_observer(move |state: &ProcessingState| {
        if json {
            emit(
                Level::Info,
                "pipeline.progress",
                &state.status_message(),
                Some(json!({
                    "step": state.step,
                    "progress": state.progress,
                    "processing": state.is_processing(),
                })),
            );
        } else {
            observer_bar.set_position(u64::from(state.progress));
            observer_bar.set_message(state.status_message());
        }
    });

    let (cancel, watcher) = cancel_on_interrupt();
    let result = process_all(&mut orchestrator, &inputs, &options, &dirs, &bar, &cancel).await;
    watcher.abort();
    bar.finish_and_clear();
    result
}

/// Runs the inputs in order, stopping at the first fatal error. The
/// orchestrator is reset between videos so progress starts from zero.
async fn process_all(
    orchestrator: &mut Orchestrator<HttpBackend>,
    inputs: &[MediaInput],
    options: &ProcessingOptions,
    dirs: &ProjectDirectories,
    bar: &ProgressBar,
    cancel: &CancellationToken,
) -> Result<()> {
    for (index, media) in inputs.iter().enumerate() {
        if index > 0 {
            orchestrator.reset();
        }
        bar.suspend(|| {
            emit(
                Level::Info,
                "process.start",
                &format!(
                    "Processing {} via {} ({})",
                    media.path().display(),
                    orchestrator.backend().base_url(),
                    orchestrator.backend().name()
                ),
                None,
            )
        });

        let outcome = orchestrator.run(Some(media), options, cancel).await?;
        let metadata_path = dirs.metadata_for_media(media.path())?;
        save_metadata(&outcome.metadata, &metadata_path)?;
        // Edits of an earlier run refer to segments that no longer exist
        let editor_path = editor_state_path(&metadata_path);
        if editor_path.exists() {
            std::fs::remove_file(&editor_path)
                .with_context(|| format!("removing stale {}", editor_path.display()))?;
        }

        let store = ProjectStore::from_metadata(outcome.metadata.clone());
        bar.suspend(|| {
            report_outcome(&outcome, orchestrator.state(), &store, &metadata_path)
        });
    }
    Ok(())
}

fn report_outcome(
    outcome: &PipelineOutcome,
    state: &ProcessingState,
    store: &ProjectStore,
    metadata_path: &Path,
) {
    let metadata = &outcome.metadata;
    let segments = store.segments();
    let subtitles = segments.iter().filter(|s| s.is_subtitle()).count();
    let brolls = segments.len() - subtitles;

    emit(
        Level::Success,
        "process.complete",
        &format!(
            "Processing complete: {} subtitle chunks, {} b-roll overlays, {} keywords ({} with images)",
            subtitles,
            brolls,
            metadata.keywords.len(),
            metadata.resolved_image_count()
        ),
        Some(json!({
            "subtitles": subtitles,
            "brolls": brolls,
            "keywords": metadata.keywords,
            "video_filename": metadata.video_filename,
            "metadata": metadata_path,
            "warnings": outcome.warnings.len(),
            "step": state.step,
        })),
    );
    emit(
        Level::Info,
        "process.cached",
        &format!("Project cached at {}", metadata_path.display()),
        None,
    );

    if metadata.has_video() {
        emit(
            Level::Info,
            "process.video",
            &format!(
                "Rendered video: {} (fetch it with `brollcut download {}`)",
                metadata.video_filename, metadata.video_filename
            ),
            None,
        );
    } else if metadata.subtitles_enabled || metadata.brolls_enabled {
        emit(
            Level::Warn,
            "process.no_video",
            &format!(
                "Final video was not generated; retry with `brollcut export {}`",
                metadata_path.display()
            ),
            None,
        );
    }
}

/// Loads a project from a `metadata.json` path or from the cache entry of a
/// source video. Saved edits are restored when present; otherwise the store
/// is seeded from the metadata with the configured style and timing.
fn open_project(args: &ProjectArgs, config: &AppConfig) -> Result<(ProjectStore, PathBuf)> {
    let metadata_path = resolve_metadata_path(&args.project)?;
    let metadata = load_metadata(&metadata_path)?;
    let editor_path = editor_state_path(&metadata_path);

    let mut store = if editor_path.exists() {
        ProjectStore::restore(Some(metadata), load_editor_state(&editor_path)?)
    } else {
        let mut store = ProjectStore::from_metadata(metadata);
        store.set_style(config.style.clone());
        store.update_settings(SettingsPatch {
            chunk_timing: Some(config.chunk_timing),
            ..SettingsPatch::default()
        })?;
        store
    };
    if let Some(words) = args.words {
        store.update_settings(SettingsPatch::words(words))?;
    }
    Ok((store, editor_path))
}

fn resolve_metadata_path(project: &Path) -> Result<PathBuf> {
    if !project.exists() {
        bail!("{} does not exist", project.display());
    }
    if project.extension().is_some_and(|ext| ext == "json") {
        return Ok(project.to_path_buf());
    }

    let path = ProjectDirectories::new()?.metadata_for_media(project)?;
    if !path.exists() {
        bail!(
            "No processed project for {}; run `brollcut process {}` first",
            project.display(),
            project.display()
        );
    }
    Ok(path)
}

async fn handle_export(args: ExportArgs, config: &AppConfig) -> Result<()> {
    let (store, _) = open_project(&args.project, config)?;
    let backend = backend(config)?;
    let (cancel, watcher) = cancel_on_interrupt();

    let spinner = create_spinner("Generating video from cached project...".to_string());
    let mut exporter = Exporter::new(backend);
    let result = exporter
        .export(
            store.metadata(),
            store.style(),
            store.settings().words_per_subtitle,
            &cancel,
        )
        .await;
    watcher.abort();
    spinner.finish_and_clear();
    let filename = result?;

    emit(
        Level::Success,
        "export.complete",
        &format!("Generated {}", filename),
        Some(json!(exporter.state())),
    );

    let dest = args.out_file.unwrap_or_else(|| PathBuf::from(&filename));
    download(exporter.backend(), &filename, &dest).await
}

async fn handle_download(args: DownloadArgs, config: &AppConfig) -> Result<()> {
    let dest = args
        .out_file
        .unwrap_or_else(|| PathBuf::from(&args.filename));
    download(&backend(config)?, &args.filename, &dest).await
}

async fn download(backend: &impl ProcessingBackend, filename: &str, dest: &Path) -> Result<()> {
    let bytes = backend
        .download_video(filename, dest)
        .await
        .with_context(|| format!("Failed to download {}", filename))?;
    emit(
        Level::Success,
        "download.complete",
        &format!("Saved {} ({} bytes)", dest.display(), bytes),
        Some(json!({ "path": dest, "bytes": bytes })),
    );
    Ok(())
}

fn handle_segments(args: SegmentsArgs, config: &AppConfig) -> Result<()> {
    let (store, _) = open_project(&args.project, config)?;
    let segments = store.segments();

    if is_json() {
        emit(
            Level::Info,
            "segments.list",
            &format!("{} segments", segments.len()),
            Some(json!({ "segments": segments })),
        );
        return Ok(());
    }

    emit(
        Level::Info,
        "segments.header",
        &format!(
            "{} ({} words per subtitle)",
            store.name(),
            store.settings().words_per_subtitle
        ),
        None,
    );

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["ID", "Kind", "Start", "End", "Content", "Keyword / Image"]);

    for segment in &segments {
        let id = if segment.is_selected {
            format!("* {}", segment.id)
        } else {
            segment.id.clone()
        };
        table.add_row(vec![
            Cell::new(id),
            kind_cell(segment),
            Cell::new(segment.start_time()),
            Cell::new(segment.end_time()),
            Cell::new(&segment.content),
            Cell::new(
                segment
                    .highlighted_keyword
                    .as_deref()
                    .or(segment.image_url.as_deref())
                    .unwrap_or(""),
            ),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn kind_cell(segment: &SegmentEntity) -> Cell {
    let cell = Cell::new(segment.kind);
    if segment.is_broll() {
        cell.fg(Color::Magenta)
    } else {
        cell.fg(Color::Cyan)
    }
}

fn handle_at(args: AtArgs, config: &AppConfig) -> Result<()> {
    let t = parse_instant(&args.time)?;
    let (store, _) = open_project(&args.project, config)?;
    let (subtitle, broll) = store.active_at(t);

    let message = match (&subtitle, &broll) {
        (None, _) => format!("{}: nothing on screen", format_mmss(t)),
        (Some(subtitle), None) => format!(
            "{}: \"{}\" [{} - {}]",
            format_mmss(t),
            subtitle.content,
            subtitle.start_time(),
            subtitle.end_time()
        ),
        (Some(subtitle), Some(broll)) => format!(
            "{}: \"{}\" [{} - {}] with b-roll \"{}\" {}",
            format_mmss(t),
            subtitle.content,
            subtitle.start_time(),
            subtitle.end_time(),
            broll.content,
            broll.image_url.as_deref().unwrap_or("(no image)")
        ),
    };

    emit(
        Level::Info,
        "timeline.at",
        &message,
        Some(json!({ "time": t, "subtitle": subtitle, "broll": broll })),
    );
    Ok(())
}

fn handle_subtitles(args: SubtitlesArgs, config: &AppConfig) -> Result<()> {
    let (store, _) = open_project(&args.project, config)?;
    let srt = render_srt(&store.segments());

    match args.out_file {
        Some(path) => {
            std::fs::write(&path, &srt)
                .with_context(|| format!("writing subtitles to {}", path.display()))?;
            emit(
                Level::Success,
                "subtitles.written",
                &format!("Wrote {}", path.display()),
                Some(json!({ "path": path })),
            );
        }
        None => print!("{srt}"),
    }
    Ok(())
}

fn handle_edit(args: EditArgs, config: &AppConfig) -> Result<()> {
    let (mut store, editor_path) = open_project(&args.project, config)?;

    let message = match args.action {
        EditAction::Add(add) => {
            let id = store.add_segment(segment_draft(add));
            format!("Added {}", id)
        }
        EditAction::Update(update) => {
            let id = update.id.clone();
            store.update_segment(&id, segment_patch(update))?;
            format!("Updated {}", id)
        }
        EditAction::Delete { id } => {
            store.delete_segment(&id)?;
            format!("Deleted {}", id)
        }
        EditAction::Select { id } => {
            store.select_segment(id.as_deref())?;
            match id {
                Some(id) => format!("Selected {}", id),
                None => "Selection cleared".to_string(),
            }
        }
        EditAction::Duplicate { id } => {
            let copy = store.duplicate_segment(&id)?;
            format!("Duplicated {} as {}", id, copy)
        }
        EditAction::Move { from, to } => {
            store.reorder_segments(from, to)?;
            format!("Moved source {} to position {}", from, to)
        }
        EditAction::Style(args) => apply_style(&mut store, args)?,
        EditAction::ResetStyle => {
            store.reset_style();
            "Style reset to defaults".to_string()
        }
        EditAction::Reset => {
            let metadata = store
                .metadata()
                .cloned()
                .context("Project has no processed metadata to reset to")?;
            store.new_project(metadata.project_name());
            store.load_metadata(metadata);
            store.set_style(config.style.clone());
            "Discarded all edits".to_string()
        }
    };

    save_editor_state(&store.snapshot(), &editor_path)?;

    let sources: Vec<&str> = store.sources().iter().map(|s| s.id.as_str()).collect();
    emit(
        Level::Success,
        "edit.applied",
        &message,
        Some(json!({
            "selected": store.selected_segment().map(|s| s.id),
            "sources": sources,
            "segments": store.segments().len(),
            "editor_state": editor_path,
        })),
    );
    Ok(())
}

fn segment_draft(args: AddSegmentArgs) -> SegmentDraft {
    let mut draft = if args.broll {
        SegmentDraft::broll(args.content, args.start, args.end)
    } else {
        SegmentDraft::subtitle(args.content, args.start, args.end)
    };
    draft.highlighted_keyword = args.keyword;
    draft.image_url = args.image_url;
    draft.keyword_timestamp = args.keyword_time;
    draft
}

fn segment_patch(args: UpdateSegmentArgs) -> SegmentPatch {
    SegmentPatch {
        content: args.content,
        start: args.start,
        end: args.end,
        highlighted_keyword: args.keyword,
        image_url: args.image_url,
        keyword_timestamp: args.keyword_time,
    }
}

fn apply_style(store: &mut ProjectStore, args: StyleArgs) -> Result<String> {
    let patch = StylePatch {
        font_family: args.font_family,
        font_size: args.font_size,
        font_weight: args.font_weight,
        color: args.color,
        text_align: args.align,
        background_color: args.background,
        border_radius: args.border_radius,
        padding: args.padding,
        margin: args.margin,
    };
    if patch == StylePatch::default() {
        bail!("No style changes given; pass at least one of --font-family, --font-size, --color, --align, ...");
    }

    let Some(id) = args.segment else {
        store.update_style(&patch);
        return Ok("Updated project style".to_string());
    };

    store.apply_style_to_segment(&id, &patch)?;
    let segments = store.segments();
    if let Some(segment) = segments.iter().find(|s| s.id == id) {
        let style = store.segment_style(segment);
        emit(
            Level::Debug,
            "edit.segment_style",
            &format!(
                "{} now uses {} {} aligned {}",
                id, style.font_family, style.font_size, style.text_align
            ),
            Some(json!(style)),
        );
    }
    Ok(format!("Updated style of {}", id))
}

async fn handle_health(config: &AppConfig) -> Result<()> {
    let backend = backend(config)?;
    let spinner = create_spinner(format!("Contacting {}...", backend.base_url()));
    let result = backend.health().await;

    match result {
        Ok(health) => {
            finish_spinner_with_success(
                spinner,
                format!("{} {} is {}", health.service, health.version, health.status),
            );
            separator();
            emit(
                Level::Info,
                "health.url",
                &format!("Service URL: {}", backend.base_url()),
                Some(json!(health)),
            );
            Ok(())
        }
        Err(err) => {
            spinner.finish_and_clear();
            Err(err)
        }
    }
}
