use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::project::style::{RgbaColor, TextAlign};
use crate::timeline::timecode::parse_instant;

/// Transcribe a video, attach keyword b-roll and compose subtitle overlays
#[derive(Parser, Debug)]
#[command(name = "brollcut", author, version, about, long_about = None)]
pub struct Cli {
    /// Print debug events
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Emit one JSON object per line instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable coloured output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the full pipeline on a video and cache the result
    Process(ProcessArgs),
    /// Regenerate the final video from a cached project
    Export(ExportArgs),
    /// Download a rendered video from the processing service
    Download(DownloadArgs),
    /// List the rendered subtitle and b-roll segments of a project
    Segments(SegmentsArgs),
    /// Show what is on screen at a playback instant
    At(AtArgs),
    /// Write the rendered subtitles as an SRT file
    Subtitles(SubtitlesArgs),
    /// Edit the segments and style of a processed project
    Edit(EditArgs),
    /// Check that the processing service is reachable
    Health,
}

#[derive(Args, Debug, Clone)]
pub struct ProcessArgs {
    /// Videos to process, one after another
    #[arg(required = true, value_hint = ValueHint::FilePath)]
    pub media: Vec<PathBuf>,

    /// Words per subtitle chunk
    #[arg(short = 'w', long = "words")]
    pub words: Option<usize>,

    /// Skip transcription and subtitles
    #[arg(long)]
    pub no_subtitles: bool,

    /// Skip keyword extraction and b-roll
    #[arg(long)]
    pub no_broll: bool,

    /// Language hint for transcription (e.g. "en")
    #[arg(short = 'l', long)]
    pub language: Option<String>,
}

/// A project is addressed by its source video or its `metadata.json`.
#[derive(Args, Debug, Clone)]
pub struct ProjectArgs {
    /// Source video or cached metadata.json
    #[arg(value_hint = ValueHint::FilePath)]
    pub project: PathBuf,

    /// Words per subtitle chunk (defaults to the project's setting)
    #[arg(short = 'w', long = "words")]
    pub words: Option<usize>,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Where to save the rendered video; defaults to the service filename
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct DownloadArgs {
    /// Filename returned by the processing service
    pub filename: String,

    /// Destination path; defaults to the filename in the current directory
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct SegmentsArgs {
    #[command(flatten)]
    pub project: ProjectArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AtArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Playback instant as seconds, MM:SS or HH:MM:SS
    #[arg(allow_hyphen_values = true)]
    pub time: String,
}

#[derive(Args, Debug, Clone)]
pub struct SubtitlesArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Output file; prints to stdout when omitted
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct EditArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    #[command(subcommand)]
    pub action: EditAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum EditAction {
    /// Add a subtitle or b-roll segment and select it
    Add(AddSegmentArgs),
    /// Change a segment; new content replaces only that chunk's words
    Update(UpdateSegmentArgs),
    /// Delete a segment together with every chunk of its source
    Delete {
        /// Segment id as shown by `segments`
        id: String,
    },
    /// Select a segment, or clear the selection when no id is given
    Select {
        /// Segment id as shown by `segments`
        id: Option<String>,
    },
    /// Copy a segment into a new source placed right after it
    Duplicate {
        /// Segment id as shown by `segments`
        id: String,
    },
    /// Move the source at FROM to position TO (0-based, chunks move with their source)
    Move { from: usize, to: usize },
    /// Change the project style, or one segment's style with --segment
    Style(StyleArgs),
    /// Restore the default style and drop per-segment overrides
    ResetStyle,
    /// Discard all edits and start again from the processed result
    Reset,
}

#[derive(Args, Debug, Clone)]
pub struct AddSegmentArgs {
    /// Subtitle text, or the keyword of a b-roll overlay
    pub content: String,

    /// Start as seconds, MM:SS or HH:MM:SS
    #[arg(long, value_parser = parse_instant)]
    pub start: f64,

    /// End as seconds, MM:SS or HH:MM:SS
    #[arg(long, value_parser = parse_instant)]
    pub end: f64,

    /// Add a b-roll overlay instead of a subtitle
    #[arg(long)]
    pub broll: bool,

    /// Keyword to highlight in a subtitle
    #[arg(long)]
    pub keyword: Option<String>,

    /// Image shown by a b-roll overlay
    #[arg(long)]
    pub image_url: Option<String>,

    /// Instant the keyword is spoken at
    #[arg(long, value_parser = parse_instant)]
    pub keyword_time: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct UpdateSegmentArgs {
    /// Segment id as shown by `segments`
    pub id: String,

    #[arg(long)]
    pub content: Option<String>,

    #[arg(long, value_parser = parse_instant)]
    pub start: Option<f64>,

    #[arg(long, value_parser = parse_instant)]
    pub end: Option<f64>,

    /// Highlighted keyword; an empty value clears it
    #[arg(long)]
    pub keyword: Option<String>,

    /// B-roll image; an empty value clears it
    #[arg(long)]
    pub image_url: Option<String>,

    #[arg(long, value_parser = parse_instant)]
    pub keyword_time: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct StyleArgs {
    /// Override the style of this segment only
    #[arg(long)]
    pub segment: Option<String>,

    #[arg(long)]
    pub font_family: Option<String>,

    #[arg(long)]
    pub font_size: Option<String>,

    #[arg(long)]
    pub font_weight: Option<String>,

    /// Text color as r,g,b or r,g,b,a
    #[arg(long)]
    pub color: Option<RgbaColor>,

    /// left, center or right
    #[arg(long)]
    pub align: Option<TextAlign>,

    /// Background color as r,g,b or r,g,b,a
    #[arg(long)]
    pub background: Option<RgbaColor>,

    #[arg(long)]
    pub border_radius: Option<u32>,

    #[arg(long)]
    pub padding: Option<u32>,

    #[arg(long)]
    pub margin: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_project_commands() {
        let cli = Cli::parse_from(["brollcut", "--json", "at", "project.json", "01:05", "-w", "4"]);
        assert!(cli.json);
        match cli.command {
            Commands::At(args) => {
                assert_eq!(args.time, "01:05");
                assert_eq!(args.project.words, Some(4));
                assert_eq!(args.project.project, PathBuf::from("project.json"));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn parses_edit_actions() {
        let cli = Cli::parse_from([
            "brollcut", "edit", "metadata.json", "add", "Hello there", "--start", "00:02", "--end", "4.5",
        ]);
        match cli.command {
            Commands::Edit(EditArgs {
                action: EditAction::Add(add),
                ..
            }) => {
                assert_eq!(add.content, "Hello there");
                assert_eq!(add.start, 2.0);
                assert_eq!(add.end, 4.5);
                assert!(!add.broll);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from([
            "brollcut", "edit", "metadata.json", "style", "--segment", "subtitle-1", "--align", "left",
            "--color", "255,0,0",
        ]);
        match cli.command {
            Commands::Edit(EditArgs {
                action: EditAction::Style(style),
                ..
            }) => {
                assert_eq!(style.segment.as_deref(), Some("subtitle-1"));
                assert_eq!(style.align, Some(TextAlign::Left));
                assert_eq!(style.color, Some(RgbaColor::new(255, 0, 0, 1.0)));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["brollcut", "edit", "metadata.json", "select"]);
        assert!(matches!(
            cli.command,
            Commands::Edit(EditArgs {
                action: EditAction::Select { id: None },
                ..
            })
        ));
    }

    #[test]
    fn process_accepts_several_videos() {
        let cli = Cli::parse_from(["brollcut", "process", "a.mp4", "b.mp4", "--no-broll"]);
        match cli.command {
            Commands::Process(args) => {
                assert_eq!(args.media, vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")]);
                assert!(args.no_broll);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }
}
