use clap::{Args, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

use crate::ui::OutputFormat;

/// Build lyric music videos from audio, still images and timed subtitles
#[derive(Parser, Debug)]
#[command(name = "lyricmv", author, version, about, long_about = None)]
pub struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Output format for events
    #[arg(long = "output", value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Detect voiced segments in an audio file
    Detect(DetectArgs),
    /// Pair subtitle lines with detected voice segments
    Match(MatchArgs),
    /// Validate a timeline file and list its subtitles
    Check(CheckArgs),
    /// Show how background images are spread over a duration
    Plan(PlanArgs),
    /// Render the music video
    Render(RenderArgs),
    /// Print the most recently generated video
    Last,
}

#[derive(Args, Debug, Clone)]
pub struct DetectArgs {
    /// Audio file to analyse
    #[arg(value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// RMS level counted as voice (0-1, exclusive)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Shortest segment kept, in seconds
    #[arg(long = "min-duration")]
    pub min_duration: Option<f64>,

    /// Write the detected segments as JSON for `match --intervals`
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub save: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct MatchArgs {
    /// Text file with one subtitle line per voice segment
    #[arg(value_hint = ValueHint::FilePath)]
    pub subtitles: PathBuf,

    /// Detect segments from this audio file
    #[arg(long, value_hint = ValueHint::FilePath, conflicts_with = "intervals", required_unless_present = "intervals")]
    pub audio: Option<PathBuf>,

    /// Use segments saved by `detect --save`
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub intervals: Option<PathBuf>,

    /// Seconds added to every start time
    #[arg(long = "start-offset", allow_hyphen_values = true)]
    pub start_offset: Option<f64>,

    /// Seconds added to every end time
    #[arg(long = "end-offset", allow_hyphen_values = true)]
    pub end_offset: Option<f64>,

    /// Write the timeline here instead of printing it
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Timeline text file
    #[arg(value_hint = ValueHint::FilePath)]
    pub timeline: PathBuf,

    /// Canvas width used for position checks
    #[arg(long, default_value_t = 1920)]
    pub width: u32,

    /// Canvas height used for position checks
    #[arg(long, default_value_t = 1080)]
    pub height: u32,
}

#[derive(Args, Debug, Clone)]
pub struct PlanArgs {
    /// Background images in display order
    #[arg(value_hint = ValueHint::FilePath)]
    pub images: Vec<PathBuf>,

    /// Total duration to cover, in seconds
    #[arg(long)]
    pub duration: f64,

    /// Longest time one image stays on screen
    #[arg(long = "slide-duration")]
    pub slide_duration: Option<f64>,
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Audio track
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub audio: PathBuf,

    /// Background image; repeat for a slideshow
    #[arg(long = "image", value_hint = ValueHint::FilePath, required = true)]
    pub images: Vec<PathBuf>,

    /// Timeline text file with timed subtitles
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub timeline: Option<PathBuf>,

    /// Longest time one image stays on screen
    #[arg(long = "slide-duration")]
    pub slide_duration: Option<f64>,

    #[command(flatten)]
    pub text: TextArgs,

    #[command(flatten)]
    pub watermark: WatermarkArgs,

    /// Optional output path; defaults to a new file in the output directory
    #[arg(short = 'o', long = "out-file", value_hint = ValueHint::FilePath)]
    pub out_file: Option<PathBuf>,

    /// Overwrite an existing output file
    #[arg(long)]
    pub force: bool,

    /// Show the ffmpeg command that would be executed without running it
    #[arg(long)]
    pub dry_run: bool,

    /// Show raw ffmpeg output instead of a progress bar
    #[arg(long)]
    pub verbose: bool,
}

/// Text shown for the whole video
#[derive(Args, Debug, Clone)]
pub struct TextArgs {
    #[arg(long = "text")]
    pub text: Option<String>,

    #[arg(long = "text-size")]
    pub text_size: Option<u32>,

    #[arg(long = "text-color")]
    pub text_color: Option<String>,

    /// `x,y` position such as `center,80`
    #[arg(long = "text-position")]
    pub text_position: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct WatermarkArgs {
    /// Watermark image, scaled to the configured height
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub watermark: Option<PathBuf>,

    #[arg(long = "watermark-opacity")]
    pub watermark_opacity: Option<f64>,

    /// `x,y` position such as `right20,bottom20`
    #[arg(long = "watermark-position")]
    pub watermark_position: Option<String>,
}
