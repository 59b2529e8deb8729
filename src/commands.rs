use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

use crate::audio::{FfmpegAudioDecoder, VoiceActivityDetector, VoicedInterval};
use crate::cli::{CheckArgs, Commands, DetectArgs, MatchArgs, PlanArgs, RenderArgs};
use crate::common::paths;
use crate::config::MvConfig;
use crate::render::ffmpeg::{SystemFfmpegRunner, SystemMediaProbe, format_command};
use crate::render::layers::FfmpegLayerRenderer;
use crate::render::output::{default_output_path, prepare_output_destination};
use crate::render::{Compositor, RenderRequest, RenderSession, TextOverlay, WatermarkOverlay};
use crate::render::slideshow;
use crate::support::time::format_seconds;
use crate::timeline;
use crate::ui::prelude::*;

pub fn handle_command(command: Commands) -> Result<()> {
    match command {
        Commands::Detect(args) => handle_detect(args),
        Commands::Match(args) => handle_match(args),
        Commands::Check(args) => handle_check(args),
        Commands::Plan(args) => handle_plan(args),
        Commands::Render(args) => handle_render(args),
        Commands::Last => handle_last(),
    }
}

fn detector(config: &MvConfig, threshold: Option<f64>, min_duration: Option<f64>) -> Result<VoiceActivityDetector> {
    let detector = VoiceActivityDetector::new(
        threshold.unwrap_or(config.threshold),
        min_duration.unwrap_or(config.min_duration),
    )?
    .with_merge_gap(config.merge_gap)?;
    Ok(detector)
}

fn detect_intervals(detector: &VoiceActivityDetector, audio: &Path) -> Result<Vec<VoicedInterval>> {
    emit(
        Level::Info,
        "mv.detect.start",
        &format!("Analysing voice activity in {}", audio.display()),
        None,
    );
    let report = detector.detect(audio, &FfmpegAudioDecoder)?;
    print_block(&report.summary());
    if report.is_empty() {
        emit(
            Level::Warn,
            "mv.detect.empty",
            &format!(
                "No voice found in {:.2}s of audio at threshold {}",
                report.audio_duration, report.threshold
            ),
            None,
        );
    }
    emit(
        Level::Success,
        "mv.detect.done",
        &format!("Found {} voice segment(s)", report.len()),
        Some(json!(report)),
    );
    Ok(report.intervals)
}

fn handle_detect(args: DetectArgs) -> Result<()> {
    let config = MvConfig::load()?;
    let detector = detector(&config, args.threshold, args.min_duration)?;
    let intervals = detect_intervals(&detector, &args.audio)?;

    if let Some(save) = args.save {
        let json = serde_json::to_string_pretty(&intervals).context("serializing voice segments")?;
        write_text(&save, &json)?;
        emit(
            Level::Success,
            "mv.detect.saved",
            &format!("Saved voice segments to {}", save.display()),
            Some(json!({ "path": save })),
        );
    }
    Ok(())
}

fn load_intervals(path: &Path) -> Result<Vec<VoicedInterval>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading voice segments from {}", path.display()))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("parsing voice segments in {}", path.display()))
}

fn handle_match(args: MatchArgs) -> Result<()> {
    let config = MvConfig::load()?;
    let subtitles = fs::read_to_string(&args.subtitles)
        .with_context(|| format!("reading subtitle lines from {}", args.subtitles.display()))?;

    let intervals = match (&args.audio, &args.intervals) {
        (_, Some(path)) => load_intervals(path)?,
        (Some(audio), None) => {
            let detector = detector(&config, None, None)?;
            detect_intervals(&detector, audio)?
        }
        (None, None) => anyhow::bail!("Either --audio or --intervals is required"),
    };

    let text = timeline::match_to_text(
        &subtitles,
        &intervals,
        args.start_offset.unwrap_or(config.start_offset),
        args.end_offset.unwrap_or(config.end_offset),
    )?;
    let lines: Vec<&str> = text.lines().collect();
    let data = json!({ "lines": lines });

    match args.out_file {
        Some(out) => {
            write_text(&out, &text)?;
            emit(
                Level::Success,
                "mv.match.saved",
                &format!("Wrote {} timeline line(s) to {}", lines.len(), out.display()),
                Some(data),
            );
        }
        None => {
            print_block(&text);
            emit(
                Level::Success,
                "mv.match.done",
                &format!("Matched {} subtitle line(s)", lines.len()),
                Some(data),
            );
        }
    }
    Ok(())
}

fn handle_check(args: CheckArgs) -> Result<()> {
    let text = fs::read_to_string(&args.timeline)
        .with_context(|| format!("reading timeline from {}", args.timeline.display()))?;
    let records = timeline::parse(&text, args.width, args.height)?;

    let listing = records
        .iter()
        .enumerate()
        .map(|(idx, record)| {
            format!(
                "{:>3}. {}s → {}s ({:.2}s)  {}  ({}px, {}, {},{})",
                idx + 1,
                format_seconds(record.start),
                format_seconds(record.end),
                record.duration(),
                record.content,
                record.font_size,
                record.color.to_hex(),
                record.pos_x,
                record.pos_y
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    if !listing.is_empty() {
        print_block(&listing);
    }

    emit(
        Level::Success,
        "mv.timeline.ok",
        &format!("Timeline is valid: {} subtitle(s)", records.len()),
        Some(json!({
            "records": records,
            "lines": records
                .iter()
                .map(|record| record.to_timeline_line())
                .collect::<Vec<_>>(),
        })),
    );
    Ok(())
}

fn handle_plan(args: PlanArgs) -> Result<()> {
    let config = MvConfig::load()?;
    let slide_duration = args.slide_duration.unwrap_or(config.slide_duration);
    let slides = slideshow::plan(&args.images, args.duration, slide_duration)?;

    let listing = slides
        .iter()
        .enumerate()
        .map(|(idx, slide)| {
            format!(
                "{:>3}. {:>8.2}s → {:>8.2}s  {}",
                idx + 1,
                slide.start,
                slide.end(),
                slide.image.display()
            )
        })
        .collect::<Vec<_>>()
        .join("\n");
    print_block(&listing);

    emit(
        Level::Success,
        "mv.plan.done",
        &format!("{} image(s) cover {:.2}s", slides.len(), args.duration),
        Some(json!({ "slides": slides })),
    );
    Ok(())
}

fn render_request(args: &RenderArgs, config: &MvConfig, output: PathBuf) -> Result<RenderRequest> {
    let timeline = match &args.timeline {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("reading timeline from {}", path.display()))?,
        None => String::new(),
    };

    let text = args.text.text.as_ref().map(|content| TextOverlay {
        content: content.clone(),
        font_size: args.text.text_size.unwrap_or(config.text_size),
        color: args
            .text
            .text_color
            .clone()
            .unwrap_or_else(|| config.text_color.clone()),
        position: args
            .text
            .text_position
            .clone()
            .unwrap_or_else(|| config.text_position.clone()),
    });

    let watermark = args.watermark.watermark.as_ref().map(|path| WatermarkOverlay {
        path: path.clone(),
        opacity: args
            .watermark
            .watermark_opacity
            .unwrap_or(config.watermark_opacity),
        position: args
            .watermark
            .watermark_position
            .clone()
            .unwrap_or_else(|| config.watermark_position.clone()),
    });

    Ok(RenderRequest {
        audio: args.audio.clone(),
        images: args.images.clone(),
        slide_duration: args.slide_duration.unwrap_or(config.slide_duration),
        text,
        watermark,
        timeline,
        output,
    })
}

fn handle_render(args: RenderArgs) -> Result<()> {
    let config = MvConfig::load()?;
    let output = match &args.out_file {
        Some(path) => path.clone(),
        None => default_output_path(&config.output_dir()?)?,
    };
    let request = render_request(&args, &config, output)?;

    let layers = FfmpegLayerRenderer::with_font_candidates(&config.font_paths);
    match layers.font() {
        Some(font) => emit(
            Level::Debug,
            "mv.render.font",
            &format!("Using font {}", font.display()),
            None,
        ),
        None => emit(
            Level::Warn,
            "mv.render.font",
            "No configured font found; falling back to ffmpeg's default font",
            None,
        ),
    }

    let probe = SystemMediaProbe;
    let runner = SystemFfmpegRunner;
    let compositor = Compositor::new(&probe, &layers, &runner)
        .with_settings(config.encode_settings())
        .with_watermark_height(config.watermark_height)
        .verbose(args.verbose);

    if args.dry_run {
        let prepared = compositor.dry_run(&request)?;
        print_block(&format_command("ffmpeg", &prepared.args));
        emit(
            Level::Info,
            "mv.render.dry_run",
            &format!(
                "Dry run: {} slide(s), {} overlay layer(s); nothing was encoded",
                prepared.plan.slides.len(),
                prepared.plan.overlays.len()
            ),
            Some(json!({ "args": prepared.args, "plan": prepared.plan })),
        );
        return Ok(());
    }

    let mut inputs: Vec<&Path> = vec![request.audio.as_path()];
    inputs.extend(request.images.iter().map(PathBuf::as_path));
    if let Some(watermark) = &request.watermark {
        inputs.push(watermark.path.as_path());
    }
    prepare_output_destination(&request.output, &inputs, args.force)?;

    let session_path = paths::session_path()?;
    let mut session = RenderSession::load_from_path(&session_path)?;
    let artifact = compositor.compose(&request, &mut session)?;
    session.save_to_path(&session_path)?;

    emit(
        Level::Success,
        "mv.render.done",
        &format!(
            "Music video written to {} ({:.1}s, {} subtitle(s))",
            artifact.path.display(),
            artifact.duration,
            artifact.subtitle_count
        ),
        Some(json!(artifact)),
    );
    Ok(())
}

fn handle_last() -> Result<()> {
    let session = RenderSession::load_from_path(paths::session_path()?)?;
    let artifact = session.last_artifact()?;
    print_block(&artifact.path.display().to_string());
    emit(
        Level::Debug,
        "mv.last",
        &format!("Last video is {:.1}s long", artifact.duration),
        None,
    );
    if matches!(get_output_format(), OutputFormat::Json) {
        emit(
            Level::Success,
            "mv.last",
            &artifact.path.display().to_string(),
            Some(json!(artifact)),
        );
    }
    Ok(())
}

fn write_text(path: &Path, text: &str) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }
    let mut contents = text.to_string();
    if !contents.ends_with('\n') {
        contents.push('\n');
    }
    fs::write(path, contents).with_context(|| format!("writing {}", path.display()))
}
