//! Composition of the final music video.
//!
//! Rendering happens in three phases. Validation checks every input without
//! doing any rendering work. Layer preparation rasterises text and scales the
//! watermark into scratch files and lays them out on the canvas. Encoding hands
//! the resulting [`RenderPlan`] to ffmpeg. Scratch files are removed whatever
//! the outcome, and a failed encode never leaves a partial video behind.

pub mod ffmpeg;
pub mod layers;
pub mod output;
pub mod plan;
pub mod scratch;
pub mod session;
pub mod slideshow;

use std::fs;
use std::path::PathBuf;

use anyhow::Context;
use serde_json::json;

use self::ffmpeg::{EncodeSettings, FfmpegCompiler, FfmpegRunOptions, FfmpegRunner, MediaProbe};
use self::layers::{LayerRenderer, RenderedLayer};
use self::plan::{Canvas, LayerKind, OverlayLayer, RenderPlan, TimeWindow};
use self::scratch::ScratchFiles;
pub use self::session::{GeneratedArtifact, RenderSession};
use self::slideshow::SlideAllocation;
use crate::error::{MvError, Result, require_file};
use crate::style::{Axis, color, position};
use crate::timeline::entry::{MAX_FONT_SIZE, MIN_FONT_SIZE};
use crate::timeline::{self, SubtitleRecord};
use crate::ui::prelude::*;

pub const DEFAULT_WATERMARK_HEIGHT: u32 = 80;

/// Global text shown for the whole video.
#[derive(Debug, Clone)]
pub struct TextOverlay {
    pub content: String,
    pub font_size: u32,
    pub color: String,
    /// Combined `x,y` position such as `center,80`.
    pub position: String,
}

#[derive(Debug, Clone)]
pub struct WatermarkOverlay {
    pub path: PathBuf,
    pub opacity: f64,
    /// Combined `x,y` position such as `right20,bottom20`.
    pub position: String,
}

#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub audio: PathBuf,
    pub images: Vec<PathBuf>,
    pub slide_duration: f64,
    pub text: Option<TextOverlay>,
    pub watermark: Option<WatermarkOverlay>,
    pub timeline: String,
    pub output: PathBuf,
}

/// Inputs that passed validation.
struct ValidatedInputs {
    canvas: Canvas,
    total_duration: f64,
    slides: Vec<SlideAllocation>,
    records: Vec<SubtitleRecord>,
}

/// A plan together with the ffmpeg arguments that realise it.
#[derive(Debug, Clone)]
pub struct PreparedRender {
    pub plan: RenderPlan,
    pub args: Vec<String>,
}

pub struct Compositor<'a> {
    probe: &'a dyn MediaProbe,
    layers: &'a dyn LayerRenderer,
    runner: &'a dyn FfmpegRunner,
    settings: EncodeSettings,
    watermark_height: u32,
    scratch_dir: Option<PathBuf>,
    verbose: bool,
}

impl<'a> Compositor<'a> {
    pub fn new(
        probe: &'a dyn MediaProbe,
        layers: &'a dyn LayerRenderer,
        runner: &'a dyn FfmpegRunner,
    ) -> Self {
        Self {
            probe,
            layers,
            runner,
            settings: EncodeSettings::default(),
            watermark_height: DEFAULT_WATERMARK_HEIGHT,
            scratch_dir: None,
            verbose: false,
        }
    }

    pub fn with_settings(mut self, settings: EncodeSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_watermark_height(mut self, height: u32) -> Self {
        self.watermark_height = height.max(1);
        self
    }

    #[cfg(test)]
    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = Some(dir.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn scratch(&self) -> ScratchFiles {
        match &self.scratch_dir {
            Some(dir) => ScratchFiles::in_dir(dir),
            None => ScratchFiles::new(),
        }
    }

    /// Renders `request` and records the result in `session`.
    pub fn compose(
        &self,
        request: &RenderRequest,
        session: &mut RenderSession,
    ) -> Result<GeneratedArtifact> {
        let inputs = self.validate(request)?;
        let mut scratch = self.scratch();

        let prepared = self
            .prepare(request, &inputs, &mut scratch)
            .map_err(MvError::encoding)?;

        emit(
            Level::Info,
            "mv.render.encode",
            &format!(
                "Encoding {:.1}s of video with {} overlay layer(s)",
                inputs.total_duration,
                prepared.plan.overlays.len()
            ),
            None,
        );

        let existed_before = request.output.exists();
        let run = self.runner.run(
            &prepared.args,
            FfmpegRunOptions::new(Some(inputs.total_duration), self.verbose),
        );
        let run = run.and_then(|()| {
            if request.output.exists() {
                Ok(())
            } else {
                anyhow::bail!(
                    "ffmpeg finished without writing {}",
                    request.output.display()
                )
            }
        });
        scratch.release();

        if let Err(err) = run {
            if !existed_before {
                remove_partial_output(&request.output);
            }
            return Err(MvError::encoding(err));
        }

        let artifact = GeneratedArtifact {
            path: request.output.clone(),
            duration: inputs.total_duration,
            slide_count: prepared.plan.slides.len(),
            overlay_count: prepared.plan.overlays.len(),
            subtitle_count: prepared.plan.subtitle_count(),
        };
        session.record(artifact.clone());
        Ok(artifact)
    }

    /// Validates and lays out `request` without encoding. Scratch layers are
    /// removed before this returns, so the arguments are for inspection only.
    pub fn dry_run(&self, request: &RenderRequest) -> Result<PreparedRender> {
        let inputs = self.validate(request)?;
        let mut scratch = self.scratch();
        self.prepare(request, &inputs, &mut scratch)
            .map_err(MvError::encoding)
    }

    fn validate(&self, request: &RenderRequest) -> Result<ValidatedInputs> {
        require_file("Audio file", &request.audio)?;
        let first_image = request.images.first().ok_or_else(|| {
            MvError::Precondition("No background images supplied; add at least one".to_string())
        })?;
        for image in &request.images {
            require_file("Background image", image)?;
        }
        if let Some(watermark) = &request.watermark {
            require_file("Watermark image", &watermark.path)?;
            if !(0.0..=1.0).contains(&watermark.opacity) {
                return Err(MvError::InvalidParameter(format!(
                    "watermark opacity must be between 0 and 1, got {}",
                    watermark.opacity
                )));
            }
        }

        if let Some(text) = &request.text
            && !(MIN_FONT_SIZE..=MAX_FONT_SIZE).contains(&text.font_size)
        {
            return Err(MvError::InvalidParameter(format!(
                "text size must be between {MIN_FONT_SIZE} and {MAX_FONT_SIZE}, got {}",
                text.font_size
            )));
        }

        let (width, height) = self
            .probe
            .image_dimensions(first_image)
            .map_err(MvError::Decode)?;
        if width == 0 || height == 0 {
            return Err(MvError::InvalidParameter(format!(
                "{} has no pixels",
                first_image.display()
            )));
        }
        let canvas = Canvas::new(width, height);

        let records = timeline::parse(&request.timeline, width, height)?;

        let total_duration = self
            .probe
            .audio_duration(&request.audio)
            .map_err(MvError::Decode)?;
        let slides = slideshow::plan(&request.images, total_duration, request.slide_duration)?;

        emit(
            Level::Debug,
            "mv.render.validate",
            &format!(
                "Canvas {}x{}, {:.2}s of audio, {} subtitle(s)",
                width,
                height,
                total_duration,
                records.len()
            ),
            None,
        );

        Ok(ValidatedInputs {
            canvas,
            total_duration,
            slides,
            records,
        })
    }

    fn prepare(
        &self,
        request: &RenderRequest,
        inputs: &ValidatedInputs,
        scratch: &mut ScratchFiles,
    ) -> anyhow::Result<PreparedRender> {
        let canvas = inputs.canvas;
        let total = inputs.total_duration;
        let full = TimeWindow::new(0.0, total);
        let mut overlays = Vec::new();

        if let Some(text) = request.text.as_ref().filter(|t| !t.content.trim().is_empty()) {
            let layer = self
                .layers
                .render_text(&text.content, text.font_size, color::resolve(&text.color), scratch)
                .context("Failed to render the overlay text")?;
            let (x, y) = position::split_pair(&text.position);
            overlays.push(place(
                LayerKind::Text,
                layer,
                canvas,
                (x.as_str(), y.as_str()),
                full,
                1.0,
            ));
        }

        if let Some(watermark) = &request.watermark {
            let layer = self
                .layers
                .scale_image(&watermark.path, self.watermark_height, scratch)
                .with_context(|| {
                    format!("Failed to prepare watermark {}", watermark.path.display())
                })?;
            let (x, y) = position::split_pair(&watermark.position);
            overlays.push(place(
                LayerKind::Watermark,
                layer,
                canvas,
                (x.as_str(), y.as_str()),
                full,
                watermark.opacity,
            ));
        }

        for (index, record) in inputs.records.iter().enumerate() {
            if record.start >= total {
                emit(
                    Level::Warn,
                    "mv.render.subtitle.skipped",
                    &format!(
                        "Subtitle '{}' starts at {}s, after the audio ends ({:.2}s); skipping it",
                        record.content, record.start, total
                    ),
                    None,
                );
                continue;
            }
            let layer = self
                .layers
                .render_text(&record.content, record.font_size, record.color, scratch)
                .with_context(|| format!("Failed to render subtitle '{}'", record.content))?;
            overlays.push(place(
                LayerKind::Subtitle { index },
                layer,
                canvas,
                (record.pos_x.as_str(), record.pos_y.as_str()),
                TimeWindow::new(record.start, record.end.min(total)),
                1.0,
            ));
        }

        emit(
            Level::Debug,
            "mv.render.layers",
            &format!("Prepared {} overlay layer(s)", overlays.len()),
            Some(json!({ "scratch_files": scratch.len() })),
        );

        let plan = RenderPlan {
            canvas,
            total_duration: total,
            slides: inputs.slides.clone(),
            overlays,
        };
        let output = FfmpegCompiler::new(self.settings.clone()).compile(
            &plan,
            &request.audio,
            &request.output,
        )?;

        Ok(PreparedRender {
            plan,
            args: output.args,
        })
    }
}

fn place(
    kind: LayerKind,
    layer: RenderedLayer,
    canvas: Canvas,
    (pos_x, pos_y): (&str, &str),
    window: TimeWindow,
    opacity: f64,
) -> OverlayLayer {
    let x = position::resolve(
        pos_x,
        f64::from(canvas.width),
        f64::from(layer.width),
        Axis::Horizontal,
    );
    let y = position::resolve(
        pos_y,
        f64::from(canvas.height),
        f64::from(layer.height),
        Axis::Vertical,
    );
    OverlayLayer {
        kind,
        image: layer.path,
        x: x.round() as i64,
        y: y.round() as i64,
        width: layer.width,
        height: layer.height,
        window,
        opacity,
    }
}

fn remove_partial_output(path: &std::path::Path) {
    if path.exists()
        && let Err(err) = fs::remove_file(path)
    {
        emit(
            Level::Warn,
            "mv.render.cleanup",
            &format!("Could not remove partial output {}: {}", path.display(), err),
            None,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::path::Path;
    use tempfile::TempDir;

    struct StubProbe {
        duration: f64,
        dimensions: (u32, u32),
    }

    impl MediaProbe for StubProbe {
        fn audio_duration(&self, _path: &Path) -> anyhow::Result<f64> {
            Ok(self.duration)
        }

        fn image_dimensions(&self, _path: &Path) -> anyhow::Result<(u32, u32)> {
            Ok(self.dimensions)
        }
    }

    #[derive(Default)]
    struct StubLayers {
        texts: RefCell<Vec<String>>,
        fail_on: Option<&'static str>,
    }

    impl LayerRenderer for StubLayers {
        fn render_text(
            &self,
            text: &str,
            _font_size: u32,
            _color: crate::style::Rgb,
            scratch: &mut ScratchFiles,
        ) -> anyhow::Result<RenderedLayer> {
            if self.fail_on == Some(text) {
                anyhow::bail!("font exploded");
            }
            self.texts.borrow_mut().push(text.to_string());
            Ok(RenderedLayer {
                path: scratch.create("stub-text-", ".png")?,
                width: 200,
                height: 40,
            })
        }

        fn scale_image(
            &self,
            _path: &Path,
            target_height: u32,
            scratch: &mut ScratchFiles,
        ) -> anyhow::Result<RenderedLayer> {
            Ok(RenderedLayer {
                path: scratch.create("stub-mark-", ".png")?,
                width: target_height * 2,
                height: target_height,
            })
        }
    }

    #[derive(Default)]
    struct StubRunner {
        fail: bool,
        calls: RefCell<Vec<Vec<String>>>,
    }

    impl FfmpegRunner for StubRunner {
        fn run(&self, args: &[String], _options: FfmpegRunOptions) -> anyhow::Result<()> {
            self.calls.borrow_mut().push(args.to_vec());
            let output = args.last().expect("output argument");
            fs::write(output, b"partial")?;
            if self.fail {
                anyhow::bail!("ffmpeg exited with status Some(1): Conversion failed!");
            }
            Ok(())
        }
    }

    struct Fixture {
        inputs: TempDir,
        scratch: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let inputs = tempfile::tempdir().unwrap();
            for name in ["song.mp3", "a.jpg", "b.jpg", "logo.png"] {
                fs::write(inputs.path().join(name), b"data").unwrap();
            }
            Self {
                inputs,
                scratch: tempfile::tempdir().unwrap(),
            }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.inputs.path().join(name)
        }

        fn request(&self, timeline: &str) -> RenderRequest {
            RenderRequest {
                audio: self.path("song.mp3"),
                images: vec![self.path("a.jpg"), self.path("b.jpg")],
                slide_duration: 3.0,
                text: Some(TextOverlay {
                    content: "My Song".to_string(),
                    font_size: 30,
                    color: "#FFFFFF".to_string(),
                    position: "center,80".to_string(),
                }),
                watermark: Some(WatermarkOverlay {
                    path: self.path("logo.png"),
                    opacity: 0.5,
                    position: "right20,bottom20".to_string(),
                }),
                timeline: timeline.to_string(),
                output: self.path("out/mv.mp4"),
            }
        }

        fn scratch_is_empty(&self) -> bool {
            fs::read_dir(self.scratch.path()).unwrap().next().is_none()
        }
    }

    const TIMELINE: &str = "1.0,hello,2.5,36,#FFFFFF,center,bottom100\n4.0,world,6.0,36,#FFFFFF,left10,top10";

    fn probe() -> StubProbe {
        StubProbe {
            duration: 10.0,
            dimensions: (1280, 720),
        }
    }

    fn compositor<'a>(
        fixture: &Fixture,
        probe: &'a StubProbe,
        layers: &'a StubLayers,
        runner: &'a StubRunner,
    ) -> Compositor<'a> {
        Compositor::new(probe, layers, runner).with_scratch_dir(fixture.scratch.path())
    }

    #[test]
    fn compose_records_artifact_and_cleans_scratch() {
        let fixture = Fixture::new();
        fs::create_dir_all(fixture.path("out")).unwrap();
        let (probe, layers, runner) = (probe(), StubLayers::default(), StubRunner::default());
        let mut session = RenderSession::default();

        let artifact = compositor(&fixture, &probe, &layers, &runner)
            .compose(&fixture.request(TIMELINE), &mut session)
            .unwrap();

        assert_eq!(artifact.path, fixture.path("out/mv.mp4"));
        assert_eq!(artifact.duration, 10.0);
        assert_eq!(artifact.slide_count, 2);
        assert_eq!(artifact.overlay_count, 4);
        assert_eq!(artifact.subtitle_count, 2);
        assert_eq!(session.last_artifact().unwrap(), &artifact);
        assert_eq!(*layers.texts.borrow(), vec!["My Song", "hello", "world"]);
        assert_eq!(runner.calls.borrow().len(), 1);
        assert!(fixture.scratch_is_empty());
    }

    #[test]
    fn layers_are_positioned_against_canvas_and_rendered_size() {
        let fixture = Fixture::new();
        let (probe, layers, runner) = (probe(), StubLayers::default(), StubRunner::default());

        let prepared = compositor(&fixture, &probe, &layers, &runner)
            .dry_run(&fixture.request(TIMELINE))
            .unwrap();
        let overlays = &prepared.plan.overlays;

        // text 200x40 at center,80
        assert_eq!((overlays[0].x, overlays[0].y), (540, 80));
        // watermark scaled to 160x80 at right20,bottom20
        assert_eq!(overlays[1].kind, LayerKind::Watermark);
        assert_eq!((overlays[1].width, overlays[1].height), (160, 80));
        assert_eq!((overlays[1].x, overlays[1].y), (1100, 620));
        assert_eq!(overlays[1].opacity, 0.5);
        // subtitles
        assert_eq!((overlays[2].x, overlays[2].y), (540, 580));
        assert_eq!(overlays[2].window, TimeWindow::new(1.0, 2.5));
        assert_eq!((overlays[3].x, overlays[3].y), (10, 10));

        assert!(runner.calls.borrow().is_empty());
        assert!(fixture.scratch_is_empty());
    }

    #[test]
    fn subtitles_are_clipped_or_dropped_at_audio_end() {
        let fixture = Fixture::new();
        let (probe, layers, runner) = (probe(), StubLayers::default(), StubRunner::default());
        let timeline = "8.0,tail,12.0,36,#FFFFFF,center,bottom100\n10.0,late,11.0,36,#FFFFFF,center,bottom100";

        let prepared = compositor(&fixture, &probe, &layers, &runner)
            .dry_run(&fixture.request(timeline))
            .unwrap();

        assert_eq!(prepared.plan.subtitle_count(), 1);
        let last = prepared.plan.overlays.last().unwrap();
        assert_eq!(last.window, TimeWindow::new(8.0, 10.0));
        assert!(!layers.texts.borrow().iter().any(|t| t == "late"));
    }

    #[test]
    fn encoding_failure_cleans_up_and_keeps_session() {
        let fixture = Fixture::new();
        let (probe, layers) = (probe(), StubLayers::default());
        let runner = StubRunner {
            fail: true,
            ..Default::default()
        };
        let mut session = RenderSession::default();
        let request = fixture.request(TIMELINE);
        fs::create_dir_all(fixture.path("out")).unwrap();

        let err = compositor(&fixture, &probe, &layers, &runner)
            .compose(&request, &mut session)
            .unwrap_err();

        assert!(matches!(err, MvError::Encoding(_)));
        assert!(err.to_string().contains("Conversion failed!"));
        assert!(!request.output.exists());
        assert!(fixture.scratch_is_empty());
        assert!(session.last_artifact().is_err());
    }

    #[test]
    fn layer_failure_is_an_encoding_error_without_running_ffmpeg() {
        let fixture = Fixture::new();
        let probe = probe();
        let layers = StubLayers {
            fail_on: Some("world"),
            ..Default::default()
        };
        let runner = StubRunner::default();
        let mut session = RenderSession::default();

        let err = compositor(&fixture, &probe, &layers, &runner)
            .compose(&fixture.request(TIMELINE), &mut session)
            .unwrap_err();

        assert!(matches!(err, MvError::Encoding(_)));
        assert!(err.to_string().contains("font exploded"));
        assert!(runner.calls.borrow().is_empty());
        assert!(fixture.scratch_is_empty());
    }

    #[test]
    fn validation_errors_stop_before_rendering() {
        let fixture = Fixture::new();
        let (probe, layers, runner) = (probe(), StubLayers::default(), StubRunner::default());
        let compositor = compositor(&fixture, &probe, &layers, &runner);
        let mut session = RenderSession::default();

        let mut request = fixture.request(TIMELINE);
        request.audio = fixture.path("missing.mp3");
        assert!(matches!(
            compositor.compose(&request, &mut session),
            Err(MvError::MissingInput { what: "Audio file", .. })
        ));

        let mut request = fixture.request(TIMELINE);
        request.images.clear();
        assert!(matches!(
            compositor.compose(&request, &mut session),
            Err(MvError::Precondition(_))
        ));

        let mut request = fixture.request(TIMELINE);
        request.images.push(fixture.path("c.jpg"));
        assert!(matches!(
            compositor.compose(&request, &mut session),
            Err(MvError::MissingInput { what: "Background image", .. })
        ));

        let mut request = fixture.request(TIMELINE);
        if let Some(watermark) = request.watermark.as_mut() {
            watermark.path = fixture.path("nope.png");
        }
        assert!(matches!(
            compositor.compose(&request, &mut session),
            Err(MvError::MissingInput { what: "Watermark image", .. })
        ));

        let mut request = fixture.request(TIMELINE);
        if let Some(text) = request.text.as_mut() {
            text.font_size = 0;
        }
        assert!(matches!(
            compositor.compose(&request, &mut session),
            Err(MvError::InvalidParameter(message)) if message.contains("text size")
        ));

        let request = fixture.request("0.0,ok,1.0,36,#FFFFFF,center,bottom100\nsoon,bad,2.0,36,#FFFFFF,center,bottom100");
        assert!(matches!(
            compositor.compose(&request, &mut session),
            Err(MvError::LineParse { line: 2, .. })
        ));

        assert!(layers.texts.borrow().is_empty());
        assert!(runner.calls.borrow().is_empty());
    }

    #[test]
    fn blank_text_and_no_watermark_add_no_layers() {
        let fixture = Fixture::new();
        let (probe, layers, runner) = (probe(), StubLayers::default(), StubRunner::default());
        let mut request = fixture.request("");
        if let Some(text) = request.text.as_mut() {
            text.content = "   ".to_string();
        }
        request.watermark = None;

        let prepared = compositor(&fixture, &probe, &layers, &runner)
            .dry_run(&request)
            .unwrap();
        assert!(prepared.plan.overlays.is_empty());
        assert_eq!(prepared.plan.slides.len(), 2);
        assert!(prepared.args.iter().any(|arg| arg == "2:a:0"));
    }
}
