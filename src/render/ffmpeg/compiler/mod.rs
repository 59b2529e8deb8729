mod util;


use std::path::Path;

use anyhow::{Result, bail};

use crate::render::plan::{OverlayLayer, RenderPlan};
use crate::render::slideshow::SlideAllocation;

pub use self::util::{escape_ffmpeg_path, format_command, format_time};

#[derive(Debug, Clone)]
pub struct FfmpegCompileOutput {
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FilterChain {
    filters: Vec<String>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: String) {
        self.filters.push(filter);
    }

    pub fn join(&self) -> String {
        self.filters.join("; ")
    }
}

/// Fixed output profile: H.264 + AAC in MP4.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub threads: u32,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self {
            fps: 15,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
            threads: 4,
        }
    }
}

/// Turns a [`RenderPlan`] into one ffmpeg invocation.
///
/// Input order is slides, then overlays, then the audio track. Slides are
/// normalised to the canvas and concatenated into `[base]`; overlays are
/// stacked on top in plan order, each gated by its time window.
pub struct FfmpegCompiler {
    settings: EncodeSettings,
}

impl FfmpegCompiler {
    pub fn new(settings: EncodeSettings) -> Self {
        Self { settings }
    }

    pub fn compile(
        &self,
        plan: &RenderPlan,
        audio: &Path,
        output: &Path,
    ) -> Result<FfmpegCompileOutput> {
        if plan.slides.is_empty() {
            bail!("render plan has no background slides");
        }

        let mut args = vec!["-y".to_string()];
        self.push_inputs(&mut args, plan, audio);
        let audio_index = plan.slides.len() + plan.overlays.len();

        args.push("-filter_complex".to_string());
        args.push(self.build_filter_complex(plan));

        args.extend([
            "-map".to_string(),
            "[outv]".to_string(),
            "-map".to_string(),
            format!("{audio_index}:a:0"),
        ]);
        self.push_encoding_args(&mut args, plan.total_duration);
        args.push(output.to_string_lossy().into_owned());

        Ok(FfmpegCompileOutput { args })
    }

    fn push_inputs(&self, args: &mut Vec<String>, plan: &RenderPlan, audio: &Path) {
        for slide in &plan.slides {
            args.extend([
                "-loop".to_string(),
                "1".to_string(),
                "-framerate".to_string(),
                self.settings.fps.to_string(),
                "-t".to_string(),
                format_time(slide.duration + 1.0 / f64::from(self.settings.fps)),
                "-i".to_string(),
                slide.image.to_string_lossy().into_owned(),
            ]);
        }
        for overlay in &plan.overlays {
            args.push("-i".to_string());
            args.push(overlay.image.to_string_lossy().into_owned());
        }
        args.push("-i".to_string());
        args.push(audio.to_string_lossy().into_owned());
    }

    fn build_filter_complex(&self, plan: &RenderPlan) -> String {
        let mut filters = FilterChain::new();

        let mut concat_inputs = String::new();
        for (idx, slide) in plan.slides.iter().enumerate() {
            filters.push(self.build_slide_filter(idx, slide, plan));
            concat_inputs.push_str(&format!("[s{idx}]"));
        }
        filters.push(format!(
            "{inputs}concat=n={count}:v=1:a=0[base]",
            inputs = concat_inputs,
            count = plan.slides.len()
        ));

        let mut current = "base".to_string();
        for (idx, overlay) in plan.overlays.iter().enumerate() {
            let input_index = plan.slides.len() + idx;
            current = self.apply_overlay(&mut filters, &current, input_index, idx, overlay);
        }

        filters.push(format!("[{current}]format=yuv420p[outv]"));
        filters.join()
    }

    fn build_slide_filter(
        &self,
        idx: usize,
        slide: &SlideAllocation,
        plan: &RenderPlan,
    ) -> String {
        let (width, height) = (plan.canvas.width, plan.canvas.height);
        format!(
            "[{idx}:v]scale={width}:{height}:force_original_aspect_ratio=decrease:flags=lanczos,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:color=black,setsar=1,fps={fps},format=yuv420p,trim=end_frame={frames},setpts=PTS-STARTPTS[s{idx}]",
            fps = self.settings.fps,
            frames = self.slide_frames(slide),
        )
    }

    /// Frames for one slide, taken from its start and end on the shared frame
    /// grid so rounding never accumulates across slides. Inputs loop one frame
    /// past their allocation so the count is always available.
    fn slide_frames(&self, slide: &SlideAllocation) -> u64 {
        let fps = f64::from(self.settings.fps);
        let first = (slide.start * fps).round() as u64;
        let last = (slide.end() * fps).round() as u64;
        last.saturating_sub(first).max(1)
    }

    fn apply_overlay(
        &self,
        filters: &mut FilterChain,
        base_label: &str,
        input_index: usize,
        idx: usize,
        overlay: &OverlayLayer,
    ) -> String {
        let layer_label = format!("ol{idx}");
        let output_label = format!("ov{idx}");

        let mut prepare = format!("[{input_index}:v]format=rgba");
        if overlay.opacity < 1.0 {
            prepare.push_str(&format!(
                ",colorchannelmixer=aa={}",
                overlay.opacity.clamp(0.0, 1.0)
            ));
        }
        prepare.push_str(&format!("[{layer_label}]"));
        filters.push(prepare);

        filters.push(format!(
            "[{base}][{layer}]overlay=x={x}:y={y}:enable='gte(t,{start})*lt(t,{end})'[{out}]",
            base = base_label,
            layer = layer_label,
            x = overlay.x,
            y = overlay.y,
            start = format_time(overlay.window.start),
            end = format_time(overlay.window.end),
            out = output_label,
        ));

        output_label
    }

    fn push_encoding_args(&self, args: &mut Vec<String>, total_duration: f64) {
        args.extend([
            "-c:v".to_string(),
            self.settings.video_codec.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            self.settings.fps.to_string(),
            "-c:a".to_string(),
            self.settings.audio_codec.clone(),
            "-threads".to_string(),
            self.settings.threads.to_string(),
            "-movflags".to_string(),
            "+faststart".to_string(),
            "-t".to_string(),
            format_time(total_duration),
        ]);
    }
}
