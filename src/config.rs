use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::audio::vad::{DEFAULT_MERGE_GAP, DEFAULT_MIN_DURATION, DEFAULT_THRESHOLD};
use crate::common::paths;
use crate::render::ffmpeg::EncodeSettings;
use crate::render::slideshow::DEFAULT_SLIDE_SECONDS;
use crate::render::DEFAULT_WATERMARK_HEIGHT;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MvConfig {
    /// RMS level above which a frame counts as voiced (0-1, exclusive)
    pub threshold: f64,
    /// Shortest voiced run kept, in seconds
    pub min_duration: f64,
    /// Voiced runs closer than this are merged, in seconds
    pub merge_gap: f64,
    /// Shift applied to every matched subtitle start
    pub start_offset: f64,
    /// Shift applied to every matched subtitle end
    pub end_offset: f64,
    /// Longest time one background image stays on screen
    pub slide_duration: f64,
    pub fps: u32,
    pub video_codec: String,
    pub audio_codec: String,
    pub threads: u32,
    pub text_size: u32,
    pub text_color: String,
    pub text_position: String,
    pub watermark_opacity: f64,
    pub watermark_height: u32,
    pub watermark_position: String,
    /// Candidate fonts for drawn text; the first existing file wins
    pub font_paths: Vec<PathBuf>,
    /// Where rendered videos go when no output path is given
    pub output_dir: Option<PathBuf>,
}

impl Default for MvConfig {
    fn default() -> Self {
        let encode = EncodeSettings::default();
        Self {
            threshold: DEFAULT_THRESHOLD,
            min_duration: DEFAULT_MIN_DURATION,
            merge_gap: DEFAULT_MERGE_GAP,
            start_offset: 0.0,
            end_offset: 0.0,
            slide_duration: DEFAULT_SLIDE_SECONDS,
            fps: encode.fps,
            video_codec: encode.video_codec,
            audio_codec: encode.audio_codec,
            threads: encode.threads,
            text_size: Self::DEFAULT_TEXT_SIZE,
            text_color: "#FFFFFF".to_string(),
            text_position: "center,80".to_string(),
            watermark_opacity: Self::DEFAULT_WATERMARK_OPACITY,
            watermark_height: DEFAULT_WATERMARK_HEIGHT,
            watermark_position: "right20,bottom20".to_string(),
            font_paths: default_font_paths(),
            output_dir: None,
        }
    }
}

fn default_font_paths() -> Vec<PathBuf> {
    [
        "/usr/share/fonts/noto-cjk/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/Library/Fonts/Arial.ttf",
        "C:/Windows/Fonts/msyh.ttc",
        "C:/Windows/Fonts/simhei.ttf",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}

impl MvConfig {
    pub const DEFAULT_TEXT_SIZE: u32 = 30;
    pub const DEFAULT_WATERMARK_OPACITY: f64 = 0.5;

    pub fn load() -> Result<Self> {
        Self::load_from_path(paths::config_path()?)
    }

    /// Loads the config, writing defaults when the file does not exist yet.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading lyricmv config from {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents).context("parsing lyricmv config")?;
        config.sanitize();
        Ok(config)
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing lyricmv config")?;
        fs::write(path, toml)
            .with_context(|| format!("writing lyricmv config to {}", path.display()))?;
        Ok(())
    }

    /// Puts out-of-range values back to their defaults.
    fn sanitize(&mut self) {
        let defaults = Self::default();

        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            self.threshold = defaults.threshold;
        }
        if !(self.min_duration.is_finite() && self.min_duration > 0.0) {
            self.min_duration = defaults.min_duration;
        }
        if !(self.merge_gap.is_finite() && self.merge_gap >= 0.0) {
            self.merge_gap = defaults.merge_gap;
        }
        if !self.start_offset.is_finite() {
            self.start_offset = 0.0;
        }
        if !self.end_offset.is_finite() {
            self.end_offset = 0.0;
        }
        if !(self.slide_duration.is_finite() && self.slide_duration > 0.0) {
            self.slide_duration = defaults.slide_duration;
        }
        if self.fps == 0 {
            self.fps = defaults.fps;
        }
        if self.threads == 0 {
            self.threads = defaults.threads;
        }
        if !(10..=100).contains(&self.text_size) {
            self.text_size = defaults.text_size;
        }
        if !(0.0..=1.0).contains(&self.watermark_opacity) {
            self.watermark_opacity = defaults.watermark_opacity;
        }
        if self.watermark_height == 0 {
            self.watermark_height = defaults.watermark_height;
        }
        if self.video_codec.trim().is_empty() {
            self.video_codec = defaults.video_codec;
        }
        if self.audio_codec.trim().is_empty() {
            self.audio_codec = defaults.audio_codec;
        }
    }

    pub fn encode_settings(&self) -> EncodeSettings {
        EncodeSettings {
            fps: self.fps,
            video_codec: self.video_codec.clone(),
            audio_codec: self.audio_codec.clone(),
            threads: self.threads,
        }
    }

    pub fn output_dir(&self) -> Result<PathBuf> {
        match &self.output_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::default_output_dir(),
        }
    }
}
