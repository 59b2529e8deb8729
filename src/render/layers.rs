//! Rasterised overlay layers: text images and the scaled watermark.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::{Context, Result, bail};
use image::imageops::FilterType;
use image::{GenericImageView, RgbaImage};

use super::ffmpeg::escape_ffmpeg_path;
use super::scratch::ScratchFiles;
use crate::style::Rgb;
use crate::support::ffmpeg::ffmpeg_binary;
use crate::ui::prelude::*;

const MIN_CANVAS_SIDE: u32 = 16;
const MAX_CANVAS_SIDE: u32 = 8192;

/// A PNG on disk and its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLayer {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

pub trait LayerRenderer {
    /// Rasterises `text` onto a transparent image cropped to the glyphs.
    fn render_text(
        &self,
        text: &str,
        font_size: u32,
        color: Rgb,
        scratch: &mut ScratchFiles,
    ) -> Result<RenderedLayer>;

    /// Resizes an image to `target_height`, keeping its aspect ratio.
    fn scale_image(
        &self,
        path: &Path,
        target_height: u32,
        scratch: &mut ScratchFiles,
    ) -> Result<RenderedLayer>;
}

/// Draws text with ffmpeg's `drawtext` and post-processes with `image`.
#[derive(Debug, Clone, Default)]
pub struct FfmpegLayerRenderer {
    font: Option<PathBuf>,
}

impl FfmpegLayerRenderer {
    pub fn new(font: Option<PathBuf>) -> Self {
        Self { font }
    }

    /// Uses the first candidate font that exists, or ffmpeg's default font.
    pub fn with_font_candidates(candidates: &[PathBuf]) -> Self {
        Self::new(find_font(candidates))
    }

    pub fn font(&self) -> Option<&Path> {
        self.font.as_deref()
    }

    fn drawtext_filter(&self, text_file: &Path, font_size: u32, color: Rgb) -> String {
        let mut filter = String::from("drawtext=expansion=none:");
        if let Some(font) = &self.font {
            filter.push_str(&format!("fontfile='{}':", escape_ffmpeg_path(font)));
        }
        let margin = font_size / 2;
        filter.push_str(&format!(
            "textfile='{}':fontsize={}:fontcolor={}:x={}:y={}",
            escape_ffmpeg_path(text_file),
            font_size,
            color.to_ffmpeg(),
            margin,
            margin
        ));
        filter
    }
}

impl LayerRenderer for FfmpegLayerRenderer {
    fn render_text(
        &self,
        text: &str,
        font_size: u32,
        color: Rgb,
        scratch: &mut ScratchFiles,
    ) -> Result<RenderedLayer> {
        let text_file = scratch.create("lyricmv-text-", ".txt")?;
        fs::write(&text_file, text)
            .with_context(|| format!("Failed to write text to {}", text_file.display()))?;
        let image_path = scratch.create("lyricmv-text-", ".png")?;

        let (width, height, cropped) = text_canvas_size(text, font_size);
        if cropped {
            emit(
                Level::Warn,
                "mv.render.text_cropped",
                &format!(
                    "Text '{}' at {}px does not fit in {}x{}; it will be cropped",
                    text, font_size, MAX_CANVAS_SIDE, MAX_CANVAS_SIDE
                ),
                None,
            );
        }
        let output = Command::new(ffmpeg_binary()?)
            .args(["-nostdin", "-v", "error", "-y", "-f", "lavfi", "-i"])
            .arg(format!("color=c=black@0.0:s={width}x{height},format=rgba"))
            .arg("-vf")
            .arg(self.drawtext_filter(&text_file, font_size, color))
            .args(["-frames:v", "1"])
            .arg(&image_path)
            .output()
            .with_context(|| "Failed to spawn ffmpeg")?;

        if !output.status.success() {
            bail!(
                "ffmpeg could not draw text '{}': {}",
                text,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let canvas = image::open(&image_path)
            .with_context(|| format!("Failed to read rendered text {}", image_path.display()))?
            .to_rgba8();
        let trimmed = trim_transparent(&canvas);
        trimmed
            .save(&image_path)
            .with_context(|| format!("Failed to write {}", image_path.display()))?;

        Ok(RenderedLayer {
            path: image_path,
            width: trimmed.width(),
            height: trimmed.height(),
        })
    }

    fn scale_image(
        &self,
        path: &Path,
        target_height: u32,
        scratch: &mut ScratchFiles,
    ) -> Result<RenderedLayer> {
        let source = image::open(path)
            .with_context(|| format!("Failed to open image {}", path.display()))?;
        let (width, height) = scaled_size(source.dimensions(), target_height);
        let scaled = source.resize_exact(width, height, FilterType::Lanczos3);

        let output = scratch.create("lyricmv-watermark-", ".png")?;
        scaled
            .to_rgba8()
            .save(&output)
            .with_context(|| format!("Failed to write {}", output.display()))?;

        Ok(RenderedLayer {
            path: output,
            width,
            height,
        })
    }
}

pub fn find_font(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates.iter().find(|path| path.is_file()).cloned()
}

/// Generous canvas for one block of text; trimmed afterwards. The flag is set
/// when the text needs more than [`MAX_CANVAS_SIDE`] in either direction.
fn text_canvas_size(text: &str, font_size: u32) -> (u32, u32, bool) {
    let lines = text.lines().count().max(1) as u32;
    let longest = text
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0) as u32;
    let wanted_width = font_size.saturating_mul(longest.saturating_add(2));
    let wanted_height = font_size.saturating_mul(lines.saturating_mul(2).saturating_add(1));
    let cropped = wanted_width > MAX_CANVAS_SIDE || wanted_height > MAX_CANVAS_SIDE;
    (
        wanted_width.clamp(MIN_CANVAS_SIDE, MAX_CANVAS_SIDE),
        wanted_height.clamp(MIN_CANVAS_SIDE, MAX_CANVAS_SIDE),
        cropped,
    )
}

fn scaled_size((width, height): (u32, u32), target_height: u32) -> (u32, u32) {
    let target_height = target_height.max(1);
    if height == 0 {
        return (width.max(1), target_height);
    }
    let scaled_width = (f64::from(width) * f64::from(target_height) / f64::from(height)).round();
    ((scaled_width as u32).max(1), target_height)
}

/// Crops to the bounding box of non-transparent pixels. A fully transparent
/// image becomes a single transparent pixel.
fn trim_transparent(image: &RgbaImage) -> RgbaImage {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    for (x, y, pixel) in image.enumerate_pixels() {
        if pixel[3] == 0 {
            continue;
        }
        bounds = Some(match bounds {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        });
    }

    match bounds {
        Some((x0, y0, x1, y1)) => {
            image::imageops::crop_imm(image, x0, y0, x1 - x0 + 1, y1 - y0 + 1).to_image()
        }
        None => RgbaImage::new(1, 1),
    }
}
