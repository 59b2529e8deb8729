use std::path::PathBuf;

use serde::Serialize;

use super::slideshow::SlideAllocation;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeWindow {
    pub start: f64,
    pub end: f64,
}

impl TimeWindow {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    #[cfg(test)]
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Half-open containment: `start <= t < end`.
    #[cfg(test)]
    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t < self.end
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Canvas {
    pub width: u32,
    pub height: u32,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum LayerKind {
    Text,
    Watermark,
    /// Index into the parsed subtitle records.
    Subtitle { index: usize },
}

/// One image composited over the slideshow while its window is active.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverlayLayer {
    pub kind: LayerKind,
    pub image: PathBuf,
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
    pub window: TimeWindow,
    pub opacity: f64,
}

/// Everything the encoder needs, in back-to-front order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan {
    pub canvas: Canvas,
    pub total_duration: f64,
    pub slides: Vec<SlideAllocation>,
    pub overlays: Vec<OverlayLayer>,
}

impl RenderPlan {
    pub fn subtitle_count(&self) -> usize {
        self.overlays
            .iter()
            .filter(|layer| matches!(layer.kind, LayerKind::Subtitle { .. }))
            .count()
    }

    /// Overlays visible at `t`, back to front.
    #[cfg(test)]
    pub fn overlays_at(&self, t: f64) -> Vec<&OverlayLayer> {
        self.overlays
            .iter()
            .filter(|layer| layer.window.contains(t))
            .collect()
    }
}
