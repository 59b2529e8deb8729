use std::fmt;

use serde::Serialize;

use crate::style::Rgb;
use crate::support::time::format_seconds;

pub const DEFAULT_FONT_SIZE: u32 = 36;
pub const DEFAULT_COLOR: &str = "#FFFFFF";
pub const DEFAULT_POS_X: &str = "center";
pub const DEFAULT_POS_Y: &str = "bottom100";
pub const MIN_FONT_SIZE: u32 = 10;
pub const MAX_FONT_SIZE: u32 = 100;
/// Shortest on-screen time of a subtitle.
pub const MIN_SUBTITLE_SECONDS: f64 = 0.5;

/// One line of timeline text:
/// `start,content,end,font_size,color,pos_x,pos_y`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub start: f64,
    pub content: String,
    pub end: f64,
    pub font_size: u32,
    pub color: String,
    pub pos_x: String,
    pub pos_y: String,
}

impl TimelineEntry {
    /// Entry with the default style: 36px white text, centred, 100px from the bottom.
    pub fn with_default_style(start: f64, content: impl Into<String>, end: f64) -> Self {
        Self {
            start,
            content: content.into(),
            end,
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_COLOR.to_string(),
            pos_x: DEFAULT_POS_X.to_string(),
            pos_y: DEFAULT_POS_Y.to_string(),
        }
    }
}

impl fmt::Display for TimelineEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{},{},{},{}",
            format_seconds(self.start),
            self.content,
            format_seconds(self.end),
            self.font_size,
            self.color,
            self.pos_x,
            self.pos_y
        )
    }
}

/// Joins entries into timeline text, one per line.
pub fn to_timeline_text(entries: &[TimelineEntry]) -> String {
    entries
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// A validated subtitle, ready to be laid out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleRecord {
    pub start: f64,
    pub end: f64,
    pub content: String,
    pub font_size: u32,
    pub color: Rgb,
    pub pos_x: String,
    pub pos_y: String,
}

impl SubtitleRecord {
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    pub fn to_entry(&self) -> TimelineEntry {
        TimelineEntry {
            start: self.start,
            content: self.content.clone(),
            end: self.end,
            font_size: self.font_size,
            color: self.color.to_hex(),
            pos_x: self.pos_x.clone(),
            pos_y: self.pos_y.clone(),
        }
    }

    pub fn to_timeline_line(&self) -> String {
        self.to_entry().to_string()
    }
}
