//! Color specs: a named color, `#RRGGBB`, `rgb(r,g,b)`, or white.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub const WHITE: Rgb = Rgb(255, 255, 255);

    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }

    /// Color literal in the form ffmpeg's `drawtext` expects.
    pub fn to_ffmpeg(self) -> String {
        format!("0x{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.0, self.1, self.2)
    }
}

/// Outcome of resolving a color spec; every branch is a legitimate result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorResolution {
    Named(Rgb),
    Hex(Rgb),
    Rgb(Rgb),
    /// Nothing matched; renders as white.
    Fallback,
}

impl ColorResolution {
    pub fn rgb(self) -> Rgb {
        match self {
            ColorResolution::Named(c) | ColorResolution::Hex(c) | ColorResolution::Rgb(c) => c,
            ColorResolution::Fallback => Rgb::WHITE,
        }
    }

    pub fn is_fallback(self) -> bool {
        matches!(self, ColorResolution::Fallback)
    }
}

const NAMED_COLORS: &[(&str, Rgb)] = &[
    ("white", Rgb(255, 255, 255)),
    ("black", Rgb(0, 0, 0)),
    ("red", Rgb(255, 0, 0)),
    ("green", Rgb(0, 255, 0)),
    ("blue", Rgb(0, 0, 255)),
    ("yellow", Rgb(255, 255, 0)),
    ("orange", Rgb(255, 165, 0)),
    ("purple", Rgb(128, 0, 128)),
    ("gray", Rgb(128, 128, 128)),
];

pub fn resolve_detailed(spec: &str) -> ColorResolution {
    let spec = spec.trim().to_lowercase();

    if let Some((_, rgb)) = NAMED_COLORS.iter().find(|(name, _)| *name == spec) {
        return ColorResolution::Named(*rgb);
    }

    if let Some(rgb) = parse_hex(&spec) {
        return ColorResolution::Hex(rgb);
    }

    if let Some(rgb) = parse_rgb_function(&spec) {
        return ColorResolution::Rgb(rgb);
    }

    ColorResolution::Fallback
}

/// Resolves a color spec, falling back to white.
pub fn resolve(spec: &str) -> Rgb {
    resolve_detailed(spec).rgb()
}

fn parse_hex(spec: &str) -> Option<Rgb> {
    let hex = spec.strip_prefix('#').unwrap_or(spec);
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    Some(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
}

fn parse_rgb_function(spec: &str) -> Option<Rgb> {
    let re = Regex::new(r"^rgb\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)\s*\)$").ok()?;
    let caps = re.captures(spec)?;
    let r: u8 = caps.get(1)?.as_str().parse().ok()?;
    let g: u8 = caps.get(2)?.as_str().parse().ok()?;
    let b: u8 = caps.get(3)?.as_str().parse().ok()?;
    Some(Rgb(r, g, b))
}
