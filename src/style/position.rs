//! Position specs such as `center`, `bottom100`, `right20` or a bare `240`.
//!
//! A spec is split into a leading keyword and a trailing integer offset. The
//! keyword picks the edge the offset is measured from; anything unrecognised
//! measures from the origin of the axis.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Center,
    Left,
    Right,
    Top,
    Bottom,
    /// Keyword that is not part of the grammar; behaves like `left`/`top`.
    Unknown,
}

impl Anchor {
    fn from_keyword(keyword: &str) -> Self {
        match keyword {
            "center" => Anchor::Center,
            "left" => Anchor::Left,
            "right" => Anchor::Right,
            "top" => Anchor::Top,
            "bottom" => Anchor::Bottom,
            _ => Anchor::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionSpec {
    /// Bare integer: an absolute pixel coordinate.
    Absolute(u64),
    Anchored { anchor: Anchor, offset: u64 },
}

impl PositionSpec {
    /// Parses a spec. Never fails; malformed offsets read as 0.
    pub fn parse(spec: &str) -> Self {
        let spec = spec.trim().to_lowercase();

        if !spec.is_empty() && spec.chars().all(|c| c.is_ascii_digit()) {
            return PositionSpec::Absolute(spec.parse().unwrap_or(0));
        }

        let (keyword, offset) = match spec.find(|c: char| c.is_ascii_digit()) {
            Some(idx) => (&spec[..idx], spec[idx..].parse().unwrap_or(0)),
            None => (spec.as_str(), 0),
        };

        PositionSpec::Anchored {
            anchor: Anchor::from_keyword(keyword),
            offset,
        }
    }

    /// Top-left coordinate of an element of `element_size` inside `base_size`.
    pub fn resolve(&self, base_size: f64, element_size: f64, axis: Axis) -> f64 {
        let (anchor, offset) = match *self {
            PositionSpec::Absolute(value) => return value as f64,
            PositionSpec::Anchored { anchor, offset } => (anchor, offset as f64),
        };

        match (anchor, axis) {
            (Anchor::Center, _) => base_size / 2.0 - element_size / 2.0,
            (Anchor::Right, Axis::Horizontal) | (Anchor::Bottom, Axis::Vertical) => {
                base_size - offset - element_size
            }
            _ => offset,
        }
    }
}

impl fmt::Display for PositionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PositionSpec::Absolute(value) => write!(f, "{value}"),
            PositionSpec::Anchored { anchor, offset } => {
                let keyword = match anchor {
                    Anchor::Center => "center",
                    Anchor::Left => "left",
                    Anchor::Right => "right",
                    Anchor::Top => "top",
                    Anchor::Bottom => "bottom",
                    Anchor::Unknown => "",
                };
                write!(f, "{keyword}{offset}")
            }
        }
    }
}

/// Resolves `spec` on one axis. See [`PositionSpec::resolve`].
pub fn resolve(spec: &str, base_size: f64, element_size: f64, axis: Axis) -> f64 {
    PositionSpec::parse(spec).resolve(base_size, element_size, axis)
}

/// Splits a combined `x,y` position such as `center,80`.
///
/// Without a comma the whole spec is the horizontal part and the vertical
/// part is `"0"`.
pub fn split_pair(spec: &str) -> (String, String) {
    match spec.split_once(',') {
        Some((x, y)) => (x.trim().to_string(), y.trim().to_string()),
        None => (spec.trim().to_string(), "0".to_string()),
    }
}

/// Whether an absolute coordinate falls outside `base_size`.
pub fn is_out_of_bounds(spec: &str, base_size: u32) -> bool {
    matches!(PositionSpec::parse(spec), PositionSpec::Absolute(v) if v > u64::from(base_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_exact_on_both_axes() {
        for (base, element) in [(1920.0, 300.0), (1080.0, 37.0), (101.0, 0.0), (50.0, 80.0)] {
            let expected = base / 2.0 - element / 2.0;
            assert_eq!(resolve("center", base, element, Axis::Horizontal), expected);
            assert_eq!(resolve("center", base, element, Axis::Vertical), expected);
        }
    }

    #[test]
    fn center_ignores_offset() {
        assert_eq!(resolve("center40", 1000.0, 200.0, Axis::Horizontal), 400.0);
    }

    #[test]
    fn far_edges_subtract_offset_and_element() {
        assert_eq!(resolve("right20", 1920.0, 160.0, Axis::Horizontal), 1740.0);
        assert_eq!(resolve("bottom100", 1080.0, 48.0, Axis::Vertical), 932.0);
    }

    #[test]
    fn near_edges_are_the_offset() {
        assert_eq!(resolve("left15", 1920.0, 160.0, Axis::Horizontal), 15.0);
        assert_eq!(resolve("top80", 1080.0, 48.0, Axis::Vertical), 80.0);
        assert_eq!(resolve("left", 1920.0, 160.0, Axis::Horizontal), 0.0);
    }

    #[test]
    fn bare_integer_is_absolute() {
        assert_eq!(resolve("240", 1920.0, 160.0, Axis::Horizontal), 240.0);
        assert_eq!(resolve(" 80 ", 1080.0, 48.0, Axis::Vertical), 80.0);
    }

    #[test]
    fn wrong_axis_keywords_fall_back_to_origin_offset() {
        assert_eq!(resolve("bottom30", 1920.0, 160.0, Axis::Horizontal), 30.0);
        assert_eq!(resolve("right30", 1080.0, 48.0, Axis::Vertical), 30.0);
        assert_eq!(resolve("middle12", 1080.0, 48.0, Axis::Vertical), 12.0);
    }

    #[test]
    fn keywords_are_case_insensitive() {
        assert_eq!(resolve("Bottom100", 1080.0, 48.0, Axis::Vertical), 932.0);
        assert_eq!(resolve("CENTER", 100.0, 20.0, Axis::Vertical), 40.0);
    }

    #[test]
    fn garbage_offsets_read_as_zero() {
        assert_eq!(
            PositionSpec::parse("right2x"),
            PositionSpec::Anchored {
                anchor: Anchor::Right,
                offset: 0
            }
        );
        assert_eq!(resolve("", 1000.0, 100.0, Axis::Horizontal), 0.0);
    }

    #[test]
    fn split_pair_defaults_vertical_to_zero() {
        assert_eq!(
            split_pair("center,80"),
            ("center".to_string(), "80".to_string())
        );
        assert_eq!(
            split_pair("right20, bottom20"),
            ("right20".to_string(), "bottom20".to_string())
        );
        assert_eq!(split_pair("left10"), ("left10".to_string(), "0".to_string()));
    }

    #[test]
    fn display_round_trips_known_keywords() {
        for spec in ["center0", "bottom100", "right20", "640"] {
            assert_eq!(PositionSpec::parse(spec).to_string(), spec);
        }
    }

    #[test]
    fn out_of_bounds_only_applies_to_absolute() {
        assert!(is_out_of_bounds("2000", 1920));
        assert!(!is_out_of_bounds("1900", 1920));
        assert!(!is_out_of_bounds("right5000", 1920));
    }
}
