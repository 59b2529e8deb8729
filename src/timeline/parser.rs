//! Timeline text parsing.
//!
//! Fields are read from the right: the first token is the start time and the
//! last five are `end,font_size,color,pos_x,pos_y`. Everything in between is
//! the subtitle content, so content may contain commas. Content that itself
//! ends in five style-like tokens cannot be told apart from a shorter line;
//! the rightmost five tokens always win.

use super::entry::{
    DEFAULT_COLOR, DEFAULT_FONT_SIZE, DEFAULT_POS_X, DEFAULT_POS_Y, MAX_FONT_SIZE,
    MIN_FONT_SIZE, MIN_SUBTITLE_SECONDS, SubtitleRecord,
};
use crate::error::{MvError, Result};
use crate::style::{Rgb, color, position};
use crate::support::time::round2;
use crate::ui::prelude::*;

const FIELD_COUNT: usize = 6;

struct RawFields<'a> {
    start: &'a str,
    content: String,
    end: &'a str,
    font_size: &'a str,
    color: &'a str,
    pos_x: &'a str,
    pos_y: &'a str,
}

/// Parses timeline text into records. Blank lines are skipped; line numbers
/// in errors count every line.
pub fn parse(
    timeline_text: &str,
    canvas_width: u32,
    canvas_height: u32,
) -> Result<Vec<SubtitleRecord>> {
    let mut records = Vec::new();

    for (idx, line) in timeline_text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_number = idx + 1;
        let record = parse_line(line, line_number)?;
        warn_if_off_canvas(&record, line_number, canvas_width, canvas_height);
        records.push(record);
    }

    Ok(records)
}

fn split_fields(line: &str) -> RawFields<'_> {
    let tokens: Vec<&str> = line.split(',').map(str::trim).collect();

    if tokens.len() < FIELD_COUNT {
        return RawFields {
            start: "0",
            content: line.to_string(),
            end: "0",
            font_size: "36",
            color: DEFAULT_COLOR,
            pos_x: DEFAULT_POS_X,
            pos_y: DEFAULT_POS_Y,
        };
    }

    let tail = &tokens[tokens.len() - 5..];
    RawFields {
        start: tokens[0],
        content: tokens[1..tokens.len() - 5].join(","),
        end: tail[0],
        font_size: tail[1],
        color: tail[2],
        pos_x: tail[3],
        pos_y: tail[4],
    }
}

fn parse_line(line: &str, line_number: usize) -> Result<SubtitleRecord> {
    let fields = split_fields(line);

    let start = parse_seconds(fields.start, "start time", line_number)?;
    let end = parse_seconds(fields.end, "end time", line_number)?;
    let start = round2(start).max(0.0);
    let end = round2(end).max(start + MIN_SUBTITLE_SECONDS);

    let content = match fields.content.trim() {
        "" => format!("字幕{line_number}"),
        content => content.to_string(),
    };

    Ok(SubtitleRecord {
        start,
        end,
        content,
        font_size: parse_font_size(fields.font_size),
        color: resolve_color(fields.color, line_number),
        pos_x: fields.pos_x.to_string(),
        pos_y: fields.pos_y.to_string(),
    })
}

fn resolve_color(spec: &str, line_number: usize) -> Rgb {
    let resolution = color::resolve_detailed(spec);
    if resolution.is_fallback() {
        emit(
            Level::Warn,
            "mv.timeline.color",
            &format!("Line {line_number}: unknown color '{spec}', using white"),
            None,
        );
    }
    resolution.rgb()
}

fn parse_seconds(field: &str, name: &str, line_number: usize) -> Result<f64> {
    if field.is_empty() {
        return Ok(0.0);
    }
    let value: f64 = field
        .parse()
        .map_err(|_| MvError::line_parse(line_number, format!("{name} '{field}' is not a number")))?;
    if !value.is_finite() {
        return Err(MvError::line_parse(
            line_number,
            format!("{name} '{field}' is not a finite number"),
        ));
    }
    Ok(value)
}

fn parse_font_size(field: &str) -> u32 {
    if field.is_empty() || !field.chars().all(|c| c.is_ascii_digit()) {
        return DEFAULT_FONT_SIZE;
    }
    let value = field.parse::<u64>().unwrap_or(u64::MAX);
    value.clamp(u64::from(MIN_FONT_SIZE), u64::from(MAX_FONT_SIZE)) as u32
}

fn warn_if_off_canvas(record: &SubtitleRecord, line_number: usize, width: u32, height: u32) {
    for (spec, bound, axis) in [(&record.pos_x, width, "x"), (&record.pos_y, height, "y")] {
        if position::is_out_of_bounds(spec, bound) {
            emit(
                Level::Warn,
                "mv.timeline.position",
                &format!(
                    "Line {line_number}: {axis} position {spec} lies outside the {width}x{height} canvas"
                ),
                None,
            );
        }
    }
}
