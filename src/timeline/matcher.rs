//! Pairs subtitle lines with detected voice intervals.

use super::entry::{MIN_SUBTITLE_SECONDS, TimelineEntry, to_timeline_text};
use crate::audio::VoicedInterval;
use crate::error::{MvError, Result};
use crate::support::time::round2;

/// Duration given to surplus lines when no interval durations are known.
const FALLBACK_LINE_SECONDS: f64 = 3.0;

/// Line `i` takes interval `i`, shifted by the offsets and pushed forward so
/// it never starts before the previous line ends. Lines beyond the last
/// interval are laid end to end using the mean interval duration.
pub fn match_lines<S: AsRef<str>>(
    subtitle_lines: &[S],
    intervals: &[VoicedInterval],
    start_offset: f64,
    end_offset: f64,
) -> Result<Vec<TimelineEntry>> {
    if intervals.is_empty() {
        return Err(MvError::Precondition(
            "No voice segments available; run detection first".to_string(),
        ));
    }

    let lines: Vec<&str> = subtitle_lines
        .iter()
        .map(|line| line.as_ref().trim())
        .filter(|line| !line.is_empty())
        .collect();
    if lines.is_empty() {
        return Err(MvError::Precondition(
            "No subtitle text supplied; enter one line per voice segment".to_string(),
        ));
    }

    let mean_duration = mean_duration(intervals);
    let mut previous_end = 0.0f64;
    let mut entries = Vec::with_capacity(lines.len());

    for (idx, line) in lines.into_iter().enumerate() {
        let (start, end) = match intervals.get(idx) {
            Some(interval) => {
                let start = round2(interval.start + start_offset)
                    .max(0.0)
                    .max(previous_end);
                let end = round2(interval.end + end_offset);
                (start, end)
            }
            None => {
                let start = round2(previous_end);
                (start, round2(start + mean_duration))
            }
        };
        let end = round2(end.max(start + MIN_SUBTITLE_SECONDS));

        previous_end = end;
        entries.push(TimelineEntry::with_default_style(start, line, end));
    }

    Ok(entries)
}

/// [`match_lines`] over newline-separated subtitle text, returning timeline text.
pub fn match_to_text(
    subtitle_text: &str,
    intervals: &[VoicedInterval],
    start_offset: f64,
    end_offset: f64,
) -> Result<String> {
    let lines: Vec<&str> = subtitle_text.lines().collect();
    let entries = match_lines(&lines, intervals, start_offset, end_offset)?;
    Ok(to_timeline_text(&entries))
}

fn mean_duration(intervals: &[VoicedInterval]) -> f64 {
    if intervals.is_empty() {
        return FALLBACK_LINE_SECONDS;
    }
    intervals.iter().map(VoicedInterval::duration).sum::<f64>() / intervals.len() as f64
}
