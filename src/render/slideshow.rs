use std::path::PathBuf;

use serde::Serialize;

use crate::error::{MvError, Result};

pub const DEFAULT_SLIDE_SECONDS: f64 = 3.0;

/// One background image and the span it is shown for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlideAllocation {
    pub image: PathBuf,
    pub start: f64,
    pub duration: f64,
}

impl SlideAllocation {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Spreads `images` over `total_duration` without gaps.
///
/// A single image covers everything. Otherwise every image but the last gets
/// `min(total / n, per_image_duration)` and the last one absorbs the rest.
pub fn plan(
    images: &[PathBuf],
    total_duration: f64,
    per_image_duration: f64,
) -> Result<Vec<SlideAllocation>> {
    if images.is_empty() {
        return Err(MvError::EmptyInput("background images"));
    }
    if !(total_duration.is_finite() && total_duration > 0.0) {
        return Err(MvError::InvalidParameter(format!(
            "total duration must be positive, got {total_duration}"
        )));
    }
    if !(per_image_duration.is_finite() && per_image_duration > 0.0) {
        return Err(MvError::InvalidParameter(format!(
            "slide duration must be positive, got {per_image_duration}"
        )));
    }

    let count = images.len();
    let share = (total_duration / count as f64).min(per_image_duration);

    let mut allocations = Vec::with_capacity(count);
    let mut elapsed = 0.0;
    for (idx, image) in images.iter().enumerate() {
        let duration = if idx + 1 == count {
            total_duration - elapsed
        } else {
            share
        };
        allocations.push(SlideAllocation {
            image: image.clone(),
            start: elapsed,
            duration,
        });
        elapsed += duration;
    }

    Ok(allocations)
}
