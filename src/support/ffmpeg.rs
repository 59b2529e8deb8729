use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Full path of the `ffmpeg` executable on `PATH`.
pub fn ffmpeg_binary() -> Result<PathBuf> {
    which::which("ffmpeg").context("ffmpeg was not found on PATH; install ffmpeg to continue")
}

pub fn ffprobe_binary() -> Result<PathBuf> {
    which::which("ffprobe").context("ffprobe was not found on PATH; it ships with ffmpeg")
}

fn run_ffprobe(path: &Path, args: &[&str]) -> Result<String> {
    let output = Command::new(ffprobe_binary()?)
        .args(["-v", "error"])
        .args(args)
        .arg(path)
        .output()
        .with_context(|| format!("Failed to run ffprobe for {}", path.display()))?;

    if !output.status.success() {
        anyhow::bail!(
            "ffprobe failed for {}: {}",
            path.display(),
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }

    String::from_utf8(output.stdout)
        .with_context(|| format!("ffprobe returned non-UTF8 output for {}", path.display()))
}

pub fn probe_duration_seconds(path: &Path) -> Result<f64> {
    let stdout = run_ffprobe(
        path,
        &[
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ],
    )?;

    let duration: f64 = stdout
        .trim()
        .parse()
        .context("Failed to parse ffprobe duration as f64")?;

    if !duration.is_finite() || duration <= 0.0 {
        anyhow::bail!(
            "ffprobe reported an unusable duration {} for {}",
            duration,
            path.display()
        );
    }

    Ok(duration)
}

/// Native sample rate of the first audio stream.
pub fn probe_sample_rate(path: &Path) -> Result<u32> {
    let stdout = run_ffprobe(
        path,
        &[
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ],
    )?;

    let value = stdout.lines().next().unwrap_or_default().trim();
    value.parse().with_context(|| {
        format!(
            "Unable to parse ffprobe sample rate '{}' for {}",
            value,
            path.display()
        )
    })
}
