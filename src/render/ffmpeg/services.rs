use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};

use crate::support::ffmpeg::{ffmpeg_binary, probe_duration_seconds};

pub trait FfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()>;
}

/// Source of media facts needed before anything is rendered.
pub trait MediaProbe {
    fn audio_duration(&self, path: &Path) -> Result<f64>;
    fn image_dimensions(&self, path: &Path) -> Result<(u32, u32)>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemFfmpegRunner;

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMediaProbe;

#[derive(Debug, Clone, Default)]
pub struct FfmpegRunOptions {
    pub total_duration: Option<f64>,
    pub verbose: bool,
}

impl FfmpegRunOptions {
    pub fn new(total_duration: Option<f64>, verbose: bool) -> Self {
        Self {
            total_duration,
            verbose,
        }
    }
}

impl MediaProbe for SystemMediaProbe {
    fn audio_duration(&self, path: &Path) -> Result<f64> {
        probe_duration_seconds(path)
    }

    fn image_dimensions(&self, path: &Path) -> Result<(u32, u32)> {
        image::image_dimensions(path)
            .with_context(|| format!("Failed to read image dimensions of {}", path.display()))
    }
}

fn progress_bar(duration: f64) -> ProgressBar {
    let pb = ProgressBar::new((duration * 1000.0) as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent:>3}% ({eta}) {msg}")
        .map(|style| style.progress_chars("█▉▊▋▌▍▎▏ "))
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("encoding");
    pb
}

impl FfmpegRunner for SystemFfmpegRunner {
    fn run(&self, args: &[String], options: FfmpegRunOptions) -> Result<()> {
        let mut child = Command::new(ffmpeg_binary()?)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| "Failed to spawn ffmpeg")?;

        let stderr = child
            .stderr
            .take()
            .context("ffmpeg stderr was not captured")?;

        let pb = options.total_duration.map(progress_bar);

        let mut log = StderrLog::default();
        let result = read_ffmpeg_stderr(stderr, options.verbose, pb.as_ref(), &mut log);

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        result?;

        if let Some(pb) = pb {
            if status.success() {
                pb.finish_with_message("done");
            } else {
                pb.abandon_with_message("failed");
            }
        }

        if !status.success() {
            bail!(
                "ffmpeg exited with status {:?}: {}",
                status.code(),
                log.failure_message()
            );
        }

        Ok(())
    }
}

#[derive(Debug, Default)]
struct StderrLog {
    last_line: String,
    error_lines: Vec<String>,
}

impl StderrLog {
    fn record(&mut self, line: &str) {
        self.last_line = line.to_string();
        if line.to_ascii_lowercase().contains("error") {
            self.error_lines.push(line.to_string());
        }
    }

    fn failure_message(&self) -> String {
        if self.error_lines.is_empty() {
            self.last_line.trim().to_string()
        } else {
            self.error_lines.join("\n").trim().to_string()
        }
    }
}

fn read_ffmpeg_stderr<R: Read>(
    mut stderr: R,
    verbose: bool,
    pb: Option<&ProgressBar>,
    log: &mut StderrLog,
) -> Result<()> {
    let mut buffer = [0u8; 4096];
    let mut accumulated = String::new();

    loop {
        let bytes_read = stderr
            .read(&mut buffer)
            .context("Failed to read ffmpeg stderr")?;
        if bytes_read == 0 {
            break;
        }

        accumulated.push_str(&String::from_utf8_lossy(&buffer[..bytes_read]));

        while let Some(pos) = accumulated.find(['\r', '\n']) {
            let line: String = accumulated.drain(..=pos).collect();
            let line = line.trim_end_matches(['\r', '\n']);
            if line.is_empty() {
                continue;
            }

            if verbose {
                eprintln!("{}", line);
            }
            log.record(line);

            if let Some(pb) = pb
                && let Some(seconds) = parse_ffmpeg_progress(line)
            {
                pb.set_position((seconds * 1000.0) as u64);
                if let Some(speed) = parse_ffmpeg_speed(line) {
                    pb.set_message(speed);
                }
            }
        }
    }

    if !accumulated.trim().is_empty() {
        log.record(accumulated.trim());
    }

    Ok(())
}

fn parse_ffmpeg_progress(line: &str) -> Option<f64> {
    let time_start = line.find("time=")?;
    let time_str = &line[time_start + 5..];
    let time_val = time_str.split_whitespace().next()?;
    parse_time_to_seconds(time_val)
}

fn parse_time_to_seconds(time_str: &str) -> Option<f64> {
    let mut parts = time_str.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

fn parse_ffmpeg_speed(line: &str) -> Option<String> {
    let speed_start = line.find("speed=")?;
    let speed_str = line[speed_start + 6..].trim_start();
    let speed_end = speed_str.find('x')?;
    Some(speed_str[..=speed_end].to_string())
}
