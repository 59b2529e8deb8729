use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, bail};

use crate::support::ffmpeg::{ffmpeg_binary, probe_sample_rate};

/// Mono samples at the file's native sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

pub trait AudioDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio>;
}

/// Decodes through `ffmpeg`, downmixing to mono 32-bit float PCM.
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegAudioDecoder;

impl AudioDecoder for FfmpegAudioDecoder {
    fn decode(&self, path: &Path) -> Result<DecodedAudio> {
        let sample_rate = probe_sample_rate(path)?;
        if sample_rate == 0 {
            bail!("{} reports a sample rate of 0", path.display());
        }

        let mut child = Command::new(ffmpeg_binary()?)
            .args(["-nostdin", "-v", "error", "-i"])
            .arg(path)
            .args(["-vn", "-ac", "1", "-f", "f32le", "-acodec", "pcm_f32le", "pipe:1"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| "Failed to spawn ffmpeg")?;

        let mut bytes = Vec::new();
        if let Some(mut stdout) = child.stdout.take() {
            stdout
                .read_to_end(&mut bytes)
                .context("Failed to read decoded samples from ffmpeg")?;
        }

        let mut stderr = String::new();
        if let Some(mut pipe) = child.stderr.take() {
            let _ = pipe.read_to_string(&mut stderr);
        }

        let status = child.wait().context("Failed to wait for ffmpeg")?;
        if !status.success() {
            bail!(
                "ffmpeg exited with status {:?} while decoding {}: {}",
                status.code(),
                path.display(),
                stderr.trim()
            );
        }

        Ok(DecodedAudio {
            samples: samples_from_f32le(&bytes),
            sample_rate,
        })
    }
}

fn samples_from_f32le(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
