pub mod compiler;
pub mod services;

pub use compiler::{EncodeSettings, FfmpegCompiler, escape_ffmpeg_path, format_command};
pub use services::{FfmpegRunOptions, FfmpegRunner, MediaProbe, SystemFfmpegRunner, SystemMediaProbe};
