pub mod decode;
pub mod vad;

pub use decode::FfmpegAudioDecoder;
pub use vad::{VoiceActivityDetector, VoicedInterval};
