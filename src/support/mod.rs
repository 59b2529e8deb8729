pub mod ffmpeg;
pub mod time;
