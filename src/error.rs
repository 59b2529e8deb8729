use std::path::PathBuf;

use thiserror::Error;

/// Example line shown whenever a timeline line cannot be parsed.
pub const TIMELINE_FORMAT_HINT: &str = "0.0,Hello world,3.0,36,#FFFFFF,center,bottom100";

#[derive(Error, Debug)]
pub enum MvError {
    #[error("{what} not found: {}", .path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("{0}")]
    Precondition(String),

    #[error(
        "Timeline line {line} could not be parsed: {reason}\nExpected format: {hint}",
        hint = TIMELINE_FORMAT_HINT
    )]
    LineParse { line: usize, reason: String },

    #[error("No {0} supplied")]
    EmptyInput(&'static str),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Could not read media input: {0:#}")]
    Decode(#[source] anyhow::Error),

    #[error("Music video generation failed: {0:#}")]
    Encoding(#[source] anyhow::Error),
}

impl MvError {
    pub fn missing(what: &'static str, path: impl Into<PathBuf>) -> Self {
        MvError::MissingInput {
            what,
            path: path.into(),
        }
    }

    pub fn line_parse(line: usize, reason: impl Into<String>) -> Self {
        MvError::LineParse {
            line,
            reason: reason.into(),
        }
    }

    pub fn encoding(source: impl Into<anyhow::Error>) -> Self {
        MvError::Encoding(source.into())
    }

    /// Short machine-readable identifier used as the event code suffix.
    pub fn kind(&self) -> &'static str {
        match self {
            MvError::MissingInput { .. } => "missing_input",
            MvError::Precondition(_) => "precondition",
            MvError::LineParse { .. } => "line_parse",
            MvError::EmptyInput(_) => "empty_input",
            MvError::InvalidParameter(_) => "invalid_parameter",
            MvError::Decode(_) => "decode",
            MvError::Encoding(_) => "encoding",
        }
    }
}

pub type Result<T> = std::result::Result<T, MvError>;

/// Fails with `MissingInput` unless `path` exists on disk.
pub fn require_file(what: &'static str, path: &std::path::Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(MvError::missing(what, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_parse_names_line_and_format() {
        let err = MvError::line_parse(3, "start time 'abc' is not a number");
        let message = err.to_string();
        assert!(message.contains("line 3"));
        assert!(message.contains("'abc'"));
        assert!(message.contains(TIMELINE_FORMAT_HINT));
    }

    #[test]
    fn encoding_wraps_cause_chain() {
        let cause = anyhow::anyhow!("exit status 1").context("ffmpeg failed");
        let err = MvError::encoding(cause);
        let message = err.to_string();
        assert!(message.starts_with("Music video generation failed"));
        assert!(message.contains("ffmpeg failed"));
        assert!(message.contains("exit status 1"));
        assert_eq!(err.kind(), "encoding");
    }

    #[test]
    fn require_file_reports_path() {
        let err = require_file("Audio file", std::path::Path::new("/nonexistent/song.mp3"))
            .unwrap_err();
        assert!(matches!(err, MvError::MissingInput { .. }));
        assert!(err.to_string().contains("/nonexistent/song.mp3"));
    }
}
