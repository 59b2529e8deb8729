use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{MvError, Result};

/// What a successful render produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub path: PathBuf,
    pub duration: f64,
    pub slide_count: usize,
    pub overlay_count: usize,
    pub subtitle_count: usize,
}

/// Remembers the most recent artifact for whoever owns the session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RenderSession {
    last: Option<GeneratedArtifact>,
}

impl RenderSession {
    pub fn record(&mut self, artifact: GeneratedArtifact) {
        self.last = Some(artifact);
    }

    /// The last artifact, provided its file is still on disk.
    pub fn last_artifact(&self) -> Result<&GeneratedArtifact> {
        let artifact = self.last.as_ref().ok_or_else(|| {
            MvError::Precondition("No music video has been generated yet".to_string())
        })?;
        if !artifact.path.exists() {
            return Err(MvError::Precondition(format!(
                "The last generated video {} no longer exists",
                artifact.path.display()
            )));
        }
        Ok(artifact)
    }

    /// Loads a persisted session; a missing file is an empty session.
    pub fn load_from_path(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading render session from {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("parsing render session {}", path.display()))
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating session directory {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).context("serializing render session")?;
        fs::write(path, json)
            .with_context(|| format!("writing render session to {}", path.display()))
    }
}
