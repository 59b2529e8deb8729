use std::path::PathBuf;

use anyhow::{Context, Result};
use tempfile::{Builder as TempFileBuilder, TempPath};

use crate::ui::prelude::*;

/// Owns the intermediate files of one render. Every file is deleted when the
/// guard is released or dropped, whichever comes first.
#[derive(Debug)]
pub struct ScratchFiles {
    dir: PathBuf,
    files: Vec<TempPath>,
}

impl ScratchFiles {
    pub fn new() -> Self {
        Self::in_dir(std::env::temp_dir())
    }

    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
        }
    }

    /// Creates an empty file with a process-wide unique name.
    pub fn create(&mut self, prefix: &str, suffix: &str) -> Result<PathBuf> {
        let file = TempFileBuilder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile_in(&self.dir)
            .with_context(|| format!("Failed to create scratch file in {}", self.dir.display()))?;
        let path = file.path().to_path_buf();
        self.files.push(file.into_temp_path());
        Ok(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Deletes every file created so far.
    pub fn release(&mut self) {
        if self.is_empty() {
            return;
        }
        emit(
            Level::Debug,
            "mv.render.scratch",
            &format!("Removing {} scratch file(s)", self.len()),
            None,
        );
        for path in self.files.drain(..) {
            let display = path.to_path_buf();
            if let Err(err) = path.close() {
                emit(
                    Level::Debug,
                    "mv.render.scratch",
                    &format!("Could not remove {}: {}", display.display(), err),
                    None,
                );
            }
        }
    }
}

impl Default for ScratchFiles {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ScratchFiles {
    fn drop(&mut self) {
        self.release();
    }
}
