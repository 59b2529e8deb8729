use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated home, config, cache and data directories for one test.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        for dir in ["home", "config", "cache", "data", "work"] {
            fs::create_dir_all(temp_dir.path().join(dir))?;
        }
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn home(&self) -> PathBuf {
        self.path().join("home")
    }

    pub fn config_home(&self) -> PathBuf {
        self.path().join("config")
    }

    pub fn cache_home(&self) -> PathBuf {
        self.path().join("cache")
    }

    pub fn data_home(&self) -> PathBuf {
        self.path().join("data")
    }

    /// Scratch area for input files
    pub fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    pub fn session_file(&self) -> PathBuf {
        self.cache_home().join("lyricmv").join("session.json")
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_home().join("lyricmv").join("config.toml")
    }

    /// Writes `contents` to `name` inside the work directory.
    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.work_dir().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, contents)?;
        Ok(path)
    }
}
