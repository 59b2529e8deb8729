use anyhow::{Context, Result};
use std::path::PathBuf;

/// Centralized path management for lyricmv

const APP_DIR: &str = "lyricmv";

/// Get the lyricmv config directory
pub fn config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join(APP_DIR);

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Get the lyricmv data directory
pub fn data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("~/.local/share"))
        .join(APP_DIR);

    std::fs::create_dir_all(&data_dir)
        .with_context(|| format!("creating data directory at {}", data_dir.display()))?;

    Ok(data_dir)
}

/// Get the lyricmv cache directory
pub fn cache_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .context("Unable to determine user cache directory")?
        .join(APP_DIR);

    std::fs::create_dir_all(&cache_dir)
        .with_context(|| format!("creating cache directory at {}", cache_dir.display()))?;

    Ok(cache_dir)
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Where the last render is remembered between invocations
pub fn session_path() -> Result<PathBuf> {
    Ok(cache_dir()?.join("session.json"))
}

/// Default directory for rendered videos
pub fn default_output_dir() -> Result<PathBuf> {
    let output_dir = data_dir()?.join("output");
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("creating output directory at {}", output_dir.display()))?;
    Ok(output_dir)
}
