use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Context, Result, bail};
use tempfile::Builder as TempFileBuilder;

/// Makes `output_path` safe to write: refuses to clobber an input, removes an
/// existing file only when `force` is set, and creates the parent directory.
pub fn prepare_output_destination(
    output_path: &Path,
    inputs: &[&Path],
    force: bool,
) -> Result<()> {
    if inputs.iter().any(|input| *input == output_path) {
        bail!(
            "Output path {} would overwrite one of the inputs",
            output_path.display()
        );
    }

    if output_path.exists() {
        if force {
            fs::remove_file(output_path).with_context(|| {
                format!(
                    "Failed to remove existing output file {} before overwrite",
                    output_path.display()
                )
            })?;
        } else {
            bail!(
                "Output file {} already exists. Use --force to overwrite.",
                output_path.display()
            );
        }
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory {}", parent.display()))?;
    }

    Ok(())
}

/// Picks an unused `mv_<random>.mp4` name inside `dir`, creating `dir` first.
/// The name is reserved by creating the file and released again before the
/// encoder runs.
pub fn default_output_path(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
    let reserved = TempFileBuilder::new()
        .prefix("mv_")
        .suffix(".mp4")
        .tempfile_in(dir)
        .with_context(|| format!("Failed to pick an output name in {}", dir.display()))?;
    let path = reserved.path().to_path_buf();
    reserved
        .close()
        .with_context(|| format!("Failed to release {}", path.display()))?;
    Ok(path)
}
