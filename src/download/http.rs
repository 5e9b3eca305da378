use crate::download::github::ReleaseSource;
use anyhow::{Context, Result};
use std::path::Path;
use tempfile::NamedTempFile;

const TEMP_PREFIX: &str = "relget-download-";

/// Download `url` into a fresh, uniquely named temporary file inside
/// `temp_dir` (the system temp directory when `None`).
///
/// The file is deleted when the returned handle is dropped, whichever way
/// the caller exits.
pub fn download_to_temp<S: ReleaseSource + ?Sized>(
    source: &S,
    url: &str,
    temp_dir: Option<&Path>,
) -> Result<NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(TEMP_PREFIX);
    let mut temp_file = match temp_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
    .context("Failed to create temporary download file")?;

    let bytes = source.download(url, temp_file.as_file_mut())?;

    // Ensure data is written to disk before the installer reopens it
    temp_file.as_file().sync_all().with_context(|| {
        format!(
            "Failed to sync temporary file: {}",
            temp_file.path().display()
        )
    })?;

    log::debug!(
        "Downloaded {bytes} bytes to {}",
        temp_file.path().display()
    );
    Ok(temp_file)
}
