use crate::archive::matches_binary_name;
use crate::error::RelgetError;
use crate::install::executable::write_executable;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use zip::ZipArchive;

/// Install `binary_name` from a ZIP archive to `dest`
pub fn extract_binary_from_zip(zip_path: &Path, binary_name: &str, dest: &Path) -> Result<()> {
    let file = fs::File::open(zip_path)
        .with_context(|| format!("Failed to open zip file: {}", zip_path.display()))?;

    let mut archive = ZipArchive::new(file).with_context(|| "Failed to read zip archive")?;

    for i in 0..archive.len() {
        let mut file = archive
            .by_index(i)
            .with_context(|| format!("Failed to access zip entry {i}"))?;

        if file.is_dir() || !matches_binary_name(Path::new(file.name()), binary_name) {
            continue;
        }

        let entry_path = file.name().to_string();
        log::debug!("Installing {entry_path} from zip archive");
        write_executable(&mut file, dest)
            .with_context(|| format!("Failed to extract file: {entry_path}"))?;
        return Ok(());
    }

    Err(RelgetError::BinaryNotFoundInArchive(binary_name.to_string()).into())
}
