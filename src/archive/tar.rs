use crate::archive::matches_binary_name;
use crate::error::RelgetError;
use crate::install::executable::write_executable;
use anyhow::{Context, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::Path;
use tar::Archive;
use xz2::read::XzDecoder;

/// Install `binary_name` from a TAR.GZ archive to `dest`
pub fn extract_binary_from_tar_gz(tar_path: &Path, binary_name: &str, dest: &Path) -> Result<()> {
    let file = fs::File::open(tar_path)
        .with_context(|| format!("Failed to open tar.gz file: {}", tar_path.display()))?;

    let decoder = GzDecoder::new(file);
    extract_binary_from_reader(decoder, binary_name, dest, "tar.gz")
}

/// Install `binary_name` from a TAR.XZ archive to `dest`
pub fn extract_binary_from_tar_xz(tar_path: &Path, binary_name: &str, dest: &Path) -> Result<()> {
    let file = fs::File::open(tar_path)
        .with_context(|| format!("Failed to open tar.xz file: {}", tar_path.display()))?;

    let decoder = XzDecoder::new(file);
    extract_binary_from_reader(decoder, binary_name, dest, "tar.xz")
}

/// Install `binary_name` from a TAR.BZ2 archive to `dest`
pub fn extract_binary_from_tar_bz2(tar_path: &Path, binary_name: &str, dest: &Path) -> Result<()> {
    let file = fs::File::open(tar_path)
        .with_context(|| format!("Failed to open tar.bz2 file: {}", tar_path.display()))?;
    let decoder = BzDecoder::new(file);
    extract_binary_from_reader(decoder, binary_name, dest, "tar.bz2")
}

/// Scan tar entries in order and copy out the first regular file that
/// matches `binary_name`.
fn extract_binary_from_reader<R: Read>(
    reader: R,
    binary_name: &str,
    dest: &Path,
    archive_type: &str,
) -> Result<()> {
    let mut archive = Archive::new(reader);

    for entry in archive
        .entries()
        .with_context(|| format!("Failed to read {archive_type} entries"))?
    {
        let mut entry = entry.with_context(|| format!("Failed to access {archive_type} entry"))?;

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let matched = {
            let path = entry.path().with_context(|| "Failed to get entry path")?;
            matches_binary_name(&path, binary_name).then(|| path.display().to_string())
        };
        let Some(entry_path) = matched else {
            continue;
        };

        log::debug!("Installing {entry_path} from {archive_type} archive");
        write_executable(&mut entry, dest)
            .with_context(|| format!("Failed to extract file: {entry_path}"))?;
        return Ok(());
    }

    Err(RelgetError::BinaryNotFoundInArchive(binary_name.to_string()).into())
}
