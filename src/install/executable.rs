use crate::archive::{ArchiveKind, tar, zip};
use anyhow::{Context, Result};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Check if a file is executable
pub fn is_executable(path: &Path) -> Result<bool> {
    let metadata = fs::metadata(path)?;

    if !metadata.is_file() {
        return Ok(false);
    }

    #[cfg(windows)]
    {
        Ok(true)
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        Ok(mode & 0o111 != 0)
    }
}

/// Write everything from `reader` to `dest` and mark it executable (0755).
///
/// An existing `dest` is removed first so a running executable can be
/// replaced without "Text file busy".
pub fn write_executable<R: Read + ?Sized>(reader: &mut R, dest: &Path) -> Result<u64> {
    if dest.exists() {
        fs::remove_file(dest)
            .with_context(|| format!("Failed to remove existing executable: {}", dest.display()))?;
    }

    let mut out = fs::File::create(dest)
        .with_context(|| format!("Failed to create executable: {}", dest.display()))?;
    let bytes = std::io::copy(reader, &mut out)
        .with_context(|| format!("Failed to write executable: {}", dest.display()))?;
    drop(out);

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dest, fs::Permissions::from_mode(0o755))
            .context("Failed to set executable permissions")?;
    }

    Ok(bytes)
}

/// Install the executable carried by `downloaded` as `install_dir/binary_name`.
///
/// `asset_name` decides the format: tar.gz/tgz, tar.xz, tar.bz2 and zip archives are
/// searched for an entry named like the binary, anything else is copied
/// verbatim. Reinstalling overwrites the previous file in place.
pub fn install_from(
    downloaded: &Path,
    asset_name: &str,
    binary_name: &str,
    install_dir: &Path,
) -> Result<PathBuf> {
    fs::create_dir_all(install_dir).with_context(|| {
        format!(
            "Failed to create install directory: {}",
            install_dir.display()
        )
    })?;

    let dest = install_dir.join(binary_name);
    let kind = ArchiveKind::from_asset_name(asset_name);
    log::debug!("Installing {asset_name} as {kind:?} to {}", dest.display());

    match kind {
        ArchiveKind::TarGz => tar::extract_binary_from_tar_gz(downloaded, binary_name, &dest)?,
        ArchiveKind::TarXz => tar::extract_binary_from_tar_xz(downloaded, binary_name, &dest)?,
        ArchiveKind::TarBz2 => tar::extract_binary_from_tar_bz2(downloaded, binary_name, &dest)?,
        ArchiveKind::Zip => zip::extract_binary_from_zip(downloaded, binary_name, &dest)?,
        ArchiveKind::Raw => {
            let mut input = fs::File::open(downloaded).with_context(|| {
                format!("Failed to open downloaded file: {}", downloaded.display())
            })?;
            write_executable(&mut input, &dest)?;
        }
    }

    Ok(dest)
}
