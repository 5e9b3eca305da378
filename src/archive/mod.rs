pub mod tar;
pub mod zip;

use std::path::Path;

/// How a downloaded asset is turned into an executable, decided from the
/// asset's file name alone (contents are never sniffed).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    TarGz,
    TarXz,
    TarBz2,
    Zip,
    /// The download is the executable itself
    Raw,
}

impl ArchiveKind {
    pub fn from_asset_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveKind::TarGz
        } else if name.ends_with(".tar.xz") {
            ArchiveKind::TarXz
        } else if name.ends_with(".tar.bz2") {
            ArchiveKind::TarBz2
        } else if name.ends_with(".zip") {
            ArchiveKind::Zip
        } else {
            ArchiveKind::Raw
        }
    }
}

/// Whether an archive entry is the binary we are looking for: its base name
/// equals `binary_name` or starts with it (`tool`, `tool.exe`, `tool-v2`).
pub fn matches_binary_name(entry_path: &Path, binary_name: &str) -> bool {
    entry_path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|base| base.starts_with(binary_name))
}
