use crate::models::ReleaseAsset;

/// Archive suffixes an asset may carry to be considered installable
pub const ARCHIVE_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".zip", ".tar.bz2", ".tar.xz"];

/// Operating system and CPU architecture to match release assets against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: &str, arch: &str) -> Self {
        Self {
            os: os.to_string(),
            arch: arch.to_string(),
        }
    }

    /// The platform this binary was compiled for
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }
}

/// Alternative spelling release maintainers use for an OS name
pub fn os_alias(os: &str) -> &str {
    match os {
        "darwin" => "macos",
        "macos" => "darwin",
        other => other,
    }
}

/// Alternative spelling release maintainers use for an architecture name
pub fn arch_alias(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "amd64" => "x86_64",
        "aarch64" => "arm64",
        "arm64" => "aarch64",
        other => other,
    }
}

pub fn is_archive(name: &str) -> bool {
    let name = name.to_lowercase();
    ARCHIVE_SUFFIXES.iter().any(|suffix| name.ends_with(suffix))
}

/// A bare executable: no extension at all, or a Windows `.exe`
pub fn is_binary(name: &str) -> bool {
    let name = name.to_lowercase();
    !name.contains('.') || name.ends_with(".exe")
}

/// Pick the first asset (in release order) built for `os`/`arch`.
///
/// Matching is plain substring containment on the lower-cased asset name,
/// accepting either the given token or its alias, and the asset must look
/// like an archive or a bare binary.
pub fn select_best_asset<'a>(
    assets: &'a [ReleaseAsset],
    os: &str,
    arch: &str,
) -> Option<&'a ReleaseAsset> {
    let os = os.to_lowercase();
    let arch = arch.to_lowercase();

    assets.iter().find(|asset| {
        let name = asset.name.to_lowercase();

        let os_matches = name.contains(&os) || name.contains(os_alias(&os));
        let arch_matches = name.contains(&arch) || name.contains(arch_alias(&arch));

        os_matches && arch_matches && (is_archive(&name) || is_binary(&name))
    })
}
