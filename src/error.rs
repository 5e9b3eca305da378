use thiserror::Error;

/// Failures that callers may want to tell apart.
///
/// Everything else (network transport, filesystem, TOML) travels as a plain
/// `anyhow::Error` with context attached at the call site.
#[derive(Debug, Error)]
pub enum RelgetError {
    #[error("no release found for {0}")]
    ReleaseNotFound(String),

    #[error("GitHub API rate limit exceeded while querying {0} (configure a token to raise it)")]
    RateLimited(String),

    #[error("no suitable binary for this platform ({os}/{arch})")]
    NoSuitableAsset { os: String, arch: String },

    #[error("binary not found in archive: {0}")]
    BinaryNotFoundInArchive(String),

    #[error("binary not installed: {0}")]
    NotInstalled(String),

    #[error("invalid repository specification: {0}")]
    InvalidRepository(String),

    #[error("no username configured for repository '{0}'")]
    MissingUsername(String),
}
