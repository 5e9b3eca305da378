use crate::error::RelgetError;
use anyhow::Result;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

/// Host assumed for bare and `owner/name` references.
pub const DEFAULT_HOST: &str = "github.com";

static SIMPLE_REPO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("valid simple repo regex"));

static OWNER_REPO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+)$").expect("valid owner/repo regex")
});

static HTTP_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?)://([^/]+)/([^/]+)/([^/?#]+)").expect("valid http url regex")
});

static SSH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:ssh://)?git@([^:/]+)[:/]([^/]+)/([^/]+?)(?:\.git)?/?$")
        .expect("valid ssh url regex")
});

/// A normalized reference to a repository that publishes releases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub host: String,
    pub owner: String,
    pub name: String,
    /// `https`, `http`, `ssh`, or empty when the user gave no URL.
    pub protocol: String,
}

impl RepositoryRef {
    /// Reference to `owner/name` on the default host.
    pub fn github(owner: &str, name: &str) -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            owner: owner.to_string(),
            name: name.to_string(),
            protocol: String::new(),
        }
    }

    /// Parse a user-supplied repository reference.
    ///
    /// Accepted forms:
    /// - `name` (owner taken from `default_owner`)
    /// - `owner/name`
    /// - `https://host/owner/name[.git]`
    /// - `git@host:owner/name[.git]` or `ssh://git@host/owner/name[.git]`
    pub fn parse(spec: &str, default_owner: Option<&str>) -> Result<Self> {
        let spec = spec.trim();

        if SIMPLE_REPO.is_match(spec) {
            let owner = default_owner
                .filter(|o| !o.is_empty())
                .ok_or_else(|| RelgetError::MissingUsername(spec.to_string()))?;
            return Self::github(owner, spec).validated(spec);
        }

        if let Some(caps) = OWNER_REPO.captures(spec) {
            return Self::github(&caps[1], &caps[2]).validated(spec);
        }

        if let Some(caps) = HTTP_URL.captures(spec) {
            return Self {
                host: caps[2].to_string(),
                owner: caps[3].to_string(),
                name: trim_git_suffix(&caps[4]).to_string(),
                protocol: caps[1].to_string(),
            }
            .validated(spec);
        }

        if spec.starts_with("git@") || spec.starts_with("ssh://git@") {
            let caps = SSH_URL
                .captures(spec)
                .ok_or_else(|| RelgetError::InvalidRepository(spec.to_string()))?;
            return Self {
                host: caps[1].to_string(),
                owner: caps[2].to_string(),
                name: trim_git_suffix(&caps[3]).to_string(),
                protocol: "ssh".to_string(),
            }
            .validated(spec);
        }

        Err(RelgetError::InvalidRepository(spec.to_string()).into())
    }

    /// The name becomes a file directly under the install directory, so
    /// neither part may be empty or a relative path component.
    fn validated(self, spec: &str) -> Result<Self> {
        let unusable = |part: &str| part.is_empty() || part == "." || part == "..";
        if unusable(&self.owner) || unusable(&self.name) {
            return Err(RelgetError::InvalidRepository(spec.to_string()).into());
        }
        Ok(self)
    }

    /// Ledger key for this repository (`owner/name`).
    pub fn key(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn trim_git_suffix(name: &str) -> &str {
    name.strip_suffix(".git").unwrap_or(name)
}
