use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Environment variable that overrides `github.token`.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// User configuration read from `~/.config/relget/config.toml`
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
}

/// `[github]` section
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct GitHubConfig {
    /// Bearer token sent with release queries
    pub token: Option<String>,
    /// Default owner for bare repository names
    pub username: Option<String>,
    /// API base URL (for GitHub Enterprise)
    pub api_url: Option<String>,
}

impl Config {
    /// Load configuration from `path`, or from the default location.
    ///
    /// A missing file yields the defaults; a file that exists but does not
    /// parse is an error. The token from `GITHUB_TOKEN` wins over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => default_config_path()?,
        };

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            Self::from_toml(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        } else {
            log::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        if let Ok(token) = std::env::var(TOKEN_ENV_VAR)
            && !token.is_empty()
        {
            config.github.token = Some(token);
        }

        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// API base URL without a trailing slash
    pub fn api_url(&self) -> String {
        self.github
            .api_url
            .as_deref()
            .unwrap_or(DEFAULT_API_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Configured token, ignoring empty strings
    pub fn token(&self) -> Option<&str> {
        self.github.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Directory holding relget's config and ledger (`~/.config/relget`)
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".config").join("relget"))
}

pub fn default_config_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

/// Ledger location (`~/.config/relget/binaries.toml`)
pub fn default_ledger_path() -> Result<PathBuf> {
    Ok(config_dir()?.join("binaries.toml"))
}

/// Install directory (`~/.local/bin`)
pub fn default_install_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))?;
    Ok(home.join(".local").join("bin"))
}
