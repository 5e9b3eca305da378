use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;

/// Command line arguments
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Print diagnostic output
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Configuration file (defaults to ~/.config/relget/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download and install the latest release binary of a repository
    Get {
        /// Repository: "name", "owner/name", an HTTPS URL or an SSH URL
        repo: String,
    },
    /// Update one installed binary, or all of them when no repository is given
    Update {
        /// Repository to update (updates every installed binary if omitted)
        repo: Option<String>,
    },
    /// List installed binaries
    List,
}

/// GitHub release information
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

/// GitHub release asset information
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

impl ReleaseAsset {
    pub fn new(name: &str, browser_download_url: &str) -> Self {
        Self {
            name: name.to_string(),
            browser_download_url: browser_download_url.to_string(),
            size: 0,
        }
    }
}
