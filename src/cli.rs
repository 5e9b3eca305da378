use crate::config::Config;
use crate::install::executable::is_executable;
use crate::install::utils::is_directory_in_path;
use crate::ledger::InstalledBinary;
use crate::manager::{Manager, ManagerOptions};
use crate::models::{Args, Commands};
use crate::repository::RepositoryRef;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;

/// Main CLI entry point
pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load(args.config.as_deref())?;
    let manager = Manager::new(ManagerOptions {
        github_token: config.token().map(str::to_string),
        api_url: Some(config.api_url()),
        verbose: args.verbose,
    })?;

    match args.command {
        Commands::Get { repo } => {
            let repo = parse_repository(&repo, &config)?;
            if args.verbose {
                println!("Downloading latest binary for {repo}");
            }

            let binary = manager
                .get(&repo)
                .with_context(|| format!("Failed to download binary for {repo}"))?;
            println!(
                "Installed {repo} {} to {}",
                binary.version,
                binary.install_path.display()
            );
            warn_if_not_in_path(manager.install_dir());
        }
        Commands::Update { repo: None } => {
            if args.verbose {
                println!("Checking for updates for all installed binaries");
            }

            let updated = manager
                .update_all()
                .context("Failed to update binaries")?;
            println!("Updated {updated} binaries");
        }
        Commands::Update { repo: Some(repo) } => {
            let repo = parse_repository(&repo, &config)?;
            if args.verbose {
                println!("Checking for updates for {repo}");
            }

            let updated = manager
                .update(&repo)
                .with_context(|| format!("Failed to update binary for {repo}"))?;
            if updated {
                println!("Successfully updated binary for {repo}");
            } else {
                println!("Binary for {repo} is already up to date");
            }
        }
        Commands::List => {
            let installed = manager.installed()?;
            if installed.is_empty() {
                println!("No binaries installed");
            }
            for binary in &installed {
                println!("{}", format_entry(binary));
            }
        }
    }

    Ok(())
}

/// Diagnostics go through `log`; `--verbose` turns on debug output for
/// this crate, `RUST_LOG` still wins when set.
fn init_logging(verbose: bool) {
    let default_filter = if verbose { "warn,relget=debug" } else { "warn" };
    let env = env_logger::Env::default().default_filter_or(default_filter);
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}

fn parse_repository(spec: &str, config: &Config) -> Result<RepositoryRef> {
    RepositoryRef::parse(spec, config.github.username.as_deref())
        .with_context(|| format!("Failed to parse repository: {spec}"))
}

fn warn_if_not_in_path(install_dir: &Path) {
    if !is_directory_in_path(install_dir) {
        println!(
            "Warning: {} is not in your PATH. Add it with: export PATH=\"$PATH:{}\"",
            install_dir.display(),
            install_dir.display()
        );
    }
}

/// Note for a ledger entry whose file is gone or lost its executable bit
fn install_status(path: &Path) -> &'static str {
    match is_executable(path) {
        Ok(true) => "",
        Ok(false) => " (not executable)",
        Err(_) => " (missing)",
    }
}

fn format_entry(binary: &InstalledBinary) -> String {
    format!(
        "{:<32} {:<16} {}{}",
        binary.repository,
        binary.version,
        binary.install_path.display(),
        install_status(&binary.install_path)
    )
}
