use crate::config::{DEFAULT_API_URL, default_install_dir, default_ledger_path};
use crate::download::http::download_to_temp;
use crate::download::{GitHubClient, Platform, ReleaseSource, select_best_asset};
use crate::error::RelgetError;
use crate::install::install_from;
use crate::ledger::{InstalledBinary, Ledger};
use crate::models::Release;
use crate::repository::RepositoryRef;
use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Options for building a [`Manager`] that talks to GitHub
#[derive(Debug, Clone, Default)]
pub struct ManagerOptions {
    /// Bearer token for API requests
    pub github_token: Option<String>,
    /// API base URL (defaults to api.github.com)
    pub api_url: Option<String>,
    /// Print progress while working
    pub verbose: bool,
}

/// Result of trying to update one ledger entry inside a batch
#[derive(Debug)]
pub struct UpdateOutcome {
    pub repository: RepositoryRef,
    pub result: Result<bool>,
}

impl UpdateOutcome {
    pub fn was_updated(&self) -> bool {
        matches!(self.result, Ok(true))
    }
}

/// Number of entries in a batch that were actually updated
pub fn count_updated(outcomes: &[UpdateOutcome]) -> usize {
    outcomes.iter().filter(|o| o.was_updated()).count()
}

/// Installs release binaries and keeps the ledger in step with them
pub struct Manager<S: ReleaseSource = GitHubClient> {
    source: S,
    ledger: Ledger,
    install_dir: PathBuf,
    platform: Platform,
    download_dir: Option<PathBuf>,
    verbose: bool,
}

impl Manager<GitHubClient> {
    /// Manager for the current platform using the default ledger and
    /// install locations
    pub fn new(options: ManagerOptions) -> Result<Self> {
        let client = GitHubClient::new(
            options.api_url.as_deref().unwrap_or(DEFAULT_API_URL),
            options.github_token.as_deref(),
        );
        let manager = Self::with_source(
            client,
            Ledger::new(default_ledger_path()?),
            default_install_dir()?,
            Platform::current(),
        );
        Ok(manager.verbose(options.verbose))
    }
}

impl<S: ReleaseSource> Manager<S> {
    pub fn with_source(
        source: S,
        ledger: Ledger,
        install_dir: impl Into<PathBuf>,
        platform: Platform,
    ) -> Self {
        Self {
            source,
            ledger,
            install_dir: install_dir.into(),
            platform,
            download_dir: None,
            verbose: false,
        }
    }

    /// Keep temporary downloads in `dir` instead of the system temp directory
    pub fn download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    /// Install the latest release of `repo` and record it in the ledger.
    ///
    /// Repeating this for an already installed repository reinstalls it
    /// in place.
    pub fn get(&self, repo: &RepositoryRef) -> Result<InstalledBinary> {
        let release = self.latest_release(repo)?;
        self.install_release(repo, &release)
    }

    /// Reinstall `repo` when its latest release tag differs from the one
    /// recorded in the ledger. Returns whether anything was installed.
    ///
    /// Tags are compared as plain strings: any difference counts as an
    /// update, including a move to an older tag.
    pub fn update(&self, repo: &RepositoryRef) -> Result<bool> {
        let document = self.ledger.load()?;
        let existing = document
            .get(&repo.owner, &repo.name)
            .ok_or_else(|| RelgetError::NotInstalled(repo.key()))?;

        let release = self.latest_release(repo)?;
        if existing.version == release.tag_name {
            log::debug!("{repo} is up to date at {}", existing.version);
            return Ok(false);
        }

        if self.verbose {
            println!(
                "Updating {repo}: {} -> {}",
                existing.version, release.tag_name
            );
        }
        self.install_release(repo, &release)?;
        Ok(true)
    }

    /// Run [`Manager::update`] for every ledger entry and report each
    /// result. One entry failing never stops the others.
    pub fn update_all_outcomes(&self) -> Result<Vec<UpdateOutcome>> {
        let document = self.ledger.load()?;

        let outcomes = document
            .binaries
            .values()
            .map(|binary| {
                let repository = RepositoryRef::github(&binary.owner, &binary.name);
                let result = self.update(&repository);
                if let Err(err) = &result {
                    log::warn!("Failed to update {}: {err:#}", binary.repository);
                    if self.verbose {
                        println!("Failed to update {}: {err:#}", binary.repository);
                    }
                }
                UpdateOutcome { repository, result }
            })
            .collect();

        Ok(outcomes)
    }

    /// Update every installed binary, returning how many changed.
    ///
    /// Only a ledger that cannot be loaded is an error; per-entry failures
    /// just count as "not updated".
    pub fn update_all(&self) -> Result<usize> {
        let outcomes = self.update_all_outcomes()?;
        Ok(count_updated(&outcomes))
    }

    /// Ledger entries ordered by `owner/name`
    pub fn installed(&self) -> Result<Vec<InstalledBinary>> {
        Ok(self.ledger.load()?.binaries.into_values().collect())
    }

    fn latest_release(&self, repo: &RepositoryRef) -> Result<Release> {
        self.source
            .latest_release(&repo.owner, &repo.name)
            .with_context(|| format!("Failed to get latest release for {repo}"))
    }

    fn install_release(&self, repo: &RepositoryRef, release: &Release) -> Result<InstalledBinary> {
        let Platform { os, arch } = &self.platform;
        let asset = select_best_asset(&release.assets, os, arch).ok_or_else(|| {
            RelgetError::NoSuitableAsset {
                os: os.clone(),
                arch: arch.clone(),
            }
        })?;

        if self.verbose {
            println!(
                "Downloading {} ({}, {} bytes)...",
                asset.name, release.tag_name, asset.size
            );
        }

        // Removed when dropped, on success and on every error path below
        let downloaded = download_to_temp(
            &self.source,
            &asset.browser_download_url,
            self.download_dir.as_deref(),
        )
            .with_context(|| format!("Failed to download asset: {}", asset.name))?;

        let install_path = install_from(
            downloaded.path(),
            &asset.name,
            &repo.name,
            &self.install_dir,
        )
        .with_context(|| format!("Failed to install binary from {}", asset.name))?;
        drop(downloaded);

        if self.verbose {
            println!("Installed to: {}", install_path.display());
        }

        let now = Utc::now();
        let binary = InstalledBinary {
            repository: repo.key(),
            owner: repo.owner.clone(),
            name: repo.name.clone(),
            version: release.tag_name.clone(),
            installed_at: now,
            updated_at: now,
            asset_name: asset.name.clone(),
            install_path,
        };

        self.ledger
            .record(binary)
            .context("Failed to save binary info")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReleaseAsset;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::cell::{Cell, RefCell};
    use std::collections::{HashMap, HashSet};
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    /// Serves releases and asset bodies from memory
    #[derive(Default)]
    struct FakeSource {
        releases: RefCell<HashMap<String, Release>>,
        payloads: RefCell<HashMap<String, Vec<u8>>>,
        failing: RefCell<HashSet<String>>,
        downloads: Cell<usize>,
    }

    impl FakeSource {
        /// Publish `tag` of `owner/name` with one tar.gz asset for linux/amd64
        /// holding `name` with `body`
        fn publish(&self, owner: &str, name: &str, tag: &str, body: &[u8]) {
            let asset_name = format!("{name}-{tag}-linux-amd64.tar.gz");
            let url = format!("https://example.com/{owner}/{name}/{tag}/{asset_name}");
            self.payloads
                .borrow_mut()
                .insert(url.clone(), tar_gz(&[("README.md", b"docs"), (name, body)]));
            self.publish_assets(owner, name, tag, vec![ReleaseAsset::new(&asset_name, &url)]);
        }

        fn publish_assets(&self, owner: &str, name: &str, tag: &str, assets: Vec<ReleaseAsset>) {
            self.releases.borrow_mut().insert(
                format!("{owner}/{name}"),
                Release {
                    tag_name: tag.to_string(),
                    assets,
                },
            );
        }

        fn fail(&self, owner: &str, name: &str) {
            self.failing.borrow_mut().insert(format!("{owner}/{name}"));
        }
    }

    impl ReleaseSource for FakeSource {
        fn latest_release(&self, owner: &str, name: &str) -> Result<Release> {
            let key = format!("{owner}/{name}");
            if self.failing.borrow().contains(&key) {
                return Err(anyhow::anyhow!("connection refused"));
            }
            self.releases
                .borrow()
                .get(&key)
                .cloned()
                .ok_or_else(|| RelgetError::ReleaseNotFound(key).into())
        }

        fn download(&self, url: &str, dest: &mut dyn Write) -> Result<u64> {
            self.downloads.set(self.downloads.get() + 1);
            let payloads = self.payloads.borrow();
            let body = payloads
                .get(url)
                .ok_or_else(|| anyhow::anyhow!("404 for {url}"))?;
            dest.write_all(body)?;
            Ok(body.len() as u64)
        }
    }

    fn tar_gz(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        for (path, data) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            builder.append_data(&mut header, path, *data).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap()
    }

    struct Fixture {
        _temp: TempDir,
        manager: Manager<FakeSource>,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let downloads = temp.path().join("downloads");
        fs::create_dir(&downloads).unwrap();
        let manager = Manager::with_source(
            FakeSource::default(),
            Ledger::new(temp.path().join("config").join("binaries.toml")),
            temp.path().join("bin"),
            Platform::new("linux", "x86_64"),
        )
        .download_dir(downloads);
        Fixture {
            _temp: temp,
            manager,
        }
    }

    fn leftover_downloads(f: &Fixture) -> usize {
        let dir = f.manager.download_dir.as_deref().unwrap();
        fs::read_dir(dir).unwrap().count()
    }

    fn repo(owner: &str, name: &str) -> RepositoryRef {
        RepositoryRef::github(owner, name)
    }

    fn relget_error(err: &anyhow::Error) -> Option<&RelgetError> {
        err.downcast_ref::<RelgetError>()
    }

    #[test]
    fn test_get_installs_and_records() {
        let f = fixture();
        f.manager.source().publish("sharkdp", "fd", "v10.2.0", b"fd binary");

        let binary = f.manager.get(&repo("sharkdp", "fd")).unwrap();

        let expected_path = f.manager.install_dir().join("fd");
        assert_eq!(binary.install_path, expected_path);
        assert_eq!(fs::read(&expected_path).unwrap(), b"fd binary");
        assert_eq!(binary.version, "v10.2.0");
        assert_eq!(binary.repository, "sharkdp/fd");
        assert_eq!(binary.asset_name, "fd-v10.2.0-linux-amd64.tar.gz");
        assert_eq!(binary.installed_at, binary.updated_at);

        let document = f.manager.ledger().load().unwrap();
        assert_eq!(document.get("sharkdp", "fd"), Some(&binary));
        assert_eq!(leftover_downloads(&f), 0);
    }

    #[test]
    fn test_get_is_idempotent() {
        let f = fixture();
        f.manager.source().publish("sharkdp", "fd", "v10.2.0", b"fd binary");

        f.manager.get(&repo("sharkdp", "fd")).unwrap();
        let second = f.manager.get(&repo("sharkdp", "fd")).unwrap();

        assert_eq!(second.version, "v10.2.0");
        assert_eq!(f.manager.installed().unwrap().len(), 1);
        assert_eq!(fs::read(&second.install_path).unwrap(), b"fd binary");
    }

    #[test]
    fn test_get_without_matching_asset_downloads_nothing() {
        let f = fixture();
        f.manager.source().publish_assets(
            "o",
            "tool",
            "v1",
            vec![
                ReleaseAsset::new("tool-windows-amd64.zip", "https://x/win"),
                ReleaseAsset::new("tool-darwin-arm64.tar.gz", "https://x/mac"),
            ],
        );

        let err = f.manager.get(&repo("o", "tool")).unwrap_err();
        assert!(matches!(
            relget_error(&err),
            Some(RelgetError::NoSuitableAsset { os, arch }) if os == "linux" && arch == "x86_64"
        ));
        assert_eq!(f.manager.source().downloads.get(), 0);
        assert!(f.manager.installed().unwrap().is_empty());
        assert!(!f.manager.install_dir().join("tool").exists());
    }

    #[test]
    fn test_get_release_failure_propagates() {
        let f = fixture();
        let err = f.manager.get(&repo("nobody", "nothing")).unwrap_err();
        assert!(matches!(
            relget_error(&err),
            Some(RelgetError::ReleaseNotFound(_))
        ));
    }

    #[test]
    fn test_get_binary_missing_from_archive_leaves_ledger_alone() {
        let f = fixture();
        let url = "https://example.com/tool.tar.gz";
        f.manager
            .source()
            .payloads
            .borrow_mut()
            .insert(url.to_string(), tar_gz(&[("LICENSE", b"MIT")]));
        f.manager.source().publish_assets(
            "o",
            "tool",
            "v1",
            vec![ReleaseAsset::new("tool-linux-amd64.tar.gz", url)],
        );

        let err = f.manager.get(&repo("o", "tool")).unwrap_err();
        assert!(matches!(
            relget_error(&err),
            Some(RelgetError::BinaryNotFoundInArchive(_))
        ));
        assert!(f.manager.installed().unwrap().is_empty());
        assert_eq!(f.manager.source().downloads.get(), 1);
        assert_eq!(leftover_downloads(&f), 0);
    }

    #[test]
    fn test_failed_download_leaves_no_temp_file() {
        let f = fixture();
        f.manager.source().publish_assets(
            "o",
            "tool",
            "v1",
            vec![ReleaseAsset::new("tool-linux-amd64.tar.gz", "https://example.com/gone")],
        );

        assert!(f.manager.get(&repo("o", "tool")).is_err());
        assert_eq!(f.manager.source().downloads.get(), 1);
        assert_eq!(leftover_downloads(&f), 0);
    }

    #[test]
    fn test_get_raw_binary_asset() {
        let f = fixture();
        let url = "https://example.com/tool-linux-x86_64";
        f.manager
            .source()
            .payloads
            .borrow_mut()
            .insert(url.to_string(), b"raw elf".to_vec());
        f.manager.source().publish_assets(
            "o",
            "tool",
            "v3",
            vec![ReleaseAsset::new("tool-linux-x86_64", url)],
        );

        let binary = f.manager.get(&repo("o", "tool")).unwrap();
        assert_eq!(fs::read(&binary.install_path).unwrap(), b"raw elf");
        assert_eq!(binary.asset_name, "tool-linux-x86_64");
    }

    #[test]
    fn test_update_not_installed() {
        let f = fixture();
        f.manager.source().publish("o", "tool", "v1", b"x");

        let err = f.manager.update(&repo("o", "tool")).unwrap_err();
        assert!(matches!(
            relget_error(&err),
            Some(RelgetError::NotInstalled(key)) if key == "o/tool"
        ));
    }

    #[test]
    fn test_update_without_new_release_is_noop() {
        let f = fixture();
        f.manager.source().publish("o", "tool", "v1", b"x");
        f.manager.get(&repo("o", "tool")).unwrap();
        let downloads = f.manager.source().downloads.get();

        assert!(!f.manager.update(&repo("o", "tool")).unwrap());
        assert!(!f.manager.update(&repo("o", "tool")).unwrap());

        let entry = f.manager.installed().unwrap().remove(0);
        assert_eq!(entry.version, "v1");
        assert_eq!(f.manager.source().downloads.get(), downloads);
    }

    #[test]
    fn test_update_to_new_tag_keeps_installed_at() {
        let f = fixture();
        f.manager.source().publish("o", "tool", "v1", b"one");
        let first = f.manager.get(&repo("o", "tool")).unwrap();

        f.manager.source().publish("o", "tool", "v2", b"two");
        assert!(f.manager.update(&repo("o", "tool")).unwrap());

        let entry = f.manager.installed().unwrap().remove(0);
        assert_eq!(entry.version, "v2");
        assert_eq!(entry.installed_at, first.installed_at);
        assert!(entry.updated_at >= first.updated_at);
        assert_eq!(entry.asset_name, "tool-v2-linux-amd64.tar.gz");
        assert_eq!(fs::read(&entry.install_path).unwrap(), b"two");
    }

    #[test]
    fn test_update_treats_any_tag_change_as_update() {
        let f = fixture();
        f.manager.source().publish("o", "tool", "v2.0.0", b"new");
        f.manager.get(&repo("o", "tool")).unwrap();

        f.manager.source().publish("o", "tool", "v1.9.0", b"old");
        assert!(f.manager.update(&repo("o", "tool")).unwrap());
        assert_eq!(f.manager.installed().unwrap()[0].version, "v1.9.0");
    }

    #[test]
    fn test_update_all_continues_past_failures() {
        let f = fixture();
        for name in ["one", "two", "three"] {
            f.manager.source().publish("a", name, "v1", name.as_bytes());
            f.manager.get(&repo("a", name)).unwrap();
        }

        f.manager.source().publish("a", "one", "v2", b"one v2");
        f.manager.source().publish("a", "three", "v2", b"three v2");
        f.manager.source().publish("a", "two", "v2", b"two v2");
        f.manager.source().fail("a", "two");

        assert_eq!(f.manager.update_all().unwrap(), 2);

        let document = f.manager.ledger().load().unwrap();
        assert_eq!(document.get("a", "one").unwrap().version, "v2");
        assert_eq!(document.get("a", "two").unwrap().version, "v1");
        assert_eq!(document.get("a", "three").unwrap().version, "v2");
    }

    #[test]
    fn test_update_all_outcomes_report_each_entry() {
        let f = fixture();
        for name in ["one", "two", "three"] {
            f.manager.source().publish("a", name, "v1", b"x");
            f.manager.get(&repo("a", name)).unwrap();
        }
        f.manager.source().publish("a", "three", "v2", b"y");
        f.manager.source().fail("a", "two");

        let outcomes = f.manager.update_all_outcomes().unwrap();
        assert_eq!(outcomes.len(), 3);

        let by_name: HashMap<_, _> = outcomes
            .iter()
            .map(|o| (o.repository.name.as_str(), o))
            .collect();
        assert!(matches!(by_name["one"].result, Ok(false)));
        assert!(by_name["two"].result.is_err());
        assert!(by_name["three"].was_updated());
        assert_eq!(count_updated(&outcomes), 1);
    }

    #[test]
    fn test_update_all_empty_ledger() {
        let f = fixture();
        assert_eq!(f.manager.update_all().unwrap(), 0);
    }

    #[test]
    fn test_update_all_malformed_ledger_is_error() {
        let f = fixture();
        let path = f.manager.ledger().path().to_path_buf();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "binaries = 3").unwrap();

        assert!(f.manager.update_all().is_err());
    }

    #[test]
    fn test_count_updated() {
        let outcomes = vec![
            UpdateOutcome {
                repository: repo("a", "one"),
                result: Ok(true),
            },
            UpdateOutcome {
                repository: repo("a", "two"),
                result: Err(anyhow::anyhow!("boom")),
            },
            UpdateOutcome {
                repository: repo("a", "three"),
                result: Ok(false),
            },
            UpdateOutcome {
                repository: repo("a", "four"),
                result: Ok(true),
            },
        ];
        assert_eq!(count_updated(&outcomes), 2);
        assert_eq!(count_updated(&[]), 0);
    }

    #[test]
    fn test_installed_is_sorted_by_key() {
        let f = fixture();
        for (owner, name) in [("z", "last"), ("a", "first"), ("m", "middle")] {
            f.manager.source().publish(owner, name, "v1", b"x");
            f.manager.get(&repo(owner, name)).unwrap();
        }

        let keys: Vec<_> = f
            .manager
            .installed()
            .unwrap()
            .iter()
            .map(|b| b.repository.clone())
            .collect();
        assert_eq!(keys, ["a/first", "m/middle", "z/last"]);
    }
}
