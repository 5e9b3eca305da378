//! Durable record of installed binaries.
//!
//! The whole document is read on every access and rewritten in full on
//! every change. There is no locking: two concurrent writers race and the
//! last one wins.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// One tracked binary
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InstalledBinary {
    /// `owner/name`
    pub repository: String,
    pub owner: String,
    pub name: String,
    /// Tag of the installed release
    pub version: String,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub asset_name: String,
    pub install_path: PathBuf,
}

impl InstalledBinary {
    pub fn key(&self) -> String {
        ledger_key(&self.owner, &self.name)
    }
}

/// On-disk shape of the ledger file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LedgerDocument {
    #[serde(default)]
    pub binaries: BTreeMap<String, InstalledBinary>,
}

impl LedgerDocument {
    pub fn get(&self, owner: &str, name: &str) -> Option<&InstalledBinary> {
        self.binaries.get(&ledger_key(owner, name))
    }

    /// Insert or replace the record for the binary's repository.
    ///
    /// A replaced record keeps its original `installed_at`.
    pub fn upsert(&mut self, mut binary: InstalledBinary) -> &InstalledBinary {
        match self.binaries.entry(binary.key()) {
            Entry::Occupied(mut entry) => {
                binary.installed_at = entry.get().installed_at;
                entry.insert(binary);
                entry.into_mut()
            }
            Entry::Vacant(entry) => entry.insert(binary),
        }
    }
}

pub fn ledger_key(owner: &str, name: &str) -> String {
    format!("{owner}/{name}")
}

/// The ledger file and the operations allowed on it
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
}

impl Ledger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the ledger. A missing file is an empty ledger; a file that
    /// exists but cannot be parsed is an error and is never reset.
    pub fn load(&self) -> Result<LedgerDocument> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::debug!("No ledger at {}, starting empty", self.path.display());
                return Ok(LedgerDocument::default());
            }
            Err(err) => {
                return Err(err).with_context(|| {
                    format!("Failed to read ledger file: {}", self.path.display())
                });
            }
        };

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse ledger file: {}", self.path.display()))
    }

    /// Rewrite the whole ledger.
    ///
    /// Each save writes its own uniquely named sibling file and renames it
    /// over the ledger, so readers never see a partial document and
    /// concurrent savers simply race for the last rename.
    pub fn save(&self, document: &LedgerDocument) -> Result<()> {
        let content = toml::to_string_pretty(document).context("Failed to serialize ledger")?;

        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;

        let mut temp_file = tempfile::Builder::new()
            .prefix(".binaries-")
            .suffix(".toml.tmp")
            .tempfile_in(parent)
            .with_context(|| format!("Failed to create temporary ledger in {}", parent.display()))?;
        temp_file
            .write_all(content.as_bytes())
            .context("Failed to write temporary ledger")?;

        // On failure the temporary file comes back inside the error and is
        // removed when that is dropped
        temp_file
            .persist(&self.path)
            .map_err(|err| err.error)
            .with_context(|| {
                format!("Failed to move temporary ledger into place: {}", self.path.display())
            })?;

        log::debug!(
            "Saved ledger with {} entries to {}",
            document.binaries.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Load, apply `change`, and save the ledger as one step.
    pub fn modify<T>(&self, change: impl FnOnce(&mut LedgerDocument) -> T) -> Result<T> {
        let mut document = self.load()?;
        let result = change(&mut document);
        self.save(&document)?;
        Ok(result)
    }

    /// Record a successful install, returning the stored entry
    pub fn record(&self, binary: InstalledBinary) -> Result<InstalledBinary> {
        self.modify(|document| document.upsert(binary).clone())
    }
}
