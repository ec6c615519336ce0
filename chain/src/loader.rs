//! Spec folder scanning.
//!
//! [`scan_dir`] walks one directory, keeps the files whose names follow the
//! fragment convention, reads each one eagerly, and buckets the resulting
//! [`Fragment`]s by group name. Files with other names are ignored; the
//! folder may hold anything else.
//!
//! ```no_run
//! use spec_history_chain::{HandleLedger, scan_dir};
//!
//! let mut ledger = HandleLedger::new();
//! let groups = scan_dir("specs/", &mut ledger).unwrap();
//! ledger.release_all().unwrap();
//!
//! for (name, group) in &groups {
//!     println!("{name}: {} fragment(s)", group.len());
//! }
//! ```

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use spec_history_core::{
    Document, FRAGMENT_EXTENSIONS, FragmentName, Version, extract, load_fragment,
    parse_raw_version,
};
use tracing::debug;

use crate::error::{HistoryError, Result};
use crate::lifecycle::HandleLedger;

/// One version-tagged fragment file, read into memory.
#[derive(Debug, Clone)]
pub struct Fragment {
    group: String,
    version: Version,
    path: PathBuf,
    raw: Vec<u8>,
}

impl Fragment {
    /// Creates a fragment from bytes already in memory.
    pub fn new(
        group: impl Into<String>,
        version: Version,
        path: impl Into<PathBuf>,
        raw: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            group: group.into(),
            version,
            path: path.into(),
            raw: raw.into(),
        }
    }

    /// Group name from the filename.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Version from the filename.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Path the fragment was read from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name used in messages.
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// Raw file content.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// SHA-256 hex digest of the raw content.
    pub fn checksum(&self) -> String {
        format!("{:x}", Sha256::digest(&self.raw))
    }

    /// Parses the content and checks it against the filename version.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::Fragment`] when the content is malformed or
    /// declares a different version.
    pub fn load(&self) -> Result<Document> {
        Ok(load_fragment(&self.file_name(), &self.raw, &self.version)?)
    }
}

/// All fragments sharing one group name, in discovery order.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    fragments: Vec<Fragment>,
}

impl Group {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fragments: Vec::new(),
        }
    }

    /// Adds a fragment.
    pub fn push(&mut self, fragment: Fragment) {
        self.fragments.push(fragment);
    }

    /// Adds a fragment, builder style.
    pub fn with_fragment(mut self, fragment: Fragment) -> Self {
        self.push(fragment);
        self
    }

    /// Group name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fragments in discovery order.
    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// Returns `true` if the group has no fragments.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Fragment versions in ascending order.
    pub fn versions(&self) -> Vec<&Version> {
        let mut versions: Vec<&Version> = self.fragments.iter().map(Fragment::version).collect();
        versions.sort();
        versions
    }
}

/// Scans `path` for fragment files and groups them by name.
///
/// Subdirectories are skipped. Each matched file is opened, read fully, and
/// its handle handed to `ledger`; the caller decides when to release.
/// Entries are visited in file-name order.
///
/// # Errors
///
/// - [`HistoryError::InvalidDirectory`] if `path` is missing or not a
///   directory.
/// - [`HistoryError::DirectoryUnreadable`] if it cannot be listed.
/// - [`HistoryError::InvalidFilenameVersion`] if a matched name carries an
///   unparseable version.
/// - [`HistoryError::FileUnreadable`] if a matched file cannot be opened or
///   read.
pub fn scan_dir(path: impl AsRef<Path>, ledger: &mut HandleLedger) -> Result<BTreeMap<String, Group>> {
    let path = path.as_ref();

    let metadata = std::fs::metadata(path).map_err(|err| HistoryError::InvalidDirectory {
        path: path.to_path_buf(),
        reason: format!("could not stat folder: {err}"),
    })?;
    if !metadata.is_dir() {
        return Err(HistoryError::InvalidDirectory {
            path: path.to_path_buf(),
            reason: "path given is not a folder".to_string(),
        });
    }

    let unreadable = |source: std::io::Error| HistoryError::DirectoryUnreadable {
        path: path.to_path_buf(),
        source,
    };
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(path).map_err(unreadable)? {
        entries.push(entry.map_err(unreadable)?);
    }
    entries.sort_by_key(|entry| entry.file_name());

    let mut groups: BTreeMap<String, Group> = BTreeMap::new();

    for entry in entries {
        let file_path = entry.path();
        if file_path.is_dir() {
            continue;
        }
        let file_name = entry.file_name().to_string_lossy().into_owned();

        let FragmentName::Matched { group, raw_version } = extract(&file_name) else {
            if has_fragment_extension(&file_path) {
                debug!(file = %file_name, "skipping file that does not follow <group>.<major>_<minor>_<patch> naming");
            }
            continue;
        };

        let version =
            parse_raw_version(&raw_version).map_err(|source| HistoryError::InvalidFilenameVersion {
                file: file_name.clone(),
                raw_version: raw_version.clone(),
                source,
            })?;

        let raw = read_fragment(&file_path, ledger)?;
        debug!(file = %file_name, group = %group, version = %version, bytes = raw.len(), "discovered fragment");

        groups
            .entry(group.clone())
            .or_insert_with(|| Group::new(group.clone()))
            .push(Fragment::new(group, version, file_path, raw));
    }

    Ok(groups)
}

fn read_fragment(path: &Path, ledger: &mut HandleLedger) -> Result<Vec<u8>> {
    let unreadable = |source: std::io::Error| HistoryError::FileUnreadable {
        path: path.to_path_buf(),
        source,
    };

    let mut file = File::open(path).map_err(unreadable)?;
    let mut raw = Vec::new();
    let read = file.read_to_end(&mut raw);
    ledger.track(path, file);
    read.map_err(unreadable)?;
    Ok(raw)
}

fn has_fragment_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| FRAGMENT_EXTENSIONS.contains(&ext))
}
