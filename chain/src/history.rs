//! The top-level entry point: open a spec folder, merge it, close it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::chain::{MigrateOptions, MigrationRun, migrate_groups};
use crate::config::HistoryConfig;
use crate::error::{HistoryError, Result};
use crate::lifecycle::HandleLedger;
use crate::loader::{Group, scan_dir};

/// A scanned spec folder, ready to merge.
///
/// Opening reads every fragment into memory and releases the file handles
/// straight away, so a `History` holds no OS resources. A release failure
/// does not fail [`open`](Self::open); it is kept and reported by
/// [`close`](Self::close).
///
/// # Examples
///
/// ```no_run
/// use spec_history_chain::{History, MigrateOptions, OutputFormat, emit_all};
///
/// let mut history = History::open("specs/").unwrap();
/// let run = history.migrate(&MigrateOptions::default()).unwrap();
/// emit_all(&mut std::io::stdout(), &run, OutputFormat::Json).unwrap();
/// history.close().unwrap();
/// ```
#[derive(Debug)]
pub struct History {
    root: PathBuf,
    groups: BTreeMap<String, Group>,
    release_error: Option<HistoryError>,
}

impl History {
    /// Scans `dir` and releases every handle opened while scanning.
    ///
    /// # Errors
    ///
    /// Returns the scan error; see [`scan_dir`]. Handles are released even
    /// then.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        Self::open_with(dir.as_ref(), HandleLedger::new())
    }

    /// Opens `config.spec_folder`, keeping only the groups the config allows.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::InvalidConfig`] if the config does not
    /// validate, or any error from [`open`](Self::open).
    pub fn from_config(config: &HistoryConfig) -> Result<Self> {
        config.validate()?;
        let mut history = Self::open(&config.spec_folder)?;
        history.groups.retain(|name, _| config.is_allowed(name));
        Ok(history)
    }

    pub(crate) fn open_with(dir: &Path, mut ledger: HandleLedger) -> Result<Self> {
        let scanned = scan_dir(dir, &mut ledger);
        let released = ledger.release_all();

        let groups = scanned?;
        let release_error = released.err();
        if let Some(err) = &release_error {
            warn!(dir = %dir.display(), error = %err, "fragments read but a handle failed to release");
        }

        info!(
            dir = %dir.display(),
            groups = groups.len(),
            fragments = groups.values().map(Group::len).sum::<usize>(),
            "opened spec folder"
        );
        Ok(Self {
            root: dir.to_path_buf(),
            groups,
            release_error,
        })
    }

    /// Folder this history was read from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Discovered groups, by name.
    pub fn groups(&self) -> &BTreeMap<String, Group> {
        &self.groups
    }

    /// Looks up one group.
    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    /// Merges every group; see [`migrate_groups`].
    pub fn migrate(&self, options: &MigrateOptions) -> Result<MigrationRun> {
        migrate_groups(&self.groups, options)
    }

    /// Reports any failure from releasing discovery handles.
    ///
    /// Output already produced stays valid either way. The failure is
    /// reported once; later calls return `Ok(())`.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::ResourceRelease`] for the first handle that
    /// failed to release.
    pub fn close(&mut self) -> Result<()> {
        match self.release_error.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
