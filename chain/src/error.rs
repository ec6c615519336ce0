//! Error types for scanning and migrating fragment histories.
//!
//! [`HistoryError`] covers every failure mode of a run: configuration and
//! directory problems, unreadable fragments, broken version chains, and
//! resource release during teardown. Fragment-level failures keep their
//! [`FragmentError`] as the source.

use std::path::PathBuf;

use spec_history_core::{FragmentError, Version};
use thiserror::Error;

/// Errors that can occur while building or migrating fragment groups.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The input path is missing or is not a directory.
    #[error("invalid spec folder {}: {reason}", path.display())]
    InvalidDirectory { path: PathBuf, reason: String },

    /// The input directory could not be listed.
    #[error("unable to read folder {}: {source}", path.display())]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration values are missing or out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A fragment file matched the naming convention but could not be read.
    #[error("unable to open migration file {}: {source}", path.display())]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The filename's version component is not a valid version.
    #[error("unable to format version {raw_version}, file: {file}: {source}")]
    InvalidFilenameVersion {
        file: String,
        raw_version: String,
        #[source]
        source: semver::Error,
    },

    /// A fragment failed to load (malformed content or version mismatch).
    #[error("{source}")]
    Fragment {
        file: String,
        #[source]
        source: FragmentError,
    },

    /// Two fragments of one group declare the same version.
    #[error("duplicate version {version} in group {group}: {first} and {second}")]
    DuplicateVersion {
        group: String,
        version: Version,
        first: String,
        second: String,
    },

    /// A group was built without any fragment. [`scan_dir`](crate::scan_dir)
    /// never produces one; groups assembled by hand can.
    #[error("group {group} has no fragments")]
    EmptyGroup { group: String },

    /// Applying a fragment on top of the previous snapshot failed.
    #[error("unable to migrate from {from} to {to}: {source}")]
    Migration {
        from: Version,
        to: Version,
        #[source]
        source: Box<HistoryError>,
    },

    /// A group failed; carries the group name.
    #[error("group {group}: {source}")]
    Group {
        group: String,
        #[source]
        source: Box<HistoryError>,
    },

    /// A file handle failed to release during teardown.
    #[error("unable to close file {}: {source}", path.display())]
    ResourceRelease {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing or serialization failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl HistoryError {
    /// Strips [`Group`](HistoryError::Group) and
    /// [`Migration`](HistoryError::Migration) context, returning the error
    /// that actually stopped the chain.
    pub fn root_cause(&self) -> &HistoryError {
        match self {
            HistoryError::Group { source, .. } | HistoryError::Migration { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }

    /// Returns the underlying fragment error, if the chain stopped on one.
    pub fn fragment_error(&self) -> Option<&FragmentError> {
        match self.root_cause() {
            HistoryError::Fragment { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Returns the failing group's name, if known.
    pub fn group(&self) -> Option<&str> {
        match self {
            HistoryError::Group { group, .. }
            | HistoryError::DuplicateVersion { group, .. }
            | HistoryError::EmptyGroup { group } => Some(group),
            _ => None,
        }
    }

    /// Attaches the group name, unless the error already carries it.
    pub(crate) fn in_group(self, group: &str) -> HistoryError {
        if self.group().is_some() {
            return self;
        }
        HistoryError::Group {
            group: group.to_string(),
            source: Box::new(self),
        }
    }
}

impl From<FragmentError> for HistoryError {
    fn from(source: FragmentError) -> Self {
        HistoryError::Fragment {
            file: source.file().to_string(),
            source,
        }
    }
}

/// Convenience alias for results with [`HistoryError`].
pub type Result<T> = std::result::Result<T, HistoryError>;
