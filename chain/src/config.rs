//! Run configuration for spec history merges.
//!
//! Defines the YAML-serializable configuration that controls where fragments
//! are read from, which groups are merged, and how failures and output are
//! handled.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! spec_folder: specs/
//! format: json
//! failure_policy: abort
//! jobs: 4
//! groups:
//!   - pet
//!   - store
//! exclude:
//!   - legacy
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chain::MigrateOptions;
use crate::error::{HistoryError, Result};
use crate::report::OutputFormat;

/// What happens to a run when one group fails to merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop at the first failing group; nothing is emitted.
    #[default]
    Abort,
    /// Leave the failing group out and keep merging the others.
    SkipGroup,
}

fn default_config_version() -> String {
    "1.0".to_string()
}

fn default_jobs() -> usize {
    1
}

/// Top-level run configuration.
///
/// # Examples
///
/// ```
/// use spec_history_chain::{FailurePolicy, HistoryConfig};
///
/// let config: HistoryConfig = serde_yaml::from_str("spec_folder: specs/\n").unwrap();
/// assert_eq!(config.failure_policy, FailurePolicy::Abort);
/// assert_eq!(config.jobs, 1);
/// assert!(config.is_allowed("pet"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Configuration format version.
    #[serde(default = "default_config_version")]
    pub version: String,
    /// Directory holding the fragment files.
    pub spec_folder: PathBuf,
    /// Output format for merged documents.
    #[serde(default)]
    pub format: OutputFormat,
    /// Behaviour when a group fails.
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Number of groups merged in parallel.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
    /// Groups to merge (empty = all discovered groups).
    #[serde(default)]
    pub groups: Vec<String>,
    /// Groups to skip.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl HistoryConfig {
    /// Creates a configuration for `spec_folder` with default settings.
    pub fn new(spec_folder: impl Into<PathBuf>) -> Self {
        Self {
            version: default_config_version(),
            spec_folder: spec_folder.into(),
            format: OutputFormat::default(),
            failure_policy: FailurePolicy::default(),
            jobs: default_jobs(),
            groups: Vec::new(),
            exclude: Vec::new(),
        }
    }

    /// Loads configuration from a YAML file and validates it.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](HistoryError::IoError) if the file cannot be read,
    /// [`YamlError`](HistoryError::YamlError) if parsing fails, or
    /// [`InvalidConfig`](HistoryError::InvalidConfig) if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config: HistoryConfig = serde_yaml::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](HistoryError::IoError) if the file cannot be
    /// written, or [`YamlError`](HistoryError::YamlError) if serialization
    /// fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Checks required fields and ranges.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidConfig`](HistoryError::InvalidConfig) if
    /// `spec_folder` is empty or `jobs` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.spec_folder.as_os_str().is_empty() {
            return Err(HistoryError::InvalidConfig(
                "spec folder must be specified".to_string(),
            ));
        }
        if self.jobs == 0 {
            return Err(HistoryError::InvalidConfig(
                "jobs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Migration options carried by this configuration.
    pub fn migrate_options(&self) -> MigrateOptions {
        MigrateOptions {
            failure_policy: self.failure_policy,
            jobs: self.jobs,
        }
    }

    /// Returns `true` if `group` is in the exclusion list.
    pub fn is_excluded(&self, group: &str) -> bool {
        self.exclude.iter().any(|g| g == group)
    }

    /// Returns `true` if `group` should be merged.
    ///
    /// An empty `groups` list allows every group that is not excluded.
    /// Exclusions always win.
    pub fn is_allowed(&self, group: &str) -> bool {
        if self.is_excluded(group) {
            return false;
        }
        if self.groups.is_empty() {
            return true;
        }
        self.groups.iter().any(|g| g == group)
    }
}
