//! Provenance manifests: the changelog view of a merge run.
//!
//! The manifest records, per group, which fragments were applied (with a
//! SHA-256 checksum of each file) and the [`Provenance`] of every schema and
//! route in the final snapshot. It is written as pretty-printed JSON next to,
//! never inside, the merged documents.
//!
//! # Examples
//!
//! ```no_run
//! use spec_history_chain::{History, MigrateOptions, ProvenanceManifest};
//!
//! let history = History::open("specs/").unwrap();
//! let run = history.migrate(&MigrateOptions::default()).unwrap();
//!
//! let manifest = ProvenanceManifest::from_run(env!("CARGO_PKG_VERSION"), &history, &run);
//! manifest.save("provenance.json").unwrap();
//!
//! let loaded = ProvenanceManifest::load("provenance.json").unwrap();
//! assert_eq!(loaded.groups.len(), run.snapshots.len());
//! ```

use std::collections::BTreeMap;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use spec_history_core::{Provenance, Snapshot, Version};

use crate::chain::MigrationRun;
use crate::error::Result;
use crate::history::History;
use crate::loader::Group;

/// One applied fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentRecord {
    /// Fragment file name.
    pub file: String,
    /// Version encoded in the file name.
    pub version: Version,
    /// SHA-256 hex digest of the file content.
    pub checksum: String,
}

/// Provenance of one merged group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupManifest {
    /// Version of the highest applied fragment.
    pub latest_version: Version,
    /// Applied fragments in ascending version order.
    pub fragments: Vec<FragmentRecord>,
    /// Schema provenance keyed by schema name.
    pub schemas: BTreeMap<String, Provenance>,
    /// Route provenance keyed by `METHOD /path`.
    pub routes: BTreeMap<String, Provenance>,
}

impl GroupManifest {
    /// Builds the manifest entry for a merged `group`.
    pub fn new(group: &Group, snapshot: &Snapshot) -> Self {
        let mut fragments: Vec<FragmentRecord> = group
            .fragments()
            .iter()
            .map(|fragment| FragmentRecord {
                file: fragment.file_name(),
                version: fragment.version().clone(),
                checksum: fragment.checksum(),
            })
            .collect();
        fragments.sort_by(|a, b| a.version.cmp(&b.version));

        Self {
            latest_version: snapshot.version().clone(),
            fragments,
            schemas: snapshot.schemas().clone(),
            routes: snapshot
                .routes()
                .iter()
                .map(|(key, provenance)| (key.to_string(), provenance.clone()))
                .collect(),
        }
    }

    /// Names of entities (schemas, then routes) last touched after `version`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::collections::BTreeMap;
    /// use spec_history_chain::GroupManifest;
    /// use spec_history_core::{Provenance, Version};
    ///
    /// let touched = |major| Provenance {
    ///     introduced: Version::new(1, 0, 0),
    ///     last_touched: Version::new(major, 0, 0),
    /// };
    /// let manifest = GroupManifest {
    ///     latest_version: Version::new(3, 0, 0),
    ///     fragments: Vec::new(),
    ///     schemas: BTreeMap::from([("Pet".into(), touched(1)), ("Owner".into(), touched(3))]),
    ///     routes: BTreeMap::from([("GET /pets".into(), touched(2))]),
    /// };
    ///
    /// assert_eq!(manifest.touched_since(&Version::new(1, 0, 0)), vec!["Owner", "GET /pets"]);
    /// ```
    pub fn touched_since(&self, version: &Version) -> Vec<&str> {
        self.schemas
            .iter()
            .chain(self.routes.iter())
            .filter(|(_, provenance)| &provenance.last_touched > version)
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Provenance of every group merged in one run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvenanceManifest {
    /// Version of the tool that produced this manifest.
    pub tool_version: String,
    /// RFC 3339 timestamp of generation.
    pub generated_at: String,
    /// Per-group provenance keyed by group name.
    pub groups: BTreeMap<String, GroupManifest>,
}

impl ProvenanceManifest {
    /// Creates an empty manifest stamped with the current time.
    pub fn new(tool_version: impl Into<String>) -> Self {
        Self {
            tool_version: tool_version.into(),
            generated_at: Utc::now().to_rfc3339(),
            groups: BTreeMap::new(),
        }
    }

    /// Builds a manifest for every group merged in `run`.
    pub fn from_run(tool_version: impl Into<String>, history: &History, run: &MigrationRun) -> Self {
        let mut manifest = Self::new(tool_version);
        for (name, snapshot) in &run.snapshots {
            if let Some(group) = history.group(name) {
                manifest
                    .groups
                    .insert(name.clone(), GroupManifest::new(group, snapshot));
            }
        }
        manifest
    }

    /// Loads a manifest from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::HistoryError::IoError) if the file cannot
    /// be read, or [`JsonError`](crate::HistoryError::JsonError) if the
    /// content is not valid manifest JSON.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let manifest = serde_json::from_reader(reader)?;
        Ok(manifest)
    }

    /// Saves the manifest as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::HistoryError::IoError) if the file cannot
    /// be written, or [`JsonError`](crate::HistoryError::JsonError) if
    /// serialization fails.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Serializes the manifest as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Looks up one group's entry.
    pub fn get(&self, group: &str) -> Option<&GroupManifest> {
        self.groups.get(group)
    }
}

#[cfg(test)]
mod tests {
    use spec_history_core::Document;

    use super::*;
    use crate::chain::migrate_group;
    use crate::loader::Fragment;

    fn v(major: u64, minor: u64, patch: u64) -> Version {
        Version::new(major, minor, patch)
    }

    fn pet_group() -> Group {
        Group::new("pet")
            .with_fragment(Fragment::new(
                "pet",
                v(1, 1, 0),
                "pet.1_1_0.yaml",
                b"info: { version: \"1.1.0\" }\npaths: { /pets: { post: {} } }\n".to_vec(),
            ))
            .with_fragment(Fragment::new(
                "pet",
                v(1, 0, 0),
                "pet.1_0_0.yaml",
                b"info: { version: \"1.0.0\" }\npaths: { /pets: { get: {} } }\ncomponents: { schemas: { Pet: {} } }\n"
                    .to_vec(),
            ))
    }

    #[test]
    fn test_group_manifest_records_fragments_and_entities() {
        let group = pet_group();
        let snapshot = migrate_group(&group).unwrap();
        let manifest = GroupManifest::new(&group, &snapshot);

        assert_eq!(manifest.latest_version, v(1, 1, 0));
        let files: Vec<&str> = manifest.fragments.iter().map(|f| f.file.as_str()).collect();
        assert_eq!(files, vec!["pet.1_0_0.yaml", "pet.1_1_0.yaml"]);
        assert!(manifest.fragments.iter().all(|f| f.checksum.len() == 64));

        assert_eq!(manifest.schemas["Pet"].last_touched, v(1, 0, 0));
        assert_eq!(manifest.routes["GET /pets"].last_touched, v(1, 0, 0));
        assert_eq!(manifest.routes["POST /pets"].introduced, v(1, 1, 0));
        assert_eq!(manifest.touched_since(&v(1, 0, 0)), vec!["POST /pets"]);
    }

    #[test]
    fn test_manifest_save_load_roundtrip() {
        let group = pet_group();
        let snapshot = migrate_group(&group).unwrap();
        let mut manifest = ProvenanceManifest::new("0.1.0");
        manifest
            .groups
            .insert("pet".to_string(), GroupManifest::new(&group, &snapshot));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("provenance.json");
        manifest.save(&path).unwrap();

        let loaded = ProvenanceManifest::load(&path).unwrap();
        assert_eq!(loaded.tool_version, "0.1.0");
        assert_eq!(loaded.generated_at, manifest.generated_at);
        assert_eq!(loaded.get("pet"), manifest.get("pet"));
    }

    #[test]
    fn test_versions_serialize_as_strings() {
        let snapshot = Snapshot::base(Document::new("1.0.0"), v(1, 0, 0));
        let manifest = GroupManifest::new(&Group::new("empty"), &snapshot);
        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["latest_version"], "1.0.0");
    }
}
