//! Migration chains: folding a group's fragments into one snapshot.
//!
//! Fragments are applied strictly in ascending version order. The overlay
//! is not commutative, so a later version may override an earlier one but
//! never the reverse.

use std::collections::BTreeMap;

use rayon::prelude::*;
use spec_history_core::Snapshot;
use tracing::{debug, info, warn};

use crate::config::FailurePolicy;
use crate::error::{HistoryError, Result};
use crate::loader::{Fragment, Group};

/// Merges one group's fragments into its cumulative snapshot.
///
/// The lowest version is loaded as the base; every following fragment is
/// loaded and overlaid in order. A failure discards the group's partial
/// result.
///
/// # Errors
///
/// - [`HistoryError::EmptyGroup`] if the group has no fragments.
/// - [`HistoryError::DuplicateVersion`] if two fragments share a version.
/// - [`HistoryError::Fragment`] if the base fragment fails to load.
/// - [`HistoryError::Migration`] if a later fragment fails to load, naming
///   the version transition.
///
/// Errors are not wrapped with the group name; see [`migrate_groups`].
pub fn migrate_group(group: &Group) -> Result<Snapshot> {
    let ordered = ordered_fragments(group)?;
    let Some((base, rest)) = ordered.split_first() else {
        return Err(HistoryError::EmptyGroup {
            group: group.name().to_string(),
        });
    };

    let mut snapshot = Snapshot::base(base.load()?, base.version().clone());
    debug!(group = group.name(), version = %base.version(), "loaded base fragment");

    for fragment in rest {
        let from = snapshot.version().clone();
        let to = fragment.version().clone();
        let document = fragment.load().map_err(|source| HistoryError::Migration {
            from,
            to: to.clone(),
            source: Box::new(source),
        })?;
        snapshot = snapshot.overlay(document, to);
        debug!(group = group.name(), version = %fragment.version(), "applied fragment");
    }

    info!(
        group = group.name(),
        fragments = ordered.len(),
        version = %snapshot.version(),
        schemas = snapshot.schemas().len(),
        routes = snapshot.routes().len(),
        "merged group"
    );
    Ok(snapshot)
}

/// Sorts fragments by version and rejects duplicates.
fn ordered_fragments(group: &Group) -> Result<Vec<&Fragment>> {
    let mut ordered: Vec<&Fragment> = group.fragments().iter().collect();
    ordered.sort_by(|a, b| a.version().cmp(b.version()));

    for pair in ordered.windows(2) {
        if pair[0].version() == pair[1].version() {
            return Err(HistoryError::DuplicateVersion {
                group: group.name().to_string(),
                version: pair[0].version().clone(),
                first: pair[0].file_name(),
                second: pair[1].file_name(),
            });
        }
    }

    Ok(ordered)
}

/// Options for migrating many groups at once.
#[derive(Debug, Clone)]
pub struct MigrateOptions {
    /// What to do when a group fails.
    pub failure_policy: FailurePolicy,
    /// Number of groups merged in parallel; `1` merges sequentially.
    pub jobs: usize,
}

impl Default for MigrateOptions {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Abort,
            jobs: 1,
        }
    }
}

/// Outcome of migrating every group.
#[derive(Debug, Default)]
pub struct MigrationRun {
    /// Final snapshot of each successfully merged group, by group name.
    pub snapshots: BTreeMap<String, Snapshot>,
    /// Groups skipped under [`FailurePolicy::SkipGroup`], in name order.
    pub failures: Vec<HistoryError>,
}

impl MigrationRun {
    /// Returns `true` if every group merged.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Merges every group independently.
///
/// Groups share no state, so they are merged on a pool of `options.jobs`
/// threads. Results are ordered by group name regardless of completion order.
///
/// # Errors
///
/// Under [`FailurePolicy::Abort`] the first failing group (in name order) is
/// returned as [`HistoryError::Group`]. Under [`FailurePolicy::SkipGroup`]
/// failures are collected in [`MigrationRun::failures`] and only pool
/// construction can fail.
pub fn migrate_groups(
    groups: &BTreeMap<String, Group>,
    options: &MigrateOptions,
) -> Result<MigrationRun> {
    let merge_one = |group: &Group| {
        (
            group.name().to_string(),
            migrate_group(group).map_err(|err| err.in_group(group.name())),
        )
    };

    let results: Vec<(String, Result<Snapshot>)> = if options.jobs > 1 {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(options.jobs)
            .build()
            .map_err(|err| HistoryError::InvalidConfig(format!("failed to build thread pool: {err}")))?;
        pool.install(|| groups.par_iter().map(|(_, group)| merge_one(group)).collect())
    } else {
        groups.values().map(merge_one).collect()
    };

    let mut run = MigrationRun::default();
    for (name, result) in results {
        match result {
            Ok(snapshot) => {
                run.snapshots.insert(name, snapshot);
            }
            Err(err) => match options.failure_policy {
                FailurePolicy::Abort => return Err(err),
                FailurePolicy::SkipGroup => {
                    warn!(group = %name, error = %err, "skipping group");
                    run.failures.push(err);
                }
            },
        }
    }

    Ok(run)
}

#[cfg(test)]
mod tests {
    use spec_history_core::{FragmentError, Version};

    use super::*;

    fn v(major: u64, minor: u64, patch: u64) -> Version {
        Version::new(major, minor, patch)
    }

    fn fragment(group: &str, version: Version, body: &str) -> Fragment {
        let file = format!(
            "{group}.{}_{}_{}.yaml",
            version.major, version.minor, version.patch
        );
        Fragment::new(group, version, file, body.as_bytes().to_vec())
    }

    fn pet_group() -> Group {
        // Discovery order deliberately differs from version order.
        Group::new("pet")
            .with_fragment(fragment(
                "pet",
                v(2, 0, 0),
                r#"
info: { version: "2.0.0" }
components:
  schemas:
    Owner: { properties: { id: { type: integer } } }
"#,
            ))
            .with_fragment(fragment(
                "pet",
                v(1, 0, 0),
                r#"
info: { version: "1.0.0" }
components:
  schemas:
    Pet: { properties: { name: { type: string } } }
"#,
            ))
            .with_fragment(fragment(
                "pet",
                v(1, 1, 0),
                r#"
info: { version: "1.1.0" }
components:
  schemas:
    Pet: { properties: { name: { type: string }, age: { type: integer } } }
"#,
            ))
    }

    #[test]
    fn test_pet_scenario() {
        let snapshot = migrate_group(&pet_group()).unwrap();

        let schemas = &snapshot.document().components.schemas;
        assert_eq!(schemas.len(), 2);
        let pet_props = schemas["Pet"].get("properties").unwrap();
        assert!(pet_props.get("name").is_some());
        assert!(pet_props.get("age").is_some());
        assert!(schemas["Owner"].get("properties").unwrap().get("id").is_some());

        assert_eq!(snapshot.schema_provenance("Pet").unwrap().last_touched, v(1, 1, 0));
        assert_eq!(snapshot.schema_provenance("Pet").unwrap().introduced, v(1, 0, 0));
        assert_eq!(snapshot.schema_provenance("Owner").unwrap().last_touched, v(2, 0, 0));
        assert_eq!(snapshot.version(), &v(2, 0, 0));
        assert_eq!(snapshot.document().info.version, "2.0.0");
    }

    #[test]
    fn test_single_fragment_group_is_base() {
        let body = "info: { version: \"1.0.0\" }\ncomponents: { schemas: { Pet: { type: object } } }\n";
        let group = Group::new("pet").with_fragment(fragment("pet", v(1, 0, 0), body));

        let snapshot = migrate_group(&group).unwrap();
        let base: spec_history_core::Document = serde_yaml::from_str(body).unwrap();
        assert_eq!(snapshot.document(), &base);
        assert_eq!(snapshot.schema_provenance("Pet").unwrap().last_touched, v(1, 0, 0));
    }

    #[test]
    fn test_duplicate_version_is_rejected() {
        let group = Group::new("pet")
            .with_fragment(Fragment::new(
                "pet",
                v(1, 0, 0),
                "pet.1_0_0.yaml",
                b"info: { version: \"1.0.0\" }\n".to_vec(),
            ))
            .with_fragment(Fragment::new(
                "pet",
                v(1, 0, 0),
                "pet.1_0_0.yml",
                b"info: { version: \"1.0.0\" }\n".to_vec(),
            ));

        let err = migrate_group(&group).unwrap_err();
        match err {
            HistoryError::DuplicateVersion { group, version, .. } => {
                assert_eq!(group, "pet");
                assert_eq!(version, v(1, 0, 0));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_group_is_rejected() {
        let err = migrate_group(&Group::new("pet")).unwrap_err();
        assert!(matches!(err, HistoryError::EmptyGroup { .. }));
        assert_eq!(err.group(), Some("pet"));
    }

    #[test]
    fn test_migrate_groups_names_duplicate_group_once() {
        let group = Group::new("pet")
            .with_fragment(fragment("pet", v(1, 0, 0), "info: { version: \"1.0.0\" }\n"))
            .with_fragment(Fragment::new(
                "pet",
                v(1, 0, 0),
                "pet.1_0_0.yml",
                b"info: { version: \"1.0.0\" }\n".to_vec(),
            ));

        let err = migrate_groups(&groups(vec![group]), &MigrateOptions::default()).unwrap_err();
        assert!(matches!(err, HistoryError::DuplicateVersion { .. }));
        assert_eq!(
            err.to_string(),
            "duplicate version 1.0.0 in group pet: pet.1_0_0.yaml and pet.1_0_0.yml"
        );
    }

    #[test]
    fn test_base_naming_mismatch() {
        let group = Group::new("pet").with_fragment(fragment(
            "pet",
            v(1, 0, 0),
            "info: { version: \"1.1.0\" }\n",
        ));

        let err = migrate_group(&group).unwrap_err();
        assert!(matches!(err, HistoryError::Fragment { .. }));
        match err.fragment_error() {
            Some(FragmentError::NamingMismatch {
                filename_version,
                declared_version,
                ..
            }) => {
                assert_eq!(filename_version, &v(1, 0, 0));
                assert_eq!(declared_version, &v(1, 1, 0));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_later_naming_mismatch_names_transition() {
        let group = Group::new("pet")
            .with_fragment(fragment("pet", v(1, 0, 0), "info: { version: \"1.0.0\" }\n"))
            .with_fragment(fragment("pet", v(1, 1, 0), "info: { version: \"1.2.0\" }\n"));

        let err = migrate_group(&group).unwrap_err();
        match &err {
            HistoryError::Migration { from, to, .. } => {
                assert_eq!(from, &v(1, 0, 0));
                assert_eq!(to, &v(1, 1, 0));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(matches!(
            err.fragment_error(),
            Some(FragmentError::NamingMismatch { .. })
        ));
        assert!(err.to_string().starts_with("unable to migrate from 1.0.0 to 1.1.0"));
    }

    #[test]
    fn test_malformed_fragment_aborts_chain() {
        let group = Group::new("pet")
            .with_fragment(fragment("pet", v(1, 0, 0), "info: { version: \"1.0.0\" }\n"))
            .with_fragment(fragment("pet", v(1, 1, 0), "info: [broken"));

        let err = migrate_group(&group).unwrap_err();
        assert!(matches!(
            err.fragment_error(),
            Some(FragmentError::Malformed { .. })
        ));
    }

    fn broken_group(name: &str) -> Group {
        Group::new(name).with_fragment(fragment(name, v(1, 0, 0), "info: { version: \"9.9.9\" }\n"))
    }

    fn groups(list: Vec<Group>) -> BTreeMap<String, Group> {
        list.into_iter()
            .map(|group| (group.name().to_string(), group))
            .collect()
    }

    #[test]
    fn test_migrate_groups_abort_names_group() {
        let all = groups(vec![pet_group(), broken_group("store")]);

        let err = migrate_groups(&all, &MigrateOptions::default()).unwrap_err();
        assert_eq!(err.group(), Some("store"));
        assert!(err.to_string().starts_with("group store: "));
    }

    #[test]
    fn test_migrate_groups_skip_keeps_healthy_groups() {
        let all = groups(vec![pet_group(), broken_group("store"), broken_group("user")]);
        let options = MigrateOptions {
            failure_policy: FailurePolicy::SkipGroup,
            jobs: 1,
        };

        let run = migrate_groups(&all, &options).unwrap();
        assert!(!run.is_complete());
        assert_eq!(run.snapshots.keys().collect::<Vec<_>>(), vec!["pet"]);
        let failed: Vec<_> = run.failures.iter().filter_map(HistoryError::group).collect();
        assert_eq!(failed, vec!["store", "user"]);
    }

    #[test]
    fn test_migrate_groups_in_parallel_matches_sequential() {
        let mut list = vec![pet_group()];
        for name in ["a", "b", "c", "d"] {
            list.push(Group::new(name).with_fragment(fragment(
                name,
                v(1, 0, 0),
                "info: { version: \"1.0.0\" }\n",
            )));
        }
        let all = groups(list);

        let sequential = migrate_groups(&all, &MigrateOptions::default()).unwrap();
        let parallel = migrate_groups(
            &all,
            &MigrateOptions {
                failure_policy: FailurePolicy::Abort,
                jobs: 4,
            },
        )
        .unwrap();

        assert_eq!(sequential.snapshots, parallel.snapshots);
        assert!(parallel.is_complete());
    }
}
