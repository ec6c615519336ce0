//! Merging version-tagged API specification fragments into cumulative
//! documents.
//!
//! A spec folder holds files named `<group>.<major>_<minor>_<patch>.yml`
//! (or `.yaml`). Each file is a fragment of an OpenAPI-style document that
//! declares its own version in `info.version`. This crate buckets fragments
//! by group, applies each group's fragments in ascending version order, and
//! emits one merged document per group, tracking in which version every
//! schema and route was introduced and last touched.
//!
//! # Quick start
//!
//! ```no_run
//! use spec_history_chain::{History, MigrateOptions, OutputFormat, emit_all};
//!
//! let mut history = History::open("specs/").unwrap();
//! for (name, group) in history.groups() {
//!     println!("{name}: {:?}", group.versions());
//! }
//!
//! let run = history.migrate(&MigrateOptions::default()).unwrap();
//! let pet = &run.snapshots["pet"];
//! if let Some(provenance) = pet.schema_provenance("Pet") {
//!     println!("Pet last changed in {}", provenance.last_touched);
//! }
//!
//! emit_all(&mut std::io::stdout(), &run, OutputFormat::Yaml).unwrap();
//! history.close().unwrap();
//! ```

mod chain;
mod config;
mod error;
mod history;
mod lifecycle;
mod loader;
mod manifest;
mod report;

pub use chain::{MigrateOptions, MigrationRun, migrate_group, migrate_groups};
pub use config::{FailurePolicy, HistoryConfig};
pub use error::{HistoryError, Result};
pub use history::History;
pub use lifecycle::{HandleLedger, Release};
pub use loader::{Fragment, Group, scan_dir};
pub use manifest::{FragmentRecord, GroupManifest, ProvenanceManifest};
pub use report::{OutputFormat, emit, emit_all, format_document};
