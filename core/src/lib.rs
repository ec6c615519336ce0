//! Core types for merging versioned API specification fragments.
//!
//! A specification's history is kept as a set of fragment files, one per
//! version, named `<group>.<major>_<minor>_<patch>.<yml|yaml>`. This crate
//! provides the building blocks to fold such a history into one cumulative
//! document:
//!
//! - [`extract`]: match a filename against the naming convention.
//! - [`load_fragment`]: parse a fragment and check its declared version.
//! - [`Document`]: the specification model (schemas, routes, metadata).
//! - [`Snapshot`]: a cumulative document with per-entity [`Provenance`].
//!
//! # Example
//!
//! ```
//! use spec_history_core::*;
//!
//! let FragmentName::Matched { raw_version, .. } = extract("pet.1_0_0.yaml") else {
//!     panic!("expected a fragment name");
//! };
//! let version = parse_raw_version(&raw_version).unwrap();
//!
//! let raw = b"info:\n  version: 1.0.0\ncomponents:\n  schemas:\n    Pet: {}\n";
//! let document = load_fragment("pet.1_0_0.yaml", raw, &version).unwrap();
//!
//! let snapshot = Snapshot::base(document, version.clone());
//! assert_eq!(snapshot.schema_provenance("Pet").unwrap().last_touched, version);
//! ```

mod load;
mod merge;
mod types;
mod version;

pub use load::{FragmentError, load_fragment};
pub use merge::{Provenance, Snapshot};
pub use types::*;
pub use version::{FRAGMENT_EXTENSIONS, FragmentName, extract, parse_raw_version};

pub use semver::Version;
