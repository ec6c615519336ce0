//! Fragment loading and version validation.
//!
//! A fragment's filename and its `info.version` must agree. [`load_fragment`]
//! parses the raw bytes and enforces that invariant; a fragment that fails
//! is never handed to the merger.

use std::cmp::Ordering;

use semver::Version;
use thiserror::Error;

use crate::Document;

/// Errors raised while turning a fragment's bytes into a [`Document`].
///
/// Every variant names the fragment file so the message can be shown to a
/// user without further context.
#[derive(Debug, Error)]
pub enum FragmentError {
    /// The content is not a valid specification document.
    #[error("unable to load {file} into specification format: {source}")]
    Malformed {
        file: String,
        #[source]
        source: serde_yaml::Error,
    },
    /// `info.version` is not a valid version string.
    #[error("invalid version string {version:?} in {file}: {source}")]
    InvalidVersionString {
        file: String,
        version: String,
        #[source]
        source: semver::Error,
    },
    /// `info.version` disagrees with the version encoded in the filename.
    #[error(
        "version mismatch in {file}, version of file: {filename_version}, version of spec: {declared_version}"
    )]
    NamingMismatch {
        file: String,
        filename_version: Version,
        declared_version: Version,
    },
}

impl FragmentError {
    /// Returns the fragment file name the error refers to.
    pub fn file(&self) -> &str {
        match self {
            FragmentError::Malformed { file, .. }
            | FragmentError::InvalidVersionString { file, .. }
            | FragmentError::NamingMismatch { file, .. } => file,
        }
    }
}

/// Parses `raw` as a specification document and checks that its
/// self-declared version equals `expected`.
///
/// `file` is only used for error messages.
///
/// # Errors
///
/// - [`FragmentError::Malformed`] if `raw` is not a specification document.
/// - [`FragmentError::InvalidVersionString`] if `info.version` cannot be
///   parsed.
/// - [`FragmentError::NamingMismatch`] if the declared version differs from
///   `expected` in major, minor, patch or pre-release. Build metadata is
///   ignored.
///
/// # Examples
///
/// ```
/// use semver::Version;
/// use spec_history_core::{FragmentError, load_fragment};
///
/// let raw = b"info:\n  version: 1.1.0\n";
/// let doc = load_fragment("pet.1_1_0.yaml", raw, &Version::new(1, 1, 0)).unwrap();
/// assert_eq!(doc.info.version, "1.1.0");
///
/// let err = load_fragment("pet.1_0_0.yaml", raw, &Version::new(1, 0, 0)).unwrap_err();
/// assert!(matches!(err, FragmentError::NamingMismatch { .. }));
/// ```
pub fn load_fragment(file: &str, raw: &[u8], expected: &Version) -> Result<Document, FragmentError> {
    let document: Document =
        serde_yaml::from_slice(raw).map_err(|source| FragmentError::Malformed {
            file: file.to_string(),
            source,
        })?;

    let declared = document.info.version.trim();
    let declared = Version::parse(declared).map_err(|source| {
        FragmentError::InvalidVersionString {
            file: file.to_string(),
            version: document.info.version.clone(),
            source,
        }
    })?;

    // Build metadata carries no precedence, so `1.0.0+build` matches `1_0_0`.
    if declared.cmp_precedence(expected) != Ordering::Equal {
        return Err(FragmentError::NamingMismatch {
            file: file.to_string(),
            filename_version: expected.clone(),
            declared_version: declared,
        });
    }

    Ok(document)
}
