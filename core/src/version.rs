//! Fragment filename parsing.
//!
//! Fragment files follow the convention
//! `<group>.<major>_<minor>_<patch>.<yml|yaml>`, for example
//! `pet.1_2_0.yaml`. The group is an ASCII alphanumeric token and the version
//! uses underscores in place of dots.
//!
//! Filenames that do not follow the convention are an expected case (the
//! directory may hold unrelated files), so [`extract`] reports them as
//! [`FragmentName::Unmatched`] rather than as an error.

use std::sync::LazyLock;

use regex::Regex;
use semver::Version;

/// File extensions recognized as specification fragments.
pub const FRAGMENT_EXTENSIONS: &[&str] = &["yml", "yaml"];

static FRAGMENT_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<group>[A-Za-z0-9]+)\.(?P<version>[0-9]+_[0-9]+_[0-9]+)\.(?P<ext>yml|yaml)$")
        .expect("static regex must compile")
});

/// Result of matching a filename against the fragment naming convention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentName {
    /// The filename follows the convention.
    Matched {
        /// Logical group the fragment belongs to.
        group: String,
        /// Version component exactly as written, e.g. `1_2_0`.
        raw_version: String,
    },
    /// The filename is not a fragment.
    Unmatched,
}

impl FragmentName {
    /// Returns `true` when the filename follows the convention.
    pub fn is_match(&self) -> bool {
        matches!(self, FragmentName::Matched { .. })
    }
}

/// Matches `filename` (a bare file name, not a path) against the fragment
/// naming convention.
///
/// # Examples
///
/// ```
/// use spec_history_core::{FragmentName, extract};
///
/// assert_eq!(
///     extract("pet.1_2_0.yaml"),
///     FragmentName::Matched { group: "pet".into(), raw_version: "1_2_0".into() },
/// );
/// assert_eq!(extract("notes.txt"), FragmentName::Unmatched);
/// ```
pub fn extract(filename: &str) -> FragmentName {
    match FRAGMENT_NAME_RE.captures(filename) {
        Some(caps) => FragmentName::Matched {
            group: caps["group"].to_string(),
            raw_version: caps["version"].to_string(),
        },
        None => FragmentName::Unmatched,
    }
}

/// Converts an underscore-separated version (`1_2_0`) into a strict
/// three-part [`Version`].
///
/// # Errors
///
/// Fails when the dotted form is not a valid version, e.g. `01_0_0`
/// (leading zeros) or a component that overflows `u64`.
///
/// # Examples
///
/// ```
/// use spec_history_core::parse_raw_version;
///
/// let version = parse_raw_version("2_10_3").unwrap();
/// assert_eq!((version.major, version.minor, version.patch), (2, 10, 3));
/// assert!(parse_raw_version("01_0_0").is_err());
/// ```
pub fn parse_raw_version(raw: &str) -> Result<Version, semver::Error> {
    Version::parse(&raw.replace('_', "."))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched(group: &str, raw_version: &str) -> FragmentName {
        FragmentName::Matched {
            group: group.to_string(),
            raw_version: raw_version.to_string(),
        }
    }

    #[test]
    fn test_extract_both_extensions() {
        assert_eq!(extract("pet.1_0_0.yaml"), matched("pet", "1_0_0"));
        assert_eq!(extract("pet.1_0_0.yml"), matched("pet", "1_0_0"));
    }

    #[test]
    fn test_extract_alphanumeric_group() {
        assert_eq!(extract("Store2.10_4_12.yaml"), matched("Store2", "10_4_12"));
    }

    #[test]
    fn test_extract_rejects_unrelated_files() {
        for name in [
            "notes.txt",
            "README.md",
            "pet.yaml",
            "pet.1_0.yaml",
            "pet.1_0_0.json",
            "pet.1.0.0.yaml",
            "pet-store.1_0_0.yaml",
            ".1_0_0.yaml",
            "pet.1_0_0.yaml.bak",
            "old.pet.1_0_0.yaml",
        ] {
            assert_eq!(extract(name), FragmentName::Unmatched, "{name} should not match");
        }
    }

    #[test]
    fn test_is_match() {
        assert!(extract("pet.1_0_0.yaml").is_match());
        assert!(!extract("notes.txt").is_match());
    }

    #[test]
    fn test_parse_raw_version() {
        let v = parse_raw_version("1_1_0").unwrap();
        assert_eq!(v, Version::new(1, 1, 0));
    }

    #[test]
    fn test_parse_raw_version_rejects_leading_zero() {
        assert!(parse_raw_version("1_01_0").is_err());
    }

    #[test]
    fn test_parse_raw_version_rejects_overflow() {
        assert!(parse_raw_version("99999999999999999999_0_0").is_err());
    }
}
