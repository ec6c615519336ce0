//! Specification document model.
//!
//! A [`Document`] is the structured form of one fragment file. Only the parts
//! the merger reasons about are typed: the self-declared version in
//! [`Info`], the named schemas in [`Components`], and the routes under
//! [`Document::paths`]. Everything else is carried through untouched as
//! [`serde_yaml::Value`], which keeps non-string keys such as response codes.
//!
//! Maps are [`BTreeMap`]s so that serialized output is canonical.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_yaml::Value;

/// HTTP methods whose entries under a path item are route entities.
pub const HTTP_METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Returns `true` if `key` names an operation inside a path item.
pub fn is_http_method(key: &str) -> bool {
    HTTP_METHODS.contains(&key)
}

/// A parsed specification document.
///
/// # Examples
///
/// ```
/// use spec_history_core::Document;
///
/// let yaml = r#"
/// openapi: 3.0.0
/// info:
///   title: Pets
///   version: 1.0.0
/// paths:
///   /pets:
///     get:
///       operationId: listPets
/// components:
///   schemas:
///     Pet:
///       type: object
/// "#;
/// let doc: Document = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(doc.info.version, "1.0.0");
/// assert!(doc.components.schemas.contains_key("Pet"));
/// assert_eq!(doc.routes().count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Specification format version, passed through as written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openapi: Option<String>,
    /// Top-level metadata, including the self-declared version.
    pub info: Info,
    /// Path templates mapped to their path items.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub paths: BTreeMap<String, PathItem>,
    /// Reusable component definitions.
    #[serde(default, skip_serializing_if = "Components::is_empty")]
    pub components: Components,
    /// Any other top-level key (`servers`, `tags`, extensions, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Document {
    /// Creates an empty document declaring `version`.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            openapi: None,
            info: Info::new(version),
            paths: BTreeMap::new(),
            components: Components::default(),
            extra: BTreeMap::new(),
        }
    }

    /// Adds a schema entity, replacing any existing one with the same name.
    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.components.schemas.insert(name.into(), schema);
        self
    }

    /// Adds an operation under `path` for `method`.
    pub fn with_route(mut self, path: impl Into<String>, method: &str, operation: Value) -> Self {
        self.paths
            .entry(path.into())
            .or_default()
            .insert(method.to_ascii_lowercase(), operation);
        self
    }

    /// Iterates over every route entity (path + method) in this document.
    pub fn routes(&self) -> impl Iterator<Item = (RouteKey, &Value)> {
        self.paths.iter().flat_map(|(path, item)| {
            item.iter()
                .filter(|(key, _)| is_http_method(key))
                .map(move |(method, op)| (RouteKey::new(path.clone(), method.clone()), op))
        })
    }

    /// Returns the operation declared for `path` and `method`, if any.
    pub fn route(&self, path: &str, method: &str) -> Option<&Value> {
        self.paths
            .get(path)
            .and_then(|item| item.get(&method.to_ascii_lowercase()))
    }
}

/// Document metadata block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// Human-readable API title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Self-declared document version; must match the filename version.
    pub version: String,
    /// Other metadata (`description`, `contact`, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Info {
    /// Creates metadata declaring `version` with no title.
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            title: None,
            version: version.into(),
            extra: BTreeMap::new(),
        }
    }
}

/// A path item: HTTP methods map to operations, other keys (`summary`,
/// `parameters`, ...) are path-level attributes.
pub type PathItem = BTreeMap<String, Value>;

/// Reusable component definitions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    /// Named schema entities.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub schemas: BTreeMap<String, Value>,
    /// Other component sections (`responses`, `parameters`, ...), each a map
    /// of named definitions.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Components {
    /// Returns `true` if no component section is present.
    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty() && self.extra.is_empty()
    }
}

/// Identifies a route entity: one operation on one path.
///
/// Methods are stored lowercase, the way they appear in the document.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RouteKey {
    /// Path template, e.g. `/pets/{id}`.
    pub path: String,
    /// Lowercase HTTP method, e.g. `get`.
    pub method: String,
}

impl RouteKey {
    /// Creates a route key, lowercasing the method.
    pub fn new(path: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.into().to_ascii_lowercase(),
        }
    }
}

impl fmt::Display for RouteKey {
    /// Formats as `GET /pets`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method.to_ascii_uppercase(), self.path)
    }
}
