//! Overlay merging with per-entity provenance.
//!
//! A [`Snapshot`] is the cumulative document of a group at one point in its
//! version history. [`Snapshot::base`] starts the history from the earliest
//! fragment; [`Snapshot::overlay`] applies the next fragment and returns a new
//! snapshot, leaving the previous one untouched.
//!
//! Overlay rules:
//!
//! - every schema and every route (path + method) in the fragment replaces
//!   the same-named entity, or is inserted if new, and is tagged with the
//!   fragment's version;
//! - path-level attributes and other component sections are overlaid key by
//!   key;
//! - `info` is taken from the fragment, other top-level keys are overlaid key
//!   by key;
//! - anything the fragment does not mention is kept as is. Absence never
//!   deletes.
//!
//! # Example
//!
//! ```
//! use semver::Version;
//! use serde_yaml::Value;
//! use spec_history_core::{Document, Snapshot};
//!
//! let v1 = Version::new(1, 0, 0);
//! let v2 = Version::new(2, 0, 0);
//!
//! let base = Snapshot::base(
//!     Document::new("1.0.0").with_schema("Pet", Value::from("v1 pet")),
//!     v1.clone(),
//! );
//! let next = base.overlay(
//!     Document::new("2.0.0").with_schema("Owner", Value::from("v2 owner")),
//!     v2.clone(),
//! );
//!
//! assert_eq!(next.schema_provenance("Pet").unwrap().last_touched, v1);
//! assert_eq!(next.schema_provenance("Owner").unwrap().last_touched, v2);
//! assert_eq!(next.document().info.version, "2.0.0");
//! ```

use std::collections::BTreeMap;

use semver::Version;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;

use crate::{Document, RouteKey, is_http_method};

/// Version history of a single entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    /// Version of the first fragment that declared the entity.
    pub introduced: Version,
    /// Version of the most recent fragment that declared or modified it.
    pub last_touched: Version,
}

impl Provenance {
    fn new(version: &Version) -> Self {
        Self {
            introduced: version.clone(),
            last_touched: version.clone(),
        }
    }

    fn touch(previous: Option<&Provenance>, version: &Version) -> Self {
        match previous {
            Some(prev) => Self {
                introduced: prev.introduced.clone(),
                last_touched: version.clone(),
            },
            None => Self::new(version),
        }
    }
}

/// Cumulative merged document plus its provenance index.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    document: Document,
    version: Version,
    schemas: BTreeMap<String, Provenance>,
    routes: BTreeMap<RouteKey, Provenance>,
}

impl Snapshot {
    /// Starts a history from the earliest fragment's document.
    ///
    /// Every schema and route in `document` is tagged with `version`.
    pub fn base(document: Document, version: Version) -> Self {
        let schemas = document
            .components
            .schemas
            .keys()
            .map(|name| (name.clone(), Provenance::new(&version)))
            .collect();
        let routes = document
            .routes()
            .map(|(key, _)| (key, Provenance::new(&version)))
            .collect();

        Self {
            document,
            version,
            schemas,
            routes,
        }
    }

    /// Applies the next fragment's document and returns the resulting
    /// snapshot.
    ///
    /// `version` must be greater than [`Snapshot::version`]; the caller owns
    /// the ordering.
    pub fn overlay(&self, fragment: Document, version: Version) -> Snapshot {
        debug_assert!(version > self.version, "fragments must be applied in ascending order");

        let mut document = self.document.clone();
        let mut schemas = self.schemas.clone();
        let mut routes = self.routes.clone();

        let Document {
            openapi,
            info,
            paths,
            components,
            extra,
        } = fragment;

        if openapi.is_some() {
            document.openapi = openapi;
        }
        document.info = info;
        document.extra.extend(extra);

        for (name, schema) in components.schemas {
            let provenance = Provenance::touch(schemas.get(&name), &version);
            schemas.insert(name.clone(), provenance);
            document.components.schemas.insert(name, schema);
        }
        for (section, definitions) in components.extra {
            let merged = match document.components.extra.remove(&section) {
                Some(existing) => overlay_mapping(existing, definitions),
                None => definitions,
            };
            document.components.extra.insert(section, merged);
        }

        for (path, item) in paths {
            let target = document.paths.entry(path.clone()).or_default();
            for (key, value) in item {
                if is_http_method(&key) {
                    let route = RouteKey::new(path.clone(), key.clone());
                    let provenance = Provenance::touch(routes.get(&route), &version);
                    routes.insert(route, provenance);
                }
                target.insert(key, value);
            }
        }

        Snapshot {
            document,
            version,
            schemas,
            routes,
        }
    }

    /// The cumulative document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Consumes the snapshot, returning the cumulative document.
    pub fn into_document(self) -> Document {
        self.document
    }

    /// Version of the most recently applied fragment.
    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Provenance of every schema entity, keyed by name.
    pub fn schemas(&self) -> &BTreeMap<String, Provenance> {
        &self.schemas
    }

    /// Provenance of every route entity.
    pub fn routes(&self) -> &BTreeMap<RouteKey, Provenance> {
        &self.routes
    }

    /// Provenance of the schema named `name`.
    pub fn schema_provenance(&self, name: &str) -> Option<&Provenance> {
        self.schemas.get(name)
    }

    /// Provenance of the route `method path`.
    pub fn route_provenance(&self, path: &str, method: &str) -> Option<&Provenance> {
        self.routes.get(&RouteKey::new(path, method))
    }
}

/// Overlays two named-definition maps key by key. Non-map values are
/// replaced wholesale.
fn overlay_mapping(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Mapping(mut base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                base.insert(key, value);
            }
            Value::Mapping(base)
        }
        (_, overlay) => overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u64, minor: u64, patch: u64) -> Version {
        Version::new(major, minor, patch)
    }

    fn yaml(src: &str) -> Value {
        serde_yaml::from_str(src).unwrap()
    }

    fn doc(src: &str) -> Document {
        serde_yaml::from_str(src).unwrap()
    }

    #[test]
    fn test_base_tags_every_entity() {
        let base = Snapshot::base(
            doc(r#"
info: { version: "1.0.0" }
paths:
  /pets:
    get: { operationId: listPets }
    post: { operationId: createPet }
components:
  schemas:
    Pet: { type: object }
    Error: { type: object }
"#),
            v(1, 0, 0),
        );

        assert_eq!(base.schemas().len(), 2);
        assert_eq!(base.routes().len(), 2);
        for provenance in base.schemas().values().chain(base.routes().values()) {
            assert_eq!(provenance.introduced, v(1, 0, 0));
            assert_eq!(provenance.last_touched, v(1, 0, 0));
        }
        assert_eq!(base.version(), &v(1, 0, 0));
    }

    #[test]
    fn test_single_fragment_snapshot_equals_base_document() {
        let original = doc(r#"
openapi: 3.0.0
info: { version: "1.0.0", title: Pets }
components:
  schemas:
    Pet: { type: object }
"#);
        let snapshot = Snapshot::base(original.clone(), v(1, 0, 0));
        assert_eq!(snapshot.document(), &original);
        assert_eq!(snapshot.into_document(), original);
    }

    #[test]
    fn test_redeclared_entity_takes_latest_content_and_version() {
        let s1 = Snapshot::base(
            Document::new("1.0.0").with_schema("Pet", yaml("{ required: [name] }")),
            v(1, 0, 0),
        );
        let s2 = s1.overlay(
            Document::new("2.0.0").with_schema("Owner", yaml("{ type: object }")),
            v(2, 0, 0),
        );
        let s3 = s2.overlay(
            Document::new("3.0.0").with_schema("Pet", yaml("{ required: [name, age] }")),
            v(3, 0, 0),
        );

        let pet = s3.schema_provenance("Pet").unwrap();
        assert_eq!(pet.last_touched, v(3, 0, 0));
        assert_eq!(pet.introduced, v(1, 0, 0));
        assert_eq!(
            s3.document().components.schemas["Pet"],
            yaml("{ required: [name, age] }")
        );
    }

    #[test]
    fn test_absent_entity_is_kept_unmodified() {
        let s1 = Snapshot::base(
            Document::new("1.0.0").with_schema("Pet", yaml("{ type: object }")),
            v(1, 0, 0),
        );
        let s2 = s1.overlay(Document::new("2.0.0"), v(2, 0, 0));
        let s3 = s2.overlay(
            Document::new("3.0.0").with_schema("Owner", yaml("{ type: object }")),
            v(3, 0, 0),
        );

        assert_eq!(
            s3.document().components.schemas["Pet"],
            yaml("{ type: object }")
        );
        assert_eq!(s3.schema_provenance("Pet").unwrap().last_touched, v(1, 0, 0));
        assert_eq!(s3.schema_provenance("Owner").unwrap().introduced, v(3, 0, 0));
    }

    #[test]
    fn test_routes_are_tracked_per_method() {
        let s1 = Snapshot::base(
            Document::new("1.0.0")
                .with_route("/pets", "get", yaml("{ operationId: listPets }"))
                .with_route("/pets", "post", yaml("{ operationId: createPet }")),
            v(1, 0, 0),
        );
        let s2 = s1.overlay(
            Document::new("1.1.0").with_route("/pets", "post", yaml("{ operationId: addPet }")),
            v(1, 1, 0),
        );

        assert_eq!(
            s2.route_provenance("/pets", "get").unwrap().last_touched,
            v(1, 0, 0)
        );
        assert_eq!(
            s2.route_provenance("/pets", "POST").unwrap().last_touched,
            v(1, 1, 0)
        );
        assert_eq!(
            s2.document().route("/pets", "get"),
            Some(&yaml("{ operationId: listPets }"))
        );
        assert_eq!(
            s2.document().route("/pets", "post"),
            Some(&yaml("{ operationId: addPet }"))
        );
    }

    #[test]
    fn test_path_attributes_overlay_without_provenance() {
        let s1 = Snapshot::base(
            doc(r#"
info: { version: "1.0.0" }
paths:
  /pets:
    summary: old
    get: { operationId: listPets }
"#),
            v(1, 0, 0),
        );
        let s2 = s1.overlay(
            doc(r#"
info: { version: "1.1.0" }
paths:
  /pets:
    summary: new
"#),
            v(1, 1, 0),
        );

        let item = &s2.document().paths["/pets"];
        assert_eq!(item["summary"], Value::from("new"));
        assert!(item.contains_key("get"));
        assert_eq!(s2.routes().len(), 1);
    }

    #[test]
    fn test_other_component_sections_overlay_by_name() {
        let s1 = Snapshot::base(
            doc(r#"
info: { version: "1.0.0" }
components:
  responses:
    NotFound: { description: missing }
"#),
            v(1, 0, 0),
        );
        let s2 = s1.overlay(
            doc(r#"
info: { version: "1.1.0" }
components:
  responses:
    Conflict: { description: taken }
"#),
            v(1, 1, 0),
        );

        let responses = &s2.document().components.extra["responses"];
        assert!(responses.get("NotFound").is_some());
        assert!(responses.get("Conflict").is_some());
    }

    #[test]
    fn test_info_follows_latest_fragment() {
        let s1 = Snapshot::base(
            doc("info: { version: \"1.0.0\", title: Old }\nopenapi: 3.0.0\n"),
            v(1, 0, 0),
        );
        let s2 = s1.overlay(doc("info: { version: \"1.1.0\", title: New }\n"), v(1, 1, 0));

        assert_eq!(s2.document().info.version, "1.1.0");
        assert_eq!(s2.document().info.title.as_deref(), Some("New"));
        assert_eq!(s2.document().openapi.as_deref(), Some("3.0.0"));
        assert_eq!(s2.version(), &v(1, 1, 0));
    }

    #[test]
    fn test_overlay_leaves_previous_snapshot_untouched() {
        let s1 = Snapshot::base(
            Document::new("1.0.0").with_schema("Pet", yaml("{ type: object }")),
            v(1, 0, 0),
        );
        let before = s1.clone();
        let _s2 = s1.overlay(
            Document::new("2.0.0").with_schema("Pet", yaml("{ type: string }")),
            v(2, 0, 0),
        );

        assert_eq!(s1, before);
    }
}
