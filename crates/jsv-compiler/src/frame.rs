//! # Reference Frame
//!
//! Walks a bundled schema once and indexes every addressable location
//! (resources, anchors, subschemas and plain JSON values) by absolute URI,
//! together with every reference edge keyed by the pointer of the keyword
//! that declares it.
//!
//! Pointer URIs are registered under every enclosing resource, so
//! `#/$defs/a/type` and `https://example.com/a#/type` reach the same
//! location. Each location remembers its *nearest* resource as its base;
//! that is the resource the compiler attributes its instructions to.
//!
//! ## Edge classification
//!
//! - `$ref` is always static.
//! - `$dynamicRef` is dynamic only when its static target is itself a
//!   dynamic anchor of the same name.
//! - `$recursiveRef` is dynamic only when its target resource declares
//!   `$recursiveAnchor: true`.
//!
//! Dynamic edges keep their static entry too, which the compiler falls back
//! to when no dynamic scope matches.

use std::collections::{BTreeMap, BTreeSet};

use jsv_core::{CompileError, Json, Pointer, SchemaVocabularyError};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::resolver::SchemaResolver;
use crate::uri;
use crate::vocabulary::{self, Draft, Vocabularies};
use crate::walker::{self, KeywordKind, Shape, Walker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceType {
    Static,
    Dynamic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    /// The root of a schema resource (a document or an embedded `$id`).
    Resource,
    /// A plain-name fragment: `$anchor`, `$dynamicAnchor`, a legacy `#name`
    /// identifier, or a `$recursiveAnchor`.
    Anchor,
    Subschema,
    /// A JSON value that is not a subschema, such as the `required` array.
    Pointer,
}

/// One addressable location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub kind: LocationType,
    /// Absolute pointer from the root of the bundled document.
    pub pointer: Pointer,
    /// Pointer from the root of the nearest enclosing resource.
    pub relative_pointer: Pointer,
    /// URI of the nearest enclosing resource, without fragment.
    pub base: String,
    /// Canonical URI of the metaschema in effect.
    pub dialect: String,
}

/// One reference edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reference {
    /// Canonical absolute target.
    pub destination: String,
    /// The target without its fragment.
    pub base: String,
    /// The decoded fragment, if any.
    pub fragment: Option<String>,
}

/// The location and reference tables of one schema.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    root: String,
    locations: BTreeMap<(ReferenceType, String), Location>,
    references: BTreeMap<(ReferenceType, Pointer), Reference>,
    vocabularies: BTreeMap<String, Vocabularies>,
}

impl Frame {
    /// Index `schema`.
    ///
    /// `default_dialect` applies when the root declares no `$schema`, and
    /// `default_id` names the root when it declares no identifier (or adds an
    /// alias when it does).
    ///
    /// # Errors
    ///
    /// Fails when no dialect can be determined or a dialect declares an
    /// unsupported vocabulary.
    pub fn build(
        schema: &Json,
        walker: Walker,
        resolver: &dyn SchemaResolver,
        default_dialect: Option<&str>,
        default_id: Option<&str>,
    ) -> Result<Self, CompileError> {
        let dialect = schema
            .get("$schema")
            .and_then(Json::as_str)
            .or(default_dialect)
            .map(uri::canonicalize)
            .ok_or_else(|| {
                CompileError::InvalidSchema(
                    "Could not determine the dialect of the schema".to_string(),
                )
            })?;

        let mut frame = Frame::default();
        let vocabularies = frame.vocabularies_for(&dialect, resolver)?;
        let draft = vocabularies.draft;

        let declared = schema
            .get(draft.id_keyword())
            .and_then(Json::as_str)
            .filter(|_| !(draft.ref_overrides_siblings() && schema.get("$ref").is_some()))
            .map(|id| uri::without_fragment(&uri::resolve(default_id.unwrap_or(""), id)).to_string())
            .filter(|id| !id.is_empty());

        let default_id = default_id.map(uri::canonicalize);
        let root = declared
            .clone()
            .or_else(|| default_id.clone())
            .unwrap_or_default();
        frame.root = root.clone();

        let mut bases = Vec::new();
        if let Some(alias) = default_id.filter(|alias| *alias != root) {
            frame.insert_resource(&alias, Pointer::new(), &dialect, &root);
            bases.push((alias, Pointer::new()));
        }
        frame.insert_resource(&root, Pointer::new(), &dialect, &root);
        bases.push((root, Pointer::new()));

        let mut walk = Walk {
            walker,
            resolver,
            frame: &mut frame,
            pending: Vec::new(),
        };
        walk.subschema(schema, Pointer::new(), &dialect, &mut bases)?;
        let pending = walk.pending;
        frame.classify_dynamic(pending);

        debug!(
            root = %frame.root,
            locations = frame.locations.len(),
            references = frame.references.len(),
            "framed schema"
        );
        Ok(frame)
    }

    /// URI of the root resource. Empty for anonymous schemas.
    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn locations(&self) -> &BTreeMap<(ReferenceType, String), Location> {
        &self.locations
    }

    pub fn references(&self) -> &BTreeMap<(ReferenceType, Pointer), Reference> {
        &self.references
    }

    /// The location a static URI names.
    pub fn traverse(&self, uri: &str) -> Option<&Location> {
        self.locations
            .get(&(ReferenceType::Static, uri::canonicalize(uri)))
    }

    /// The edge declared by the keyword at `pointer`.
    pub fn reference(&self, kind: ReferenceType, pointer: &Pointer) -> Option<&Reference> {
        self.references.get(&(kind, pointer.clone()))
    }

    /// Vocabularies of a dialect seen while framing.
    pub fn vocabularies(&self, dialect: &str) -> Option<&Vocabularies> {
        self.vocabularies.get(dialect)
    }

    /// Whether any reference resolves against the dynamic scope.
    pub fn has_dynamic_references(&self) -> bool {
        self.references
            .keys()
            .any(|(kind, _)| *kind == ReferenceType::Dynamic)
    }

    /// Sorted, deduplicated resource URIs.
    pub fn resources(&self) -> Vec<String> {
        let set: BTreeSet<&String> = self
            .locations
            .iter()
            .filter(|(_, location)| location.kind == LocationType::Resource)
            .map(|((_, uri), _)| uri)
            .collect();
        set.into_iter().cloned().collect()
    }

    /// Debugging view of both tables.
    pub fn to_json(&self) -> Json {
        let mut locations = json!({"static": {}, "dynamic": {}});
        for ((kind, uri), location) in &self.locations {
            let table = match kind {
                ReferenceType::Static => "static",
                ReferenceType::Dynamic => "dynamic",
            };
            locations[table][uri] = serde_json::to_value(location).unwrap_or(Json::Null);
        }
        let mut references = json!({"static": {}, "dynamic": {}});
        for ((kind, pointer), reference) in &self.references {
            let table = match kind {
                ReferenceType::Static => "static",
                ReferenceType::Dynamic => "dynamic",
            };
            references[table][pointer.to_string()] =
                serde_json::to_value(reference).unwrap_or(Json::Null);
        }
        json!({
            "root": self.root,
            "locations": locations,
            "references": references,
        })
    }

    fn vocabularies_for(
        &mut self,
        dialect: &str,
        resolver: &dyn SchemaResolver,
    ) -> Result<Vocabularies, SchemaVocabularyError> {
        if let Some(vocabularies) = self.vocabularies.get(dialect) {
            return Ok(vocabularies.clone());
        }
        let vocabularies = Vocabularies::for_dialect(dialect, resolver)?;
        self.vocabularies
            .insert(dialect.to_string(), vocabularies.clone());
        Ok(vocabularies)
    }

    fn insert_resource(&mut self, uri: &str, pointer: Pointer, dialect: &str, base: &str) {
        self.locations.insert(
            (ReferenceType::Static, uri.to_string()),
            Location {
                kind: LocationType::Resource,
                pointer,
                relative_pointer: Pointer::new(),
                base: base.to_string(),
                dialect: dialect.to_string(),
            },
        );
    }

    fn classify_dynamic(&mut self, pending: Vec<(Pointer, String)>) {
        for (pointer, destination) in pending {
            let anchored = self
                .locations
                .contains_key(&(ReferenceType::Dynamic, destination.clone()));
            if !anchored {
                continue;
            }
            let base = uri::without_fragment(&destination).to_string();
            let fragment = uri::fragment(&destination).filter(|fragment| !fragment.is_empty());
            self.references.insert(
                (ReferenceType::Dynamic, pointer),
                Reference {
                    destination,
                    base,
                    fragment,
                },
            );
        }
    }
}

struct Walk<'a> {
    walker: Walker,
    resolver: &'a dyn SchemaResolver,
    frame: &'a mut Frame,
    // Dynamic-reference candidates, classified once every anchor is known.
    pending: Vec<(Pointer, String)>,
}

impl Walk<'_> {
    fn subschema(
        &mut self,
        schema: &Json,
        pointer: Pointer,
        parent_dialect: &str,
        bases: &mut Vec<(String, Pointer)>,
    ) -> Result<(), CompileError> {
        let dialect = schema
            .get("$schema")
            .and_then(Json::as_str)
            .map(uri::canonicalize)
            .unwrap_or_else(|| parent_dialect.to_string());
        let vocabularies = self.frame.vocabularies_for(&dialect, self.resolver)?;
        let draft = vocabularies.draft;

        let depth = bases.len();
        if let Some(object) = schema.as_object() {
            let hidden = draft.ref_overrides_siblings() && object.contains_key("$ref");
            let identifier = object
                .get(draft.id_keyword())
                .and_then(Json::as_str)
                .filter(|_| !hidden && !pointer.is_empty());
            if let Some(identifier) = identifier {
                self.identifier(identifier, &pointer, &dialect, draft, bases);
            }
            self.anchors(object, &pointer, &dialect, &vocabularies, bases);
        }

        self.register(&pointer, &dialect, LocationType::Subschema, bases);

        if let Some(object) = schema.as_object() {
            for (keyword, info) in walker::keywords(schema, &vocabularies, self.walker) {
                let Some(value) = object.get(keyword) else {
                    continue;
                };
                let keyword_pointer = pointer.join(keyword);
                match info.kind {
                    KeywordKind::Reference => {
                        self.reference(keyword, value, &keyword_pointer, bases);
                        self.values(value, keyword_pointer, &dialect, bases);
                    }
                    KeywordKind::Definitions => {
                        self.register(&keyword_pointer, &dialect, LocationType::Pointer, bases);
                        self.members(value, &keyword_pointer, &dialect, bases, false)?;
                    }
                    KeywordKind::Applicator(shape, _) => {
                        self.applicator(shape, value, keyword_pointer, &dialect, bases)?;
                    }
                    _ => self.values(value, keyword_pointer, &dialect, bases),
                }
            }
        }

        bases.truncate(depth);
        Ok(())
    }

    fn applicator(
        &mut self,
        shape: Shape,
        value: &Json,
        pointer: Pointer,
        dialect: &str,
        bases: &mut Vec<(String, Pointer)>,
    ) -> Result<(), CompileError> {
        match (shape, value) {
            (Shape::Value, _) | (Shape::ValueOrElements, Json::Object(_) | Json::Bool(_)) => {
                self.subschema(value, pointer, dialect, bases)
            }
            (Shape::Elements | Shape::ValueOrElements, Json::Array(items)) => {
                self.register(&pointer, dialect, LocationType::Pointer, bases);
                for (index, item) in items.iter().enumerate() {
                    self.subschema(item, pointer.join(index), dialect, bases)?;
                }
                Ok(())
            }
            (Shape::Members, _) => {
                self.register(&pointer, dialect, LocationType::Pointer, bases);
                self.members(value, &pointer, dialect, bases, false)
            }
            (Shape::Dependencies, _) => {
                self.register(&pointer, dialect, LocationType::Pointer, bases);
                self.members(value, &pointer, dialect, bases, true)
            }
            _ => {
                self.values(value, pointer, dialect, bases);
                Ok(())
            }
        }
    }

    fn members(
        &mut self,
        value: &Json,
        pointer: &Pointer,
        dialect: &str,
        bases: &mut Vec<(String, Pointer)>,
        schemas_only: bool,
    ) -> Result<(), CompileError> {
        let Some(object) = value.as_object() else {
            return Ok(());
        };
        for (name, member) in object {
            let member_pointer = pointer.join(name.as_str());
            if schemas_only && !(member.is_object() || member.is_boolean()) {
                self.values(member, member_pointer, dialect, bases);
            } else {
                self.subschema(member, member_pointer, dialect, bases)?;
            }
        }
        Ok(())
    }

    /// Register a non-schema value and everything inside it.
    fn values(
        &mut self,
        value: &Json,
        pointer: Pointer,
        dialect: &str,
        bases: &[(String, Pointer)],
    ) {
        self.register(&pointer, dialect, LocationType::Pointer, bases);
        match value {
            Json::Object(object) => {
                for (name, member) in object {
                    self.values(member, pointer.join(name.as_str()), dialect, bases);
                }
            }
            Json::Array(items) => {
                for (index, item) in items.iter().enumerate() {
                    self.values(item, pointer.join(index), dialect, bases);
                }
            }
            _ => {}
        }
    }

    fn identifier(
        &mut self,
        identifier: &str,
        pointer: &Pointer,
        dialect: &str,
        draft: Draft,
        bases: &mut Vec<(String, Pointer)>,
    ) {
        let current = bases.last().map(|(base, _)| base.as_str()).unwrap_or("");
        let resolved = uri::resolve(current, identifier);
        let (main, fragment) = uri::split_fragment(&resolved);
        let main = main.to_string();
        let fragment = fragment.map(uri::percent_decode);

        if main != uri::without_fragment(current) {
            self.frame
                .insert_resource(&main, pointer.clone(), dialect, &main);
            bases.push((main.clone(), pointer.clone()));
        }

        // Drafts before 2019-09 spell plain-name anchors as fragment ids.
        let legacy = matches!(draft, Draft::Draft4 | Draft::Draft6 | Draft::Draft7);
        if let Some(name) = fragment.filter(|name| legacy && !name.is_empty() && !name.starts_with('/')) {
            let uri = uri::canonicalize(&format!("{main}#{name}"));
            self.anchor(ReferenceType::Static, uri, pointer, dialect, bases);
        }
    }

    fn anchors(
        &mut self,
        object: &serde_json::Map<String, Json>,
        pointer: &Pointer,
        dialect: &str,
        vocabularies: &Vocabularies,
        bases: &[(String, Pointer)],
    ) {
        let base = bases
            .last()
            .map(|(base, _)| base.clone())
            .unwrap_or_default();
        let core = vocabularies.contains_any(&[vocabulary::V2019_09_CORE, vocabulary::V2020_12_CORE]);
        if !core {
            return;
        }

        if let Some(name) = object.get("$anchor").and_then(Json::as_str) {
            let uri = uri::canonicalize(&format!("{base}#{name}"));
            self.anchor(ReferenceType::Static, uri, pointer, dialect, bases);
        }

        if vocabularies.contains(vocabulary::V2020_12_CORE) {
            if let Some(name) = object.get("$dynamicAnchor").and_then(Json::as_str) {
                let uri = uri::canonicalize(&format!("{base}#{name}"));
                self.anchor(ReferenceType::Static, uri.clone(), pointer, dialect, bases);
                self.anchor(ReferenceType::Dynamic, uri, pointer, dialect, bases);
            }
        }

        if vocabularies.contains(vocabulary::V2019_09_CORE)
            && object.get("$recursiveAnchor") == Some(&Json::Bool(true))
        {
            let uri = uri::canonicalize(&base);
            self.anchor(ReferenceType::Dynamic, uri, pointer, dialect, bases);
        }
    }

    fn anchor(
        &mut self,
        kind: ReferenceType,
        uri: String,
        pointer: &Pointer,
        dialect: &str,
        bases: &[(String, Pointer)],
    ) {
        let (base, root) = bases
            .last()
            .cloned()
            .unwrap_or_else(|| (String::new(), Pointer::new()));
        self.frame.locations.entry((kind, uri)).or_insert(Location {
            kind: LocationType::Anchor,
            pointer: pointer.clone(),
            relative_pointer: relative(pointer, &root),
            base,
            dialect: dialect.to_string(),
        });
    }

    fn reference(
        &mut self,
        keyword: &str,
        value: &Json,
        pointer: &Pointer,
        bases: &[(String, Pointer)],
    ) {
        let Some(raw) = value.as_str() else {
            return;
        };
        let current = bases.last().map(|(base, _)| base.as_str()).unwrap_or("");
        let destination = uri::resolve(current, raw);
        let base = uri::without_fragment(&destination).to_string();
        let fragment = uri::fragment(&destination).filter(|fragment| !fragment.is_empty());
        self.frame.references.insert(
            (ReferenceType::Static, pointer.clone()),
            Reference {
                destination: destination.clone(),
                base,
                fragment,
            },
        );
        if matches!(keyword, "$dynamicRef" | "$recursiveRef") {
            self.pending.push((pointer.clone(), destination));
        }
    }

    /// Register `pointer` under every enclosing resource.
    fn register(
        &mut self,
        pointer: &Pointer,
        dialect: &str,
        kind: LocationType,
        bases: &[(String, Pointer)],
    ) {
        let Some((nearest, nearest_root)) = bases.last() else {
            return;
        };
        let location = Location {
            kind,
            pointer: pointer.clone(),
            relative_pointer: relative(pointer, nearest_root),
            base: nearest.clone(),
            dialect: dialect.to_string(),
        };
        for (base, root) in bases {
            let uri = uri::to_uri(&relative(pointer, root), base);
            self.frame
                .locations
                .entry((ReferenceType::Static, uri))
                .or_insert_with(|| location.clone());
        }
    }
}

fn relative(pointer: &Pointer, root: &Pointer) -> Pointer {
    pointer.tokens()[root.len().min(pointer.len())..]
        .iter()
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::MapResolver;
    use crate::walker::default_walker;

    fn frame(schema: Json) -> Frame {
        Frame::build(&schema, default_walker, &MapResolver::new(), None, None).unwrap()
    }

    fn ptr(raw: &str) -> Pointer {
        Pointer::parse(raw).unwrap()
    }

    #[test]
    fn anonymous_schema_registers_pointer_uris() {
        let frame = frame(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "properties": {"a": {"type": "string"}},
            "required": ["a"]
        }));
        assert_eq!(frame.root(), "");
        assert_eq!(frame.traverse("").unwrap().kind, LocationType::Resource);
        assert_eq!(
            frame.traverse("#/properties/a").unwrap().kind,
            LocationType::Subschema
        );
        assert_eq!(frame.traverse("#/required/0").unwrap().kind, LocationType::Pointer);
        assert_eq!(frame.traverse("#/properties").unwrap().kind, LocationType::Pointer);
    }

    #[test]
    fn nested_resources_are_reachable_both_ways() {
        let frame = frame(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/root",
            "$defs": {
                "item": {"$id": "item", "$anchor": "it", "type": "integer"}
            }
        }));
        let nested = frame.traverse("https://example.com/item").unwrap();
        assert_eq!(nested.kind, LocationType::Resource);
        assert_eq!(nested.pointer, ptr("/$defs/item"));

        let through_root = frame.traverse("https://example.com/root#/$defs/item/type").unwrap();
        assert_eq!(through_root.base, "https://example.com/item");
        assert_eq!(through_root.relative_pointer, ptr("/type"));

        let anchor = frame.traverse("https://example.com/item#it").unwrap();
        assert_eq!(anchor.kind, LocationType::Anchor);
        assert_eq!(frame.resources(), vec!["https://example.com/item", "https://example.com/root"]);
    }

    #[test]
    fn draft4_uses_id_and_legacy_anchors() {
        let frame = frame(json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "id": "http://example.com/root.json",
            "definitions": {
                "a": {"id": "#foo", "type": "integer"},
                "b": {"$ref": "#foo"}
            }
        }));
        assert_eq!(frame.root(), "http://example.com/root.json");
        let anchor = frame.traverse("http://example.com/root.json#foo").unwrap();
        assert_eq!(anchor.pointer, ptr("/definitions/a"));
        let reference = frame
            .reference(ReferenceType::Static, &ptr("/definitions/b/$ref"))
            .unwrap();
        assert_eq!(reference.destination, "http://example.com/root.json#foo");
        assert_eq!(reference.fragment.as_deref(), Some("foo"));
    }

    #[test]
    fn ref_hides_sibling_identifier_before_2019() {
        let frame = frame(json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "definitions": {
                "a": {"$id": "http://example.com/ignored", "$ref": "#/definitions/b"},
                "b": {"type": "string"}
            }
        }));
        assert!(frame.traverse("http://example.com/ignored").is_none());
        let reference = frame
            .reference(ReferenceType::Static, &ptr("/definitions/a/$ref"))
            .unwrap();
        assert_eq!(reference.destination, "#/definitions/b");
    }

    #[test]
    fn dynamic_ref_is_dynamic_only_with_matching_anchor() {
        let frame = frame(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/list",
            "$dynamicAnchor": "items",
            "properties": {
                "a": {"$dynamicRef": "#items"},
                "b": {"$dynamicRef": "#/$defs/plain"}
            },
            "$defs": {"plain": true}
        }));
        assert!(frame.has_dynamic_references());
        let a = ptr("/properties/a/$dynamicRef");
        let b = ptr("/properties/b/$dynamicRef");
        assert_eq!(
            frame.reference(ReferenceType::Dynamic, &a).unwrap().fragment.as_deref(),
            Some("items")
        );
        assert!(frame.reference(ReferenceType::Static, &a).is_some());
        assert!(frame.reference(ReferenceType::Dynamic, &b).is_none());
    }

    #[test]
    fn recursive_ref_needs_recursive_anchor() {
        let anchored = frame(json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/tree",
            "$recursiveAnchor": true,
            "items": {"$recursiveRef": "#"}
        }));
        assert!(anchored.has_dynamic_references());

        let plain = frame(json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/tree",
            "items": {"$recursiveRef": "#"}
        }));
        assert!(!plain.has_dynamic_references());
    }

    #[test]
    fn default_id_becomes_an_alias() {
        let schema = json!({"$id": "https://example.com/real", "type": "string"});
        let frame = Frame::build(
            &schema,
            default_walker,
            &MapResolver::new(),
            Some("https://json-schema.org/draft/2020-12/schema"),
            Some("https://example.com/alias"),
        )
        .unwrap();
        assert_eq!(frame.root(), "https://example.com/real");
        assert!(frame.traverse("https://example.com/alias#/type").is_some());
        assert_eq!(
            frame.traverse("https://example.com/alias#/type").unwrap().base,
            "https://example.com/real"
        );
    }

    #[test]
    fn missing_dialect_is_rejected() {
        let result = Frame::build(&json!({"type": "string"}), default_walker, &MapResolver::new(), None, None);
        assert!(matches!(result, Err(CompileError::InvalidSchema(_))));
    }

    #[test]
    fn debugging_view_lists_both_tables() {
        let frame = frame(json!({
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$ref": "#/$defs/a",
            "$defs": {"a": true}
        }));
        let view = frame.to_json();
        assert_eq!(view["references"]["static"]["/$ref"]["destination"], json!("#/$defs/a"));
        assert_eq!(view["locations"]["static"]["#/$defs/a"]["kind"], json!("subschema"));
    }
}
