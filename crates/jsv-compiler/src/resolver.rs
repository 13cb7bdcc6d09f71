//! Schema resolution: mapping a URI to the schema document it identifies.

use std::collections::BTreeMap;

use jsv_core::Json;

use crate::uri;

/// Source of external schemas. Implementations may do I/O; the compiler
/// itself never does.
pub trait SchemaResolver {
    /// The schema identified by the canonical `uri`, or `None` if unknown.
    fn resolve(&self, uri: &str) -> Option<Json>;
}

impl<F> SchemaResolver for F
where
    F: Fn(&str) -> Option<Json>,
{
    fn resolve(&self, uri: &str) -> Option<Json> {
        self(uri)
    }
}

/// In-memory resolver keyed by canonical URI.
#[derive(Debug, Clone, Default)]
pub struct MapResolver {
    schemas: BTreeMap<String, Json>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `schema` under an explicit URI.
    pub fn insert(&mut self, identifier: &str, schema: Json) {
        self.schemas.insert(uri::canonicalize(identifier), schema);
    }

    /// Register `schema` under its own `$id` (or draft 4 `id`). Returns the
    /// identifier used, or `None` if the schema declares none.
    pub fn add(&mut self, schema: Json) -> Option<String> {
        let identifier = schema
            .get("$id")
            .or_else(|| schema.get("id"))
            .and_then(Json::as_str)
            .map(uri::canonicalize)?;
        self.schemas.insert(identifier.clone(), schema);
        Some(identifier)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaResolver for MapResolver {
    fn resolve(&self, uri: &str) -> Option<Json> {
        self.schemas.get(&uri::canonicalize(uri)).cloned()
    }
}
