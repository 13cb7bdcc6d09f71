//! Pre-pass locating the subschemas whose `unevaluatedProperties` or
//! `unevaluatedItems` must actually be compiled.
//!
//! A sibling `additionalProperties` already evaluates every property, and a
//! sibling `items` schema (or `additionalItems` after a tuple) already
//! evaluates every item. In those cases the unevaluated keyword can never
//! see anything, so it is left out and nobody needs to track evaluation on
//! its behalf.

use std::collections::BTreeSet;

use jsv_core::{Json, Pointer};

use crate::frame::{Frame, LocationType, ReferenceType};
use crate::vocabulary::{self, Vocabularies};

/// Absolute pointers of the subschemas holding a live unevaluated keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Unevaluated {
    pub properties: BTreeSet<Pointer>,
    pub items: BTreeSet<Pointer>,
}

impl Unevaluated {
    /// Scan every subschema of the framed `root`.
    pub fn collect(root: &Json, frame: &Frame) -> Self {
        let mut result = Self::default();
        let subschemas: BTreeSet<(&Pointer, &str)> = frame
            .locations()
            .iter()
            .filter(|((kind, _), location)| {
                *kind == ReferenceType::Static
                    && matches!(
                        location.kind,
                        LocationType::Resource | LocationType::Subschema
                    )
            })
            .map(|(_, location)| (&location.pointer, location.dialect.as_str()))
            .collect();

        for (pointer, dialect) in subschemas {
            let Some(schema) = pointer.resolve(root).and_then(Json::as_object) else {
                continue;
            };
            let Some(vocabularies) = frame.vocabularies(dialect) else {
                continue;
            };
            if !supports_unevaluated(vocabularies) {
                continue;
            }
            let applicator = vocabularies
                .contains_any(&[vocabulary::V2019_09_APPLICATOR, vocabulary::V2020_12_APPLICATOR]);

            if schema.contains_key("unevaluatedProperties")
                && !(applicator && schema.contains_key("additionalProperties"))
            {
                result.properties.insert(pointer.clone());
            }

            if schema.contains_key("unevaluatedItems") && !(applicator && items_cover_all(schema, vocabularies)) {
                result.items.insert(pointer.clone());
            }
        }
        result
    }

    /// Whether any subschema needs evaluation marks.
    pub fn requires_evaluation(&self) -> bool {
        !self.properties.is_empty() || !self.items.is_empty()
    }
}

fn supports_unevaluated(vocabularies: &Vocabularies) -> bool {
    vocabularies.contains(vocabulary::V2019_09_APPLICATOR)
        || (vocabularies.contains(vocabulary::V2020_12_UNEVALUATED)
            && vocabularies.contains(vocabulary::V2020_12_APPLICATOR))
}

fn items_cover_all(schema: &serde_json::Map<String, Json>, vocabularies: &Vocabularies) -> bool {
    if vocabularies.contains(vocabulary::V2020_12_APPLICATOR) {
        return schema.contains_key("items");
    }
    match schema.get("items") {
        Some(Json::Object(_) | Json::Bool(_)) => true,
        Some(Json::Array(_)) => schema.contains_key("additionalItems"),
        _ => false,
    }
}
