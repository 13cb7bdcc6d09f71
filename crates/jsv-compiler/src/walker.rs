//! Keyword classification.
//!
//! The walker tells the framer where subschemas live and tells the compiler
//! in which order to lower keywords. Keywords that read the results of other
//! keywords (`additionalProperties`, `then`, 2020-12 `items`, the
//! `unevaluated*` family) get a higher rank so they are compiled last.

use jsv_core::Json;

use crate::vocabulary::{self, Vocabularies};

/// How an applicator's value holds subschemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A single subschema.
    Value,
    /// An array of subschemas.
    Elements,
    /// An object whose values are subschemas.
    Members,
    /// A subschema or an array of subschemas (pre-2020 `items`).
    ValueOrElements,
    /// An object whose values are subschemas or property lists.
    Dependencies,
}

/// Whether an applicator evaluates its subschemas against the same instance
/// location as the schema that holds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InPlace {
    /// Subschemas apply to child locations.
    Never,
    /// Every subschema applies.
    All,
    /// Some subschemas apply, depending on the instance.
    Some,
    /// The subschema may or may not apply.
    Maybe,
    /// The subschema applies negated.
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordKind {
    Unknown,
    Comment,
    Identifier,
    Reference,
    /// A container of reusable subschemas that is not applied by itself.
    Definitions,
    Assertion,
    Annotation,
    Applicator(Shape, InPlace),
}

/// What the walker knows about one keyword under one set of vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordInfo {
    /// The vocabulary that defines the keyword, if any active one does.
    pub vocabulary: Option<&'static str>,
    pub kind: KeywordKind,
    /// Compilation order; lower ranks first.
    pub rank: u8,
}

impl KeywordInfo {
    const UNKNOWN: KeywordInfo = KeywordInfo {
        vocabulary: None,
        kind: KeywordKind::Unknown,
        rank: 0,
    };

    pub fn is_applicator(&self) -> bool {
        matches!(self.kind, KeywordKind::Applicator(..))
    }
}

/// Pluggable keyword classifier.
pub type Walker = fn(&str, &Vocabularies) -> KeywordInfo;

use InPlace as P;
use KeywordKind as K;
use Shape as S;

type Table = &'static [(&'static str, KeywordKind, u8)];

const DRAFT4: Table = &[
    ("id", K::Identifier, 0),
    ("$schema", K::Identifier, 0),
    ("$ref", K::Reference, 0),
    ("definitions", K::Definitions, 0),
    ("allOf", K::Applicator(S::Elements, P::All), 0),
    ("anyOf", K::Applicator(S::Elements, P::Some), 0),
    ("oneOf", K::Applicator(S::Elements, P::Some), 0),
    ("not", K::Applicator(S::Value, P::Negate), 0),
    ("items", K::Applicator(S::ValueOrElements, P::Never), 0),
    ("additionalItems", K::Applicator(S::Value, P::Never), 1),
    ("properties", K::Applicator(S::Members, P::Never), 0),
    ("patternProperties", K::Applicator(S::Members, P::Never), 0),
    ("additionalProperties", K::Applicator(S::Value, P::Never), 1),
    ("dependencies", K::Applicator(S::Dependencies, P::Some), 0),
    ("type", K::Assertion, 0),
    ("enum", K::Assertion, 0),
    ("multipleOf", K::Assertion, 0),
    ("maximum", K::Assertion, 0),
    ("exclusiveMaximum", K::Assertion, 0),
    ("minimum", K::Assertion, 0),
    ("exclusiveMinimum", K::Assertion, 0),
    ("maxLength", K::Assertion, 0),
    ("minLength", K::Assertion, 0),
    ("pattern", K::Assertion, 0),
    ("maxItems", K::Assertion, 0),
    ("minItems", K::Assertion, 0),
    ("uniqueItems", K::Assertion, 0),
    ("maxProperties", K::Assertion, 0),
    ("minProperties", K::Assertion, 0),
    ("required", K::Assertion, 0),
    ("format", K::Assertion, 0),
    ("title", K::Annotation, 0),
    ("description", K::Annotation, 0),
    ("default", K::Annotation, 0),
];

const DRAFT6: Table = &[
    ("$id", K::Identifier, 0),
    ("$schema", K::Identifier, 0),
    ("$ref", K::Reference, 0),
    ("definitions", K::Definitions, 0),
    ("allOf", K::Applicator(S::Elements, P::All), 0),
    ("anyOf", K::Applicator(S::Elements, P::Some), 0),
    ("oneOf", K::Applicator(S::Elements, P::Some), 0),
    ("not", K::Applicator(S::Value, P::Negate), 0),
    ("items", K::Applicator(S::ValueOrElements, P::Never), 0),
    ("additionalItems", K::Applicator(S::Value, P::Never), 1),
    ("contains", K::Applicator(S::Value, P::Never), 0),
    ("properties", K::Applicator(S::Members, P::Never), 0),
    ("patternProperties", K::Applicator(S::Members, P::Never), 0),
    ("additionalProperties", K::Applicator(S::Value, P::Never), 1),
    ("propertyNames", K::Applicator(S::Value, P::Never), 0),
    ("dependencies", K::Applicator(S::Dependencies, P::Some), 0),
    ("type", K::Assertion, 0),
    ("enum", K::Assertion, 0),
    ("const", K::Assertion, 0),
    ("multipleOf", K::Assertion, 0),
    ("maximum", K::Assertion, 0),
    ("exclusiveMaximum", K::Assertion, 0),
    ("minimum", K::Assertion, 0),
    ("exclusiveMinimum", K::Assertion, 0),
    ("maxLength", K::Assertion, 0),
    ("minLength", K::Assertion, 0),
    ("pattern", K::Assertion, 0),
    ("maxItems", K::Assertion, 0),
    ("minItems", K::Assertion, 0),
    ("uniqueItems", K::Assertion, 0),
    ("maxProperties", K::Assertion, 0),
    ("minProperties", K::Assertion, 0),
    ("required", K::Assertion, 0),
    ("format", K::Assertion, 0),
    ("title", K::Annotation, 0),
    ("description", K::Annotation, 0),
    ("default", K::Annotation, 0),
    ("examples", K::Annotation, 0),
];

const DRAFT7_EXTRA: Table = &[
    ("$comment", K::Comment, 0),
    ("if", K::Applicator(S::Value, P::Maybe), 0),
    ("then", K::Applicator(S::Value, P::Maybe), 1),
    ("else", K::Applicator(S::Value, P::Maybe), 1),
    ("readOnly", K::Annotation, 0),
    ("writeOnly", K::Annotation, 0),
    ("contentMediaType", K::Annotation, 0),
    ("contentEncoding", K::Annotation, 0),
];

const CORE_2019_09: Table = &[
    ("$id", K::Identifier, 0),
    ("$schema", K::Identifier, 0),
    ("$anchor", K::Identifier, 0),
    ("$recursiveAnchor", K::Identifier, 0),
    ("$vocabulary", K::Identifier, 0),
    ("$comment", K::Comment, 0),
    ("$ref", K::Reference, 0),
    ("$recursiveRef", K::Reference, 0),
    ("$defs", K::Definitions, 0),
];

const CORE_2020_12: Table = &[
    ("$id", K::Identifier, 0),
    ("$schema", K::Identifier, 0),
    ("$anchor", K::Identifier, 0),
    ("$dynamicAnchor", K::Identifier, 0),
    ("$vocabulary", K::Identifier, 0),
    ("$comment", K::Comment, 0),
    ("$ref", K::Reference, 0),
    ("$dynamicRef", K::Reference, 0),
    ("$defs", K::Definitions, 0),
];

const APPLICATOR_2019_09: Table = &[
    ("allOf", K::Applicator(S::Elements, P::All), 0),
    ("anyOf", K::Applicator(S::Elements, P::Some), 0),
    ("oneOf", K::Applicator(S::Elements, P::Some), 0),
    ("not", K::Applicator(S::Value, P::Negate), 0),
    ("if", K::Applicator(S::Value, P::Maybe), 0),
    ("then", K::Applicator(S::Value, P::Maybe), 1),
    ("else", K::Applicator(S::Value, P::Maybe), 1),
    ("dependentSchemas", K::Applicator(S::Members, P::Some), 0),
    ("items", K::Applicator(S::ValueOrElements, P::Never), 0),
    ("additionalItems", K::Applicator(S::Value, P::Never), 1),
    ("unevaluatedItems", K::Applicator(S::Value, P::Never), 2),
    ("contains", K::Applicator(S::Value, P::Never), 0),
    ("properties", K::Applicator(S::Members, P::Never), 0),
    ("patternProperties", K::Applicator(S::Members, P::Never), 0),
    ("additionalProperties", K::Applicator(S::Value, P::Never), 1),
    ("unevaluatedProperties", K::Applicator(S::Value, P::Never), 2),
    ("propertyNames", K::Applicator(S::Value, P::Never), 0),
];

const APPLICATOR_2020_12: Table = &[
    ("allOf", K::Applicator(S::Elements, P::All), 0),
    ("anyOf", K::Applicator(S::Elements, P::Some), 0),
    ("oneOf", K::Applicator(S::Elements, P::Some), 0),
    ("not", K::Applicator(S::Value, P::Negate), 0),
    ("if", K::Applicator(S::Value, P::Maybe), 0),
    ("then", K::Applicator(S::Value, P::Maybe), 1),
    ("else", K::Applicator(S::Value, P::Maybe), 1),
    ("dependentSchemas", K::Applicator(S::Members, P::Some), 0),
    ("prefixItems", K::Applicator(S::Elements, P::Never), 0),
    ("items", K::Applicator(S::Value, P::Never), 1),
    ("contains", K::Applicator(S::Value, P::Never), 0),
    ("properties", K::Applicator(S::Members, P::Never), 0),
    ("patternProperties", K::Applicator(S::Members, P::Never), 0),
    ("additionalProperties", K::Applicator(S::Value, P::Never), 1),
    ("propertyNames", K::Applicator(S::Value, P::Never), 0),
];

const UNEVALUATED_2020_12: Table = &[
    ("unevaluatedItems", K::Applicator(S::Value, P::Never), 2),
    ("unevaluatedProperties", K::Applicator(S::Value, P::Never), 2),
];

const VALIDATION: Table = &[
    ("type", K::Assertion, 0),
    ("enum", K::Assertion, 0),
    ("const", K::Assertion, 0),
    ("multipleOf", K::Assertion, 0),
    ("maximum", K::Assertion, 0),
    ("exclusiveMaximum", K::Assertion, 0),
    ("minimum", K::Assertion, 0),
    ("exclusiveMinimum", K::Assertion, 0),
    ("maxLength", K::Assertion, 0),
    ("minLength", K::Assertion, 0),
    ("pattern", K::Assertion, 0),
    ("maxItems", K::Assertion, 0),
    ("minItems", K::Assertion, 0),
    ("uniqueItems", K::Assertion, 0),
    ("maxContains", K::Assertion, 0),
    ("minContains", K::Assertion, 0),
    ("maxProperties", K::Assertion, 0),
    ("minProperties", K::Assertion, 0),
    ("required", K::Assertion, 0),
    ("dependentRequired", K::Assertion, 0),
];

const META_DATA: Table = &[
    ("title", K::Annotation, 0),
    ("description", K::Annotation, 0),
    ("default", K::Annotation, 0),
    ("deprecated", K::Annotation, 0),
    ("readOnly", K::Annotation, 0),
    ("writeOnly", K::Annotation, 0),
    ("examples", K::Annotation, 0),
];

const FORMAT: Table = &[("format", K::Annotation, 0)];

const CONTENT: Table = &[
    ("contentEncoding", K::Annotation, 0),
    ("contentMediaType", K::Annotation, 0),
    ("contentSchema", K::Applicator(S::Value, P::Never), 0),
];

const REGISTRY: &[(&str, Table)] = &[
    (vocabulary::DRAFT4, DRAFT4),
    (vocabulary::DRAFT6, DRAFT6),
    (vocabulary::DRAFT7, DRAFT6),
    (vocabulary::DRAFT7, DRAFT7_EXTRA),
    (vocabulary::V2019_09_CORE, CORE_2019_09),
    (vocabulary::V2019_09_APPLICATOR, APPLICATOR_2019_09),
    (vocabulary::V2019_09_VALIDATION, VALIDATION),
    (vocabulary::V2019_09_META_DATA, META_DATA),
    (vocabulary::V2019_09_FORMAT, FORMAT),
    (vocabulary::V2019_09_CONTENT, CONTENT),
    (vocabulary::V2020_12_CORE, CORE_2020_12),
    (vocabulary::V2020_12_APPLICATOR, APPLICATOR_2020_12),
    (vocabulary::V2020_12_UNEVALUATED, UNEVALUATED_2020_12),
    (vocabulary::V2020_12_VALIDATION, VALIDATION),
    (vocabulary::V2020_12_META_DATA, META_DATA),
    (vocabulary::V2020_12_FORMAT_ANNOTATION, FORMAT),
    (vocabulary::V2020_12_FORMAT_ASSERTION, FORMAT),
    (vocabulary::V2020_12_CONTENT, CONTENT),
];

/// Classify `keyword` under the active vocabularies.
pub fn default_walker(keyword: &str, vocabularies: &Vocabularies) -> KeywordInfo {
    for (vocabulary, table) in REGISTRY {
        if !vocabularies.contains(vocabulary) {
            continue;
        }
        if let Some((_, kind, rank)) = table.iter().find(|(name, _, _)| *name == keyword) {
            return KeywordInfo {
                vocabulary: Some(vocabulary),
                kind: *kind,
                rank: *rank,
            };
        }
    }

    // Many 2019-09+ schemas still keep reusable subschemas under the legacy
    // container; frame it so references into it resolve.
    if keyword == "definitions" {
        return KeywordInfo {
            vocabulary: None,
            kind: KeywordKind::Definitions,
            rank: 0,
        };
    }

    KeywordInfo::UNKNOWN
}

/// The keywords of `schema` in compilation order.
pub fn keywords<'a>(
    schema: &'a Json,
    vocabularies: &Vocabularies,
    walker: Walker,
) -> Vec<(&'a str, KeywordInfo)> {
    let Some(object) = schema.as_object() else {
        return Vec::new();
    };
    let mut result: Vec<(&str, KeywordInfo)> = object
        .keys()
        .map(|keyword| (keyword.as_str(), walker(keyword, vocabularies)))
        .collect();
    result.sort_by(|(left, left_info), (right, right_info)| {
        left_info.rank.cmp(&right_info.rank).then_with(|| left.cmp(right))
    });
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vocabulary::Draft;
    use serde_json::json;

    #[test]
    fn classifies_by_draft() {
        let draft4 = Vocabularies::of_draft(Draft::Draft4);
        let draft2020 = Vocabularies::of_draft(Draft::Draft2020_12);
        assert_eq!(default_walker("id", &draft4).kind, KeywordKind::Identifier);
        assert_eq!(default_walker("$id", &draft4).kind, KeywordKind::Unknown);
        assert_eq!(
            default_walker("items", &draft2020).kind,
            KeywordKind::Applicator(Shape::Value, InPlace::Never)
        );
        assert_eq!(
            default_walker("items", &draft4).kind,
            KeywordKind::Applicator(Shape::ValueOrElements, InPlace::Never)
        );
        assert_eq!(
            default_walker("unevaluatedProperties", &draft2020).vocabulary,
            Some(vocabulary::V2020_12_UNEVALUATED)
        );
    }

    #[test]
    fn draft7_inherits_draft6_keywords() {
        let draft7 = Vocabularies::of_draft(Draft::Draft7);
        assert_eq!(default_walker("const", &draft7).kind, KeywordKind::Assertion);
        assert_eq!(default_walker("if", &draft7).vocabulary, Some(vocabulary::DRAFT7));
    }

    #[test]
    fn dependent_keywords_are_ordered_last() {
        let schema = json!({
            "unevaluatedProperties": false,
            "additionalProperties": true,
            "properties": {},
            "type": "object"
        });
        let vocabularies = Vocabularies::of_draft(Draft::Draft2020_12);
        let order: Vec<&str> = keywords(&schema, &vocabularies, default_walker)
            .into_iter()
            .map(|(keyword, _)| keyword)
            .collect();
        assert_eq!(
            order,
            vec!["properties", "type", "additionalProperties", "unevaluatedProperties"]
        );
    }
}
