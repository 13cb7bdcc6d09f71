//! # Keyword Lowering Rules
//!
//! [`default_compiler`] maps a keyword, under the vocabularies active where
//! it appears, to the rule that lowers it. Later drafts reuse the rules of
//! earlier ones where the semantics did not change, so every rule lives in
//! the module of the draft that introduced it.
//!
//! Each table is scanned in order and the first entry whose vocabulary is
//! active and whose keyword matches wins. Keywords no table claims fall
//! through to [`fallback`], which turns them into annotations on 2019-09 and
//! later dialects.

pub mod draft2019_09;
pub mod draft2020_12;
pub mod draft4;
pub mod draft6;
pub mod draft7;

use jsv_core::{CompileError, Instruction, JsonType, Operation, SchemaVocabularyError};

use crate::context::{
    make, subschema_pointer, Context, DynamicContext, KeywordCompiler, SchemaContext,
};
use crate::vocabulary::{
    DRAFT4, DRAFT6, DRAFT7, V2019_09_APPLICATOR, V2019_09_CONTENT, V2019_09_CORE,
    V2019_09_FORMAT, V2019_09_VALIDATION, V2020_12_APPLICATOR, V2020_12_CONTENT, V2020_12_CORE,
    V2020_12_FORMAT_ANNOTATION, V2020_12_HYPER_SCHEMA, V2020_12_UNEVALUATED,
    V2020_12_VALIDATION,
};

type Table = &'static [(&'static str, &'static str, KeywordCompiler)];

/// Core, applicator and validation vocabularies shared by 2019-09 and
/// 2020-12 under different URIs.
macro_rules! modern_common {
    ($core:expr, $applicator:expr, $validation:expr) => {
        [
            ($applicator, "if", draft7::if_then_else as KeywordCompiler),
            ($applicator, "then", draft7::handled_by_if),
            ($applicator, "else", draft7::handled_by_if),
            ($applicator, "propertyNames", draft6::property_names),
            ($validation, "type", draft6::type_),
            ($validation, "const", draft6::constant),
            ($validation, "exclusiveMaximum", draft6::exclusive_maximum),
            ($validation, "exclusiveMinimum", draft6::exclusive_minimum),
            ($applicator, "dependencies", draft4::dependencies),
            ($core, "$ref", draft4::reference),
            ($applicator, "allOf", draft4::all_of),
            ($applicator, "anyOf", draft4::any_of),
            ($applicator, "oneOf", draft4::one_of),
            ($applicator, "not", draft4::not),
            ($validation, "enum", draft4::enumeration),
            ($validation, "uniqueItems", draft4::unique_items),
            ($validation, "maxItems", draft4::max_items),
            ($validation, "minItems", draft4::min_items),
            ($validation, "required", draft4::required),
            ($validation, "maxProperties", draft4::max_properties),
            ($validation, "minProperties", draft4::min_properties),
            ($validation, "maximum", draft4::maximum),
            ($validation, "minimum", draft4::minimum),
            ($validation, "multipleOf", draft4::multiple_of),
            ($validation, "maxLength", draft4::max_length),
            ($validation, "minLength", draft4::min_length),
            ($validation, "pattern", draft4::pattern),
        ]
    };
}

const RULES_2020_12_SPECIFIC: Table = &[
    (V2020_12_CORE, "$dynamicRef", draft2020_12::dynamic_ref),
    (V2020_12_APPLICATOR, "prefixItems", draft2020_12::prefix_items),
    (V2020_12_APPLICATOR, "items", draft2020_12::items),
    (V2020_12_APPLICATOR, "contains", draft2020_12::contains),
    (V2020_12_VALIDATION, "dependentRequired", draft2019_09::dependent_required),
    (V2020_12_APPLICATOR, "dependentSchemas", draft2019_09::dependent_schemas),
    (V2020_12_APPLICATOR, "properties", draft2019_09::properties),
    (V2020_12_APPLICATOR, "patternProperties", draft2019_09::pattern_properties),
    (V2020_12_APPLICATOR, "additionalProperties", draft2019_09::additional_properties),
    (V2020_12_UNEVALUATED, "unevaluatedProperties", draft2019_09::unevaluated_properties),
    (V2020_12_UNEVALUATED, "unevaluatedItems", draft2019_09::unevaluated_items),
    (V2020_12_CONTENT, "contentEncoding", draft2019_09::content),
    (V2020_12_CONTENT, "contentMediaType", draft2019_09::content),
    (V2020_12_CONTENT, "contentSchema", draft2019_09::content),
    (V2020_12_FORMAT_ANNOTATION, "format", draft2019_09::format),
];

const RULES_2020_12_COMMON: Table =
    &modern_common!(V2020_12_CORE, V2020_12_APPLICATOR, V2020_12_VALIDATION);

const RULES_2019_09_SPECIFIC: Table = &[
    (V2019_09_CORE, "$recursiveRef", draft2019_09::recursive_ref),
    (V2019_09_VALIDATION, "dependentRequired", draft2019_09::dependent_required),
    (V2019_09_APPLICATOR, "dependentSchemas", draft2019_09::dependent_schemas),
    (V2019_09_APPLICATOR, "contains", draft2019_09::contains),
    (V2019_09_APPLICATOR, "unevaluatedItems", draft2019_09::unevaluated_items),
    (V2019_09_APPLICATOR, "unevaluatedProperties", draft2019_09::unevaluated_properties),
    (V2019_09_APPLICATOR, "items", draft2019_09::items),
    (V2019_09_APPLICATOR, "additionalItems", draft2019_09::additional_items),
    (V2019_09_APPLICATOR, "properties", draft2019_09::properties),
    (V2019_09_APPLICATOR, "patternProperties", draft2019_09::pattern_properties),
    (V2019_09_APPLICATOR, "additionalProperties", draft2019_09::additional_properties),
    (V2019_09_CONTENT, "contentEncoding", draft2019_09::content),
    (V2019_09_CONTENT, "contentMediaType", draft2019_09::content),
    (V2019_09_CONTENT, "contentSchema", draft2019_09::content),
    (V2019_09_FORMAT, "format", draft2019_09::format),
];

const RULES_2019_09_COMMON: Table =
    &modern_common!(V2019_09_CORE, V2019_09_APPLICATOR, V2019_09_VALIDATION);

const RULES_DRAFT7: Table = &[
    (DRAFT7, "if", draft7::if_then_else),
    (DRAFT7, "then", draft7::handled_by_if),
    (DRAFT7, "else", draft7::handled_by_if),
    (DRAFT7, "type", draft6::type_),
    (DRAFT7, "const", draft6::constant),
    (DRAFT7, "contains", draft6::contains),
    (DRAFT7, "propertyNames", draft6::property_names),
    (DRAFT7, "exclusiveMaximum", draft6::exclusive_maximum),
    (DRAFT7, "exclusiveMinimum", draft6::exclusive_minimum),
];

const RULES_DRAFT6: Table = &[
    (DRAFT6, "type", draft6::type_),
    (DRAFT6, "const", draft6::constant),
    (DRAFT6, "contains", draft6::contains),
    (DRAFT6, "propertyNames", draft6::property_names),
    (DRAFT6, "exclusiveMaximum", draft6::exclusive_maximum),
    (DRAFT6, "exclusiveMinimum", draft6::exclusive_minimum),
];

/// Keywords draft 6 and 7 lower exactly like draft 4.
const RULES_DRAFT4_INHERITED: &[(&str, KeywordCompiler)] = &[
    ("allOf", draft4::all_of),
    ("anyOf", draft4::any_of),
    ("oneOf", draft4::one_of),
    ("not", draft4::not),
    ("enum", draft4::enumeration),
    ("items", draft4::items),
    ("additionalItems", draft4::additional_items),
    ("uniqueItems", draft4::unique_items),
    ("maxItems", draft4::max_items),
    ("minItems", draft4::min_items),
    ("required", draft4::required),
    ("maxProperties", draft4::max_properties),
    ("minProperties", draft4::min_properties),
    ("properties", draft4::properties),
    ("patternProperties", draft4::pattern_properties),
    ("additionalProperties", draft4::additional_properties),
    ("dependencies", draft4::dependencies),
    ("maximum", draft4::maximum),
    ("minimum", draft4::minimum),
    ("multipleOf", draft4::multiple_of),
    ("maxLength", draft4::max_length),
    ("minLength", draft4::min_length),
    ("pattern", draft4::pattern),
];

const RULES_DRAFT4: Table = &[
    (DRAFT4, "allOf", draft4::all_of),
    (DRAFT4, "anyOf", draft4::any_of),
    (DRAFT4, "oneOf", draft4::one_of),
    (DRAFT4, "not", draft4::not),
    (DRAFT4, "properties", draft4::properties),
    (DRAFT4, "patternProperties", draft4::pattern_properties),
    (DRAFT4, "additionalProperties", draft4::additional_properties),
    (DRAFT4, "items", draft4::items),
    (DRAFT4, "additionalItems", draft4::additional_items),
    (DRAFT4, "dependencies", draft4::dependencies),
    (DRAFT4, "type", draft4::type_),
    (DRAFT4, "enum", draft4::enumeration),
    (DRAFT4, "required", draft4::required),
    (DRAFT4, "maxProperties", draft4::max_properties),
    (DRAFT4, "minProperties", draft4::min_properties),
    (DRAFT4, "uniqueItems", draft4::unique_items),
    (DRAFT4, "maxItems", draft4::max_items),
    (DRAFT4, "minItems", draft4::min_items),
    (DRAFT4, "pattern", draft4::pattern),
    (DRAFT4, "maxLength", draft4::max_length),
    (DRAFT4, "minLength", draft4::min_length),
    (DRAFT4, "format", draft4::format),
    (DRAFT4, "maximum", draft4::maximum),
    (DRAFT4, "minimum", draft4::minimum),
    (DRAFT4, "multipleOf", draft4::multiple_of),
];

fn lookup(table: Table, schema_context: &SchemaContext<'_>, keyword: &str) -> Option<KeywordCompiler> {
    table
        .iter()
        .find(|(vocabulary, name, _)| {
            *name == keyword && schema_context.vocabularies.contains(vocabulary)
        })
        .map(|(_, _, rule)| *rule)
}

/// The default keyword dispatcher.
///
/// # Errors
///
/// Fails with a [`SchemaVocabularyError`] for the 2020-12 hyper-schema
/// vocabulary, and otherwise propagates whatever the selected rule raises.
pub fn default_compiler(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    current: &[Instruction],
) -> Result<Vec<Instruction>, CompileError> {
    let vocabularies = schema_context.vocabularies;
    if vocabularies.contains(V2020_12_HYPER_SCHEMA) {
        return Err(SchemaVocabularyError::unsupported(V2020_12_HYPER_SCHEMA).into());
    }

    let keyword = dynamic_context.keyword.as_str();
    for table in [
        RULES_2020_12_SPECIFIC,
        RULES_2020_12_COMMON,
        RULES_2019_09_SPECIFIC,
        RULES_2019_09_COMMON,
    ] {
        if let Some(rule) = lookup(table, schema_context, keyword) {
            return rule(context, schema_context, dynamic_context, current);
        }
    }

    // Before 2019-09, `$ref` hides every sibling keyword.
    for draft in [DRAFT7, DRAFT6, DRAFT4] {
        if !vocabularies.contains(draft) {
            continue;
        }
        if keyword == "$ref" {
            return draft4::reference(context, schema_context, dynamic_context, current);
        }
        if schema_context.schema.get("$ref").is_some() {
            return Ok(Vec::new());
        }
        let specific = match draft {
            DRAFT7 => RULES_DRAFT7,
            DRAFT6 => RULES_DRAFT6,
            _ => RULES_DRAFT4,
        };
        if let Some(rule) = lookup(specific, schema_context, keyword) {
            return rule(context, schema_context, dynamic_context, current);
        }
        if draft != DRAFT4 {
            if let Some((_, rule)) = RULES_DRAFT4_INHERITED.iter().find(|(name, _)| *name == keyword) {
                return rule(context, schema_context, dynamic_context, current);
            }
        }
    }

    fallback(context, schema_context, dynamic_context)
}

/// Unknown keywords of 2019-09 and later become annotations carrying their
/// value, when anything can observe them.
fn fallback(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
) -> Result<Vec<Instruction>, CompileError> {
    let vocabularies = schema_context.vocabularies;
    let keyword = dynamic_context.keyword.as_str();
    if !vocabularies.contains_any(&[V2019_09_CORE, V2020_12_CORE])
        || keyword.starts_with('$')
        || keyword == "definitions"
    {
        return Ok(Vec::new());
    }

    // Consumed by `contains`.
    if matches!(keyword, "minContains" | "maxContains")
        && vocabularies.contains_any(&[V2019_09_VALIDATION, V2020_12_VALIDATION])
    {
        return Ok(Vec::new());
    }

    if context.is_fast() || schema_context.property_name {
        return Ok(Vec::new());
    }
    draft2019_09::annotation(context, schema_context, dynamic_context)
}

/// Whether the enclosing subschema must mark the properties it evaluates
/// for an `unevaluatedProperties` somewhere in the schema.
pub(crate) fn tracks_properties(context: &Context<'_>, schema_context: &SchemaContext<'_>) -> bool {
    !context.unevaluated.properties.is_empty()
        && !context
            .unevaluated
            .properties
            .contains(&subschema_pointer(context, schema_context))
}

/// Whether item evaluation must be marked for an `unevaluatedItems`
/// somewhere in the schema.
pub(crate) fn tracks_items(context: &Context<'_>) -> bool {
    !context.unevaluated.items.is_empty()
}

/// Whether any evaluation marks are collected at all.
pub(crate) fn requires_evaluation(context: &Context<'_>) -> bool {
    context.unevaluated.requires_evaluation()
}

/// A leaf whose only job is to fail when the keyword is impossible to
/// satisfy.
pub(crate) fn fail(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
) -> Vec<Instruction> {
    vec![make(context, schema_context, dynamic_context, Operation::AssertionFail)]
}

/// The single type a step list checks, if it is exactly one type assertion
/// that fast mode can fold into its parent loop.
pub(crate) fn single_type_check(steps: &[Instruction]) -> Option<&Operation> {
    match steps {
        [step] if step.children.is_empty() => match &step.operation {
            operation @ (Operation::AssertionTypeStrict(_)
            | Operation::AssertionType(_)
            | Operation::AssertionTypeStrictAny(_)) => Some(operation),
            _ => None,
        },
        _ => None,
    }
}

/// The type of a single strict type assertion.
pub(crate) fn single_strict_type(steps: &[Instruction]) -> Option<JsonType> {
    match single_type_check(steps) {
        Some(Operation::AssertionTypeStrict(json_type)) => Some(*json_type),
        _ => None,
    }
}
