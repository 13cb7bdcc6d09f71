//! 2019-09 keywords: the `unevaluated*` pair, `dependent*`, bounded
//! `contains`, `$recursiveRef`, and annotation-only vocabularies.
//!
//! 2020-12 reuses most of these unchanged.

use std::collections::BTreeMap;

use jsv_core::{
    CompileError, Instruction, Json, JsonType, Operation, Pointer, Property, PropertyFilter,
    Range, StringSet,
};

use super::draft4::{self, at, sibling};
use super::{fail, tracks_items, tracks_properties};
use crate::compile::compile_child;
use crate::context::{
    find_adjacent, make, make_with_children, make_with_resource, parse_regex, pattern_as_prefix,
    relative_dynamic_context, static_location, subschema_pointer, unsigned_integer_property,
    Context, DynamicContext, SchemaContext,
};
use crate::frame::ReferenceType;
use crate::vocabulary::{V2019_09_APPLICATOR, V2020_12_APPLICATOR};

type Lowered = Result<Vec<Instruction>, CompileError>;

/// The keyword's value as an annotation.
pub fn annotation(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
) -> Lowered {
    let Some(value) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    Ok(vec![make(
        context,
        schema_context,
        dynamic_context,
        Operation::AnnotationEmit(value.clone()),
    )])
}

/// Lower a `$recursiveRef` or `$dynamicRef` that the frame resolved against
/// the dynamic scope, or `None` when it binds statically.
pub(crate) fn dynamic_jump(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
) -> Option<Instruction> {
    let entry = static_location(context, schema_context)?;
    let reference = context
        .frame
        .reference(ReferenceType::Dynamic, &entry.pointer)?;
    let anchor = reference.fragment.clone().unwrap_or_default();
    Some(make_with_resource(
        context,
        schema_context,
        dynamic_context,
        Operation::ControlDynamicAnchorJump(anchor),
        &reference.base,
    ))
}

pub fn recursive_ref(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    current: &[Instruction],
) -> Lowered {
    match dynamic_jump(context, schema_context, dynamic_context) {
        Some(jump) => Ok(vec![jump]),
        None => draft4::reference(context, schema_context, dynamic_context, current),
    }
}

pub fn dependent_required(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(Json::Object(dependencies)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    if schema_context.declares_other_type(&["object"]) {
        return Ok(Vec::new());
    }
    let mut requirements = BTreeMap::new();
    for (name, value) in dependencies {
        let Json::Array(names) = value else {
            continue;
        };
        let names: Vec<String> = names
            .iter()
            .filter_map(Json::as_str)
            .map(str::to_string)
            .collect();
        if !names.is_empty() {
            requirements.insert(name.clone(), names);
        }
    }
    if requirements.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![make(
        context,
        schema_context,
        dynamic_context,
        Operation::AssertionPropertyDependencies(requirements),
    )])
}

pub fn dependent_schemas(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(Json::Object(dependencies)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    if schema_context.declares_other_type(&["object"]) {
        return Ok(Vec::new());
    }
    let relative = relative_dynamic_context();
    let here = Pointer::new();
    let mut children = Vec::new();
    // Map keys are already sorted.
    for (name, value) in dependencies {
        if !(value.is_object() || *value == Json::Bool(false)) {
            continue;
        }
        let steps = compile_child(context, schema_context, &relative, &at(name.as_str()), &here)?;
        if steps.is_empty() {
            continue;
        }
        children.push(make_with_children(
            context,
            schema_context,
            &relative,
            Operation::LogicalWhenDefines(Property::new(name.as_str())),
            steps,
        ));
    }
    if children.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LogicalWhenType(JsonType::Object),
        children,
    )])
}

/// Bounded `contains`. `annotate` reports matching indexes; `track` marks
/// them evaluated. Either forces every item to be visited.
pub(crate) fn contains_with_options(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    annotate: bool,
    track: bool,
) -> Lowered {
    if schema_context.declares_other_type(&["array"]) {
        return Ok(Vec::new());
    }
    let minimum = unsigned_integer_property(schema_context.schema, "minContains").unwrap_or(1);
    let maximum = unsigned_integer_property(schema_context.schema, "maxContains");
    if maximum.is_some_and(|maximum| minimum > maximum) {
        return Ok(fail(context, schema_context, dynamic_context));
    }
    if minimum == 0 && maximum.is_none() {
        return Ok(Vec::new());
    }

    let here = Pointer::new();
    let relative = relative_dynamic_context();
    let mut children = compile_child(context, schema_context, &relative, &here, &here)?;

    if children.is_empty() && !annotate && !track {
        // Every item matches, so the count is the array size.
        let mut steps = Vec::new();
        if minimum > 0 {
            steps.push(make(
                context,
                schema_context,
                dynamic_context,
                Operation::AssertionArraySizeGreater(minimum - 1),
            ));
        }
        if let Some(maximum) = maximum {
            steps.push(make(
                context,
                schema_context,
                dynamic_context,
                Operation::AssertionArraySizeLess(maximum + 1),
            ));
        }
        return Ok(steps);
    }

    if annotate {
        children.push(make(context, schema_context, &relative, Operation::AnnotationBasenameToParent));
    }
    if track {
        children.push(make(
            context,
            schema_context,
            &relative,
            Operation::ControlEvaluate(Pointer::new()),
        ));
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LoopContains(Range {
            minimum,
            maximum,
            exhaustive: annotate || track,
        }),
        children,
    )])
}

pub fn contains(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    contains_with_options(
        context,
        schema_context,
        dynamic_context,
        context.is_exhaustive(),
        tracks_items(context),
    )
}

pub fn items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    draft4::items_with_options(
        context,
        schema_context,
        dynamic_context,
        context.is_exhaustive(),
        tracks_items(context),
    )
}

pub fn additional_items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    draft4::additional_items_with_options(
        context,
        schema_context,
        dynamic_context,
        context.is_exhaustive(),
        tracks_items(context),
    )
}

pub fn properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    draft4::properties_with_options(
        context,
        schema_context,
        dynamic_context,
        context.is_exhaustive(),
        tracks_properties(context, schema_context),
    )
}

pub fn pattern_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    draft4::pattern_properties_with_options(
        context,
        schema_context,
        dynamic_context,
        context.is_exhaustive(),
        tracks_properties(context, schema_context),
    )
}

pub fn additional_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    draft4::additional_properties_with_options(
        context,
        schema_context,
        dynamic_context,
        context.is_exhaustive(),
        tracks_properties(context, schema_context),
    )
}

/// Whether this subschema's `unevaluated*` keyword survived the
/// pre-pass that drops the ones a sibling makes vacuous.
fn is_live(context: &Context<'_>, schema_context: &SchemaContext<'_>, items: bool) -> bool {
    let pointer = subschema_pointer(context, schema_context);
    if items {
        context.unevaluated.items.contains(&pointer)
    } else {
        context.unevaluated.properties.contains(&pointer)
    }
}

pub fn unevaluated_items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    if schema_context.declares_other_type(&["array"]) || !is_live(context, schema_context, true) {
        return Ok(Vec::new());
    }
    let here = Pointer::new();
    let relative = relative_dynamic_context();
    let mut children = compile_child(context, schema_context, &relative, &here, &here)?;
    if children.is_empty() {
        return Ok(vec![make(
            context,
            schema_context,
            dynamic_context,
            Operation::ControlEvaluate(Pointer::new()),
        )]);
    }
    if context.is_exhaustive() {
        children.push(make(
            context,
            schema_context,
            &relative,
            Operation::AnnotationToParent(Json::Bool(true)),
        ));
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LoopItemsUnevaluated,
        children,
    )])
}

/// Names and patterns of adjacent `properties`/`patternProperties`, which
/// are always evaluated when present and need no runtime lookup.
fn adjacent_filter(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
) -> Result<PropertyFilter, CompileError> {
    let vocabularies = [V2019_09_APPLICATOR, V2020_12_APPLICATOR];
    let mut names = Vec::new();
    for properties in find_adjacent(context, schema_context, &vocabularies, "properties", JsonType::Object)
    {
        if let Json::Object(properties) = properties {
            names.extend(properties.keys().cloned());
        }
    }

    let mut prefixes = Vec::new();
    let mut patterns = Vec::new();
    let pattern_context = sibling(schema_context, "patternProperties");
    for properties in find_adjacent(
        context,
        schema_context,
        &vocabularies,
        "patternProperties",
        JsonType::Object,
    ) {
        let Json::Object(properties) = properties else {
            continue;
        };
        for pattern in properties.keys() {
            match pattern_as_prefix(pattern) {
                Some(prefix) => prefixes.push(prefix),
                None => patterns.push(parse_regex(pattern, &pattern_context)?),
            }
        }
    }
    prefixes.sort();
    prefixes.dedup();

    Ok(PropertyFilter {
        names: StringSet::from_names(names),
        prefixes,
        patterns,
    })
}

pub fn unevaluated_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    if schema_context.declares_other_type(&["object"]) || !is_live(context, schema_context, false)
    {
        return Ok(Vec::new());
    }
    let here = Pointer::new();
    let relative = relative_dynamic_context();
    let mut children = compile_child(context, schema_context, &relative, &here, &here)?;
    if children.is_empty() {
        return Ok(vec![make(
            context,
            schema_context,
            dynamic_context,
            Operation::ControlEvaluate(Pointer::new()),
        )]);
    }
    if context.is_exhaustive() {
        children.push(make(
            context,
            schema_context,
            &relative,
            Operation::AnnotationBasenameToParent,
        ));
    }

    let filter = adjacent_filter(context, schema_context)?;
    let operation = if filter.is_empty() {
        Operation::LoopPropertiesUnevaluated
    } else {
        Operation::LoopPropertiesUnevaluatedExcept(filter)
    };
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        operation,
        children,
    )])
}

/// `contentEncoding`, `contentMediaType` and `contentSchema` only annotate.
pub fn content(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    if !context.is_exhaustive() || schema_context.property_name {
        return Ok(Vec::new());
    }
    annotation(context, schema_context, dynamic_context)
}

/// Under the annotation vocabularies `format` does not assert.
pub fn format(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    current: &[Instruction],
) -> Lowered {
    content(context, schema_context, dynamic_context, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::rules::tests::lower;
    use serde_json::json;

    const DIALECT: &str = "https://json-schema.org/draft/2019-09/schema";

    #[test]
    fn impossible_contains_bounds_fail_outright() {
        let template = lower(
            json!({"$schema": DIALECT, "contains": {"type": "string"}, "minContains": 2, "maxContains": 1}),
            Mode::FastValidation,
        );
        assert_eq!(template.instructions.len(), 1);
        assert_eq!(template.instructions[0].operation, Operation::AssertionFail);
    }

    #[test]
    fn zero_min_contains_without_maximum_is_dropped() {
        let template = lower(
            json!({"$schema": DIALECT, "contains": {"type": "string"}, "minContains": 0}),
            Mode::FastValidation,
        );
        assert!(template.instructions.is_empty());
    }

    #[test]
    fn trivial_contains_becomes_size_bounds() {
        let template = lower(
            json!({"$schema": DIALECT, "contains": true, "maxContains": 2}),
            Mode::FastValidation,
        );
        let operations: Vec<_> = template
            .instructions
            .iter()
            .map(|instruction| instruction.operation.clone())
            .collect();
        assert_eq!(
            operations,
            vec![
                Operation::AssertionArraySizeGreater(0),
                Operation::AssertionArraySizeLess(3),
            ]
        );
    }

    #[test]
    fn bounded_contains_keeps_both_limits() {
        let template = lower(
            json!({"$schema": DIALECT, "contains": {"type": "string"}, "minContains": 2, "maxContains": 3}),
            Mode::FastValidation,
        );
        assert_eq!(
            template.instructions[0].operation,
            Operation::LoopContains(Range {
                minimum: 2,
                maximum: Some(3),
                exhaustive: false,
            })
        );
    }

    #[test]
    fn adjacent_properties_are_excluded_up_front() {
        let template = lower(
            json!({
                "$schema": DIALECT,
                "properties": {"a": {"type": "string"}},
                "patternProperties": {"^x-": true, "[0-9]$": true},
                "unevaluatedProperties": {"type": "integer"}
            }),
            Mode::FastValidation,
        );
        let filter = template
            .instructions
            .iter()
            .find_map(|instruction| match &instruction.operation {
                Operation::LoopPropertiesUnevaluatedExcept(filter) => Some(filter.clone()),
                _ => None,
            })
            .unwrap();
        assert!(filter.names.contains("a"));
        assert_eq!(filter.prefixes, vec!["x-".to_string()]);
        assert_eq!(filter.patterns.len(), 1);
    }

    #[test]
    fn false_unevaluated_items_loop_over_remaining_items() {
        let template = lower(
            json!({"$schema": DIALECT, "items": [{"type": "string"}], "unevaluatedItems": false}),
            Mode::FastValidation,
        );
        assert!(template.contains(|operation| *operation == Operation::LoopItemsUnevaluated));
        assert!(template.track);
    }

    #[test]
    fn dependent_required_skips_empty_lists() {
        let template = lower(
            json!({"$schema": DIALECT, "dependentRequired": {"a": ["b"], "c": []}}),
            Mode::FastValidation,
        );
        let expected: BTreeMap<String, Vec<String>> =
            [("a".to_string(), vec!["b".to_string()])].into_iter().collect();
        assert_eq!(
            template.instructions[0].operation,
            Operation::AssertionPropertyDependencies(expected)
        );
    }

    #[test]
    fn dependent_schemas_guard_each_property() {
        let template = lower(
            json!({"$schema": DIALECT, "dependentSchemas": {"a": {"required": ["b"]}, "c": true}}),
            Mode::FastValidation,
        );
        let guard = &template.instructions[0];
        assert_eq!(guard.operation, Operation::LogicalWhenType(JsonType::Object));
        assert_eq!(guard.children.len(), 1);
        assert_eq!(guard.children[0].operation, Operation::LogicalWhenDefines(Property::new("a")));
    }

    #[test]
    fn recursive_reference_without_anchor_is_static() {
        let template = lower(
            json!({
                "$schema": DIALECT,
                "properties": {"next": {"$recursiveRef": "#"}},
                "type": "object"
            }),
            Mode::FastValidation,
        );
        assert!(!template.dynamic);
        assert!(!template.contains(|operation| matches!(operation, Operation::ControlDynamicAnchorJump(_))));
    }

    #[test]
    fn annotations_only_in_exhaustive_mode() {
        let schema = json!({"$schema": DIALECT, "format": "email", "contentMediaType": "text/plain"});
        assert!(lower(schema.clone(), Mode::FastValidation).instructions.is_empty());
        assert_eq!(lower(schema, Mode::Exhaustive).instructions.len(), 2);
    }
}
