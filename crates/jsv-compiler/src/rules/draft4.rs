//! Draft 4 keywords, and the shared machinery later drafts build on.
//!
//! The `*_with_options` functions take the two knobs that differ between
//! drafts: whether to emit annotations and whether to mark evaluated
//! locations for `unevaluatedProperties`/`unevaluatedItems`.

use std::collections::{BTreeMap, BTreeSet};

use jsv_core::{
    json, label_id, CompileError, Instruction, Json, JsonType, Operation, Pointer, Property,
    PropertyFilter, Range, SchemaReferenceError, StringFormat, StringSet, Token,
};
use serde_json::Map;

use super::{requires_evaluation, single_strict_type, single_type_check, tracks_properties};
use crate::compile::{compile_child, compile_location};
use crate::context::{
    collect_jump_labels, direct_enumeration, is_closed_properties_required, is_inside_disjunctor,
    make, make_with_children, parse_regex, pattern_as_prefix, rephrase, relative_dynamic_context,
    static_location, subschema_pointer, template_size, unsigned_integer_property, Context,
    DynamicContext, SchemaContext,
};
use crate::frame::ReferenceType;
use crate::uri;
use crate::vocabulary::{DRAFT4, DRAFT6, DRAFT7, V2019_09_VALIDATION, V2020_12_VALIDATION};
use crate::walker;

type Lowered = Result<Vec<Instruction>, CompileError>;

const FORMAT_REGEX_IPV4: &str = r"^(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])\.(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])\.(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])\.(25[0-5]|2[0-4][0-9]|1[0-9][0-9]|[1-9][0-9]|[0-9])$";

/// A one-token pointer.
pub(crate) fn at(token: impl Into<Token>) -> Pointer {
    Pointer::new().join(token)
}

/// A schema context for a sibling keyword of the one being lowered.
pub(crate) fn sibling<'a>(schema_context: &SchemaContext<'a>, keyword: &str) -> SchemaContext<'a> {
    let mut pointer = schema_context.relative_pointer.clone();
    pointer.pop();
    pointer.push(keyword);
    schema_context.with_pointer(pointer)
}

fn required_names(schema: &Json) -> BTreeSet<&str> {
    schema
        .get("required")
        .and_then(Json::as_array)
        .map(|names| names.iter().filter_map(Json::as_str).collect())
        .unwrap_or_default()
}

fn is_schema(value: &Json) -> bool {
    value.is_object() || value.is_boolean()
}

fn is_fail(steps: &[Instruction]) -> bool {
    matches!(steps, [step] if step.operation == Operation::AssertionFail)
}

pub fn reference(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let identifier = schema_context
        .value(dynamic_context)
        .and_then(Json::as_str)
        .unwrap_or_default()
        .to_string();
    let unknown = |pointer: String| SchemaReferenceError {
        identifier: identifier.clone(),
        pointer,
        message: "The schema location is inside of an unknown keyword".to_string(),
    };
    let entry = static_location(context, schema_context)
        .ok_or_else(|| unknown(schema_context.relative_pointer.to_string()))?;
    let reference = context
        .frame
        .reference(ReferenceType::Static, &entry.pointer)
        .ok_or_else(|| unknown(entry.pointer.to_string()))?;

    let destination = uri::canonicalize(&reference.destination);
    let label = label_id(0, &destination);
    if schema_context.labels.contains(&label) || context.precompiled.contains(&destination) {
        return Ok(vec![make(
            context,
            schema_context,
            dynamic_context,
            Operation::ControlJump(label),
        )]);
    }

    let mut nested = schema_context.clone();
    nested.references.insert(destination.clone());

    let target = context.frame.traverse(&destination);
    let direct_children_references = target.map_or(0, |target| {
        context
            .frame
            .references()
            .keys()
            .filter(|(_, pointer)| pointer.starts_with(&target.pointer))
            .count()
    });
    let is_recursive = target.is_some_and(|target| entry.pointer.starts_with(&target.pointer))
        || schema_context.references.contains(&destination);
    let here = Pointer::new();

    if !is_recursive && direct_children_references <= context.tweaks.inline_threshold {
        if context.is_fast() && !context.uses_dynamic_scopes {
            return compile_location(
                context,
                &nested,
                dynamic_context,
                &here,
                &here,
                Some(&destination),
            );
        }
        let children = compile_location(
            context,
            &nested,
            &relative_dynamic_context(),
            &here,
            &here,
            Some(&destination),
        )?;
        return Ok(vec![make_with_children(
            context,
            schema_context,
            dynamic_context,
            Operation::LogicalAnd,
            children,
        )]);
    }

    nested.labels.insert(label);
    let children = compile_location(
        context,
        &nested,
        &relative_dynamic_context(),
        &here,
        &here,
        Some(&destination),
    )?;
    let mut used = BTreeSet::new();
    collect_jump_labels(&children, &mut used);
    if !used.contains(&label) {
        // Nothing below jumps back, so the label is dead weight.
        return compile_location(
            context,
            schema_context,
            dynamic_context,
            &here,
            &here,
            Some(&destination),
        );
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::ControlLabel(label),
        children,
    )])
}

pub fn all_of(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(Json::Array(branches)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    let here = Pointer::new();
    let mut children = Vec::new();
    if context.is_fast() && !context.uses_dynamic_scopes {
        for index in 0..branches.len() {
            children.extend(compile_child(
                context,
                schema_context,
                dynamic_context,
                &at(index),
                &here,
            )?);
        }
        return Ok(children);
    }
    for index in 0..branches.len() {
        children.extend(compile_child(
            context,
            schema_context,
            &relative_dynamic_context(),
            &at(index),
            &here,
        )?);
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LogicalAnd,
        children,
    )])
}

/// One `ControlGroup` per branch of `anyOf` or `oneOf`.
fn disjunctors(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
) -> Lowered {
    let Some(Json::Array(branches)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    let relative = relative_dynamic_context();
    let mut groups = Vec::with_capacity(branches.len());
    for index in 0..branches.len() {
        let steps = compile_child(context, schema_context, &relative, &at(index), &Pointer::new())?;
        groups.push(make_with_children(
            context,
            schema_context,
            &relative,
            Operation::ControlGroup,
            steps,
        ));
    }
    Ok(groups)
}

pub fn any_of(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let groups = disjunctors(context, schema_context, dynamic_context)?;
    if groups.is_empty() {
        return Ok(Vec::new());
    }

    // A disjunction of plain type checks is a single type check.
    if context.is_fast() {
        let mut types = Vec::new();
        let collapsible = groups.iter().all(|group| match group.children.as_slice() {
            [step] => match &step.operation {
                Operation::AssertionTypeStrict(json_type) => {
                    types.push(*json_type);
                    true
                }
                Operation::AssertionTypeStrictAny(many) => {
                    types.extend(many.iter().copied());
                    true
                }
                _ => false,
            },
            _ => false,
        });
        if collapsible {
            let operation = match types.as_slice() {
                [json_type] => Operation::AssertionTypeStrict(*json_type),
                _ => Operation::AssertionTypeStrictAny(types),
            };
            return Ok(vec![make(context, schema_context, dynamic_context, operation)]);
        }
    }

    let exhaustive = context.is_exhaustive() || requires_evaluation(context);
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LogicalOr(exhaustive),
        groups,
    )])
}

pub fn one_of(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let groups = disjunctors(context, schema_context, dynamic_context)?;
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    let exhaustive = context.is_exhaustive() || requires_evaluation(context);
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LogicalXor(exhaustive),
        groups,
    )])
}

pub fn not(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let here = Pointer::new();
    let children = compile_child(
        context,
        schema_context,
        &relative_dynamic_context(),
        &here,
        &here,
    )?;

    // Evaluation marks collected under a negation must be thrown away.
    let applies_subschemas = schema_context.value(dynamic_context).is_some_and(|subschema| {
        walker::keywords(subschema, schema_context.vocabularies, context.walker)
            .iter()
            .any(|(_, info)| info.is_applicator())
    });
    let operation = if applies_subschemas && requires_evaluation(context) {
        Operation::LogicalNotEvaluate
    } else {
        Operation::LogicalNot
    };
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        operation,
        children,
    )])
}

/// Whether to lower `properties` as a single loop dispatching on the member
/// name rather than one guarded group per declared property. Loops win for
/// wide, mostly optional property lists.
fn properties_as_loop(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    properties: &Map<String, Json>,
) -> bool {
    let size = properties.len();
    let vocabularies = schema_context.vocabularies;
    let imports_validation = vocabularies.contains_any(&[
        DRAFT4,
        DRAFT6,
        DRAFT7,
        V2019_09_VALIDATION,
        V2020_12_VALIDATION,
    ]);
    let imports_const =
        vocabularies.contains_any(&[DRAFT6, DRAFT7, V2019_09_VALIDATION, V2020_12_VALIDATION]);
    let required = required_names(schema_context.schema)
        .into_iter()
        .filter(|name| properties.contains_key(*name))
        .count();

    let inside_disjunctor = is_inside_disjunctor(&schema_context.relative_pointer) || {
        let here = subschema_pointer(context, schema_context);
        context.frame.references().iter().any(|((kind, pointer), reference)| {
            *kind == ReferenceType::Static
                && is_inside_disjunctor(pointer)
                && context
                    .frame
                    .traverse(&reference.destination)
                    .is_some_and(|target| target.pointer == here)
        })
    };

    if !inside_disjunctor
        && schema_context.schema.get("additionalProperties") == Some(&Json::Bool(false))
        && required < size
    {
        return true;
    }

    // Inside a disjunction, enumerated properties are what tells branches
    // apart, and the unrolled form checks them first.
    let pins_value = |subschema: &Json| {
        subschema.as_object().is_some_and(|object| {
            (imports_validation && object.contains_key("enum"))
                || (imports_const && object.contains_key("const"))
        })
    };
    required <= size / 4
        && size > 5
        && (!inside_disjunctor || !properties.values().any(pins_value))
}

/// Lower every member of `properties`, cheapest and most selective first.
fn compile_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    properties: &Map<String, Json>,
) -> Result<Vec<(String, Vec<Instruction>)>, CompileError> {
    let mut compiled = Vec::with_capacity(properties.len());
    for name in properties.keys() {
        let steps = compile_child(
            context,
            schema_context,
            dynamic_context,
            &at(name.as_str()),
            &at(name.as_str()),
        )?;
        compiled.push((name.clone(), steps));
    }
    compiled.sort_by_cached_key(|(name, steps)| {
        let enumeration = direct_enumeration(steps).map_or((1, 0), |depth| (0, depth));
        (template_size(steps), enumeration, name.clone())
    });
    Ok(compiled)
}

/// Whether `properties`, `required` and `additionalProperties: false`
/// together pin the object to exactly the declared members, in a way fast
/// mode can check with one loop. `schema_context` may point at any keyword
/// of the subschema.
fn closes_properties(context: &Context<'_>, schema_context: &SchemaContext<'_>) -> bool {
    if !context.is_fast()
        || !schema_context.declares_type("object")
        || schema_context.schema.get("patternProperties").is_some()
        || tracks_properties(context, schema_context)
    {
        return false;
    }
    let required: BTreeSet<String> = required_names(schema_context.schema)
        .into_iter()
        .map(str::to_string)
        .collect();
    is_closed_properties_required(schema_context.schema, &required)
}

/// The type every compiled member checks, when each is a lone strict type
/// assertion of the same type.
fn uniform_strict_type(compiled: &[(String, Vec<Instruction>)]) -> Option<JsonType> {
    let mut types = compiled.iter().map(|(_, steps)| single_strict_type(steps));
    let first = types.next()??;
    types.all(|json_type| json_type == Some(first)).then_some(first)
}

fn property_type_check(operation: &Operation, track: bool) -> Option<Operation> {
    Some(match (operation, track) {
        (Operation::AssertionTypeStrict(json_type), false) => {
            Operation::AssertionPropertyTypeStrict(*json_type)
        }
        (Operation::AssertionTypeStrict(json_type), true) => {
            Operation::AssertionPropertyTypeStrictEvaluate(*json_type)
        }
        (Operation::AssertionType(json_type), false) => Operation::AssertionPropertyType(*json_type),
        (Operation::AssertionType(json_type), true) => {
            Operation::AssertionPropertyTypeEvaluate(*json_type)
        }
        (Operation::AssertionTypeStrictAny(types), false) => {
            Operation::AssertionPropertyTypeStrictAny(types.clone())
        }
        (Operation::AssertionTypeStrictAny(types), true) => {
            Operation::AssertionPropertyTypeStrictAnyEvaluate(types.clone())
        }
        _ => return None,
    })
}

pub(crate) fn properties_with_options(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    annotate: bool,
    track: bool,
) -> Lowered {
    let Some(Json::Object(properties)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    if properties.is_empty() || schema_context.declares_other_type(&["object"]) {
        return Ok(Vec::new());
    }
    let relative = relative_dynamic_context();

    if properties_as_loop(context, schema_context, properties) {
        let compiled = compile_properties(context, schema_context, &relative, properties)?;
        let mut indexes = BTreeMap::new();
        let mut groups = Vec::with_capacity(compiled.len());
        for (index, (name, mut substeps)) in compiled.into_iter().enumerate() {
            if track {
                substeps.push(make(
                    context,
                    schema_context,
                    &relative,
                    Operation::ControlEvaluate(at(name.as_str())),
                ));
            }
            if annotate {
                substeps.push(make(
                    context,
                    schema_context,
                    &relative,
                    Operation::AnnotationEmit(Json::String(name.clone())),
                ));
            }
            indexes.insert(name, index);
            groups.push(make_with_children(
                context,
                schema_context,
                &relative,
                Operation::ControlGroup,
                substeps,
            ));
        }
        let closed = context.is_fast()
            && !track
            && schema_context.schema.get("patternProperties").is_none()
            && schema_context.schema.get("additionalProperties") == Some(&Json::Bool(false));
        let operation = if closed {
            Operation::LoopPropertiesMatchClosed(indexes)
        } else {
            Operation::LoopPropertiesMatch(indexes)
        };
        return Ok(vec![make_with_children(
            context,
            schema_context,
            dynamic_context,
            operation,
            groups,
        )]);
    }

    let effective = if context.is_fast() {
        dynamic_context.clone()
    } else {
        relative
    };
    let compiled = compile_properties(context, schema_context, &effective, properties)?;

    if closes_properties(context, schema_context) {
        if let Some(json_type) = uniform_strict_type(&compiled) {
            let names = StringSet::from_names(compiled.iter().map(|(name, _)| name.as_str()));
            let operation = if names.all_perfect() {
                Operation::LoopPropertiesExactlyTypeStrictHash((json_type, names))
            } else {
                Operation::LoopPropertiesExactlyTypeStrict((json_type, names))
            };
            return Ok(vec![make(context, schema_context, dynamic_context, operation)]);
        }
    }

    let assume_object = schema_context.declares_type("object");
    let required = required_names(schema_context.schema);
    let mut children = Vec::new();
    for (name, mut substeps) in compiled {
        if annotate {
            substeps.push(make(
                context,
                schema_context,
                &effective,
                Operation::AnnotationEmit(Json::String(name.clone())),
            ));
        }

        if context.is_fast() {
            if let Some(operation) =
                single_type_check(&substeps).and_then(|operation| property_type_check(operation, track))
            {
                children.push(rephrase(operation, &substeps[0]));
                continue;
            }
        }

        if track {
            substeps.push(make(
                context,
                schema_context,
                &effective,
                Operation::ControlEvaluate(at(name.as_str())),
            ));
        }
        if substeps.is_empty() {
            continue;
        }

        if !effective.base_instance_location.is_empty() {
            children.push(make_with_children(
                context,
                schema_context,
                &effective,
                Operation::ControlGroupWhenDefines(Property::new(name)),
                substeps,
            ));
        } else if assume_object && required.contains(name.as_str()) {
            // `required` fails the object if the member is missing.
            children.extend(substeps);
        } else {
            children.push(make_with_children(
                context,
                schema_context,
                &effective,
                Operation::ControlGroupWhenDefinesDirect(Property::new(name)),
                substeps,
            ));
        }
    }

    if context.is_fast() || children.is_empty() {
        return Ok(children);
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LogicalAnd,
        children,
    )])
}

pub fn properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    properties_with_options(context, schema_context, dynamic_context, false, false)
}

fn sorted_patterns(schema: &Json) -> Vec<&str> {
    let mut patterns: Vec<&str> = schema
        .get("patternProperties")
        .and_then(Json::as_object)
        .map(|patterns| patterns.keys().map(String::as_str).collect())
        .unwrap_or_default();
    patterns.sort_unstable();
    patterns
}

pub(crate) fn pattern_properties_with_options(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    annotate: bool,
    track: bool,
) -> Lowered {
    let patterns = sorted_patterns(schema_context.schema);
    if patterns.is_empty() || schema_context.declares_other_type(&["object"]) {
        return Ok(Vec::new());
    }
    let relative = relative_dynamic_context();
    let closed = context.is_fast()
        && !track
        && patterns.len() == 1
        && schema_context.schema.get("properties").is_none()
        && schema_context.schema.get("additionalProperties") == Some(&Json::Bool(false));

    let mut result = Vec::new();
    for pattern in patterns {
        let mut substeps =
            compile_child(context, schema_context, &relative, &at(pattern), &Pointer::new())?;
        if annotate {
            substeps.push(make(
                context,
                schema_context,
                &relative,
                Operation::AnnotationBasenameToParent,
            ));
        }
        if track {
            substeps.push(make(
                context,
                schema_context,
                &relative,
                Operation::ControlEvaluate(Pointer::new()),
            ));
        }

        if closed {
            result.push(make_with_children(
                context,
                schema_context,
                dynamic_context,
                Operation::LoopPropertiesRegexClosed(parse_regex(pattern, schema_context)?),
                substeps,
            ));
            continue;
        }
        if substeps.is_empty() {
            continue;
        }
        let operation = match pattern_as_prefix(pattern) {
            Some(prefix) => Operation::LoopPropertiesStartsWith(prefix),
            None => Operation::LoopPropertiesRegex(parse_regex(pattern, schema_context)?),
        };
        result.push(make_with_children(
            context,
            schema_context,
            dynamic_context,
            operation,
            substeps,
        ));
    }
    Ok(result)
}

pub fn pattern_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    pattern_properties_with_options(context, schema_context, dynamic_context, false, false)
}

pub(crate) fn additional_properties_with_options(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    annotate: bool,
    track: bool,
) -> Lowered {
    if schema_context.declares_other_type(&["object"]) {
        return Ok(Vec::new());
    }
    let here = Pointer::new();
    let relative = relative_dynamic_context();
    let mut children = compile_child(context, schema_context, &relative, &here, &here)?;
    if annotate {
        children.push(make(
            context,
            schema_context,
            &relative,
            Operation::AnnotationBasenameToParent,
        ));
    }

    let properties = schema_context.schema.get("properties").and_then(Json::as_object);
    let patterns = sorted_patterns(schema_context.schema);
    let mut filter = PropertyFilter {
        names: StringSet::from_names(properties.into_iter().flat_map(|map| map.keys())),
        ..PropertyFilter::default()
    };
    let patterns_context = sibling(schema_context, "patternProperties");
    for pattern in &patterns {
        match pattern_as_prefix(pattern) {
            Some(prefix) => filter.prefixes.push(prefix),
            None => filter.patterns.push(parse_regex(pattern, &patterns_context)?),
        }
    }

    if !track && children.is_empty() {
        return Ok(Vec::new());
    }

    if context.is_fast() && is_fail(&children) {
        if let Some(properties) = properties {
            if patterns.is_empty() {
                let properties_context = sibling(schema_context, "properties");
                // `properties` already lowered to a closed loop.
                if !track && properties_as_loop(context, &properties_context, properties) {
                    return Ok(Vec::new());
                }
                return Ok(vec![make(
                    context,
                    schema_context,
                    dynamic_context,
                    Operation::LoopPropertiesWhitelist(filter.names),
                )]);
            }
        } else if !track && patterns.len() == 1 {
            // `patternProperties` already lowered to a closed regex loop.
            return Ok(Vec::new());
        }
    }

    if !filter.is_empty() {
        if track {
            children.push(make(
                context,
                schema_context,
                &relative,
                Operation::ControlEvaluate(Pointer::new()),
            ));
        }
        return Ok(vec![make_with_children(
            context,
            schema_context,
            dynamic_context,
            Operation::LoopPropertiesExcept(filter),
            children,
        )]);
    }

    if context.is_fast() {
        let folded = match (single_type_check(&children), track) {
            (Some(Operation::AssertionTypeStrict(json_type)), false) => {
                Some(Operation::LoopPropertiesTypeStrict(*json_type))
            }
            (Some(Operation::AssertionTypeStrict(json_type)), true) => {
                Some(Operation::LoopPropertiesTypeStrictEvaluate(*json_type))
            }
            (Some(Operation::AssertionType(json_type)), false) => {
                Some(Operation::LoopPropertiesType(*json_type))
            }
            (Some(Operation::AssertionType(json_type)), true) => {
                Some(Operation::LoopPropertiesTypeEvaluate(*json_type))
            }
            (Some(Operation::AssertionTypeStrictAny(types)), false) => {
                Some(Operation::LoopPropertiesTypeStrictAny(types.clone()))
            }
            (Some(Operation::AssertionTypeStrictAny(types)), true) => {
                Some(Operation::LoopPropertiesTypeStrictAnyEvaluate(types.clone()))
            }
            _ => None,
        };
        if let Some(operation) = folded {
            return Ok(vec![make(context, schema_context, dynamic_context, operation)]);
        }
    }

    if track {
        if children.is_empty() {
            return Ok(vec![make(
                context,
                schema_context,
                dynamic_context,
                Operation::ControlEvaluate(Pointer::new()),
            )]);
        }
        return Ok(vec![make_with_children(
            context,
            schema_context,
            dynamic_context,
            Operation::LoopPropertiesEvaluate,
            children,
        )]);
    }

    if is_fail(&children) {
        return Ok(vec![make(
            context,
            schema_context,
            dynamic_context,
            Operation::AssertionObjectSizeLess(1),
        )]);
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LoopProperties,
        children,
    )])
}

pub fn additional_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    additional_properties_with_options(context, schema_context, dynamic_context, false, false)
}

/// `items` as an array of positional schemas (`prefixItems` in 2020-12).
///
/// Lowers to one group per possible prefix length: an array of length `n`
/// runs group `n - 1`, and longer arrays run the final group.
pub(crate) fn items_array(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    annotate: bool,
    track: bool,
) -> Lowered {
    let Some(Json::Array(items)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    if items.is_empty() || schema_context.declares_other_type(&["array"]) {
        return Ok(Vec::new());
    }
    let relative = relative_dynamic_context();
    let mut subschemas = Vec::with_capacity(items.len());
    for index in 0..items.len() {
        subschemas.push(compile_child(
            context,
            schema_context,
            &relative,
            &at(index),
            &at(index),
        )?);
    }

    let annotation = |value: Json| {
        make(context, schema_context, &relative, Operation::AnnotationEmit(value))
    };
    let mut groups = Vec::with_capacity(items.len() + 1);
    for cursor in 0..items.len() {
        let mut group: Vec<Instruction> = subschemas[..=cursor].iter().flatten().cloned().collect();
        if annotate {
            group.push(annotation(Json::from(cursor)));
        }
        groups.push(make_with_children(
            context,
            schema_context,
            &relative,
            Operation::ControlGroup,
            group,
        ));
    }
    let mut tail: Vec<Instruction> = subschemas.into_iter().flatten().collect();
    if annotate {
        // The array has exactly as many items as there are prefixes.
        tail.push(annotation(Json::from(items.len() - 1)));
        tail.push(annotation(Json::Bool(true)));
    }
    groups.push(make_with_children(
        context,
        schema_context,
        &relative,
        Operation::ControlGroup,
        tail,
    ));

    let operation = if track {
        Operation::AssertionArrayPrefixEvaluate
    } else {
        Operation::AssertionArrayPrefix
    };
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        operation,
        groups,
    )])
}

pub(crate) fn items_with_options(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    annotate: bool,
    track: bool,
) -> Lowered {
    let Some(value) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    if value.is_array() {
        return items_array(context, schema_context, dynamic_context, annotate, track);
    }
    if !is_schema(value) || schema_context.declares_other_type(&["array"]) {
        return Ok(Vec::new());
    }

    let here = Pointer::new();
    let relative = relative_dynamic_context();
    let children = compile_child(context, schema_context, &relative, &here, &here)?;

    if annotate || track {
        let mut result = Vec::new();
        if !children.is_empty() {
            result.push(make_with_children(
                context,
                schema_context,
                dynamic_context,
                Operation::LoopItems,
                children,
            ));
        }
        let mut marks = Vec::new();
        if annotate {
            marks.push(make(
                context,
                schema_context,
                &relative,
                Operation::AnnotationEmit(Json::Bool(true)),
            ));
        }
        if track {
            marks.push(make(
                context,
                schema_context,
                &relative,
                Operation::ControlEvaluate(Pointer::new()),
            ));
        }
        result.push(make_with_children(
            context,
            schema_context,
            dynamic_context,
            Operation::LogicalWhenType(JsonType::Array),
            marks,
        ));
        return Ok(result);
    }

    if children.is_empty() {
        return Ok(Vec::new());
    }

    if context.is_fast() {
        let folded = match single_type_check(&children) {
            Some(Operation::AssertionTypeStrict(json_type)) => {
                Some(Operation::LoopItemsTypeStrict(*json_type))
            }
            Some(Operation::AssertionType(json_type)) => Some(Operation::LoopItemsType(*json_type)),
            Some(Operation::AssertionTypeStrictAny(types)) => {
                Some(Operation::LoopItemsTypeStrictAny(types.clone()))
            }
            _ => match children.as_slice() {
                [step] => match &step.operation {
                    Operation::LoopPropertiesExactlyTypeStrictHash((json_type, names))
                        if names.len() == 3 =>
                    {
                        Some(Operation::LoopItemsPropertiesExactlyTypeStrictHash3((
                            *json_type,
                            names.clone(),
                        )))
                    }
                    Operation::LoopPropertiesExactlyTypeStrictHash(value) => {
                        Some(Operation::LoopItemsPropertiesExactlyTypeStrictHash(value.clone()))
                    }
                    _ => None,
                },
                _ => None,
            },
        };
        if let Some(operation) = folded {
            return Ok(vec![make(context, schema_context, dynamic_context, operation)]);
        }
    }

    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LoopItems,
        children,
    )])
}

pub fn items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    items_with_options(context, schema_context, dynamic_context, false, false)
}

/// The schema every item from `cursor` onwards must satisfy.
pub(crate) fn additional_items_from_cursor(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    cursor: usize,
    annotate: bool,
    track: bool,
) -> Lowered {
    if schema_context.declares_other_type(&["array"]) {
        return Ok(Vec::new());
    }
    let here = Pointer::new();
    let relative = relative_dynamic_context();
    let children = compile_child(context, schema_context, &relative, &here, &here)?;

    let mut result = Vec::new();
    if !children.is_empty() {
        result.push(make_with_children(
            context,
            schema_context,
            dynamic_context,
            Operation::LoopItemsFrom(cursor),
            children,
        ));
    }
    if annotate || track {
        let mut marks = Vec::new();
        if annotate {
            marks.push(make(
                context,
                schema_context,
                &relative,
                Operation::AnnotationEmit(Json::Bool(true)),
            ));
        }
        if track {
            marks.push(make(
                context,
                schema_context,
                &relative,
                Operation::ControlEvaluate(Pointer::new()),
            ));
        }
        result.push(make_with_children(
            context,
            schema_context,
            dynamic_context,
            Operation::LogicalWhenArraySizeGreater(cursor),
            marks,
        ));
    }
    Ok(result)
}

pub(crate) fn additional_items_with_options(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    annotate: bool,
    track: bool,
) -> Lowered {
    // Without positional `items`, every item is already covered.
    let Some(Json::Array(items)) = schema_context.schema.get("items") else {
        return Ok(Vec::new());
    };
    additional_items_from_cursor(
        context,
        schema_context,
        dynamic_context,
        items.len(),
        annotate,
        track,
    )
}

pub fn additional_items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    additional_items_with_options(context, schema_context, dynamic_context, false, false)
}

pub fn dependencies(
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
    let mut result = Vec::new();
    let mut required = BTreeMap::new();
    for (name, dependency) in dependencies {
        match dependency {
            Json::Bool(true) => {}
            Json::Object(_) | Json::Bool(false) => {
                let children = compile_child(
                    context,
                    schema_context,
                    &relative,
                    &at(name.as_str()),
                    &Pointer::new(),
                )?;
                result.push(make_with_children(
                    context,
                    schema_context,
                    dynamic_context,
                    Operation::LogicalWhenDefines(Property::new(name.clone())),
                    children,
                ));
            }
            Json::Array(names) if !names.is_empty() => {
                required.insert(
                    name.clone(),
                    names.iter().filter_map(Json::as_str).map(str::to_string).collect(),
                );
            }
            _ => {}
        }
    }
    if !required.is_empty() {
        result.push(make(
            context,
            schema_context,
            dynamic_context,
            Operation::AssertionPropertyDependencies(required),
        ));
    }
    Ok(result)
}

/// Fast-mode `type: object|array|string` folded together with the size
/// keywords of the same subschema.
fn bounded_type(schema: &Json, json_type: JsonType) -> Option<Operation> {
    let (minimum_keyword, maximum_keyword) = match json_type {
        JsonType::Object => ("minProperties", "maxProperties"),
        JsonType::Array => ("minItems", "maxItems"),
        JsonType::String => ("minLength", "maxLength"),
        _ => return None,
    };
    let minimum = unsigned_integer_property(schema, minimum_keyword).unwrap_or(0);
    let maximum = unsigned_integer_property(schema, maximum_keyword);
    if minimum == 0 && maximum.is_none() {
        return None;
    }
    let range = Range {
        minimum,
        maximum,
        exhaustive: false,
    };
    Some(match (json_type, minimum, maximum) {
        (JsonType::Object, 0, Some(maximum)) => Operation::AssertionTypeObjectUpper(maximum),
        (JsonType::Object, _, _) => Operation::AssertionTypeObjectBounded(range),
        (JsonType::Array, 0, Some(maximum)) => Operation::AssertionTypeArrayUpper(maximum),
        (JsonType::Array, _, _) => Operation::AssertionTypeArrayBounded(range),
        (_, 0, Some(maximum)) => Operation::AssertionTypeStringUpper(maximum),
        _ => Operation::AssertionTypeStringBounded(range),
    })
}

/// Whether a sibling `enum` only admits values of the given type, which
/// makes the type check redundant in fast mode.
fn enum_implies(schema: &Json, admits: impl Fn(&Json) -> bool) -> bool {
    schema
        .get("enum")
        .and_then(Json::as_array)
        .is_some_and(|values| values.iter().all(admits))
}

/// `type` as a single name.
fn single_type(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    name: &str,
    bare: bool,
    strict_integers: bool,
) -> Option<Operation> {
    let fold = bare && context.is_fast();
    let schema = schema_context.schema;
    let elide = |admits: fn(&Json) -> bool| fold && enum_implies(schema, admits);
    match name {
        "null" if elide(Json::is_null) => None,
        "null" => Some(Operation::AssertionTypeStrict(JsonType::Null)),
        "boolean" if elide(Json::is_boolean) => None,
        "boolean" => Some(Operation::AssertionTypeStrict(JsonType::Boolean)),
        "object" | "array" | "string" => {
            let json_type = JsonType::from_schema_name(name)?;
            if fold {
                if let Some(bounded) = bounded_type(schema, json_type) {
                    return Some(bounded);
                }
                if enum_implies(schema, |value| json::json_type(value) == json_type) {
                    return None;
                }
                // A non-empty `required` already fails anything but an object.
                if json_type == JsonType::Object && !required_names(schema).is_empty() {
                    return None;
                }
            }
            Some(Operation::AssertionTypeStrict(json_type))
        }
        "number" if elide(Json::is_number) => None,
        "number" => Some(Operation::AssertionTypeStrictAny(vec![
            JsonType::Integer,
            JsonType::Real,
        ])),
        "integer" if strict_integers => Some(Operation::AssertionTypeStrict(JsonType::Integer)),
        "integer" if elide(|value| json::is_type(value, JsonType::Integer)) => None,
        "integer" => Some(Operation::AssertionType(JsonType::Integer)),
        _ => None,
    }
}

/// `type`, where `strict_integers` selects draft 4's reading of `integer`
/// (no reals with a zero fractional part).
pub(crate) fn lower_type(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    strict_integers: bool,
) -> Lowered {
    let Some(value) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    let operation = match value {
        Json::String(name) => single_type(context, schema_context, name, true, strict_integers),
        Json::Array(names) if names.len() == 1 => names[0]
            .as_str()
            .and_then(|name| single_type(context, schema_context, name, false, strict_integers)),
        Json::Array(names) => {
            let mut types = Vec::new();
            for name in names.iter().filter_map(Json::as_str) {
                let expanded: &[JsonType] = match name {
                    "number" => &[JsonType::Integer, JsonType::Real],
                    "null" => &[JsonType::Null],
                    "boolean" => &[JsonType::Boolean],
                    "integer" => &[JsonType::Integer],
                    "string" => &[JsonType::String],
                    "array" => &[JsonType::Array],
                    "object" => &[JsonType::Object],
                    _ => &[],
                };
                for json_type in expanded {
                    if !types.contains(json_type) {
                        types.push(*json_type);
                    }
                }
            }
            Some(if strict_integers {
                Operation::AssertionTypeStrictAny(types)
            } else {
                Operation::AssertionTypeAny(types)
            })
        }
        _ => None,
    };
    Ok(operation
        .map(|operation| make(context, schema_context, dynamic_context, operation))
        .into_iter()
        .collect())
}

pub fn type_(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    lower_type(context, schema_context, dynamic_context, true)
}

pub fn enumeration(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(Json::Array(values)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    let operation = match values.as_slice() {
        [single] => Operation::AssertionEqual(single.clone()),
        _ if context.is_fast() && values.iter().all(Json::is_string) => {
            let names = StringSet::from_names(values.iter().filter_map(Json::as_str));
            if names.all_perfect() {
                Operation::AssertionEqualsAnyStringHash(names)
            } else {
                Operation::AssertionEqualsAny(values.clone())
            }
        }
        _ => Operation::AssertionEqualsAny(values.clone()),
    };
    Ok(vec![make(context, schema_context, dynamic_context, operation)])
}

pub fn required(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    if schema_context.declares_other_type(&["object"]) {
        return Ok(Vec::new());
    }
    let Some(Json::Array(values)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    let names = StringSet::from_names(values.iter().filter_map(Json::as_str));
    let strict = context.is_fast() && schema_context.declares_type("object");
    let make_one = |operation| Ok(vec![make(context, schema_context, dynamic_context, operation)]);

    if names.is_empty() {
        return Ok(Vec::new());
    }
    if names.len() == 1 {
        let property = Property::new(names.iter().next().unwrap_or_default());
        return make_one(if strict {
            Operation::AssertionDefinesStrict(property)
        } else {
            Operation::AssertionDefines(property)
        });
    }

    let required: BTreeSet<String> = names.iter().map(str::to_string).collect();
    if is_closed_properties_required(schema_context.schema, &required) {
        if !strict {
            return make_one(Operation::AssertionDefinesExactly(names));
        }
        if closes_properties(context, schema_context) {
            if let Some(Json::Object(properties)) = schema_context.schema.get("properties") {
                let properties_context = sibling(schema_context, "properties");
                let compiled = compile_properties(
                    context,
                    &properties_context,
                    &relative_dynamic_context(),
                    properties,
                )?;
                if uniform_strict_type(&compiled).is_some() {
                    // `properties` checks the exact member set itself.
                    return Ok(Vec::new());
                }
            }
        }
        if names.len() == 3 && names.all_perfect() {
            return make_one(Operation::AssertionDefinesExactlyStrictHash3(names));
        }
        return make_one(Operation::AssertionDefinesExactlyStrict(names));
    }

    make_one(if strict {
        Operation::AssertionDefinesAllStrict(names)
    } else {
        Operation::AssertionDefinesAll(names)
    })
}

pub fn unique_items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    if schema_context.value(dynamic_context) != Some(&Json::Bool(true))
        || schema_context.declares_other_type(&["array"])
    {
        return Ok(Vec::new());
    }
    Ok(vec![make(
        context,
        schema_context,
        dynamic_context,
        Operation::AssertionUnique,
    )])
}

#[derive(Clone, Copy)]
enum Bound {
    Upper,
    Lower,
}

/// `maxLength` and friends. Fast mode folds them into a bounded `type`
/// check when the subschema declares the matching type.
fn size_bound(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    type_name: &str,
    bound: Bound,
) -> Lowered {
    if schema_context.declares_other_type(&[type_name]) {
        return Ok(Vec::new());
    }
    if context.is_fast() && schema_context.declares_type(type_name) {
        return Ok(Vec::new());
    }
    let Some(limit) = unsigned_integer_property(schema_context.schema, &dynamic_context.keyword)
    else {
        return Ok(Vec::new());
    };
    let operation = match (type_name, bound) {
        (_, Bound::Lower) if limit == 0 => return Ok(Vec::new()),
        ("string", Bound::Upper) => Operation::AssertionStringSizeLess(limit.saturating_add(1)),
        ("string", Bound::Lower) => Operation::AssertionStringSizeGreater(limit - 1),
        ("array", Bound::Upper) => Operation::AssertionArraySizeLess(limit.saturating_add(1)),
        ("array", Bound::Lower) => Operation::AssertionArraySizeGreater(limit - 1),
        (_, Bound::Upper) => Operation::AssertionObjectSizeLess(limit.saturating_add(1)),
        (_, Bound::Lower) => Operation::AssertionObjectSizeGreater(limit - 1),
    };
    Ok(vec![make(context, schema_context, dynamic_context, operation)])
}

pub fn max_length(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    size_bound(context, schema_context, dynamic_context, "string", Bound::Upper)
}

pub fn min_length(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    size_bound(context, schema_context, dynamic_context, "string", Bound::Lower)
}

pub fn max_items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    size_bound(context, schema_context, dynamic_context, "array", Bound::Upper)
}

pub fn min_items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    size_bound(context, schema_context, dynamic_context, "array", Bound::Lower)
}

pub fn max_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    size_bound(context, schema_context, dynamic_context, "object", Bound::Upper)
}

pub fn min_properties(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    size_bound(context, schema_context, dynamic_context, "object", Bound::Lower)
}

fn numeric_bound(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    exclusive_keyword: &str,
    inclusive: fn(Json) -> Operation,
    exclusive: fn(Json) -> Operation,
) -> Lowered {
    let Some(limit) = schema_context.value(dynamic_context).filter(|value| value.is_number())
    else {
        return Ok(Vec::new());
    };
    if schema_context.declares_other_type(&["integer", "number"]) {
        return Ok(Vec::new());
    }
    // Draft 4 spells exclusivity as a boolean sibling.
    let is_exclusive = schema_context.vocabularies.contains(DRAFT4)
        && schema_context.schema.get(exclusive_keyword) == Some(&Json::Bool(true));
    let operation = if is_exclusive {
        exclusive(limit.clone())
    } else {
        inclusive(limit.clone())
    };
    Ok(vec![make(context, schema_context, dynamic_context, operation)])
}

pub fn maximum(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    numeric_bound(
        context,
        schema_context,
        dynamic_context,
        "exclusiveMaximum",
        Operation::AssertionLessEqual,
        Operation::AssertionLess,
    )
}

pub fn minimum(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    numeric_bound(
        context,
        schema_context,
        dynamic_context,
        "exclusiveMinimum",
        Operation::AssertionGreaterEqual,
        Operation::AssertionGreater,
    )
}

pub fn multiple_of(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(divisor) = schema_context.value(dynamic_context).filter(|value| value.is_number())
    else {
        return Ok(Vec::new());
    };
    if schema_context.declares_other_type(&["integer", "number"]) {
        return Ok(Vec::new());
    }
    Ok(vec![make(
        context,
        schema_context,
        dynamic_context,
        Operation::AssertionDivisible(divisor.clone()),
    )])
}

pub fn pattern(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(Json::String(source)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    if schema_context.declares_other_type(&["string"]) {
        return Ok(Vec::new());
    }
    Ok(vec![make(
        context,
        schema_context,
        dynamic_context,
        Operation::AssertionRegex(parse_regex(source, schema_context)?),
    )])
}

/// Draft 4 asserts the two formats it can check cheaply and ignores the
/// rest.
pub fn format(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(Json::String(format)) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    if schema_context.declares_other_type(&["string"]) {
        return Ok(Vec::new());
    }
    let operation = match format.as_str() {
        "uri" => Operation::AssertionStringType(StringFormat::Uri),
        "ipv4" => Operation::AssertionRegex(parse_regex(FORMAT_REGEX_IPV4, schema_context)?),
        _ => return Ok(Vec::new()),
    };
    Ok(vec![make(context, schema_context, dynamic_context, operation)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::rules::tests::lower;
    use serde_json::json;

    const DIALECT: &str = "http://json-schema.org/draft-04/schema#";

    fn operations(schema: Json, mode: Mode) -> Vec<Operation> {
        lower(schema, mode)
            .instructions
            .into_iter()
            .map(|instruction| instruction.operation)
            .collect()
    }

    #[test]
    fn integers_are_strict() {
        assert_eq!(
            operations(json!({"$schema": DIALECT, "type": "integer"}), Mode::FastValidation),
            vec![Operation::AssertionTypeStrict(JsonType::Integer)]
        );
    }

    #[test]
    fn minimum_keeps_root_locations() {
        let template = lower(
            json!({"$schema": DIALECT, "type": "integer", "minimum": 0}),
            Mode::Exhaustive,
        );
        let minimum = template
            .instructions
            .iter()
            .find(|instruction| instruction.operation == Operation::AssertionGreaterEqual(json!(0)))
            .unwrap();
        assert_eq!(minimum.relative_schema_location.to_string(), "/minimum");
        assert!(minimum.relative_instance_location.is_empty());
    }

    #[test]
    fn boolean_exclusive_bounds() {
        assert_eq!(
            operations(
                json!({"$schema": DIALECT, "maximum": 5, "exclusiveMaximum": true}),
                Mode::FastValidation
            ),
            vec![Operation::AssertionLess(json!(5))]
        );
    }

    #[test]
    fn fast_mode_folds_sizes_into_type() {
        let schema = json!({"$schema": DIALECT, "type": "string", "minLength": 2, "maxLength": 4});
        assert_eq!(
            operations(schema.clone(), Mode::FastValidation),
            vec![Operation::AssertionTypeStringBounded(Range {
                minimum: 2,
                maximum: Some(4),
                exhaustive: false
            })]
        );
        assert_eq!(
            operations(schema, Mode::Exhaustive),
            vec![
                Operation::AssertionStringSizeLess(5),
                Operation::AssertionStringSizeGreater(1),
                Operation::AssertionTypeStrict(JsonType::String),
            ]
        );
    }

    #[test]
    fn zero_minimum_sizes_are_dropped() {
        assert!(operations(json!({"$schema": DIALECT, "minItems": 0}), Mode::Exhaustive).is_empty());
    }

    #[test]
    fn single_type_properties_become_property_type_checks() {
        assert_eq!(
            operations(
                json!({"$schema": DIALECT, "properties": {"name": {"type": "string"}}}),
                Mode::FastValidation
            ),
            vec![Operation::AssertionPropertyTypeStrict(JsonType::String)]
        );
    }

    #[test]
    fn closed_required_properties_collapse_into_one_loop() {
        let schema = json!({
            "$schema": DIALECT,
            "type": "object",
            "required": ["a", "b"],
            "properties": {"a": {"type": "string"}, "b": {"type": "string"}},
            "additionalProperties": false
        });
        let lowered = operations(schema, Mode::FastValidation);
        let names = StringSet::from_names(["a", "b"]);
        assert!(lowered.contains(&Operation::LoopPropertiesExactlyTypeStrictHash((
            JsonType::String,
            names
        ))));
        assert!(!lowered
            .iter()
            .any(|operation| matches!(operation, Operation::AssertionDefinesExactlyStrict(_))));
    }

    #[test]
    fn wide_optional_properties_use_a_dispatch_loop() {
        let mut properties = Map::new();
        for name in ["a", "b", "c", "d", "e", "f"] {
            properties.insert(name.to_string(), json!({"minLength": 1}));
        }
        let lowered = operations(
            json!({"$schema": DIALECT, "properties": properties, "additionalProperties": false}),
            Mode::FastValidation,
        );
        assert_eq!(lowered.len(), 1);
        assert!(matches!(&lowered[0], Operation::LoopPropertiesMatchClosed(map) if map.len() == 6));
    }

    #[test]
    fn closed_objects_without_loop_use_a_whitelist() {
        let lowered = operations(
            json!({
                "$schema": DIALECT,
                "properties": {"a": {"minLength": 1}},
                "required": ["a"],
                "additionalProperties": false
            }),
            Mode::FastValidation,
        );
        assert!(lowered.contains(&Operation::LoopPropertiesWhitelist(StringSet::from_names(["a"]))));
    }

    #[test]
    fn any_of_type_checks_collapse() {
        assert_eq!(
            operations(
                json!({"$schema": DIALECT, "anyOf": [{"type": "string"}, {"type": "null"}]}),
                Mode::FastValidation
            ),
            vec![Operation::AssertionTypeStrictAny(vec![JsonType::String, JsonType::Null])]
        );
    }

    #[test]
    fn recursive_references_use_labels() {
        let template = lower(
            json!({
                "$schema": DIALECT,
                "properties": {"next": {"$ref": "#"}}
            }),
            Mode::FastValidation,
        );
        assert!(template.contains(|operation| matches!(operation, Operation::ControlLabel(_))));
        assert!(template.contains(|operation| matches!(operation, Operation::ControlJump(_))));
    }

    #[test]
    fn unknown_reference_targets_are_errors() {
        let error = crate::compile::compile(
            &json!({"$schema": DIALECT, "$ref": "#/definitions/missing"}),
            &crate::resolver::MapResolver::new(),
            &crate::config::CompileOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(error, CompileError::Reference(_)));
    }

    #[test]
    fn invalid_patterns_are_compiler_errors() {
        let error = crate::compile::compile(
            &json!({"$schema": DIALECT, "pattern": "("}),
            &crate::resolver::MapResolver::new(),
            &crate::config::CompileOptions::default(),
        )
        .unwrap_err();
        match error {
            CompileError::Compiler(error) => assert_eq!(error.schema_location, "/pattern"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn tuple_items_dispatch_by_length() {
        let lowered = operations(
            json!({"$schema": DIALECT, "items": [{"type": "string"}, {"type": "integer"}]}),
            Mode::FastValidation,
        );
        match &lowered[..] {
            [Operation::AssertionArrayPrefix] => {}
            other => panic!("unexpected lowering: {other:?}"),
        }
        let template = lower(
            json!({"$schema": DIALECT, "items": [{"type": "string"}, {"type": "integer"}]}),
            Mode::FastValidation,
        );
        assert_eq!(template.instructions[0].children.len(), 3);
    }
}
