//! Draft 6 keywords: `const`, `contains`, `propertyNames`, numeric
//! exclusive bounds, and the lenient reading of `integer`.

use jsv_core::{CompileError, Instruction, Json, Operation, Pointer, Range};

use super::draft4::lower_type;
use crate::compile::compile_child;
use crate::context::{make, make_with_children, relative_dynamic_context, Context, DynamicContext, SchemaContext};

type Lowered = Result<Vec<Instruction>, CompileError>;

pub fn type_(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    lower_type(context, schema_context, dynamic_context, false)
}

pub fn constant(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let Some(value) = schema_context.value(dynamic_context) else {
        return Ok(Vec::new());
    };
    Ok(vec![make(
        context,
        schema_context,
        dynamic_context,
        Operation::AssertionEqual(value.clone()),
    )])
}

fn exclusive_bound(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    operation: fn(Json) -> Operation,
) -> Lowered {
    let Some(limit) = schema_context.value(dynamic_context).filter(|value| value.is_number())
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
        operation(limit.clone()),
    )])
}

pub fn exclusive_maximum(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    exclusive_bound(context, schema_context, dynamic_context, Operation::AssertionLess)
}

pub fn exclusive_minimum(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    exclusive_bound(context, schema_context, dynamic_context, Operation::AssertionGreater)
}

pub fn contains(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    if schema_context.declares_other_type(&["array"]) {
        return Ok(Vec::new());
    }
    let here = Pointer::new();
    let children = compile_child(
        context,
        schema_context,
        &relative_dynamic_context(),
        &here,
        &here,
    )?;
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LoopContains(Range {
            minimum: 1,
            maximum: None,
            exhaustive: false,
        }),
        children,
    )])
}

/// Keys are validated as string instances, so the subschema is lowered
/// in property-name mode.
pub fn property_names(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    if schema_context.declares_other_type(&["object"]) {
        return Ok(Vec::new());
    }
    let mut keys = schema_context.clone();
    keys.property_name = true;
    let here = Pointer::new();
    let children = compile_child(context, &keys, &relative_dynamic_context(), &here, &here)?;
    if children.is_empty() {
        return Ok(Vec::new());
    }
    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LoopKeys,
        children,
    )])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::rules::tests::lower;
    use jsv_core::JsonType;
    use serde_json::json;

    const DIALECT: &str = "http://json-schema.org/draft-06/schema#";

    #[test]
    fn integers_accept_integral_reals() {
        let template = lower(json!({"$schema": DIALECT, "type": "integer"}), Mode::FastValidation);
        assert_eq!(
            template.instructions[0].operation,
            Operation::AssertionType(JsonType::Integer)
        );
    }

    #[test]
    fn type_arrays_are_lenient() {
        let template = lower(
            json!({"$schema": DIALECT, "type": ["integer", "null"]}),
            Mode::FastValidation,
        );
        assert_eq!(
            template.instructions[0].operation,
            Operation::AssertionTypeAny(vec![JsonType::Integer, JsonType::Null])
        );
    }

    #[test]
    fn property_names_guard_on_objects() {
        let template = lower(
            json!({"$schema": DIALECT, "type": "object", "propertyNames": {"maxLength": 3}}),
            Mode::Exhaustive,
        );
        assert!(template.contains(|operation| *operation == Operation::LoopKeys));

        let skipped = lower(
            json!({"$schema": DIALECT, "type": "string", "propertyNames": {"maxLength": 3}}),
            Mode::Exhaustive,
        );
        assert!(!skipped.contains(|operation| *operation == Operation::LoopKeys));
    }

    #[test]
    fn exclusive_bounds_are_numbers() {
        let template = lower(
            json!({"$schema": DIALECT, "exclusiveMinimum": 1.5}),
            Mode::FastValidation,
        );
        assert_eq!(
            template.instructions[0].operation,
            Operation::AssertionGreater(json!(1.5))
        );
    }
}
