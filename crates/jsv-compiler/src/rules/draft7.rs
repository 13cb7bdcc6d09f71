//! Draft 7 keywords: `if`, `then`, `else`.

use jsv_core::{CompileError, Instruction, Operation, Pointer};

use super::draft4::{at, sibling};
use crate::compile::{compile_child, compile_location};
use crate::context::{
    make_with_children, relative_dynamic_context, Context, DynamicContext, SchemaContext,
};
use crate::uri;

type Lowered = Result<Vec<Instruction>, CompileError>;

/// Lower `branch` (`then` or `else`) of the conditional at
/// `schema_context`.
fn branch(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    keyword: &str,
) -> Lowered {
    let destination = uri::to_uri(
        &sibling(schema_context, keyword).relative_pointer,
        &schema_context.base,
    );
    let here = Pointer::new();
    compile_location(
        context,
        schema_context,
        dynamic_context,
        &at(keyword),
        &here,
        Some(&destination),
    )
}

/// The whole conditional lowers to one `LogicalCondition` whose children
/// are the `if` steps followed by the `then` and `else` steps. The value
/// holds the index where each branch starts, or 0 when it is absent.
pub fn if_then_else(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let here = Pointer::new();
    let relative = relative_dynamic_context();
    let mut children = compile_child(context, schema_context, &relative, &here, &here)?;
    let has_then = schema_context.schema.get("then").is_some();

    if children.is_empty() {
        // The condition always holds.
        if !has_then {
            return Ok(Vec::new());
        }
        let unconditional = DynamicContext {
            keyword: String::new(),
            ..dynamic_context.clone()
        };
        return branch(context, schema_context, &unconditional, "then");
    }

    let mut then_cursor = 0;
    if has_then {
        then_cursor = children.len();
        children.extend(branch(context, schema_context, &relative, "then")?);
    }
    let mut else_cursor = 0;
    if schema_context.schema.get("else").is_some() {
        else_cursor = children.len();
        children.extend(branch(context, schema_context, &relative, "else")?);
    }

    Ok(vec![make_with_children(
        context,
        schema_context,
        dynamic_context,
        Operation::LogicalCondition((then_cursor, else_cursor)),
        children,
    )])
}

/// `then` and `else` are lowered together with `if`.
pub fn handled_by_if(
    _context: &Context<'_>,
    _schema_context: &SchemaContext<'_>,
    _dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Mode;
    use crate::rules::tests::lower;
    use serde_json::json;

    const DIALECT: &str = "http://json-schema.org/draft-07/schema#";

    #[test]
    fn branches_start_at_recorded_cursors() {
        let template = lower(
            json!({
                "$schema": DIALECT,
                "if": {"minimum": 0},
                "then": {"multipleOf": 2},
                "else": {"multipleOf": 3}
            }),
            Mode::FastValidation,
        );
        let condition = &template.instructions[0];
        assert_eq!(condition.operation, Operation::LogicalCondition((1, 2)));
        assert_eq!(condition.children.len(), 3);
        assert_eq!(condition.children[1].relative_schema_location.to_string(), "/then/multipleOf");
        assert_eq!(condition.children[2].relative_schema_location.to_string(), "/else/multipleOf");
    }

    #[test]
    fn trivial_condition_applies_then_directly() {
        let template = lower(
            json!({"$schema": DIALECT, "if": true, "then": {"minimum": 1}, "else": false}),
            Mode::FastValidation,
        );
        assert_eq!(template.instructions.len(), 1);
        assert_eq!(
            template.instructions[0].relative_schema_location.to_string(),
            "/then/minimum"
        );
    }

    #[test]
    fn missing_branches_keep_zero_cursors() {
        let template = lower(
            json!({"$schema": DIALECT, "if": {"minimum": 0}, "else": {"minimum": 10}}),
            Mode::FastValidation,
        );
        assert_eq!(
            template.instructions[0].operation,
            Operation::LogicalCondition((0, 1))
        );
    }
}
