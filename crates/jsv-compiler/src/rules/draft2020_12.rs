//! 2020-12 keywords: `prefixItems`, the tail-only `items`, and
//! `$dynamicRef`.

use jsv_core::{CompileError, Instruction, Json};

use super::draft2019_09::{contains_with_options, dynamic_jump};
use super::{draft4, tracks_items};
use crate::context::{Context, DynamicContext, SchemaContext};

type Lowered = Result<Vec<Instruction>, CompileError>;

/// Jumps to the outermost `$dynamicAnchor` of the same name in the dynamic
/// scope when the initial target declares one, and behaves like `$ref`
/// otherwise.
pub fn dynamic_ref(
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

pub fn prefix_items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    draft4::items_array(
        context,
        schema_context,
        dynamic_context,
        context.is_exhaustive(),
        tracks_items(context),
    )
}

/// `items` only covers what `prefixItems` leaves over.
pub fn items(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    _current: &[Instruction],
) -> Lowered {
    let cursor = schema_context
        .schema
        .get("prefixItems")
        .and_then(Json::as_array)
        .map_or(0, Vec::len);
    draft4::additional_items_from_cursor(
        context,
        schema_context,
        dynamic_context,
        cursor,
        context.is_exhaustive(),
        tracks_items(context),
    )
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
