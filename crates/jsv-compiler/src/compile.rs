//! # Compilation Pipeline
//!
//! `compile` turns a schema into a [`Template`] in five steps:
//!
//! 1. **Bundle** every external reference into the root document.
//! 2. **Frame** the bundled document: locations, references, vocabularies.
//! 3. **Analyse** which subschemas need evaluation tracking for
//!    `unevaluatedProperties` and `unevaluatedItems`.
//! 4. **Precompile** heavily shared reference targets, and every dynamic
//!    anchor when dynamic scopes are in play, under their own labels.
//! 5. **Lower** the entry point keyword by keyword through the dispatcher.
//!
//! Lowering rules descend into subschemas through [`compile_location`]. It
//! resolves the target through the frame and carries the open labels along,
//! which is how recursive references terminate.

use std::collections::{BTreeMap, BTreeSet};

use jsv_core::{
    label_id, CompileError, Instruction, Json, Operation, Pointer, SchemaReferenceError,
    SchemaVocabularyError, Template,
};
use tracing::{debug, trace};

use crate::bundle::bundle;
use crate::config::{CompileOptions, Mode};
use crate::context::{
    make, make_with_children, relative_dynamic_context, Context, DynamicContext, KeywordCompiler,
    SchemaContext,
};
use crate::frame::{Frame, LocationType, ReferenceType};
use crate::resolver::SchemaResolver;
use crate::rules::default_compiler;
use crate::unevaluated::Unevaluated;
use crate::uri;
use crate::walker::{self, default_walker, Walker};

/// Compile `schema` with the default walker and keyword rules.
///
/// # Errors
///
/// Returns a [`CompileError`] when the schema references something the
/// resolver cannot provide, uses an unsupported vocabulary, or contains a
/// keyword value the rules cannot lower (such as an invalid regular
/// expression).
pub fn compile(
    schema: &Json,
    resolver: &dyn SchemaResolver,
    options: &CompileOptions,
) -> Result<Template, CompileError> {
    compile_with(schema, default_walker, resolver, default_compiler, options)
}

/// Compile `schema` with a custom walker and keyword dispatcher.
///
/// # Errors
///
/// See [`compile`].
pub fn compile_with(
    schema: &Json,
    walker: Walker,
    resolver: &dyn SchemaResolver,
    compiler: KeywordCompiler,
    options: &CompileOptions,
) -> Result<Template, CompileError> {
    let default_dialect = options.default_dialect.as_deref();
    let default_id = options.default_id.as_deref();
    let bundled = bundle(schema, walker, resolver, default_dialect, default_id)?;
    let frame = Frame::build(&bundled, walker, resolver, default_dialect, default_id)?;
    compile_framed(&bundled, &frame, walker, compiler, options)
}

/// Compile an already bundled and framed schema.
///
/// # Errors
///
/// See [`compile`].
pub fn compile_framed(
    root: &Json,
    frame: &Frame,
    walker: Walker,
    compiler: KeywordCompiler,
    options: &CompileOptions,
) -> Result<Template, CompileError> {
    let uses_dynamic_scopes = frame.has_dynamic_references();
    let mut context = Context {
        root,
        frame,
        resources: frame.resources(),
        walker,
        compiler,
        mode: options.mode,
        uses_dynamic_scopes,
        unevaluated: Unevaluated::collect(root, frame),
        precompiled: BTreeSet::new(),
        tweaks: options.tweaks,
    };

    let targets = precompile_targets(&context);
    context.precompiled = targets.iter().cloned().collect();

    let mut instructions = Vec::new();
    for destination in &targets {
        let label = label_id(0, destination);
        let mut sctx = entry_schema_context(&context, destination)?;
        sctx.labels.insert(label);
        let body = compile_location(
            &context,
            &sctx,
            &relative_dynamic_context(),
            &Pointer::new(),
            &Pointer::new(),
            Some(destination),
        )?;
        instructions.push(make_with_children(
            &context,
            &sctx,
            &relative_dynamic_context(),
            Operation::ControlMark(label),
            body,
        ));
        debug!(%destination, "precompiled shared reference target");
    }

    if uses_dynamic_scopes {
        for ((kind, anchor), location) in frame.locations() {
            if *kind != ReferenceType::Dynamic {
                continue;
            }
            let resource = uri::without_fragment(anchor);
            let fragment = uri::fragment(anchor).unwrap_or_default();
            let label = label_id(context.resource_id(resource), &fragment);
            let sctx = entry_schema_context(&context, anchor)?;
            let body = compile_location(
                &context,
                &sctx,
                &relative_dynamic_context(),
                &Pointer::new(),
                &Pointer::new(),
                Some(anchor),
            )?;
            trace!(%anchor, base = %location.base, "registered dynamic anchor");
            instructions.push(make_with_children(
                &context,
                &sctx,
                &relative_dynamic_context(),
                Operation::ControlMark(label),
                body,
            ));
        }
    }

    let sctx = entry_schema_context(&context, frame.root())?;
    instructions.extend(compile_subschema(&context, &sctx, &relative_dynamic_context())?);

    let template = Template {
        dynamic: uses_dynamic_scopes,
        track: options.mode != Mode::FastValidation || context.unevaluated.requires_evaluation(),
        instructions,
    };
    debug!(
        root = %frame.root(),
        size = template.size(),
        dynamic = template.dynamic,
        track = template.track,
        "compiled schema"
    );
    Ok(template)
}

/// Reference destinations shared by enough references to compile once.
fn precompile_targets(context: &Context<'_>) -> Vec<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for ((kind, _), reference) in context.frame.references() {
        if *kind == ReferenceType::Static {
            *counts.entry(uri::canonicalize(&reference.destination)).or_default() += 1;
        }
    }
    let mut candidates: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(destination, count)| {
            *count > context.tweaks.precompile_min_references
                && context.frame.traverse(destination).is_some_and(|location| {
                    location.kind != LocationType::Pointer
                })
        })
        .collect();
    candidates.sort_by(|left, right| right.1.cmp(&left.1).then_with(|| left.0.cmp(&right.0)));
    candidates
        .into_iter()
        .take(context.tweaks.precompile_max_targets)
        .map(|(destination, _)| destination)
        .collect()
}

/// A schema context positioned at the subschema a static URI names.
fn entry_schema_context<'a>(
    context: &Context<'a>,
    target: &str,
) -> Result<SchemaContext<'a>, CompileError> {
    let location = context.frame.traverse(target).ok_or_else(|| SchemaReferenceError {
        identifier: target.to_string(),
        pointer: String::new(),
        message: "The target of the reference does not exist in the schema".to_string(),
    })?;
    let schema = location
        .pointer
        .resolve(context.root)
        .ok_or_else(|| CompileError::InvalidSchema(format!("Dangling location: {target}")))?;
    let vocabularies = context
        .frame
        .vocabularies(&location.dialect)
        .ok_or_else(|| SchemaVocabularyError::unsupported(location.dialect.clone()))?;
    Ok(SchemaContext {
        relative_pointer: location.relative_pointer.clone(),
        schema,
        vocabularies,
        base: location.base.clone(),
        labels: BTreeSet::new(),
        references: BTreeSet::new(),
        property_name: false,
    })
}

/// Lower every keyword of the subschema under `schema_context`.
///
/// # Errors
///
/// Propagates the first error a keyword rule raises.
pub fn compile_subschema(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
) -> Result<Vec<Instruction>, CompileError> {
    match schema_context.schema {
        Json::Bool(true) => return Ok(Vec::new()),
        Json::Bool(false) => {
            return Ok(vec![make(
                context,
                schema_context,
                &dynamic_context.for_keyword(""),
                Operation::AssertionFail,
            )])
        }
        Json::Object(_) => {}
        _ => {
            return Err(CompileError::InvalidSchema(format!(
                "The value at {} is not a schema",
                uri::to_uri(&schema_context.relative_pointer, &schema_context.base)
            )))
        }
    }

    let mut steps = Vec::new();
    for (keyword, _) in walker::keywords(
        schema_context.schema,
        schema_context.vocabularies,
        context.walker,
    ) {
        let keyword_context = schema_context.with_pointer(schema_context.relative_pointer.join(keyword));
        let keyword_dynamic = dynamic_context.for_keyword(keyword);
        let produced = (context.compiler)(context, &keyword_context, &keyword_dynamic, &steps)?;
        trace!(keyword, count = produced.len(), "lowered keyword");
        steps.extend(produced);
    }
    Ok(steps)
}

/// Descend into the subschema at `schema_suffix` below the keyword being
/// lowered, or at `target` when given, placing its instructions at
/// `instance_suffix` below the current instance location.
///
/// # Errors
///
/// Fails with a [`SchemaReferenceError`] when the destination is not a
/// location of the frame, or is not a subschema.
pub fn compile_location(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    schema_suffix: &Pointer,
    instance_suffix: &Pointer,
    target: Option<&str>,
) -> Result<Vec<Instruction>, CompileError> {
    let destination = match target {
        Some(target) => uri::canonicalize(target),
        None => uri::to_uri(
            &schema_context.relative_pointer.concat(schema_suffix),
            &schema_context.base,
        ),
    };

    let entry = context.frame.traverse(&destination).ok_or_else(|| SchemaReferenceError {
        identifier: destination.clone(),
        pointer: schema_context.relative_pointer.to_string(),
        message: "The target of the reference does not exist in the schema".to_string(),
    })?;
    if entry.kind == LocationType::Pointer {
        return Err(SchemaReferenceError {
            identifier: destination,
            pointer: entry.pointer.to_string(),
            message: "The schema location is inside of an unknown keyword".to_string(),
        }
        .into());
    }

    let schema = entry
        .pointer
        .resolve(context.root)
        .ok_or_else(|| CompileError::InvalidSchema(format!("Dangling location: {destination}")))?;
    let vocabularies = context
        .frame
        .vocabularies(&entry.dialect)
        .ok_or_else(|| SchemaVocabularyError::unsupported(entry.dialect.clone()))?;

    let mut base_schema_location = dynamic_context.base_schema_location.clone();
    if !dynamic_context.keyword.is_empty() {
        base_schema_location.push(dynamic_context.keyword.as_str());
    }
    base_schema_location.extend(schema_suffix);

    let nested = SchemaContext {
        relative_pointer: entry.relative_pointer.clone(),
        schema,
        vocabularies,
        base: entry.base.clone(),
        labels: schema_context.labels.clone(),
        references: schema_context.references.clone(),
        property_name: schema_context.property_name,
    };
    let nested_dynamic = DynamicContext {
        keyword: String::new(),
        base_schema_location,
        base_instance_location: dynamic_context.base_instance_location.concat(instance_suffix),
    };
    compile_subschema(context, &nested, &nested_dynamic)
}

/// Shorthand for descending into a child of the keyword being lowered.
///
/// # Errors
///
/// See [`compile_location`].
pub fn compile_child(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    schema_suffix: &Pointer,
    instance_suffix: &Pointer,
) -> Result<Vec<Instruction>, CompileError> {
    compile_location(
        context,
        schema_context,
        dynamic_context,
        schema_suffix,
        instance_suffix,
        None,
    )
}
