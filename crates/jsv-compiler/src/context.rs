//! # Compilation Context — Cursors and Instruction Builders
//!
//! Three layers of state flow through every lowering rule:
//!
//! - [`Context`] is fixed for one compilation: the bundled document, its
//!   frame, the resource list, the mode and the results of the pre-passes.
//! - [`SchemaContext`] is the cursor over the schema: which keyword of which
//!   subschema is being lowered, under which vocabularies and base URI, and
//!   which labels and reference targets are already open on this chain.
//! - [`DynamicContext`] is the cursor over the output: where the produced
//!   instruction sits relative to the enclosing instruction, in both the
//!   schema and the instance.
//!
//! The helpers at the bottom build instructions from those cursors so every
//! rule fills the shared envelope the same way.

use std::collections::BTreeSet;

use jsv_core::{
    CompileError, CompilerError, Instruction, Json, JsonType, LabelId, Operation, Pattern,
    Pointer, Token,
};

use crate::config::{CompilerTweaks, Mode};
use crate::frame::{Frame, Location, ReferenceType};
use crate::unevaluated::Unevaluated;
use crate::uri;
use crate::vocabulary::Vocabularies;
use crate::walker::Walker;

/// A lowering rule dispatcher: given the keyword named by the dynamic
/// context and the instructions its siblings produced so far, return the
/// instructions for that keyword.
pub type KeywordCompiler = fn(
    &Context<'_>,
    &SchemaContext<'_>,
    &DynamicContext,
    &[Instruction],
) -> Result<Vec<Instruction>, CompileError>;

/// Read-only state for one compilation.
pub struct Context<'a> {
    /// The bundled schema.
    pub root: &'a Json,
    pub frame: &'a Frame,
    /// Sorted resource URIs; an instruction's resource id indexes this list
    /// starting at 1.
    pub resources: Vec<String>,
    pub walker: Walker,
    pub compiler: KeywordCompiler,
    pub mode: Mode,
    /// Some reference resolves against the dynamic scope.
    pub uses_dynamic_scopes: bool,
    pub unevaluated: Unevaluated,
    /// Reference destinations compiled up front under their own label.
    pub precompiled: BTreeSet<String>,
    pub tweaks: CompilerTweaks,
}

/// Cursor over the schema being lowered.
#[derive(Debug, Clone)]
pub struct SchemaContext<'a> {
    /// Pointer from the current resource root to the keyword being lowered
    /// (or to the subschema, between keywords).
    pub relative_pointer: Pointer,
    /// The subschema holding the keyword.
    pub schema: &'a Json,
    pub vocabularies: &'a Vocabularies,
    /// Base URI of the current resource, without fragment.
    pub base: String,
    /// Labels open on this compilation chain.
    pub labels: BTreeSet<LabelId>,
    /// Reference destinations visited on this compilation chain.
    pub references: BTreeSet<String>,
    /// The instance is a property name, not a value (inside
    /// `propertyNames`).
    pub property_name: bool,
}

/// Cursor over the instructions being produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DynamicContext {
    /// The keyword being lowered, or empty when an instruction does not
    /// correspond to a keyword of its own.
    pub keyword: String,
    pub base_schema_location: Pointer,
    pub base_instance_location: Pointer,
}

impl DynamicContext {
    pub fn for_keyword(&self, keyword: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            base_schema_location: self.base_schema_location.clone(),
            base_instance_location: self.base_instance_location.clone(),
        }
    }
}

/// A dynamic context that places instructions directly under their parent.
pub fn relative_dynamic_context() -> DynamicContext {
    DynamicContext::default()
}

impl Context<'_> {
    /// 1-based index of `resource` in the resource list, or 0 when it is
    /// not a resource.
    pub fn resource_id(&self, resource: &str) -> usize {
        let canonical = uri::canonicalize(resource);
        self.resources
            .iter()
            .position(|candidate| *candidate == canonical)
            .map_or(0, |index| index + 1)
    }

    pub fn is_fast(&self) -> bool {
        self.mode == Mode::FastValidation
    }

    pub fn is_exhaustive(&self) -> bool {
        self.mode == Mode::Exhaustive
    }
}

impl SchemaContext<'_> {
    /// The value of the keyword being lowered.
    pub fn value(&self, dynamic_context: &DynamicContext) -> Option<&Json> {
        self.schema.get(dynamic_context.keyword.as_str())
    }

    /// Whether the subschema declares `type` as a single name other than
    /// `expected`, which makes keywords for other types dead code.
    pub fn declares_other_type(&self, expected: &[&str]) -> bool {
        matches!(
            self.schema.get("type").and_then(Json::as_str),
            Some(name) if !expected.contains(&name)
        )
    }

    /// Whether the subschema declares `type` as exactly `expected`.
    pub fn declares_type(&self, expected: &str) -> bool {
        self.schema.get("type").and_then(Json::as_str) == Some(expected)
    }

    pub fn with_pointer(&self, relative_pointer: Pointer) -> Self {
        Self {
            relative_pointer,
            ..self.clone()
        }
    }
}

/// The frame entry of the keyword being lowered.
pub fn static_location<'a>(
    context: &Context<'a>,
    schema_context: &SchemaContext<'_>,
) -> Option<&'a Location> {
    context
        .frame
        .traverse(&uri::to_uri(&schema_context.relative_pointer, &schema_context.base))
}

/// Absolute pointer of the subschema holding the keyword being lowered.
pub fn subschema_pointer(context: &Context<'_>, schema_context: &SchemaContext<'_>) -> Pointer {
    let location = static_location(context, schema_context);
    let mut pointer = location.map(|location| location.pointer.clone()).unwrap_or_default();
    pointer.pop();
    pointer
}

/// Build a leaf instruction.
pub fn make(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    operation: Operation,
) -> Instruction {
    make_with_children(context, schema_context, dynamic_context, operation, Vec::new())
}

/// Build an applicator instruction.
pub fn make_with_children(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    operation: Operation,
    children: Vec<Instruction>,
) -> Instruction {
    let mut instruction = make_with_resource(
        context,
        schema_context,
        dynamic_context,
        operation,
        &schema_context.base,
    );
    instruction.children = children;
    instruction
}

/// Build a leaf instruction attributed to a resource other than the current
/// one.
pub fn make_with_resource(
    context: &Context<'_>,
    schema_context: &SchemaContext<'_>,
    dynamic_context: &DynamicContext,
    operation: Operation,
    resource: &str,
) -> Instruction {
    let mut relative_schema_location = dynamic_context.base_schema_location.clone();
    if !dynamic_context.keyword.is_empty() {
        relative_schema_location.push(dynamic_context.keyword.as_str());
    }
    Instruction {
        operation,
        relative_schema_location,
        relative_instance_location: dynamic_context.base_instance_location.clone(),
        keyword_location: uri::to_uri(&schema_context.relative_pointer, &schema_context.base),
        schema_resource: context.resource_id(resource),
        dynamic: context.uses_dynamic_scopes,
        children: Vec::new(),
    }
}

/// Keep the envelope of `step` with a different operation.
pub fn rephrase(operation: Operation, step: &Instruction) -> Instruction {
    Instruction {
        operation,
        relative_schema_location: step.relative_schema_location.clone(),
        relative_instance_location: step.relative_instance_location.clone(),
        keyword_location: step.keyword_location.clone(),
        schema_resource: step.schema_resource,
        dynamic: step.dynamic,
        children: Vec::new(),
    }
}

/// A non-negative integer keyword. Reals with an integral value count.
pub fn unsigned_integer_property(schema: &Json, keyword: &str) -> Option<usize> {
    let value = schema.get(keyword)?;
    if let Some(integer) = value.as_u64() {
        return usize::try_from(integer).ok();
    }
    let real = value.as_f64()?;
    (real >= 0.0 && real.fract() == 0.0 && real <= usize::MAX as f64).then_some(real as usize)
}

/// The literal prefix of a pattern of the form `^literal`.
pub fn pattern_as_prefix(pattern: &str) -> Option<String> {
    let rest = pattern.strip_prefix('^')?;
    let literal = !rest.is_empty()
        && rest
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
    literal.then(|| rest.to_string())
}

/// Compile `pattern`, reporting failures against the keyword being lowered.
///
/// # Errors
///
/// Returns a [`CompilerError`] naming the pattern when it is not a valid
/// regular expression.
pub fn parse_regex(
    pattern: &str,
    schema_context: &SchemaContext<'_>,
) -> Result<Pattern, CompileError> {
    Pattern::new(pattern).map_err(|_| {
        CompileError::Compiler(CompilerError {
            base: schema_context.base.clone(),
            schema_location: schema_context.relative_pointer.to_string(),
            message: format!("Invalid regular expression: {pattern}"),
        })
    })
}

/// Values of `keyword` in the current subschema and, when it has a `$ref`,
/// in the reference target, provided they are of `expected` type and
/// belong to one of `vocabularies`.
pub fn find_adjacent<'a>(
    context: &Context<'a>,
    schema_context: &SchemaContext<'_>,
    vocabularies: &[&str],
    keyword: &str,
    expected: JsonType,
) -> Vec<&'a Json> {
    let mut candidates = Vec::new();
    let mut sibling = schema_context.relative_pointer.clone();
    sibling.pop();
    sibling.push(keyword);
    candidates.push(uri::to_uri(&sibling, &schema_context.base));

    if schema_context.schema.get("$ref").is_some() {
        let reference_pointer = subschema_pointer(context, schema_context).join("$ref");
        if let Some(reference) = context.frame.reference(ReferenceType::Static, &reference_pointer) {
            if let Some(target) = context.frame.traverse(&reference.destination) {
                let target_uri = uri::to_uri(&target.relative_pointer.join(keyword), &target.base);
                candidates.push(target_uri);
            }
        }
    }

    let mut result = Vec::new();
    for candidate in candidates {
        let Some(location) = context.frame.traverse(&candidate) else {
            continue;
        };
        let Some(value) = location.pointer.resolve(context.root) else {
            continue;
        };
        let Some(owner) = context.frame.vocabularies(&location.dialect) else {
            continue;
        };
        if owner.contains_any(vocabularies) && jsv_core::json::json_type(value) == expected {
            result.push(value);
        }
    }
    result
}

/// Whether the keyword at `pointer` sits directly inside a branch of
/// `anyOf` or `oneOf`.
pub fn is_inside_disjunctor(pointer: &Pointer) -> bool {
    let tokens = pointer.tokens();
    if tokens.len() < 3 {
        return false;
    }
    let branch = &tokens[tokens.len() - 2];
    let applicator = &tokens[tokens.len() - 3];
    matches!(branch, Token::Index(_))
        && matches!(applicator.as_text().as_ref(), "anyOf" | "oneOf")
}

/// Whether the subschema lists every member of `properties` in `required`
/// and forbids anything else.
pub fn is_closed_properties_required(schema: &Json, required: &BTreeSet<String>) -> bool {
    schema.get("additionalProperties") == Some(&Json::Bool(false))
        && schema
            .get("properties")
            .and_then(Json::as_object)
            .is_some_and(|properties| {
                properties.len() == required.len()
                    && properties.keys().all(|name| required.contains(name))
            })
}

/// Depth of the first step that pins the instance to an enumeration, if
/// any. Properties checked this way fail fastest, so they sort first.
pub fn direct_enumeration(instructions: &[Instruction]) -> Option<usize> {
    instructions
        .iter()
        .find(|step| {
            matches!(
                step.operation,
                Operation::AssertionEqual(_)
                    | Operation::AssertionEqualsAny(_)
                    | Operation::AssertionEqualsAnyStringHash(_)
            )
        })
        .map(|step| step.relative_schema_location.len())
}

/// Every label a subtree jumps to.
pub fn collect_jump_labels(instructions: &[Instruction], output: &mut BTreeSet<LabelId>) {
    for instruction in instructions {
        if let Operation::ControlJump(label) = instruction.operation {
            output.insert(label);
        }
        collect_jump_labels(&instruction.children, output);
    }
}

/// Total instructions in a list, counting children.
pub fn template_size(instructions: &[Instruction]) -> usize {
    instructions.iter().map(Instruction::size).sum()
}
