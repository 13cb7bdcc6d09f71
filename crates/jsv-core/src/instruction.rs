//! # Instructions — The Compiled Form of a Schema
//!
//! An [`Instruction`] is a shared envelope (where in the schema it came from,
//! where in the instance it applies, which schema resource owns it) around an
//! [`Operation`], the kind-specific part. Applicator operations own their
//! children; labels are the only back-references, and those are numeric ids
//! resolved at evaluation time.
//!
//! Operation families:
//!
//! - `Assertion*`: leaf predicates over the target value.
//! - `Annotation*`: attach a value to the current location; never fail.
//! - `Logical*`: boolean combinators over children.
//! - `Loop*`: iterate object members or array items.
//! - `Control*`: grouping, labels, jumps, and evaluation marks.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hash::LabelId;
use crate::json::{Json, JsonType};
use crate::pointer::Pointer;
use crate::string_set::StringSet;
use crate::value::{Pattern, Property, PropertyFilter, Range, StringFormat};

/// Kind-specific part of an instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Operation {
    // ---------------------------------------------------------------------
    // Assertions
    // ---------------------------------------------------------------------
    /// Always fails.
    AssertionFail,
    /// Objects must define the property.
    AssertionDefines(Property),
    /// The target must be an object defining the property.
    AssertionDefinesStrict(Property),
    AssertionDefinesAll(StringSet),
    AssertionDefinesAllStrict(StringSet),
    /// Objects must define exactly these properties and no others.
    AssertionDefinesExactly(StringSet),
    AssertionDefinesExactlyStrict(StringSet),
    /// Three perfectly hashed names, checked without a set lookup.
    AssertionDefinesExactlyStrictHash3(StringSet),
    /// For each present key, the listed properties must also be present.
    AssertionPropertyDependencies(BTreeMap<String, Vec<String>>),
    AssertionType(JsonType),
    AssertionTypeAny(Vec<JsonType>),
    AssertionTypeStrict(JsonType),
    AssertionTypeStrictAny(Vec<JsonType>),
    /// A string whose length lies in the range.
    AssertionTypeStringBounded(Range),
    /// A string of at most the given length.
    AssertionTypeStringUpper(usize),
    AssertionTypeArrayBounded(Range),
    AssertionTypeArrayUpper(usize),
    AssertionTypeObjectBounded(Range),
    AssertionTypeObjectUpper(usize),
    AssertionRegex(Pattern),
    /// Strings must be shorter than the bound.
    AssertionStringSizeLess(usize),
    /// Strings must be longer than the bound.
    AssertionStringSizeGreater(usize),
    AssertionArraySizeLess(usize),
    AssertionArraySizeGreater(usize),
    AssertionObjectSizeLess(usize),
    AssertionObjectSizeGreater(usize),
    AssertionEqual(Json),
    AssertionEqualsAny(Vec<Json>),
    /// Enumeration of perfectly hashed strings.
    AssertionEqualsAnyStringHash(StringSet),
    AssertionGreaterEqual(Json),
    AssertionLessEqual(Json),
    AssertionGreater(Json),
    AssertionLess(Json),
    AssertionUnique,
    AssertionDivisible(Json),
    AssertionStringType(StringFormat),
    /// Type check of an object member addressed by the relative instance
    /// location. A missing member passes.
    AssertionPropertyType(JsonType),
    AssertionPropertyTypeEvaluate(JsonType),
    AssertionPropertyTypeStrict(JsonType),
    AssertionPropertyTypeStrictEvaluate(JsonType),
    AssertionPropertyTypeStrictAny(Vec<JsonType>),
    AssertionPropertyTypeStrictAnyEvaluate(Vec<JsonType>),
    /// Tuple validation. Child `n` checks arrays of length `n + 1`; the last
    /// child covers every longer array.
    AssertionArrayPrefix,
    AssertionArrayPrefixEvaluate,

    // ---------------------------------------------------------------------
    // Annotations
    // ---------------------------------------------------------------------
    AnnotationEmit(Json),
    /// Emit at the parent of the current instance location.
    AnnotationToParent(Json),
    /// Emit the last instance token at the parent instance location.
    AnnotationBasenameToParent,

    // ---------------------------------------------------------------------
    // Logical
    // ---------------------------------------------------------------------
    LogicalNot,
    /// Negation that discards the evaluation marks its children made.
    LogicalNotEvaluate,
    /// The flag requests exhaustive evaluation of every branch.
    LogicalOr(bool),
    LogicalAnd,
    LogicalXor(bool),
    /// `(then_start, else_start)` split points into the children. Zero means
    /// the branch is absent.
    LogicalCondition((usize, usize)),
    LogicalWhenType(JsonType),
    LogicalWhenDefines(Property),
    LogicalWhenArraySizeGreater(usize),

    // ---------------------------------------------------------------------
    // Loops
    // ---------------------------------------------------------------------
    LoopPropertiesUnevaluated,
    LoopPropertiesUnevaluatedExcept(PropertyFilter),
    /// Dispatch each member to the child at the named index. Unknown names
    /// pass.
    LoopPropertiesMatch(BTreeMap<String, usize>),
    /// Like [`Operation::LoopPropertiesMatch`], but unknown names fail.
    LoopPropertiesMatchClosed(BTreeMap<String, usize>),
    LoopProperties,
    LoopPropertiesEvaluate,
    LoopPropertiesRegex(Pattern),
    /// Every member name must match the pattern and its value must pass.
    LoopPropertiesRegexClosed(Pattern),
    LoopPropertiesStartsWith(String),
    LoopPropertiesExcept(PropertyFilter),
    /// Every member name must be in the set.
    LoopPropertiesWhitelist(StringSet),
    LoopPropertiesType(JsonType),
    LoopPropertiesTypeEvaluate(JsonType),
    /// Exactly the named members, each of the given strict type.
    LoopPropertiesExactlyTypeStrict((JsonType, StringSet)),
    LoopPropertiesExactlyTypeStrictHash((JsonType, StringSet)),
    LoopPropertiesTypeStrict(JsonType),
    LoopPropertiesTypeStrictEvaluate(JsonType),
    LoopPropertiesTypeStrictAny(Vec<JsonType>),
    LoopPropertiesTypeStrictAnyEvaluate(Vec<JsonType>),
    LoopKeys,
    LoopItems,
    /// Items from the given index onwards.
    LoopItemsFrom(usize),
    LoopItemsUnevaluated,
    LoopItemsType(JsonType),
    LoopItemsTypeStrict(JsonType),
    LoopItemsTypeStrictAny(Vec<JsonType>),
    LoopItemsPropertiesExactlyTypeStrictHash((JsonType, StringSet)),
    LoopItemsPropertiesExactlyTypeStrictHash3((JsonType, StringSet)),
    /// Count matching items and check the count against the range.
    LoopContains(Range),

    // ---------------------------------------------------------------------
    // Control
    // ---------------------------------------------------------------------
    ControlGroup,
    ControlGroupWhenDefines(Property),
    ControlGroupWhenDefinesDirect(Property),
    ControlGroupWhenType(JsonType),
    /// Register the children under the id and run them.
    ControlLabel(LabelId),
    /// Register the children under the id without running them.
    ControlMark(LabelId),
    /// Mark the location as evaluated.
    ControlEvaluate(Pointer),
    ControlJump(LabelId),
    /// Run the first open resource's registration of the dynamic anchor.
    ControlDynamicAnchorJump(String),
}

impl Operation {
    /// Stable kebab-case name, identical to the serialized `type` tag.
    pub fn name(&self) -> &'static str {
        use Operation::*;
        match self {
            AssertionFail => "assertion-fail",
            AssertionDefines(_) => "assertion-defines",
            AssertionDefinesStrict(_) => "assertion-defines-strict",
            AssertionDefinesAll(_) => "assertion-defines-all",
            AssertionDefinesAllStrict(_) => "assertion-defines-all-strict",
            AssertionDefinesExactly(_) => "assertion-defines-exactly",
            AssertionDefinesExactlyStrict(_) => "assertion-defines-exactly-strict",
            AssertionDefinesExactlyStrictHash3(_) => "assertion-defines-exactly-strict-hash3",
            AssertionPropertyDependencies(_) => "assertion-property-dependencies",
            AssertionType(_) => "assertion-type",
            AssertionTypeAny(_) => "assertion-type-any",
            AssertionTypeStrict(_) => "assertion-type-strict",
            AssertionTypeStrictAny(_) => "assertion-type-strict-any",
            AssertionTypeStringBounded(_) => "assertion-type-string-bounded",
            AssertionTypeStringUpper(_) => "assertion-type-string-upper",
            AssertionTypeArrayBounded(_) => "assertion-type-array-bounded",
            AssertionTypeArrayUpper(_) => "assertion-type-array-upper",
            AssertionTypeObjectBounded(_) => "assertion-type-object-bounded",
            AssertionTypeObjectUpper(_) => "assertion-type-object-upper",
            AssertionRegex(_) => "assertion-regex",
            AssertionStringSizeLess(_) => "assertion-string-size-less",
            AssertionStringSizeGreater(_) => "assertion-string-size-greater",
            AssertionArraySizeLess(_) => "assertion-array-size-less",
            AssertionArraySizeGreater(_) => "assertion-array-size-greater",
            AssertionObjectSizeLess(_) => "assertion-object-size-less",
            AssertionObjectSizeGreater(_) => "assertion-object-size-greater",
            AssertionEqual(_) => "assertion-equal",
            AssertionEqualsAny(_) => "assertion-equals-any",
            AssertionEqualsAnyStringHash(_) => "assertion-equals-any-string-hash",
            AssertionGreaterEqual(_) => "assertion-greater-equal",
            AssertionLessEqual(_) => "assertion-less-equal",
            AssertionGreater(_) => "assertion-greater",
            AssertionLess(_) => "assertion-less",
            AssertionUnique => "assertion-unique",
            AssertionDivisible(_) => "assertion-divisible",
            AssertionStringType(_) => "assertion-string-type",
            AssertionPropertyType(_) => "assertion-property-type",
            AssertionPropertyTypeEvaluate(_) => "assertion-property-type-evaluate",
            AssertionPropertyTypeStrict(_) => "assertion-property-type-strict",
            AssertionPropertyTypeStrictEvaluate(_) => "assertion-property-type-strict-evaluate",
            AssertionPropertyTypeStrictAny(_) => "assertion-property-type-strict-any",
            AssertionPropertyTypeStrictAnyEvaluate(_) => {
                "assertion-property-type-strict-any-evaluate"
            }
            AssertionArrayPrefix => "assertion-array-prefix",
            AssertionArrayPrefixEvaluate => "assertion-array-prefix-evaluate",
            AnnotationEmit(_) => "annotation-emit",
            AnnotationToParent(_) => "annotation-to-parent",
            AnnotationBasenameToParent => "annotation-basename-to-parent",
            LogicalNot => "logical-not",
            LogicalNotEvaluate => "logical-not-evaluate",
            LogicalOr(_) => "logical-or",
            LogicalAnd => "logical-and",
            LogicalXor(_) => "logical-xor",
            LogicalCondition(_) => "logical-condition",
            LogicalWhenType(_) => "logical-when-type",
            LogicalWhenDefines(_) => "logical-when-defines",
            LogicalWhenArraySizeGreater(_) => "logical-when-array-size-greater",
            LoopPropertiesUnevaluated => "loop-properties-unevaluated",
            LoopPropertiesUnevaluatedExcept(_) => "loop-properties-unevaluated-except",
            LoopPropertiesMatch(_) => "loop-properties-match",
            LoopPropertiesMatchClosed(_) => "loop-properties-match-closed",
            LoopProperties => "loop-properties",
            LoopPropertiesEvaluate => "loop-properties-evaluate",
            LoopPropertiesRegex(_) => "loop-properties-regex",
            LoopPropertiesRegexClosed(_) => "loop-properties-regex-closed",
            LoopPropertiesStartsWith(_) => "loop-properties-starts-with",
            LoopPropertiesExcept(_) => "loop-properties-except",
            LoopPropertiesWhitelist(_) => "loop-properties-whitelist",
            LoopPropertiesType(_) => "loop-properties-type",
            LoopPropertiesTypeEvaluate(_) => "loop-properties-type-evaluate",
            LoopPropertiesExactlyTypeStrict(_) => "loop-properties-exactly-type-strict",
            LoopPropertiesExactlyTypeStrictHash(_) => "loop-properties-exactly-type-strict-hash",
            LoopPropertiesTypeStrict(_) => "loop-properties-type-strict",
            LoopPropertiesTypeStrictEvaluate(_) => "loop-properties-type-strict-evaluate",
            LoopPropertiesTypeStrictAny(_) => "loop-properties-type-strict-any",
            LoopPropertiesTypeStrictAnyEvaluate(_) => "loop-properties-type-strict-any-evaluate",
            LoopKeys => "loop-keys",
            LoopItems => "loop-items",
            LoopItemsFrom(_) => "loop-items-from",
            LoopItemsUnevaluated => "loop-items-unevaluated",
            LoopItemsType(_) => "loop-items-type",
            LoopItemsTypeStrict(_) => "loop-items-type-strict",
            LoopItemsTypeStrictAny(_) => "loop-items-type-strict-any",
            LoopItemsPropertiesExactlyTypeStrictHash(_) => {
                "loop-items-properties-exactly-type-strict-hash"
            }
            LoopItemsPropertiesExactlyTypeStrictHash3(_) => {
                "loop-items-properties-exactly-type-strict-hash3"
            }
            LoopContains(_) => "loop-contains",
            ControlGroup => "control-group",
            ControlGroupWhenDefines(_) => "control-group-when-defines",
            ControlGroupWhenDefinesDirect(_) => "control-group-when-defines-direct",
            ControlGroupWhenType(_) => "control-group-when-type",
            ControlLabel(_) => "control-label",
            ControlMark(_) => "control-mark",
            ControlEvaluate(_) => "control-evaluate",
            ControlJump(_) => "control-jump",
            ControlDynamicAnchorJump(_) => "control-dynamic-anchor-jump",
        }
    }

    /// Whether the instruction takes part in tracing and output. Groups and
    /// evaluation marks are transparent.
    pub fn reports(&self) -> bool {
        !matches!(
            self,
            Operation::ControlGroup
                | Operation::ControlGroupWhenDefines(_)
                | Operation::ControlGroupWhenDefinesDirect(_)
                | Operation::ControlGroupWhenType(_)
                | Operation::ControlEvaluate(_)
        )
    }

    pub fn is_annotation(&self) -> bool {
        matches!(
            self,
            Operation::AnnotationEmit(_)
                | Operation::AnnotationToParent(_)
                | Operation::AnnotationBasenameToParent
        )
    }
}

/// One compiled step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instruction {
    pub operation: Operation,
    /// Schema location relative to the enclosing instruction.
    pub relative_schema_location: Pointer,
    /// Instance location relative to the enclosing instruction's target.
    pub relative_instance_location: Pointer,
    /// Absolute keyword location URI, for diagnostics.
    pub keyword_location: String,
    /// 1-based index into the compiled resource list, or 0.
    pub schema_resource: usize,
    /// Whether the compiler saw dynamic scopes in the schema. Informational:
    /// the evaluator keeps the resource stack for every instruction whenever
    /// [`crate::Template::dynamic`] is set or the profile asks for it, and
    /// never reads this flag.
    pub dynamic: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Instruction>,
}

impl Instruction {
    /// Number of instructions in this subtree, used as a cost estimate.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(Instruction::size).sum::<usize>()
    }

    /// Whether any instruction in the subtree satisfies `predicate`.
    pub fn any(&self, predicate: &impl Fn(&Instruction) -> bool) -> bool {
        predicate(self) || self.children.iter().any(|child| child.any(predicate))
    }
}
