//! # Dispatch — One Handler per Instruction Kind
//!
//! Every instruction goes through the same lifecycle:
//!
//! 1. **Resolve the target** by following the relative instance location.
//!    A missing target means the instruction does not apply.
//! 2. **Check the precondition.** Most assertions only constrain one JSON
//!    type (`minimum` says nothing about strings), so a target of another
//!    type passes without any bookkeeping.
//! 3. **Push** the evaluate path, instance location and schema resource,
//!    as far as the profile and the template require.
//! 4. **Run** the predicate and recurse into children.
//! 5. **Pop** and return the verdict.
//!
//! Control groups and evaluation marks skip steps 1 to 3: they are
//! structural and invisible to callbacks.

use std::borrow::Cow;
use std::marker::PhantomData;

use jsv_core::json::{
    compare_numbers, container_size, is_divisible_by, is_type, is_type_strict, is_unique,
    json_equal, json_type,
};
use jsv_core::{
    label_id, EvaluationError, Instruction, Json, JsonType, Operation, Pointer, Property,
    PropertyFilter, PropertyHash, Range, StringFormat, StringSet, Template, Token,
};

use crate::context::EvaluationContext;
use crate::evaluator::{EvaluationType, Event};
use crate::policy::Policy;

type Verdict = Result<bool, EvaluationError>;

pub(crate) struct Dispatcher<'t, 'c, P: Policy> {
    template: &'t Template,
    context: EvaluationContext<'t>,
    callback: Option<&'c mut dyn FnMut(&Event<'_>)>,
    depth_limit: usize,
    track: bool,
    dynamic: bool,
    policy: PhantomData<P>,
}

impl<'t, 'c, P: Policy> Dispatcher<'t, 'c, P> {
    pub(crate) fn new(
        template: &'t Template,
        callback: Option<&'c mut dyn FnMut(&Event<'_>)>,
        depth_limit: usize,
    ) -> Self {
        let callback = if P::CALLBACK { callback } else { None };
        Self {
            template,
            context: EvaluationContext::new(),
            track: P::TRACK || template.track || callback.is_some(),
            dynamic: P::DYNAMIC || template.dynamic,
            callback,
            depth_limit,
            policy: PhantomData,
        }
    }

    /// Run the top-level instructions in order, stopping at the first
    /// failure.
    pub(crate) fn run(mut self, instance: &Json) -> Verdict {
        let template = self.template;
        for instruction in &template.instructions {
            if !self.step(instruction, instance, 0)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn step(&mut self, instruction: &'t Instruction, instance: &Json, depth: usize) -> Verdict {
        if depth > self.depth_limit {
            return Err(EvaluationError::depth_limit());
        }
        let next = depth + 1;

        match &instruction.operation {
            Operation::ControlGroup => self.all(&instruction.children, instance, next),
            Operation::ControlGroupWhenDefines(property) => {
                // The children address the member themselves, so they run
                // against the current instance rather than the target.
                let present = instruction
                    .relative_instance_location
                    .resolve(instance)
                    .is_some_and(|target| defines(target, property));
                if present {
                    self.all(&instruction.children, instance, next)
                } else {
                    Ok(true)
                }
            }
            Operation::ControlGroupWhenDefinesDirect(property) => {
                if defines(instance, property) {
                    self.all(&instruction.children, instance, next)
                } else {
                    Ok(true)
                }
            }
            Operation::ControlGroupWhenType(json_type_) => {
                if json_type(instance) == *json_type_ {
                    self.all(&instruction.children, instance, next)
                } else {
                    Ok(true)
                }
            }
            Operation::ControlEvaluate(pointer) => {
                // Marks carry the keyword's own path, so that flattened
                // subschemas stay distinguishable from their cousins.
                if self.track {
                    self.context.push(instruction);
                    self.context.mark(pointer);
                    self.context.pop(instruction);
                }
                Ok(true)
            }
            Operation::ControlMark(label) => {
                self.context.register(*label, &instruction.children);
                self.report(EvaluationType::Pre, true, instruction, None, None);
                self.report(EvaluationType::Post, true, instruction, None, None);
                Ok(true)
            }
            Operation::AnnotationEmit(_)
            | Operation::AnnotationToParent(_)
            | Operation::AnnotationBasenameToParent => {
                self.annotate(instruction);
                Ok(true)
            }
            operation => {
                let Some(target) = instruction.relative_instance_location.resolve(instance) else {
                    return Ok(true);
                };
                if !applies(operation, target) {
                    return Ok(true);
                }
                self.enter(instruction);
                let result = self.apply(instruction, target, next)?;
                self.leave(instruction, result);
                Ok(result)
            }
        }
    }

    /// The resource stack follows the dispatcher-wide switch, not the
    /// instruction's own `dynamic` flag.
    fn enter(&mut self, instruction: &Instruction) {
        if self.track {
            self.context.push(instruction);
        }
        if self.dynamic {
            self.context.resources.push(instruction.schema_resource);
        }
        self.report(EvaluationType::Pre, true, instruction, None, None);
    }

    fn leave(&mut self, instruction: &Instruction, result: bool) {
        self.report(EvaluationType::Post, result, instruction, None, None);
        if self.track {
            self.context.pop(instruction);
        }
        if self.dynamic {
            self.context.resources.pop();
        }
    }

    fn report(
        &mut self,
        kind: EvaluationType,
        valid: bool,
        instruction: &Instruction,
        location: Option<&Pointer>,
        annotation: Option<&Json>,
    ) {
        if !P::CALLBACK {
            return;
        }
        if let Some(callback) = self.callback.as_deref_mut() {
            callback(&Event {
                kind,
                valid,
                instruction,
                evaluate_path: &self.context.evaluate_path,
                instance_location: location.unwrap_or(&self.context.instance_location),
                annotation,
            });
        }
    }

    /// Annotations only exist for observers, and never fail.
    fn annotate(&mut self, instruction: &Instruction) {
        if !P::CALLBACK || self.callback.is_none() {
            return;
        }
        self.context.push(instruction);
        let location = &self.context.instance_location;
        let (destination, value): (Pointer, Cow<'_, Json>) = match &instruction.operation {
            Operation::AnnotationEmit(value) => (location.clone(), Cow::Borrowed(value)),
            Operation::AnnotationToParent(value) => {
                (location.parent().unwrap_or_default(), Cow::Borrowed(value))
            }
            _ => {
                let basename = match location.last() {
                    Some(Token::Index(index)) => Json::from(*index),
                    Some(Token::Property(name)) => Json::String(name.clone()),
                    None => Json::Null,
                };
                (location.parent().unwrap_or_default(), Cow::Owned(basename))
            }
        };
        self.report(EvaluationType::Pre, true, instruction, Some(&destination), None);
        self.report(
            EvaluationType::Post,
            true,
            instruction,
            Some(&destination),
            Some(value.as_ref()),
        );
        self.context.pop(instruction);
    }

    fn all(&mut self, children: &'t [Instruction], instance: &Json, depth: usize) -> Verdict {
        for child in children {
            if !self.step(child, instance, depth)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run `children` against a member or item, with `token` appended to
    /// the instance location while they run.
    fn descend(
        &mut self,
        token: impl FnOnce() -> Token,
        children: &'t [Instruction],
        value: &Json,
        depth: usize,
    ) -> Verdict {
        if self.track {
            self.context.instance_location.push(token());
        }
        let result = self.all(children, value, depth);
        if self.track {
            self.context.instance_location.pop();
        }
        result
    }

    fn mark_here(&mut self) {
        if self.track {
            self.context.mark(&Pointer::new());
        }
    }

    fn apply(&mut self, instruction: &'t Instruction, target: &Json, depth: usize) -> Verdict {
        let children = instruction.children.as_slice();
        Ok(match &instruction.operation {
            // -----------------------------------------------------------------
            // Assertions
            // -----------------------------------------------------------------
            Operation::AssertionFail => false,
            Operation::AssertionDefines(property) | Operation::AssertionDefinesStrict(property) => {
                defines(target, property)
            }
            Operation::AssertionDefinesAll(names) | Operation::AssertionDefinesAllStrict(names) => {
                target.as_object().is_some_and(|object| {
                    names.len() <= object.len() && names.iter().all(|name| object.contains_key(name))
                })
            }
            Operation::AssertionDefinesExactly(names)
            | Operation::AssertionDefinesExactlyStrict(names)
            | Operation::AssertionDefinesExactlyStrictHash3(names) => {
                target.as_object().is_some_and(|object| {
                    object.len() == names.len() && object.keys().all(|key| names.contains(key))
                })
            }
            Operation::AssertionPropertyDependencies(dependencies) => {
                target.as_object().is_some_and(|object| {
                    dependencies
                        .iter()
                        .filter(|(trigger, _)| object.contains_key(trigger.as_str()))
                        .all(|(_, required)| {
                            required.iter().all(|name| object.contains_key(name.as_str()))
                        })
                })
            }
            Operation::AssertionType(expected) => is_type(target, *expected),
            Operation::AssertionTypeAny(types) => types.iter().any(|expected| is_type(target, *expected)),
            Operation::AssertionTypeStrict(expected) => is_type_strict(target, *expected),
            Operation::AssertionTypeStrictAny(types) => types.contains(&json_type(target)),
            Operation::AssertionTypeStringBounded(range) => {
                sized(target, JsonType::String).is_some_and(|size| range.contains(size))
            }
            Operation::AssertionTypeStringUpper(maximum) => {
                sized(target, JsonType::String).is_some_and(|size| size <= *maximum)
            }
            Operation::AssertionTypeArrayBounded(range) => {
                sized(target, JsonType::Array).is_some_and(|size| range.contains(size))
            }
            Operation::AssertionTypeArrayUpper(maximum) => {
                sized(target, JsonType::Array).is_some_and(|size| size <= *maximum)
            }
            Operation::AssertionTypeObjectBounded(range) => {
                sized(target, JsonType::Object).is_some_and(|size| range.contains(size))
            }
            Operation::AssertionTypeObjectUpper(maximum) => {
                sized(target, JsonType::Object).is_some_and(|size| size <= *maximum)
            }
            Operation::AssertionRegex(pattern) => {
                target.as_str().is_some_and(|text| pattern.is_match(text))
            }
            Operation::AssertionStringSizeLess(bound)
            | Operation::AssertionArraySizeLess(bound)
            | Operation::AssertionObjectSizeLess(bound) => {
                container_size(target).is_some_and(|size| size < *bound)
            }
            Operation::AssertionStringSizeGreater(bound)
            | Operation::AssertionArraySizeGreater(bound)
            | Operation::AssertionObjectSizeGreater(bound) => {
                container_size(target).is_some_and(|size| size > *bound)
            }
            Operation::AssertionEqual(value) => json_equal(target, value),
            Operation::AssertionEqualsAny(values) => values.iter().any(|value| json_equal(target, value)),
            Operation::AssertionEqualsAnyStringHash(names) => {
                target.as_str().is_some_and(|text| names.contains(text))
            }
            Operation::AssertionGreaterEqual(limit) => {
                compare_numbers(target, limit).is_some_and(std::cmp::Ordering::is_ge)
            }
            Operation::AssertionLessEqual(limit) => {
                compare_numbers(target, limit).is_some_and(std::cmp::Ordering::is_le)
            }
            Operation::AssertionGreater(limit) => {
                compare_numbers(target, limit).is_some_and(std::cmp::Ordering::is_gt)
            }
            Operation::AssertionLess(limit) => {
                compare_numbers(target, limit).is_some_and(std::cmp::Ordering::is_lt)
            }
            Operation::AssertionUnique => target.as_array().is_some_and(|items| is_unique(items)),
            Operation::AssertionDivisible(divisor) => is_divisible_by(target, divisor),
            Operation::AssertionStringType(StringFormat::Uri) => {
                target.as_str().is_some_and(|text| url::Url::parse(text).is_ok())
            }
            Operation::AssertionPropertyType(expected) => is_type(target, *expected),
            Operation::AssertionPropertyTypeStrict(expected) => is_type_strict(target, *expected),
            Operation::AssertionPropertyTypeStrictAny(types) => types.contains(&json_type(target)),
            Operation::AssertionPropertyTypeEvaluate(expected) => {
                self.then_mark(is_type(target, *expected))
            }
            Operation::AssertionPropertyTypeStrictEvaluate(expected) => {
                self.then_mark(is_type_strict(target, *expected))
            }
            Operation::AssertionPropertyTypeStrictAnyEvaluate(types) => {
                self.then_mark(types.contains(&json_type(target)))
            }
            Operation::AssertionArrayPrefix => self.array_prefix(children, target, depth, false)?,
            Operation::AssertionArrayPrefixEvaluate => {
                self.array_prefix(children, target, depth, true)?
            }

            // -----------------------------------------------------------------
            // Logical
            // -----------------------------------------------------------------
            Operation::LogicalAnd
            | Operation::LogicalWhenType(_)
            | Operation::LogicalWhenDefines(_)
            | Operation::LogicalWhenArraySizeGreater(_) => self.all(children, target, depth)?,
            Operation::LogicalOr(exhaustive) => {
                let mut result = children.is_empty();
                for child in children {
                    let checkpoint = self.context.checkpoint();
                    if self.step(child, target, depth)? {
                        result = true;
                        if !exhaustive {
                            break;
                        }
                    } else {
                        self.context.rollback(checkpoint);
                    }
                }
                result
            }
            Operation::LogicalXor(exhaustive) => {
                let mut matches = 0usize;
                for child in children {
                    let checkpoint = self.context.checkpoint();
                    if self.step(child, target, depth)? {
                        matches += 1;
                        if matches > 1 && !exhaustive {
                            break;
                        }
                    } else {
                        self.context.rollback(checkpoint);
                    }
                }
                matches == 1
            }
            Operation::LogicalCondition((then_start, else_start)) => {
                self.condition(instruction, target, depth, *then_start, *else_start)?
            }
            Operation::LogicalNot => {
                let checkpoint = self.context.checkpoint();
                let result = !self.all(children, target, depth)?;
                self.context.rollback(checkpoint);
                result
            }
            Operation::LogicalNotEvaluate => {
                let result = !self.all(children, target, depth)?;
                self.context.unevaluate();
                result
            }

            // -----------------------------------------------------------------
            // Object loops
            // -----------------------------------------------------------------
            Operation::LoopPropertiesUnevaluated => {
                self.unevaluated_properties(children, target, depth, None)?
            }
            Operation::LoopPropertiesUnevaluatedExcept(filter) => {
                self.unevaluated_properties(children, target, depth, Some(filter))?
            }
            Operation::LoopPropertiesMatch(indexes) | Operation::LoopPropertiesMatchClosed(indexes) => {
                let closed = matches!(instruction.operation, Operation::LoopPropertiesMatchClosed(_));
                let Some(object) = target.as_object() else {
                    return Ok(true);
                };
                for key in object.keys() {
                    let Some(index) = indexes.get(key) else {
                        if closed {
                            return Ok(false);
                        }
                        continue;
                    };
                    let Some(group) = children.get(*index) else {
                        return Ok(false);
                    };
                    if !self.all(&group.children, target, depth)? {
                        return Ok(false);
                    }
                }
                true
            }
            Operation::LoopProperties => self.properties(children, target, depth, |_| true)?,
            Operation::LoopPropertiesEvaluate => {
                let result = self.properties(children, target, depth, |_| true)?;
                self.then_mark(result)
            }
            Operation::LoopPropertiesRegex(pattern) => {
                self.properties(children, target, depth, |key| pattern.is_match(key))?
            }
            Operation::LoopPropertiesRegexClosed(pattern) => {
                let Some(object) = target.as_object() else {
                    return Ok(true);
                };
                if !object.keys().all(|key| pattern.is_match(key)) {
                    return Ok(false);
                }
                children.is_empty() || self.properties(children, target, depth, |_| true)?
            }
            Operation::LoopPropertiesStartsWith(prefix) => {
                self.properties(children, target, depth, |key| key.starts_with(prefix.as_str()))?
            }
            Operation::LoopPropertiesExcept(filter) => self.properties(children, target, depth, |key| {
                !filter.excludes(key, &PropertyHash::of(key))
            })?,
            Operation::LoopPropertiesWhitelist(names) => target.as_object().is_some_and(|object| {
                object.len() <= names.len() && object.keys().all(|key| names.contains(key))
            }),
            Operation::LoopPropertiesType(expected) => {
                values_of(target).all(|value| is_type(value, *expected))
            }
            Operation::LoopPropertiesTypeEvaluate(expected) => {
                let result = values_of(target).all(|value| is_type(value, *expected));
                self.then_mark(result)
            }
            Operation::LoopPropertiesTypeStrict(expected) => {
                values_of(target).all(|value| is_type_strict(value, *expected))
            }
            Operation::LoopPropertiesTypeStrictEvaluate(expected) => {
                let result = values_of(target).all(|value| is_type_strict(value, *expected));
                self.then_mark(result)
            }
            Operation::LoopPropertiesTypeStrictAny(types) => {
                values_of(target).all(|value| types.contains(&json_type(value)))
            }
            Operation::LoopPropertiesTypeStrictAnyEvaluate(types) => {
                let result = values_of(target).all(|value| types.contains(&json_type(value)));
                self.then_mark(result)
            }
            Operation::LoopPropertiesExactlyTypeStrict((expected, names))
            | Operation::LoopPropertiesExactlyTypeStrictHash((expected, names)) => {
                exactly_typed(target, *expected, names)
            }
            Operation::LoopKeys => {
                let Some(object) = target.as_object() else {
                    return Ok(true);
                };
                for key in object.keys() {
                    let name = Json::String(key.clone());
                    if !self.descend(|| Token::from(key.as_str()), children, &name, depth)? {
                        return Ok(false);
                    }
                }
                true
            }

            // -----------------------------------------------------------------
            // Array loops
            // -----------------------------------------------------------------
            Operation::LoopItems => self.items(children, target, depth, 0)?,
            Operation::LoopItemsFrom(start) => self.items(children, target, depth, *start)?,
            Operation::LoopItemsUnevaluated => self.unevaluated_items(children, target, depth)?,
            Operation::LoopItemsType(expected) => {
                items_of(target).all(|item| is_type(item, *expected))
            }
            Operation::LoopItemsTypeStrict(expected) => {
                items_of(target).all(|item| is_type_strict(item, *expected))
            }
            Operation::LoopItemsTypeStrictAny(types) => {
                items_of(target).all(|item| types.contains(&json_type(item)))
            }
            Operation::LoopItemsPropertiesExactlyTypeStrictHash((expected, names))
            | Operation::LoopItemsPropertiesExactlyTypeStrictHash3((expected, names)) => target
                .as_array()
                .is_some_and(|items| items.iter().all(|item| exactly_typed(item, *expected, names))),
            Operation::LoopContains(range) => self.contains(children, target, depth, range)?,

            // -----------------------------------------------------------------
            // Control
            // -----------------------------------------------------------------
            Operation::ControlLabel(label) => {
                self.context.register(*label, children);
                self.all(children, target, depth)?
            }
            Operation::ControlJump(label) => match self.context.label(*label) {
                Some(body) => self.all(body, target, depth)?,
                None => false,
            },
            Operation::ControlDynamicAnchorJump(anchor) => {
                let found = self
                    .context
                    .resources
                    .iter()
                    .find_map(|resource| self.context.label(label_id(*resource, anchor)));
                match found {
                    Some(body) => self.all(body, target, depth)?,
                    None => false,
                }
            }

            // Handled in `step` without a target.
            Operation::ControlGroup
            | Operation::ControlGroupWhenDefines(_)
            | Operation::ControlGroupWhenDefinesDirect(_)
            | Operation::ControlGroupWhenType(_)
            | Operation::ControlEvaluate(_)
            | Operation::ControlMark(_)
            | Operation::AnnotationEmit(_)
            | Operation::AnnotationToParent(_)
            | Operation::AnnotationBasenameToParent => true,
        })
    }

    fn then_mark(&mut self, result: bool) -> bool {
        if result {
            self.mark_here();
        }
        result
    }

    /// `children[n]` checks arrays of exactly `n + 1` items; the last child
    /// checks arrays with at least as many items as there are prefixes.
    fn array_prefix(
        &mut self,
        children: &'t [Instruction],
        target: &Json,
        depth: usize,
        evaluate: bool,
    ) -> Verdict {
        let Some(items) = target.as_array() else {
            return Ok(true);
        };
        if items.is_empty() {
            return Ok(true);
        }
        let prefixes = children.len().saturating_sub(1);
        let cursor = if items.len() == prefixes {
            Some(prefixes)
        } else {
            items.len().min(prefixes).checked_sub(1)
        };
        let Some(group) = cursor.and_then(|cursor| children.get(cursor)) else {
            return Ok(false);
        };
        if !self.all(&group.children, target, depth)? {
            return Ok(false);
        }
        if evaluate && self.track {
            match cursor {
                Some(last) if items.len() != prefixes => self.context.mark_items(last),
                _ => self.mark_here(),
            }
        }
        Ok(true)
    }

    fn condition(
        &mut self,
        instruction: &'t Instruction,
        target: &Json,
        depth: usize,
        then_start: usize,
        else_start: usize,
    ) -> Verdict {
        let children = instruction.children.as_slice();
        let condition_end = if then_start > 0 {
            then_start
        } else if else_start > 0 {
            else_start
        } else {
            children.len()
        };

        let checkpoint = self.context.checkpoint();
        let Some(condition) = children.get(..condition_end) else {
            return Ok(false);
        };
        let holds = self.all(condition, target, depth)?;
        if !holds {
            self.context.rollback(checkpoint);
        }

        let start = if holds { then_start } else { else_start };
        if start == 0 {
            return Ok(true);
        }
        let end = if holds && else_start > 0 {
            else_start
        } else {
            children.len()
        };
        let Some(branch) = children.get(start..end) else {
            return Ok(false);
        };

        // The branch runs as a sibling of `if`, not beneath it.
        if self.track {
            self.context
                .evaluate_path
                .truncate_by(instruction.relative_schema_location.len());
        }
        let result = self.all(branch, target, depth);
        if self.track {
            self.context
                .evaluate_path
                .extend(&instruction.relative_schema_location);
        }
        result
    }

    fn properties(
        &mut self,
        children: &'t [Instruction],
        target: &Json,
        depth: usize,
        selected: impl Fn(&str) -> bool,
    ) -> Verdict {
        let Some(object) = target.as_object() else {
            return Ok(true);
        };
        for (key, value) in object {
            if !selected(key) {
                continue;
            }
            if !self.descend(|| Token::from(key.as_str()), children, value, depth)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn unevaluated_properties(
        &mut self,
        children: &'t [Instruction],
        target: &Json,
        depth: usize,
        filter: Option<&PropertyFilter>,
    ) -> Verdict {
        let Some(object) = target.as_object() else {
            return Ok(true);
        };
        if self.context.is_evaluated(None) {
            return Ok(true);
        }
        for (key, value) in object {
            if filter.is_some_and(|filter| filter.excludes(key, &PropertyHash::of(key))) {
                continue;
            }
            let token = Token::from(key.as_str());
            if self.context.is_evaluated(Some(&token)) {
                continue;
            }
            if !self.descend(|| token, children, value, depth)? {
                return Ok(false);
            }
        }
        self.mark_here();
        Ok(true)
    }

    fn items(&mut self, children: &'t [Instruction], target: &Json, depth: usize, start: usize) -> Verdict {
        let Some(items) = target.as_array() else {
            return Ok(true);
        };
        for (index, item) in items.iter().enumerate().skip(start) {
            if !self.descend(|| Token::Index(index), children, item, depth)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn unevaluated_items(&mut self, children: &'t [Instruction], target: &Json, depth: usize) -> Verdict {
        let Some(items) = target.as_array() else {
            return Ok(true);
        };
        if self.context.is_evaluated(None) {
            return Ok(true);
        }
        for (index, item) in items.iter().enumerate() {
            if self.context.is_evaluated(Some(&Token::Index(index))) {
                continue;
            }
            if !self.descend(|| Token::Index(index), children, item, depth)? {
                return Ok(false);
            }
        }
        self.mark_here();
        Ok(true)
    }

    /// Count matching items. Items that do not match leave no evaluation
    /// marks behind.
    fn contains(&mut self, children: &'t [Instruction], target: &Json, depth: usize, range: &Range) -> Verdict {
        let Some(items) = target.as_array() else {
            return Ok(true);
        };
        let mut count = 0usize;
        for (index, item) in items.iter().enumerate() {
            let checkpoint = self.context.checkpoint();
            if !self.descend(|| Token::Index(index), children, item, depth)? {
                self.context.rollback(checkpoint);
                continue;
            }
            count += 1;
            match range.maximum {
                Some(maximum) if count > maximum => break,
                None if count >= range.minimum && !range.exhaustive => break,
                _ => {}
            }
        }
        Ok(range.contains(count))
    }
}

/// Whether `target` falls in the instruction's domain at all.
fn applies(operation: &Operation, target: &Json) -> bool {
    match operation {
        Operation::AssertionDefines(_)
        | Operation::AssertionDefinesAll(_)
        | Operation::AssertionDefinesExactly(_)
        | Operation::AssertionPropertyDependencies(_)
        | Operation::AssertionObjectSizeLess(_)
        | Operation::AssertionObjectSizeGreater(_)
        | Operation::LoopPropertiesUnevaluated
        | Operation::LoopPropertiesUnevaluatedExcept(_)
        | Operation::LoopPropertiesMatch(_)
        | Operation::LoopPropertiesMatchClosed(_)
        | Operation::LoopProperties
        | Operation::LoopPropertiesEvaluate
        | Operation::LoopPropertiesRegex(_)
        | Operation::LoopPropertiesRegexClosed(_)
        | Operation::LoopPropertiesStartsWith(_)
        | Operation::LoopPropertiesExcept(_)
        | Operation::LoopPropertiesWhitelist(_)
        | Operation::LoopPropertiesType(_)
        | Operation::LoopPropertiesTypeEvaluate(_)
        | Operation::LoopPropertiesTypeStrict(_)
        | Operation::LoopPropertiesTypeStrictEvaluate(_)
        | Operation::LoopPropertiesTypeStrictAny(_)
        | Operation::LoopPropertiesTypeStrictAnyEvaluate(_)
        | Operation::LoopKeys => target.is_object(),
        Operation::AssertionRegex(_)
        | Operation::AssertionStringSizeLess(_)
        | Operation::AssertionStringSizeGreater(_)
        | Operation::AssertionStringType(_) => target.is_string(),
        Operation::AssertionArraySizeLess(_)
        | Operation::AssertionArraySizeGreater(_)
        | Operation::AssertionUnique
        | Operation::AssertionArrayPrefix
        | Operation::AssertionArrayPrefixEvaluate
        | Operation::LoopItems
        | Operation::LoopItemsUnevaluated
        | Operation::LoopItemsType(_)
        | Operation::LoopItemsTypeStrict(_)
        | Operation::LoopItemsTypeStrictAny(_)
        | Operation::LoopContains(_) => target.is_array(),
        Operation::AssertionGreaterEqual(_)
        | Operation::AssertionLessEqual(_)
        | Operation::AssertionGreater(_)
        | Operation::AssertionLess(_)
        | Operation::AssertionDivisible(_) => target.is_number(),
        Operation::LogicalWhenType(expected) => json_type(target) == *expected,
        Operation::LogicalWhenDefines(property) => defines(target, property),
        Operation::LogicalWhenArraySizeGreater(size) => {
            target.as_array().is_some_and(|items| items.len() > *size)
        }
        Operation::LoopItemsFrom(start) => target.as_array().is_some_and(|items| *start < items.len()),
        _ => true,
    }
}

fn defines(target: &Json, property: &Property) -> bool {
    target
        .as_object()
        .is_some_and(|object| object.contains_key(property.name.as_str()))
}

/// Size of `target` when it has the given type.
fn sized(target: &Json, expected: JsonType) -> Option<usize> {
    if json_type(target) == expected {
        container_size(target)
    } else {
        None
    }
}

fn values_of(target: &Json) -> impl Iterator<Item = &Json> {
    target.as_object().into_iter().flat_map(|object| object.values())
}

fn items_of(target: &Json) -> impl Iterator<Item = &Json> {
    target.as_array().into_iter().flatten()
}

/// An object with exactly the named members, each of strict type
/// `expected`.
fn exactly_typed(target: &Json, expected: JsonType, names: &StringSet) -> bool {
    target.as_object().is_some_and(|object| {
        object.len() == names.len()
            && object.iter().all(|(key, value)| {
                is_type_strict(value, expected) && names.contains_hashed(key, &PropertyHash::of(key))
            })
    })
}
