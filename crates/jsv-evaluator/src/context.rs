//! Per-call evaluation state.
//!
//! Nothing here outlives one evaluation. The label registry borrows
//! instruction slices from the template, so a context can never be used
//! with a template other than the one it was created for.

use std::collections::HashMap;

use jsv_core::{Instruction, LabelId, Pointer, Token};

/// An instance location some keyword has evaluated.
#[derive(Debug, Clone)]
struct Mark {
    instance_location: Pointer,
    evaluate_path: Pointer,
    /// Withdrawn by an enclosing `not`.
    skip: bool,
}

#[derive(Debug, Default)]
pub(crate) struct EvaluationContext<'t> {
    pub(crate) evaluate_path: Pointer,
    pub(crate) instance_location: Pointer,
    /// Open schema resources, outermost first.
    pub(crate) resources: Vec<usize>,
    labels: HashMap<LabelId, &'t [Instruction]>,
    marks: Vec<Mark>,
    /// Positions in `marks` by instance location, ascending.
    marks_by_location: HashMap<Pointer, Vec<usize>>,
}

impl<'t> EvaluationContext<'t> {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, instruction: &Instruction) {
        self.evaluate_path.extend(&instruction.relative_schema_location);
        self.instance_location.extend(&instruction.relative_instance_location);
    }

    pub(crate) fn pop(&mut self, instruction: &Instruction) {
        self.evaluate_path
            .truncate_by(instruction.relative_schema_location.len());
        self.instance_location
            .truncate_by(instruction.relative_instance_location.len());
    }

    /// Register a labelled subtree. The first registration of an id wins.
    pub(crate) fn register(&mut self, label: LabelId, children: &'t [Instruction]) {
        self.labels.entry(label).or_insert(children);
    }

    pub(crate) fn label(&self, label: LabelId) -> Option<&'t [Instruction]> {
        self.labels.get(&label).copied()
    }

    /// Mark `relative` (from the current instance location) as evaluated by
    /// the current evaluate path.
    pub(crate) fn mark(&mut self, relative: &Pointer) {
        let instance_location = self.instance_location.concat(relative);
        self.marks_by_location
            .entry(instance_location.clone())
            .or_default()
            .push(self.marks.len());
        self.marks.push(Mark {
            instance_location,
            evaluate_path: self.evaluate_path.clone(),
            skip: false,
        });
    }

    /// Mark array items `0..=last` of the current location.
    pub(crate) fn mark_items(&mut self, last: usize) {
        for index in 0..=last {
            self.mark(&Pointer::new().join(index));
        }
    }

    /// Whether the current location, extended by `tail` when given, was
    /// evaluated by the current keyword or one of its siblings (or their
    /// descendants). Cousins cannot affect each other.
    pub(crate) fn is_evaluated(&self, tail: Option<&Token>) -> bool {
        let found = match tail {
            Some(token) => self
                .marks_by_location
                .get(&self.instance_location.join(token.clone())),
            None => self.marks_by_location.get(&self.instance_location),
        };
        found.map_or(false, |positions| {
            positions.iter().rev().any(|&position| {
                let mark = &self.marks[position];
                !mark.skip && mark.evaluate_path.starts_with_initial(&self.evaluate_path)
            })
        })
    }

    /// Withdraw every mark made at or below the current evaluate path.
    pub(crate) fn unevaluate(&mut self) {
        for mark in &mut self.marks {
            if !mark.skip && mark.evaluate_path.starts_with(&self.evaluate_path) {
                mark.skip = true;
            }
        }
    }

    /// Position to [`EvaluationContext::rollback`] to.
    pub(crate) fn checkpoint(&self) -> usize {
        self.marks.len()
    }

    /// Forget marks made since `checkpoint`. Used when a branch fails but
    /// its parent recovers, so the failed branch evaluated nothing.
    pub(crate) fn rollback(&mut self, checkpoint: usize) {
        for mark in self.marks.drain(checkpoint..).rev() {
            if let Some(positions) = self.marks_by_location.get_mut(&mark.instance_location) {
                positions.pop();
                if positions.is_empty() {
                    self.marks_by_location.remove(&mark.instance_location);
                }
            }
        }
    }
}
