//! Output collectors built on evaluation callbacks.
//!
//! [`SimpleOutput`] keeps what a user needs to fix an instance: one
//! described error per failing keyword, plus the annotations of the
//! branches that succeeded. [`TraceOutput`] keeps everything, in order.
//! [`standard`] renders a result in the JSON Schema `flag` or `basic`
//! output format.
//!
//! Both are plain callback targets:
//!
//! ```ignore
//! let mut output = SimpleOutput::new(&instance);
//! let valid = evaluator.evaluate_with_callback(&template, &instance, &mut |event| {
//!     output.record(event)
//! })?;
//! ```

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use jsv_core::{EvaluationError, Json, Pointer, Template};

use crate::describe::describe;
use crate::evaluator::{EvaluationType, Evaluator, Event};

static NULL: Json = Json::Null;

/// Keywords whose subschemas may fail without failing the keyword.
const MASKING_KEYWORDS: [&str; 5] = ["anyOf", "oneOf", "not", "if", "contains"];

/// One reported failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleError {
    pub message: String,
    pub instance_location: Pointer,
    pub evaluate_path: Pointer,
    pub keyword_location: String,
}

/// Where an annotation was produced.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationKey {
    pub instance_location: Pointer,
    pub evaluate_path: Pointer,
    pub keyword_location: String,
}

/// Errors and surviving annotations of one evaluation.
#[derive(Debug, Clone)]
pub struct SimpleOutput<'a> {
    instance: &'a Json,
    errors: Vec<SimpleError>,
    annotations: BTreeMap<AnnotationKey, Vec<Json>>,
    /// Open masking keywords: evaluate path and instance location.
    mask: Vec<(Pointer, Pointer)>,
}

impl<'a> SimpleOutput<'a> {
    pub fn new(instance: &'a Json) -> Self {
        Self {
            instance,
            errors: Vec::new(),
            annotations: BTreeMap::new(),
            mask: Vec::new(),
        }
    }

    /// Feed one evaluation event.
    pub fn record(&mut self, event: &Event<'_>) {
        let evaluate_path = event.evaluate_path;
        let instance_location = event.instance_location;
        let Some(keyword) = evaluate_path.last() else {
            return;
        };

        if event.instruction.operation.is_annotation() {
            if event.kind == EvaluationType::Post {
                if let Some(value) = event.annotation {
                    self.annotate(event, value.clone());
                }
            }
            return;
        }

        match event.kind {
            EvaluationType::Pre => {
                let keyword = keyword.as_text();
                if MASKING_KEYWORDS.contains(&&*keyword) {
                    self.mask.push((evaluate_path.clone(), instance_location.clone()));
                }
            }
            EvaluationType::Post => {
                if let Some(index) = self.mask.iter().rposition(|(path, location)| {
                    path == evaluate_path && location == instance_location
                }) {
                    self.mask.remove(index);
                }
            }
        }

        if event.valid {
            return;
        }

        if event.kind == EvaluationType::Post {
            self.annotations.retain(|key, _| {
                !(key.evaluate_path.starts_with_initial(evaluate_path)
                    && key.instance_location == *instance_location)
            });
        }

        if self
            .mask
            .iter()
            .any(|(path, _)| evaluate_path.starts_with(path))
        {
            return;
        }

        let target = instance_location.resolve(self.instance).unwrap_or(&NULL);
        self.errors.push(SimpleError {
            message: describe(
                false,
                event.instruction,
                evaluate_path,
                instance_location,
                target,
                event.annotation,
            ),
            instance_location: instance_location.clone(),
            evaluate_path: evaluate_path.clone(),
            keyword_location: event.instruction.keyword_location.clone(),
        });
    }

    fn annotate(&mut self, event: &Event<'_>, value: Json) {
        let key = AnnotationKey {
            instance_location: event.instance_location.clone(),
            evaluate_path: event.evaluate_path.clone(),
            keyword_location: event.instruction.keyword_location.clone(),
        };
        let values = self.annotations.entry(key).or_default();
        // The same keyword may annotate a location more than once.
        if values.last() != Some(&value) {
            values.push(value);
        }
    }

    pub fn errors(&self) -> &[SimpleError] {
        &self.errors
    }

    pub fn annotations(&self) -> &BTreeMap<AnnotationKey, Vec<Json>> {
        &self.annotations
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Print every error with its locations, one indented block per error.
    ///
    /// # Errors
    ///
    /// Propagates write failures from `out`.
    pub fn stacktrace(&self, out: &mut impl fmt::Write, indentation: &str) -> fmt::Result {
        for error in &self.errors {
            writeln!(out, "{indentation}{}", error.message)?;
            writeln!(out, "{indentation}  at instance location \"{}\"", error.instance_location)?;
            writeln!(out, "{indentation}  at evaluate path \"{}\"", error.evaluate_path)?;
        }
        Ok(())
    }
}

impl fmt::Display for SimpleOutput<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.stacktrace(f, "")
    }
}

/// JSON Schema standard output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StandardOutput {
    /// `{"valid": bool}` only.
    Flag,
    /// A flat list of errors, or of annotations when the instance is valid.
    Basic,
}

/// Evaluate `instance` and render the result in a standard output format.
///
/// `Flag` evaluates without a callback. `Basic` collects a
/// [`SimpleOutput`]: a valid instance lists its annotations (the key is
/// omitted when there are none) and an invalid one lists its errors.
///
/// # Errors
///
/// Propagates [`EvaluationError`] from the evaluator.
pub fn standard(
    evaluator: &Evaluator,
    template: &Template,
    instance: &Json,
    format: StandardOutput,
) -> Result<Json, EvaluationError> {
    if format == StandardOutput::Flag {
        let valid = evaluator.evaluate(template, instance)?;
        return Ok(serde_json::json!({ "valid": valid }));
    }

    let mut output = SimpleOutput::new(instance);
    let valid = evaluator.evaluate_with_callback(template, instance, &mut |event| {
        output.record(event)
    })?;

    let mut result = serde_json::Map::new();
    result.insert("valid".to_string(), Json::Bool(valid));
    if valid {
        let annotations: Vec<Json> = output
            .annotations()
            .iter()
            .map(|(key, values)| {
                serde_json::json!({
                    "keywordLocation": key.evaluate_path.to_string(),
                    "absoluteKeywordLocation": key.keyword_location,
                    "instanceLocation": key.instance_location.to_string(),
                    "annotation": values,
                })
            })
            .collect();
        if !annotations.is_empty() {
            result.insert("annotations".to_string(), Json::Array(annotations));
        }
    } else {
        let errors: Vec<Json> = output
            .errors()
            .iter()
            .map(|error| {
                serde_json::json!({
                    "keywordLocation": error.evaluate_path.to_string(),
                    "absoluteKeywordLocation": error.keyword_location,
                    "instanceLocation": error.instance_location.to_string(),
                    "error": error.message,
                })
            })
            .collect();
        result.insert("errors".to_string(), Json::Array(errors));
    }
    Ok(Json::Object(result))
}

/// Kind of a trace entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraceEntryKind {
    Push,
    Pass,
    Fail,
}

/// One step of an evaluation trace.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEntry {
    pub kind: TraceEntryKind,
    pub name: &'static str,
    pub instance_location: Pointer,
    pub evaluate_path: Pointer,
    pub keyword_location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotation: Option<Json>,
}

/// Every reported instruction, before and after it runs.
#[derive(Debug, Clone, Default)]
pub struct TraceOutput {
    entries: Vec<TraceEntry>,
}

impl TraceOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, event: &Event<'_>) {
        let kind = match (event.kind, event.valid) {
            (EvaluationType::Pre, _) => TraceEntryKind::Push,
            (EvaluationType::Post, true) => TraceEntryKind::Pass,
            (EvaluationType::Post, false) => TraceEntryKind::Fail,
        };
        self.entries.push(TraceEntry {
            kind,
            name: event.instruction.operation.name(),
            instance_location: event.instance_location.clone(),
            evaluate_path: event.evaluate_path.clone(),
            keyword_location: event.instruction.keyword_location.clone(),
            annotation: event.annotation.cloned(),
        });
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }
}

impl fmt::Display for TraceOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let marker = match entry.kind {
                TraceEntryKind::Push => "->",
                TraceEntryKind::Pass => "<- (pass)",
                TraceEntryKind::Fail => "<- (fail)",
            };
            write!(
                f,
                "{marker} {} \"{}\" ({})\n   at \"{}\"",
                entry.name, entry.evaluate_path, entry.keyword_location, entry.instance_location
            )?;
            if let Some(annotation) = &entry.annotation {
                write!(f, "\n   [annotation] {annotation}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
