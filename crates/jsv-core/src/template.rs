//! # Template — A Complete Compilation Result
//!
//! The template is what the compiler hands to the evaluator and what the CLI
//! writes to disk. Its JSON form is versioned; loading a document recomputes
//! every derived value (hashes, compiled regexes) from source text.

use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::instruction::{Instruction, Operation};
use crate::json::Json;

/// Version of the serialized layout produced by [`Template::to_json`].
pub const TEMPLATE_FORMAT_VERSION: u64 = 1;

/// Ordered top-level instructions plus the bookkeeping they require.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Template {
    /// Some instruction opens a dynamic scope, so the evaluator must keep
    /// the resource stack.
    pub dynamic: bool,
    /// Some instruction needs evaluate-path tracking (evaluation marks or
    /// annotations).
    pub track: bool,
    pub instructions: Vec<Instruction>,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: u64,
}

impl Template {
    /// Serialize to the stable JSON form.
    ///
    /// # Errors
    ///
    /// Fails only if a payload cannot be represented as JSON, which the
    /// instruction set never produces.
    pub fn to_json(&self) -> Result<Json, TemplateError> {
        let mut document = serde_json::to_value(self)?;
        if let Json::Object(map) = &mut document {
            map.insert("version".to_string(), Json::from(TEMPLATE_FORMAT_VERSION));
        }
        Ok(document)
    }

    /// Load a template from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Version`] for documents written by an
    /// incompatible version and [`TemplateError::Malformed`] for anything
    /// that does not match the layout, including invalid regular
    /// expressions.
    pub fn from_json(document: &Json) -> Result<Self, TemplateError> {
        let probe = VersionProbe::deserialize(document)?;
        if probe.version != TEMPLATE_FORMAT_VERSION {
            return Err(TemplateError::Version {
                found: probe.version,
                expected: TEMPLATE_FORMAT_VERSION,
            });
        }
        Ok(Template::deserialize(document)?)
    }

    /// Total number of instructions, counting children.
    pub fn size(&self) -> usize {
        self.instructions.iter().map(Instruction::size).sum()
    }

    /// Whether any instruction anywhere satisfies `predicate`.
    pub fn contains(&self, predicate: impl Fn(&Operation) -> bool) -> bool {
        self.instructions
            .iter()
            .any(|instruction| instruction.any(&|i| predicate(&i.operation)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::json::JsonType;
    use crate::pointer::Pointer;
    use crate::value::Pattern;
    use serde_json::json;

    fn sample() -> Template {
        Template {
            dynamic: false,
            track: true,
            instructions: vec![Instruction {
                operation: Operation::LoopPropertiesRegex(Pattern::new("^x-").unwrap()),
                relative_schema_location: Pointer::new().join("patternProperties").join("^x-"),
                relative_instance_location: Pointer::new(),
                keyword_location: "#/patternProperties/%5Ex-".to_string(),
                schema_resource: 0,
                dynamic: false,
                children: vec![Instruction {
                    operation: Operation::AssertionTypeStrict(JsonType::String),
                    relative_schema_location: Pointer::new().join("type"),
                    relative_instance_location: Pointer::new(),
                    keyword_location: "#/patternProperties/%5Ex-/type".to_string(),
                    schema_resource: 0,
                    dynamic: false,
                    children: Vec::new(),
                }],
            }],
        }
    }

    #[test]
    fn json_form_round_trips() {
        let template = sample();
        let encoded = template.to_json().unwrap();
        assert_eq!(encoded["version"], json!(TEMPLATE_FORMAT_VERSION));
        assert_eq!(Template::from_json(&encoded).unwrap(), template);
    }

    #[test]
    fn rejects_other_versions() {
        let mut encoded = sample().to_json().unwrap();
        encoded["version"] = json!(99);
        assert!(matches!(
            Template::from_json(&encoded),
            Err(TemplateError::Version { found: 99, .. })
        ));
    }

    #[test]
    fn rejects_invalid_regex() {
        let mut encoded = sample().to_json().unwrap();
        encoded["instructions"][0]["operation"]["value"] = json!("([");
        assert!(matches!(Template::from_json(&encoded), Err(TemplateError::Malformed(_))));
    }

    #[test]
    fn size_and_search() {
        let template = sample();
        assert_eq!(template.size(), 2);
        assert!(template.contains(|op| matches!(op, Operation::AssertionTypeStrict(_))));
        assert!(!template.contains(|op| matches!(op, Operation::AssertionFail)));
    }
}
