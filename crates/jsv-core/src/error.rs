//! # Error Types — Compilation and Evaluation Failures
//!
//! Every fatal condition the engine can raise. Ordinary validation failure is
//! not an error: it is the `false` result of an evaluation.
//!
//! ## Design
//!
//! - Vocabulary and reference errors name the offending URI.
//! - Compiler errors carry the base URI and schema pointer of the keyword that
//!   could not be lowered.
//! - Nothing here is retried or recovered internally. Every error aborts the
//!   call that raised it.

use thiserror::Error;

/// The schema declares a vocabulary the engine cannot compile.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}: {uri}")]
pub struct SchemaVocabularyError {
    /// URI of the offending vocabulary or dialect.
    pub uri: String,
    /// Human-readable reason.
    pub message: String,
}

impl SchemaVocabularyError {
    /// Build an error for an unsupported vocabulary URI.
    pub fn unsupported(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            message: "Cannot compile unsupported vocabulary".to_string(),
        }
    }
}

/// A reference points outside the known schema graph or into a non-schema
/// location.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}: {identifier} (at \"{pointer}\")")]
pub struct SchemaReferenceError {
    /// The reference as resolved against its base URI.
    pub identifier: String,
    /// Schema pointer of the keyword holding the reference.
    pub pointer: String,
    /// Human-readable reason.
    pub message: String,
}

/// A keyword value could not be lowered into instructions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (at {base}#{schema_location})")]
pub struct CompilerError {
    /// Base URI of the schema resource holding the keyword.
    pub base: String,
    /// Schema pointer of the keyword.
    pub schema_location: String,
    /// Human-readable reason.
    pub message: String,
}

/// Any fatal condition raised while compiling a schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Unsupported or unknown vocabulary.
    #[error("vocabulary error: {0}")]
    Vocabulary(#[from] SchemaVocabularyError),

    /// Unresolvable or invalid reference.
    #[error("reference error: {0}")]
    Reference(#[from] SchemaReferenceError),

    /// Malformed keyword value.
    #[error("compiler error: {0}")]
    Compiler(#[from] CompilerError),

    /// The schema document itself is not a JSON Schema.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// A fatal runtime condition, distinct from an ordinary validation failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct EvaluationError {
    /// Human-readable reason.
    pub message: String,
}

impl EvaluationError {
    /// The recursion guard tripped.
    pub fn depth_limit() -> Self {
        Self {
            message: "The evaluation path depth limit was reached likely due to infinite recursion"
                .to_string(),
        }
    }
}

/// A serialized template could not be loaded.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// The document does not match the template layout.
    #[error("malformed template: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The template was produced by an incompatible format version.
    #[error("unsupported template version {found}, expected {expected}")]
    Version {
        /// Version found in the document.
        found: u64,
        /// Version this build reads.
        expected: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_error_names_uri() {
        let err = SchemaVocabularyError::unsupported("https://example.com/vocab/custom");
        assert_eq!(
            err.to_string(),
            "Cannot compile unsupported vocabulary: https://example.com/vocab/custom"
        );
    }

    #[test]
    fn compile_error_wraps_compiler_error() {
        let err: CompileError = CompilerError {
            base: "https://example.com/schema".to_string(),
            schema_location: "/pattern".to_string(),
            message: "Invalid regular expression".to_string(),
        }
        .into();
        assert!(err.to_string().contains("/pattern"));
        assert!(matches!(err, CompileError::Compiler(_)));
    }

    #[test]
    fn depth_limit_message() {
        assert_eq!(
            EvaluationError::depth_limit().to_string(),
            "The evaluation path depth limit was reached likely due to infinite recursion"
        );
    }
}
