//! # jsv-core — Instruction Set for the jsv JSON Schema Engine
//!
//! This crate is the contract between the compiler and the evaluator. It
//! defines the instruction vocabulary a compiled schema is lowered into, the
//! typed payloads those instructions carry, and the [`Template`] that wraps a
//! complete compilation result. Both `jsv-compiler` and `jsv-evaluator`
//! depend on it; it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **One closed sum type for instruction kinds.** [`Operation`] carries the
//!    kind together with its payload, so a kind can never be paired with the
//!    wrong value shape. The shared envelope (locations, resource id, dynamic
//!    flag, children) lives on [`Instruction`].
//!
//! 2. **Templates are plain data.** A [`Template`] is immutable once built and
//!    serializes to a stable JSON form through serde. Derived data such as
//!    property hashes and compiled regular expressions is recomputed on load,
//!    never trusted from the wire.
//!
//! 3. **Perfect hashing for short property names.** [`PropertyHash`] encodes
//!    names of up to 31 bytes losslessly, so hash equality is string equality
//!    for the common case and the slow path only runs for long names.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `jsv-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod error;
pub mod hash;
pub mod instruction;
pub mod json;
pub mod pointer;
pub mod string_set;
pub mod template;
pub mod value;

// Re-export primary types for ergonomic imports.
pub use error::{
    CompileError, CompilerError, EvaluationError, SchemaReferenceError, SchemaVocabularyError,
    TemplateError,
};
pub use hash::{label_id, LabelId, PropertyHash};
pub use instruction::{Instruction, Operation};
pub use json::{Json, JsonType};
pub use pointer::{Pointer, Token};
pub use string_set::StringSet;
pub use template::Template;
pub use value::{Pattern, Property, PropertyFilter, Range, StringFormat};
