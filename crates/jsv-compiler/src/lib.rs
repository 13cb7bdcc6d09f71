//! # jsv-compiler — JSON Schema to Instruction Template Compiler
//!
//! Lowers a JSON Schema (draft 4, 6, 7, 2019-09 or 2020-12) into a
//! [`jsv_core::Template`] that `jsv-evaluator` runs against instances.
//!
//! ## Pipeline
//!
//! 1. [`bundle()`] embeds every externally referenced schema into the root,
//!    fetching documents through a [`SchemaResolver`].
//! 2. [`Frame::build`] indexes every addressable location (resources,
//!    anchors, subschemas) and every reference, and decides which
//!    `$dynamicRef`/`$recursiveRef` edges bind late.
//! 3. [`unevaluated::Unevaluated`] finds the `unevaluated*` keywords that can
//!    observe anything, so the rest of the schema only pays for evaluation
//!    tracking when it must.
//! 4. [`compile()`] walks the schema and hands each keyword to the
//!    [`default_compiler`] dispatcher, which picks a lowering rule by
//!    vocabulary.
//!
//! ## Key Design Principles
//!
//! 1. **The compiler is pure.** No I/O happens here; resolvers own it. The
//!    same schema and options always produce the same template.
//!
//! 2. **Modes change shape, never meaning.** [`Mode::FastValidation`]
//!    rewrites keyword combinations into specialised instructions (hashed
//!    property sets, typed loops, folded size bounds). [`Mode::Exhaustive`]
//!    keeps one instruction per keyword so every failure and annotation has
//!    a location. Both accept exactly the same instances.
//!
//! 3. **Rules are plain functions.** A [`KeywordCompiler`] is a function
//!    pointer, so callers can wrap [`default_compiler`] to add or override
//!    keywords without touching this crate.
//!
//! ## Crate Policy
//!
//! - Depends only on `jsv-core` internally. Never on the evaluator.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod bundle;
pub mod compile;
pub mod config;
pub mod context;
pub mod frame;
pub mod resolver;
pub mod rules;
pub mod unevaluated;
pub mod uri;
pub mod vocabulary;
pub mod walker;

pub use bundle::bundle;
pub use compile::{compile, compile_framed, compile_with};
pub use config::{CompileOptions, CompilerTweaks, ConfigError, Mode};
pub use context::KeywordCompiler;
pub use frame::Frame;
pub use resolver::{MapResolver, SchemaResolver};
pub use rules::default_compiler;
pub use walker::{default_walker, Walker};
