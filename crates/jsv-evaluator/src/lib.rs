//! # jsv-evaluator — Instruction Template Evaluator
//!
//! Runs a [`jsv_core::Template`] produced by `jsv-compiler` against a JSON
//! instance and answers whether the instance is valid.
//!
//! ## Key Design Principles
//!
//! 1. **One dispatch, four profiles.** The instruction handlers are written
//!    once and monomorphised per [`Policy`]. [`Fast`] keeps no bookkeeping,
//!    [`Track`] keeps evaluate paths for `unevaluated*`, [`Dynamic`] keeps the
//!    schema resource stack for `$dynamicRef`, and [`Complete`] keeps both
//!    and reports every instruction to a callback.
//!
//! 2. **Profiles never change verdicts.** A template records what it needs,
//!    and the dispatcher turns that bookkeeping on regardless of the profile
//!    it was asked for.
//!
//! 3. **Failures are values, faults are errors.** An invalid instance is
//!    `Ok(false)`. Only runaway recursion is an [`jsv_core::EvaluationError`].
//!    A malformed template never panics; the affected instruction fails.
//!
//! 4. **Observation is opt-in.** [`SimpleOutput`] and [`TraceOutput`] are
//!    ordinary callbacks, [`standard()`] builds the JSON Schema `flag` and
//!    `basic` output formats on top of them, and [`describe()`] renders any
//!    reported instruction as a sentence.
//!
//! ## Crate Policy
//!
//! - Depends only on `jsv-core` internally. Never on the compiler.
//! - No logging inside the evaluation loop.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

mod context;
pub mod describe;
mod dispatch;
pub mod evaluator;
pub mod output;
pub mod policy;

pub use describe::describe;
pub use evaluator::{ConfigError, EvaluationType, Evaluator, Event, DEFAULT_DEPTH_LIMIT};
pub use output::{
    standard, AnnotationKey, SimpleError, SimpleOutput, StandardOutput, TraceEntry, TraceEntryKind,
    TraceOutput,
};
pub use policy::{Complete, Dynamic, EvaluationMode, Fast, Policy, Track};
