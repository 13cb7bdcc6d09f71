//! # jsv-cli — Command-Line Interface
//!
//! The `jsv` binary wraps the compiler and the evaluator for use from a
//! shell or CI job.
//!
//! ## Subcommands
//!
//! - `compile` — Compile a schema and print the template as JSON
//! - `validate` — Validate instances against a schema or a template
//! - `frame` — Print a schema's location and reference tables
//!
//! ## Crate Policy
//!
//! - Argument parsing lives beside each handler; `main.rs` only dispatches.
//! - Handlers write to a caller-supplied writer so they can be tested
//!   without spawning the binary.
//! - Logs go to stderr. Stdout carries only command output.

pub mod compile;
pub mod frame;
pub mod input;
pub mod resolver;
pub mod settings;
pub mod validate;
