//! The public entry point: run a template against an instance.

use jsv_core::{EvaluationError, Instruction, Json, Pointer, Template};
use tracing::debug;

use crate::dispatch::Dispatcher;
use crate::policy::{Complete, Dynamic, EvaluationMode, Fast, Policy, Track};

/// Default maximum nesting of instructions before evaluation gives up.
pub const DEFAULT_DEPTH_LIMIT: usize = 300;

/// Whether an event is reported before or after its instruction runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvaluationType {
    Pre,
    Post,
}

/// One observation passed to an evaluation callback.
///
/// Every reported instruction produces a `Pre` event and a matching `Post`
/// event. `valid` is always `true` on `Pre`. Annotation instructions carry
/// their value on `Post`, and their `instance_location` is where the
/// annotation applies, which for the `ToParent` kinds is the parent of the
/// current location.
#[derive(Debug, Clone, Copy)]
pub struct Event<'a> {
    pub kind: EvaluationType,
    pub valid: bool,
    pub instruction: &'a Instruction,
    pub evaluate_path: &'a Pointer,
    pub instance_location: &'a Pointer,
    pub annotation: Option<&'a Json>,
}

/// Runs compiled templates.
///
/// An `Evaluator` holds configuration only. It keeps no state between calls
/// and can be shared freely across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluator {
    depth_limit: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self {
            depth_limit: DEFAULT_DEPTH_LIMIT,
        }
    }
}

impl Evaluator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_depth_limit(mut self, depth_limit: usize) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn depth_limit(&self) -> usize {
        self.depth_limit
    }

    /// Load configuration from the environment.
    ///
    /// Variables:
    /// - `JSV_DEPTH_LIMIT` (default: 300)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when the variable is set but is
    /// not a non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let depth_limit = match std::env::var("JSV_DEPTH_LIMIT") {
            Ok(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidNumber("JSV_DEPTH_LIMIT".to_string(), raw))?,
            Err(_) => DEFAULT_DEPTH_LIMIT,
        };
        debug!(depth_limit, "evaluator configured from environment");
        Ok(Self { depth_limit })
    }

    /// Evaluate with the cheapest profile the template allows.
    ///
    /// # Errors
    ///
    /// Returns an [`EvaluationError`] when instruction nesting exceeds the
    /// depth limit, which in practice means the schema recursed without
    /// consuming the instance.
    pub fn evaluate(&self, template: &Template, instance: &Json) -> Result<bool, EvaluationError> {
        self.evaluate_with_mode(template, instance, EvaluationMode::for_template(template))
    }

    /// Evaluate with an explicit profile. Every profile returns the same
    /// verdict; the choice only affects speed.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::evaluate`].
    pub fn evaluate_with_mode(
        &self,
        template: &Template,
        instance: &Json,
        mode: EvaluationMode,
    ) -> Result<bool, EvaluationError> {
        match mode {
            EvaluationMode::Fast => self.evaluate_as::<Fast>(template, instance),
            EvaluationMode::Track => self.evaluate_as::<Track>(template, instance),
            EvaluationMode::Dynamic => self.evaluate_as::<Dynamic>(template, instance),
            EvaluationMode::Complete => self.evaluate_as::<Complete>(template, instance),
        }
    }

    /// Evaluate with a statically chosen profile.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::evaluate`].
    pub fn evaluate_as<P: Policy>(
        &self,
        template: &Template,
        instance: &Json,
    ) -> Result<bool, EvaluationError> {
        Dispatcher::<P>::new(template, None, self.depth_limit).run(instance)
    }

    /// Evaluate with the complete profile, reporting every instruction to
    /// `callback`. Use an exhaustive template to observe every failure and
    /// annotation; a fast template stops at the first failure.
    ///
    /// # Errors
    ///
    /// See [`Evaluator::evaluate`].
    pub fn evaluate_with_callback(
        &self,
        template: &Template,
        instance: &Json,
        callback: &mut dyn FnMut(&Event<'_>),
    ) -> Result<bool, EvaluationError> {
        Dispatcher::<Complete>::new(template, Some(callback), self.depth_limit).run(instance)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
}
