//! Compiler configuration.
//!
//! The reference-expansion heuristics are tuned constants. They are exposed
//! here so callers can experiment with them. Override via environment
//! variables, a config file loaded by the CLI, or explicit construction.

use serde::{Deserialize, Serialize};

/// What the compiled template must be able to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Boolean validity only. Enables shape-specializing rewrites.
    #[default]
    FastValidation,
    /// Every branch, annotation and error location is observable.
    Exhaustive,
}

/// Tuning knobs for reference expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerTweaks {
    /// A non-recursive `$ref` whose target declares at most this many
    /// references of its own is inlined.
    pub inline_threshold: usize,
    /// Targets referenced more often than this are compiled once, up front.
    pub precompile_min_references: usize,
    /// At most this many targets are compiled up front.
    pub precompile_max_targets: usize,
}

impl Default for CompilerTweaks {
    fn default() -> Self {
        Self {
            inline_threshold: 5,
            precompile_min_references: 100,
            precompile_max_targets: 5,
        }
    }
}

impl CompilerTweaks {
    /// Load tweaks from environment variables, falling back to the defaults.
    ///
    /// Variables:
    /// - `JSV_INLINE_THRESHOLD` (default: 5)
    /// - `JSV_PRECOMPILE_MIN_REFERENCES` (default: 100)
    /// - `JSV_PRECOMPILE_MAX_TARGETS` (default: 5)
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidNumber`] when a variable is set but is
    /// not a non-negative integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            inline_threshold: env_usize("JSV_INLINE_THRESHOLD", defaults.inline_threshold)?,
            precompile_min_references: env_usize(
                "JSV_PRECOMPILE_MIN_REFERENCES",
                defaults.precompile_min_references,
            )?,
            precompile_max_targets: env_usize(
                "JSV_PRECOMPILE_MAX_TARGETS",
                defaults.precompile_max_targets,
            )?,
        })
    }
}

/// Everything [`crate::compile`] needs besides the schema and the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompileOptions {
    pub mode: Mode,
    /// Dialect for schemas that declare no `$schema`.
    pub default_dialect: Option<String>,
    /// Identifier for schemas that declare no `$id`.
    pub default_id: Option<String>,
    pub tweaks: CompilerTweaks,
}

impl CompileOptions {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn with_default_dialect(mut self, dialect: impl Into<String>) -> Self {
        self.default_dialect = Some(dialect.into());
        self
    }

    pub fn with_default_id(mut self, id: impl Into<String>) -> Self {
        self.default_id = Some(id.into());
        self
    }

    pub fn with_tweaks(mut self, tweaks: CompilerTweaks) -> Self {
        self.tweaks = tweaks;
        self
    }
}

fn env_usize(var: &str, default: usize) -> Result<usize, ConfigError> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidNumber(var.to_string(), raw)),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid number for {0}: {1:?}")]
    InvalidNumber(String, String),
}
