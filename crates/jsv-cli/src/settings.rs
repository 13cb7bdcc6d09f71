//! # Layered Settings
//!
//! Compiler tweaks and the evaluator depth limit come from three layers,
//! later layers winning:
//!
//! 1. `JSV_*` environment variables (or the built-in defaults).
//! 2. The `--config` file, YAML or JSON.
//! 3. Explicit command-line flags.
//!
//! The file and the flags share one shape, [`Overrides`], in which every
//! field is optional so that an absent value never masks a lower layer.

use std::path::Path;

use anyhow::Context;
use clap::Args;
use jsv_compiler::CompilerTweaks;
use jsv_evaluator::Evaluator;
use serde::Deserialize;
use tracing::debug;

use crate::input::read_document;

/// Optional overrides for every tunable setting.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Overrides {
    /// Inline non-recursive references whose target has at most this many
    /// references of its own.
    #[arg(long, global = true)]
    pub inline_threshold: Option<usize>,

    /// Precompile reference targets used more often than this.
    #[arg(long, global = true)]
    pub precompile_min_references: Option<usize>,

    /// Precompile at most this many reference targets.
    #[arg(long, global = true)]
    pub precompile_max_targets: Option<usize>,

    /// Maximum instruction nesting during evaluation.
    #[arg(long, global = true)]
    pub depth_limit: Option<usize>,
}

impl Overrides {
    /// Load overrides from a YAML or JSON file.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read, does not parse, or names a
    /// setting that does not exist.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let document = read_document(path)?;
        serde_json::from_value(document)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    fn apply(&self, settings: &mut Settings) {
        let tweaks = &mut settings.tweaks;
        if let Some(value) = self.inline_threshold {
            tweaks.inline_threshold = value;
        }
        if let Some(value) = self.precompile_min_references {
            tweaks.precompile_min_references = value;
        }
        if let Some(value) = self.precompile_max_targets {
            tweaks.precompile_max_targets = value;
        }
        if let Some(value) = self.depth_limit {
            settings.depth_limit = value;
        }
    }
}

/// Fully resolved settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settings {
    pub tweaks: CompilerTweaks,
    pub depth_limit: usize,
}

impl Settings {
    /// Layer the environment, the optional config file, and `flags`.
    ///
    /// # Errors
    ///
    /// Fails when an environment variable is not a number or the config
    /// file cannot be loaded.
    pub fn load(config: Option<&Path>, flags: &Overrides) -> anyhow::Result<Self> {
        let mut settings = Self {
            tweaks: CompilerTweaks::from_env()?,
            depth_limit: Evaluator::from_env()?.depth_limit(),
        };
        if let Some(path) = config {
            Overrides::from_file(path)?.apply(&mut settings);
        }
        flags.apply(&mut settings);
        debug!(?settings, "resolved settings");
        Ok(settings)
    }

    pub fn evaluator(&self) -> Evaluator {
        Evaluator::new().with_depth_limit(self.depth_limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn flags_override_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jsv.yaml");
        fs::write(&path, "inline_threshold: 9\ndepth_limit: 40\n").unwrap();

        let flags = Overrides {
            depth_limit: Some(7),
            ..Overrides::default()
        };
        let settings = Settings::load(Some(&path), &flags).unwrap();
        assert_eq!(settings.tweaks.inline_threshold, 9);
        assert_eq!(settings.depth_limit, 7);
        assert_eq!(settings.evaluator().depth_limit(), 7);
    }

    #[test]
    fn json_config_files_are_accepted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jsv.json");
        fs::write(&path, r#"{"precompile_max_targets": 2}"#).unwrap();
        let overrides = Overrides::from_file(&path).unwrap();
        assert_eq!(overrides.precompile_max_targets, Some(2));
        assert_eq!(overrides.inline_threshold, None);
    }

    #[test]
    fn unknown_settings_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("jsv.yaml");
        fs::write(&path, "inline_treshold: 3\n").unwrap();
        assert!(Overrides::from_file(&path).is_err());
    }

    #[test]
    fn absent_values_leave_lower_layers_alone() {
        let mut settings = Settings {
            tweaks: CompilerTweaks::default(),
            depth_limit: 12,
        };
        Overrides::default().apply(&mut settings);
        assert_eq!(settings.tweaks, CompilerTweaks::default());
        assert_eq!(settings.depth_limit, 12);
    }
}
