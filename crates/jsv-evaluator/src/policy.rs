//! Evaluation profiles.
//!
//! A profile decides which bookkeeping the dispatcher keeps around every
//! instruction. The dispatch itself is written once and monomorphised per
//! profile through the [`Policy`] trait, so the fast profile carries no
//! runtime checks for state it never needs.
//!
//! A profile is a floor, not a ceiling: a template that needs the evaluate
//! path (evaluation marks) or the resource stack (dynamic anchors) always
//! gets them, so every profile returns the same verdict.

use serde::{Deserialize, Serialize};

use jsv_core::Template;

/// Compile-time bookkeeping switches.
pub trait Policy {
    /// Keep the evaluate path and instance location.
    const TRACK: bool;
    /// Keep the stack of open schema resources.
    const DYNAMIC: bool;
    /// Report every instruction to the caller's callback.
    const CALLBACK: bool;
    const MODE: EvaluationMode;
}

/// Boolean validation with no bookkeeping beyond what the template demands.
#[derive(Debug, Clone, Copy)]
pub struct Fast;

/// Evaluate-path tracking, for `unevaluated*` keywords.
#[derive(Debug, Clone, Copy)]
pub struct Track;

/// Resource-stack tracking, for `$dynamicRef` and `$recursiveRef`.
#[derive(Debug, Clone, Copy)]
pub struct Dynamic;

/// Everything, including callbacks.
#[derive(Debug, Clone, Copy)]
pub struct Complete;

impl Policy for Fast {
    const TRACK: bool = false;
    const DYNAMIC: bool = false;
    const CALLBACK: bool = false;
    const MODE: EvaluationMode = EvaluationMode::Fast;
}

impl Policy for Track {
    const TRACK: bool = true;
    const DYNAMIC: bool = false;
    const CALLBACK: bool = false;
    const MODE: EvaluationMode = EvaluationMode::Track;
}

impl Policy for Dynamic {
    const TRACK: bool = false;
    const DYNAMIC: bool = true;
    const CALLBACK: bool = false;
    const MODE: EvaluationMode = EvaluationMode::Dynamic;
}

impl Policy for Complete {
    const TRACK: bool = true;
    const DYNAMIC: bool = true;
    const CALLBACK: bool = true;
    const MODE: EvaluationMode = EvaluationMode::Complete;
}

/// Runtime name of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvaluationMode {
    Fast,
    Track,
    Dynamic,
    Complete,
}

impl EvaluationMode {
    /// The cheapest profile that covers what `template` needs.
    pub fn for_template(template: &Template) -> Self {
        match (template.track, template.dynamic) {
            (true, true) => Self::Complete,
            (true, false) => Self::Track,
            (false, true) => Self::Dynamic,
            (false, false) => Self::Fast,
        }
    }

    pub const ALL: [EvaluationMode; 4] = [Self::Fast, Self::Track, Self::Dynamic, Self::Complete];
}
