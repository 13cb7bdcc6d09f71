//! Dialects and vocabularies.
//!
//! Drafts 4, 6 and 7 predate vocabularies; each is modelled as a single
//! pseudo-vocabulary named after its metaschema. 2019-09 and 2020-12 declare
//! real vocabularies, and custom metaschemas may pick a subset of them
//! through `$vocabulary`.

use std::collections::BTreeMap;

use jsv_core::{Json, SchemaVocabularyError};
use tracing::trace;

use crate::resolver::SchemaResolver;
use crate::uri;

pub const DRAFT4: &str = "http://json-schema.org/draft-04/schema";
pub const DRAFT4_HYPER: &str = "http://json-schema.org/draft-04/hyper-schema";
pub const DRAFT6: &str = "http://json-schema.org/draft-06/schema";
pub const DRAFT6_HYPER: &str = "http://json-schema.org/draft-06/hyper-schema";
pub const DRAFT7: &str = "http://json-schema.org/draft-07/schema";
pub const DRAFT7_HYPER: &str = "http://json-schema.org/draft-07/hyper-schema";
pub const DRAFT2019_09: &str = "https://json-schema.org/draft/2019-09/schema";
pub const DRAFT2019_09_HYPER: &str = "https://json-schema.org/draft/2019-09/hyper-schema";
pub const DRAFT2020_12: &str = "https://json-schema.org/draft/2020-12/schema";
pub const DRAFT2020_12_HYPER: &str = "https://json-schema.org/draft/2020-12/hyper-schema";

pub const V2019_09_CORE: &str = "https://json-schema.org/draft/2019-09/vocab/core";
pub const V2019_09_APPLICATOR: &str = "https://json-schema.org/draft/2019-09/vocab/applicator";
pub const V2019_09_VALIDATION: &str = "https://json-schema.org/draft/2019-09/vocab/validation";
pub const V2019_09_META_DATA: &str = "https://json-schema.org/draft/2019-09/vocab/meta-data";
pub const V2019_09_FORMAT: &str = "https://json-schema.org/draft/2019-09/vocab/format";
pub const V2019_09_CONTENT: &str = "https://json-schema.org/draft/2019-09/vocab/content";
pub const V2019_09_HYPER_SCHEMA: &str = "https://json-schema.org/draft/2019-09/vocab/hyper-schema";

pub const V2020_12_CORE: &str = "https://json-schema.org/draft/2020-12/vocab/core";
pub const V2020_12_APPLICATOR: &str = "https://json-schema.org/draft/2020-12/vocab/applicator";
pub const V2020_12_UNEVALUATED: &str = "https://json-schema.org/draft/2020-12/vocab/unevaluated";
pub const V2020_12_VALIDATION: &str = "https://json-schema.org/draft/2020-12/vocab/validation";
pub const V2020_12_META_DATA: &str = "https://json-schema.org/draft/2020-12/vocab/meta-data";
pub const V2020_12_FORMAT_ANNOTATION: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-annotation";
pub const V2020_12_FORMAT_ASSERTION: &str =
    "https://json-schema.org/draft/2020-12/vocab/format-assertion";
pub const V2020_12_CONTENT: &str = "https://json-schema.org/draft/2020-12/vocab/content";
pub const V2020_12_HYPER_SCHEMA: &str = "https://json-schema.org/draft/2020-12/vocab/hyper-schema";

const KNOWN_VOCABULARIES: &[&str] = &[
    V2019_09_CORE,
    V2019_09_APPLICATOR,
    V2019_09_VALIDATION,
    V2019_09_META_DATA,
    V2019_09_FORMAT,
    V2019_09_CONTENT,
    V2019_09_HYPER_SCHEMA,
    V2020_12_CORE,
    V2020_12_APPLICATOR,
    V2020_12_UNEVALUATED,
    V2020_12_VALIDATION,
    V2020_12_META_DATA,
    V2020_12_FORMAT_ANNOTATION,
    V2020_12_FORMAT_ASSERTION,
    V2020_12_CONTENT,
    V2020_12_HYPER_SCHEMA,
];

/// The specification generation a dialect builds on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Draft {
    Draft4,
    Draft6,
    Draft7,
    Draft2019_09,
    Draft2020_12,
}

impl Draft {
    /// Recognize one of the official metaschema URIs.
    pub fn from_metaschema(uri: &str) -> Option<Self> {
        match uri::canonicalize(uri).as_str() {
            DRAFT4 | DRAFT4_HYPER => Some(Self::Draft4),
            DRAFT6 | DRAFT6_HYPER => Some(Self::Draft6),
            DRAFT7 | DRAFT7_HYPER => Some(Self::Draft7),
            DRAFT2019_09 | DRAFT2019_09_HYPER => Some(Self::Draft2019_09),
            DRAFT2020_12 | DRAFT2020_12_HYPER => Some(Self::Draft2020_12),
            _ => None,
        }
    }

    /// Keyword carrying a schema resource identifier.
    pub fn id_keyword(&self) -> &'static str {
        match self {
            Self::Draft4 => "id",
            _ => "$id",
        }
    }

    /// Container the bundler embeds external resources into.
    pub fn definitions_keyword(&self) -> &'static str {
        match self {
            Self::Draft2019_09 | Self::Draft2020_12 => "$defs",
            _ => "definitions",
        }
    }

    /// `$ref` hides every sibling keyword.
    pub fn ref_overrides_siblings(&self) -> bool {
        matches!(self, Self::Draft4 | Self::Draft6 | Self::Draft7)
    }

    pub fn metaschema(&self) -> &'static str {
        match self {
            Self::Draft4 => DRAFT4,
            Self::Draft6 => DRAFT6,
            Self::Draft7 => DRAFT7,
            Self::Draft2019_09 => DRAFT2019_09,
            Self::Draft2020_12 => DRAFT2020_12,
        }
    }

    fn default_vocabularies(&self) -> BTreeMap<String, bool> {
        let uris: &[&str] = match self {
            Self::Draft4 => &[DRAFT4],
            Self::Draft6 => &[DRAFT6],
            Self::Draft7 => &[DRAFT7],
            Self::Draft2019_09 => &[
                V2019_09_CORE,
                V2019_09_APPLICATOR,
                V2019_09_VALIDATION,
                V2019_09_META_DATA,
                V2019_09_FORMAT,
                V2019_09_CONTENT,
            ],
            Self::Draft2020_12 => &[
                V2020_12_CORE,
                V2020_12_APPLICATOR,
                V2020_12_UNEVALUATED,
                V2020_12_VALIDATION,
                V2020_12_META_DATA,
                V2020_12_FORMAT_ANNOTATION,
                V2020_12_CONTENT,
            ],
        };
        uris.iter().map(|uri| (uri.to_string(), true)).collect()
    }
}

/// The vocabularies active for a subschema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabularies {
    pub draft: Draft,
    /// Vocabulary URI to "required" flag.
    enabled: BTreeMap<String, bool>,
}

impl Vocabularies {
    pub fn contains(&self, vocabulary: &str) -> bool {
        self.enabled.contains_key(vocabulary)
    }

    pub fn contains_any(&self, vocabularies: &[&str]) -> bool {
        vocabularies.iter().any(|vocabulary| self.contains(vocabulary))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, bool)> {
        self.enabled.iter().map(|(uri, required)| (uri.as_str(), *required))
    }

    /// Vocabularies of an official dialect.
    pub fn of_draft(draft: Draft) -> Self {
        Self {
            draft,
            enabled: draft.default_vocabularies(),
        }
    }

    /// Vocabularies of an official metaschema. The 2019-09 and 2020-12
    /// hyper-schema dialects add their hyper-schema vocabulary on top of
    /// the draft defaults.
    pub fn of_metaschema(uri: &str) -> Option<Self> {
        let draft = Draft::from_metaschema(uri)?;
        let mut vocabularies = Self::of_draft(draft);
        let hyper = match uri::canonicalize(uri).as_str() {
            DRAFT2019_09_HYPER => Some(V2019_09_HYPER_SCHEMA),
            DRAFT2020_12_HYPER => Some(V2020_12_HYPER_SCHEMA),
            _ => None,
        };
        if let Some(hyper) = hyper {
            vocabularies.enabled.insert(hyper.to_string(), true);
        }
        Some(vocabularies)
    }

    /// Resolve the vocabularies declared by `dialect`, following custom
    /// metaschemas through `resolver`.
    ///
    /// # Errors
    ///
    /// Fails when a metaschema cannot be resolved or requires a vocabulary
    /// this engine does not know.
    pub fn for_dialect(
        dialect: &str,
        resolver: &dyn SchemaResolver,
    ) -> Result<Self, SchemaVocabularyError> {
        Self::for_dialect_at_depth(dialect, resolver, 0)
    }

    fn for_dialect_at_depth(
        dialect: &str,
        resolver: &dyn SchemaResolver,
        depth: usize,
    ) -> Result<Self, SchemaVocabularyError> {
        if let Some(vocabularies) = Self::of_metaschema(dialect) {
            return Ok(vocabularies);
        }
        if depth > 16 {
            return Err(SchemaVocabularyError {
                uri: dialect.to_string(),
                message: "The metaschema chain is too deep".to_string(),
            });
        }

        let canonical = uri::canonicalize(dialect);
        let metaschema = resolver
            .resolve(&canonical)
            .ok_or_else(|| SchemaVocabularyError {
                uri: canonical.clone(),
                message: "Could not resolve the metaschema of the schema".to_string(),
            })?;
        let parent = metaschema
            .get("$schema")
            .and_then(Json::as_str)
            .ok_or_else(|| SchemaVocabularyError {
                uri: canonical.clone(),
                message: "The metaschema does not declare its own dialect".to_string(),
            })?;
        let base = Self::for_dialect_at_depth(parent, resolver, depth + 1)?;
        trace!(dialect = %canonical, draft = ?base.draft, "resolved custom metaschema");

        let Some(declared) = metaschema.get("$vocabulary").and_then(Json::as_object) else {
            return Ok(base);
        };

        let mut enabled = BTreeMap::new();
        for (vocabulary, required) in declared {
            let vocabulary = uri::canonicalize(vocabulary);
            let required = required.as_bool().unwrap_or(false);
            if KNOWN_VOCABULARIES.contains(&vocabulary.as_str()) {
                enabled.insert(vocabulary, required);
            } else if required {
                return Err(SchemaVocabularyError::unsupported(vocabulary));
            }
        }
        Ok(Self {
            draft: base.draft,
            enabled,
        })
    }
}
