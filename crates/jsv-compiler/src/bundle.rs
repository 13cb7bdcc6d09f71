//! Bundling: inline every externally referenced schema into the root
//! document so the rest of the pipeline never touches the resolver again
//! (except for custom metaschemas).

use std::collections::BTreeMap;

use jsv_core::{CompileError, Json, SchemaReferenceError};
use serde_json::Map;
use tracing::debug;

use crate::frame::{Frame, ReferenceType};
use crate::resolver::SchemaResolver;
use crate::uri;
use crate::vocabulary::Vocabularies;
use crate::walker::Walker;

/// Embed every schema reachable through static references under the root's
/// `$defs` (2019-09 and later) or `definitions` (earlier drafts), keyed by
/// its URI. Repeats until a pass embeds nothing.
///
/// # Errors
///
/// Fails with a [`SchemaReferenceError`] when the resolver does not know a
/// referenced URI, and with whatever framing raises.
pub fn bundle(
    schema: &Json,
    walker: Walker,
    resolver: &dyn SchemaResolver,
    default_dialect: Option<&str>,
    default_id: Option<&str>,
) -> Result<Json, CompileError> {
    let mut result = schema.clone();
    loop {
        let frame = Frame::build(&result, walker, resolver, default_dialect, default_id)?;

        // External base URI to the first keyword that references it.
        let mut missing = BTreeMap::new();
        for ((kind, pointer), reference) in frame.references() {
            if *kind != ReferenceType::Static
                || reference.base.is_empty()
                || frame.traverse(&reference.base).is_some()
            {
                continue;
            }
            missing
                .entry(reference.base.clone())
                .or_insert_with(|| pointer.to_string());
        }
        if missing.is_empty() {
            return Ok(result);
        }

        let root_dialect = root_dialect(&result, default_dialect);
        let container = Vocabularies::for_dialect(&root_dialect, resolver)?
            .draft
            .definitions_keyword();

        for (identifier, pointer) in missing {
            let remote = resolver.resolve(&identifier).ok_or_else(|| SchemaReferenceError {
                identifier: identifier.clone(),
                pointer: pointer.clone(),
                message: "Could not resolve the reference to an external schema".to_string(),
            })?;
            let remote = identify(remote, &identifier, &root_dialect, resolver)?;
            embed(&mut result, container, &identifier, remote);
            debug!(%identifier, %pointer, "embedded external schema");
        }
    }
}

fn root_dialect(schema: &Json, default_dialect: Option<&str>) -> String {
    schema
        .get("$schema")
        .and_then(Json::as_str)
        .or(default_dialect)
        .map(uri::canonicalize)
        .unwrap_or_default()
}

/// Give the remote schema an identifier equal to the URI it was fetched by,
/// so the next framing pass finds it there.
fn identify(
    remote: Json,
    identifier: &str,
    parent_dialect: &str,
    resolver: &dyn SchemaResolver,
) -> Result<Json, CompileError> {
    let mut object = match remote {
        Json::Object(object) => object,
        Json::Bool(true) => Map::new(),
        Json::Bool(false) => {
            let mut object = Map::new();
            object.insert("not".to_string(), Json::Object(Map::new()));
            object
        }
        _ => {
            return Err(CompileError::InvalidSchema(format!(
                "The external schema is neither an object nor a boolean: {identifier}"
            )))
        }
    };
    let dialect = object
        .get("$schema")
        .and_then(Json::as_str)
        .map(uri::canonicalize)
        .unwrap_or_else(|| parent_dialect.to_string());
    let draft = Vocabularies::for_dialect(&dialect, resolver)?.draft;
    object.insert(
        draft.id_keyword().to_string(),
        Json::String(identifier.to_string()),
    );
    if !object.contains_key("$schema") && !dialect.is_empty() {
        object.insert("$schema".to_string(), Json::String(dialect));
    }
    Ok(Json::Object(object))
}

fn embed(root: &mut Json, container: &str, identifier: &str, remote: Json) {
    if let Json::Bool(value) = root {
        // A boolean root has no references; this only guards the shape.
        let mut object = Map::new();
        if !*value {
            object.insert("not".to_string(), Json::Object(Map::new()));
        }
        *root = Json::Object(object);
    }
    if let Json::Object(object) = root {
        let definitions = object
            .entry(container.to_string())
            .or_insert_with(|| Json::Object(Map::new()));
        if let Json::Object(definitions) = definitions {
            definitions.insert(identifier.to_string(), remote);
        }
    }
}
