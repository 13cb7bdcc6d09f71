//! # Directory Resolver
//!
//! Indexes every `*.json`/`*.yaml` schema found under the `--resolve` paths
//! by its `$id` (or draft 4 `id`), so cross-file references resolve without
//! network access.

use std::fs;
use std::path::Path;

use anyhow::Context;
use jsv_compiler::{MapResolver, SchemaResolver};
use jsv_core::Json;
use tracing::{debug, warn};

use crate::input::{is_document, read_document};

/// Schemas loaded from disk, keyed by their declared identifier.
#[derive(Debug, Clone, Default)]
pub struct DirectoryResolver {
    schemas: MapResolver,
}

impl DirectoryResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index every path in `paths`, each a directory or a single file.
    ///
    /// # Errors
    ///
    /// Fails when a directory cannot be listed or a schema file cannot be
    /// read or parsed.
    pub fn from_paths<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<Self> {
        let mut resolver = Self::new();
        for path in paths {
            resolver.add_path(path.as_ref())?;
        }
        Ok(resolver)
    }

    /// Index `path`, recursing into directories. Returns how many schemas
    /// were added.
    ///
    /// # Errors
    ///
    /// See [`DirectoryResolver::from_paths`].
    pub fn add_path(&mut self, path: &Path) -> anyhow::Result<usize> {
        if !path.is_dir() {
            return Ok(usize::from(self.add_file(path)?.is_some()));
        }
        let mut entries = fs::read_dir(path)
            .with_context(|| format!("failed to list {}", path.display()))?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to list {}", path.display()))?;
        entries.sort();

        let mut added = 0;
        for entry in entries {
            if entry.is_dir() {
                added += self.add_path(&entry)?;
            } else if is_document(&entry) {
                added += usize::from(self.add_file(&entry)?.is_some());
            }
        }
        debug!(directory = %path.display(), added, "indexed schema directory");
        Ok(added)
    }

    /// Index one schema file. Returns its identifier, or `None` when the
    /// document declares none and therefore cannot be referenced.
    ///
    /// # Errors
    ///
    /// Fails when the file cannot be read or parsed.
    pub fn add_file(&mut self, path: &Path) -> anyhow::Result<Option<String>> {
        let schema = read_document(path)?;
        let identifier = self.add(schema);
        match &identifier {
            Some(identifier) => debug!(file = %path.display(), %identifier, "indexed schema"),
            None => warn!(file = %path.display(), "skipping schema without an identifier"),
        }
        Ok(identifier)
    }

    /// Index an in-memory schema by its own identifier.
    pub fn add(&mut self, schema: Json) -> Option<String> {
        self.schemas.add(schema)
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

impl SchemaResolver for DirectoryResolver {
    fn resolve(&self, uri: &str) -> Option<Json> {
        self.schemas.resolve(uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn indexes_nested_json_and_yaml_by_identifier() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("a.json"),
            r#"{"$id": "https://example.com/a", "type": "string"}"#,
        )
        .unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(
            dir.path().join("nested").join("b.yaml"),
            "id: http://example.com/b\ntype: integer\n",
        )
        .unwrap();
        fs::write(dir.path().join("anonymous.json"), r#"{"type": "null"}"#).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a schema").unwrap();

        let resolver = DirectoryResolver::from_paths(&[dir.path()]).unwrap();
        assert_eq!(resolver.len(), 2);
        assert_eq!(
            resolver.resolve("https://example.com/a"),
            Some(json!({"$id": "https://example.com/a", "type": "string"}))
        );
        assert!(resolver.resolve("http://example.com/b").is_some());
        assert!(resolver.resolve("https://example.com/missing").is_none());
    }

    #[test]
    fn single_files_can_be_indexed_directly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("schema.json");
        fs::write(&path, r#"{"$id": "https://example.com/s#"}"#).unwrap();
        let resolver = DirectoryResolver::from_paths(&[&path]).unwrap();
        assert!(resolver.resolve("https://example.com/s").is_some());
    }

    #[test]
    fn unreadable_schema_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();
        assert!(DirectoryResolver::from_paths(&[dir.path()]).is_err());
    }
}
