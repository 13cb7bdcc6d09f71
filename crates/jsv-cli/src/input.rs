//! # Document Loading
//!
//! Schemas, templates and instances may be written as JSON or YAML. The
//! format is chosen by file extension; anything that is not `.yaml`/`.yml`
//! is read as JSON. A `.jsonl` file holds one instance per line.

use std::fs;
use std::path::Path;

use anyhow::Context;
use jsv_core::Json;

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|extension| extension.to_str())
}

/// Whether `path` names a YAML document.
pub fn is_yaml(path: &Path) -> bool {
    matches!(extension(path), Some("yaml" | "yml"))
}

/// Whether `path` names a document this tool knows how to read.
pub fn is_document(path: &Path) -> bool {
    matches!(extension(path), Some("json" | "yaml" | "yml"))
}

/// Parse `content` as the format `path` implies.
pub fn parse_document(path: &Path, content: &str) -> anyhow::Result<Json> {
    if is_yaml(path) {
        serde_yaml::from_str(content)
            .with_context(|| format!("invalid YAML in {}", path.display()))
    } else {
        serde_json::from_str(content)
            .with_context(|| format!("invalid JSON in {}", path.display()))
    }
}

/// Read and parse one document.
pub fn read_document(path: &Path) -> anyhow::Result<Json> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_document(path, &content)
}

/// Read every instance stored in `path`: a single document, or one per
/// non-blank line for `.jsonl`.
pub fn read_instances(path: &Path) -> anyhow::Result<Vec<Json>> {
    if extension(path) != Some("jsonl") {
        return Ok(vec![read_document(path)?]);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid JSON on line {} of {}", index + 1, path.display()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn yaml_and_json_parse_to_the_same_value() {
        let from_yaml = parse_document(Path::new("a.yaml"), "type: object\nrequired: [a]\n").unwrap();
        let from_json =
            parse_document(Path::new("a.json"), r#"{"type": "object", "required": ["a"]}"#).unwrap();
        assert_eq!(from_yaml, from_json);
        assert_eq!(from_yaml, json!({"type": "object", "required": ["a"]}));
    }

    #[test]
    fn parse_errors_name_the_file() {
        let error = parse_document(Path::new("broken.json"), "{").unwrap_err();
        assert!(error.to_string().contains("broken.json"));
    }

    #[test]
    fn jsonl_yields_one_instance_per_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.jsonl");
        fs::write(&path, "1\n\n\"two\"\n{\"three\": 3}\n").unwrap();
        let instances = read_instances(&path).unwrap();
        assert_eq!(instances, vec![json!(1), json!("two"), json!({"three": 3})]);
    }

    #[test]
    fn only_known_extensions_are_documents() {
        assert!(is_document(Path::new("schema.json")));
        assert!(is_document(Path::new("schema.yml")));
        assert!(!is_document(Path::new("notes.txt")));
        assert!(!is_document(Path::new("README")));
    }
}
