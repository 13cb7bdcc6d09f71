//! # Binary Tests
//!
//! Run the built `jsv` binary end to end and check its exit statuses:
//! 0 when every instance is valid, 2 when any is invalid, 1 on errors.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

const SCHEMA: &str = r#"{
    "$schema": "https://json-schema.org/draft/2020-12/schema",
    "type": "object",
    "properties": {"a": {"type": "string"}},
    "unevaluatedProperties": false
}"#;

fn jsv(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_jsv"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("the jsv binary should start")
}

fn fixture(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn arg(path: &Path) -> &str {
    path.to_str().unwrap()
}

#[test]
fn test_validate_exit_statuses() {
    let dir = tempfile::tempdir().unwrap();
    let schema = fixture(dir.path(), "schema.json", SCHEMA);
    let good = fixture(dir.path(), "good.json", r#"{"a": "x"}"#);
    let bad = fixture(dir.path(), "bad.yaml", "a: x\nb: 1\n");

    let output = jsv(&["validate", arg(&schema), arg(&good)]);
    assert_eq!(output.status.code(), Some(0));

    let output = jsv(&["validate", arg(&schema), arg(&good), arg(&bad)]);
    assert_eq!(output.status.code(), Some(2));
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("ok: "));
    assert!(stdout.contains("fail: "));
}

#[test]
fn test_compile_then_validate_with_template() {
    let dir = tempfile::tempdir().unwrap();
    let schema = fixture(dir.path(), "schema.json", SCHEMA);
    let output = jsv(&["compile", "--fast", "--minify", arg(&schema)]);
    assert_eq!(output.status.code(), Some(0));
    let template = fixture(
        dir.path(),
        "template.json",
        &String::from_utf8(output.stdout).unwrap(),
    );

    let bad = fixture(dir.path(), "bad.json", r#"{"a": "x", "b": 1}"#);
    let output = jsv(&["validate", "--template", arg(&template), arg(&bad)]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_errors_exit_with_one() {
    let dir = tempfile::tempdir().unwrap();
    let schema = fixture(dir.path(), "schema.json", r#"{"pattern": "("}"#);
    let instance = fixture(dir.path(), "instance.json", "\"x\"");
    let output = jsv(&[
        "validate",
        "--default-dialect",
        "https://json-schema.org/draft/2020-12/schema",
        arg(&schema),
        arg(&instance),
    ]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8(output.stderr)
        .unwrap()
        .contains("Invalid regular expression"));
}

#[test]
fn test_depth_limit_flag_overrides_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let schema = fixture(
        dir.path(),
        "schema.json",
        r##"{
            "$schema": "https://json-schema.org/draft/2020-12/schema",
            "$id": "https://example.com/list",
            "type": "object",
            "properties": {"next": {"$ref": "#"}}
        }"##,
    );
    let deep = fixture(
        dir.path(),
        "deep.json",
        r#"{"next": {"next": {"next": {"next": {"next": {}}}}}}"#,
    );
    let config = fixture(dir.path(), "jsv.yaml", "depth_limit: 2\n");

    let output = jsv(&["--config", arg(&config), "validate", "--fast", arg(&schema), arg(&deep)]);
    assert_eq!(output.status.code(), Some(1));

    let output = jsv(&[
        "--config",
        arg(&config),
        "--depth-limit",
        "300",
        "validate",
        "--fast",
        arg(&schema),
        arg(&deep),
    ]);
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn test_frame_prints_json() {
    let dir = tempfile::tempdir().unwrap();
    let schema = fixture(dir.path(), "schema.json", SCHEMA);
    let output = jsv(&["frame", arg(&schema)]);
    assert_eq!(output.status.code(), Some(0));
    let frame: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(frame.get("locations").is_some());
    assert!(frame.get("references").is_some());
}
