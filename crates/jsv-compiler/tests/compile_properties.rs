//! # Compilation Properties
//!
//! Whole-pipeline checks on the compiler's public surface:
//!
//! 1. **Idempotence**: compiling the same schema twice yields equal
//!    templates, whatever the draft and mode.
//!
//! 2. **Round-trip**: a template survives its JSON form unchanged.
//!
//! 3. **Errors**: each failure class surfaces as its own `CompileError`
//!    variant and names what went wrong.

use jsv_compiler::{compile, CompileOptions, CompilerTweaks, MapResolver, Mode};
use jsv_core::{CompileError, Json, Template};
use proptest::prelude::*;
use serde_json::json;

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

fn compile_as(schema: &Json, mode: Mode) -> Result<Template, CompileError> {
    compile(
        schema,
        &MapResolver::new(),
        &CompileOptions::new(mode).with_default_dialect(DRAFT_2020_12),
    )
}

/// One schema per supported draft, each touching that draft's peculiarities.
fn drafts() -> Vec<Json> {
    vec![
        json!({
            "$schema": "http://json-schema.org/draft-04/schema#",
            "id": "http://example.com/d4",
            "type": "object",
            "properties": {"n": {"type": "integer", "maximum": 3, "exclusiveMaximum": true}},
            "additionalProperties": false,
            "definitions": {"s": {"type": "string"}},
            "patternProperties": {"^s_": {"$ref": "#/definitions/s"}}
        }),
        json!({
            "$schema": "http://json-schema.org/draft-06/schema#",
            "$id": "http://example.com/d6",
            "propertyNames": {"maxLength": 3},
            "contains": {"const": 1},
            "exclusiveMinimum": 0
        }),
        json!({
            "$schema": "http://json-schema.org/draft-07/schema#",
            "if": {"required": ["a"]},
            "then": {"properties": {"a": {"type": "string"}}},
            "else": {"items": [{"type": "integer"}], "additionalItems": false}
        }),
        json!({
            "$schema": "https://json-schema.org/draft/2019-09/schema",
            "$id": "https://example.com/d2019",
            "$recursiveAnchor": true,
            "type": "object",
            "properties": {"child": {"$recursiveRef": "#"}},
            "dependentRequired": {"a": ["b"]},
            "unevaluatedProperties": false
        }),
        json!({
            "$schema": DRAFT_2020_12,
            "$id": "https://example.com/d2020",
            "$dynamicAnchor": "node",
            "prefixItems": [{"type": "string"}],
            "items": {"$dynamicRef": "#node"},
            "minContains": 2,
            "contains": {"type": "number"},
            "unevaluatedItems": false
        }),
    ]
}

// =========================================================================
// Idempotence and round-trip
// =========================================================================

#[test]
fn test_every_draft_compiles_identically_twice() {
    for schema in drafts() {
        for mode in [Mode::FastValidation, Mode::Exhaustive] {
            let first = compile_as(&schema, mode).expect("draft sample should compile");
            let second = compile_as(&schema, mode).expect("draft sample should compile");
            assert_eq!(first, second, "{mode:?} compile of {schema} is not idempotent");
            assert_eq!(first.to_json().unwrap(), second.to_json().unwrap());
        }
    }
}

#[test]
fn test_every_draft_round_trips_through_json() {
    for schema in drafts() {
        for mode in [Mode::FastValidation, Mode::Exhaustive] {
            let template = compile_as(&schema, mode).unwrap();
            let document = template.to_json().unwrap();
            assert_eq!(document["version"], json!(1));
            let restored = Template::from_json(&document).unwrap();
            assert_eq!(restored, template, "{mode:?} template of {schema} changed");
        }
    }
}

#[test]
fn test_template_flags_reflect_the_schema() {
    let fast = compile_as(&json!({"type": "string"}), Mode::FastValidation).unwrap();
    assert!(!fast.track);
    assert!(!fast.dynamic);

    let exhaustive = compile_as(&json!({"type": "string"}), Mode::Exhaustive).unwrap();
    assert!(exhaustive.track);

    let unevaluated = compile_as(
        &json!({"properties": {"a": true}, "unevaluatedProperties": false}),
        Mode::FastValidation,
    )
    .unwrap();
    assert!(unevaluated.track);

    let dynamic = compile_as(&drafts()[4], Mode::FastValidation).unwrap();
    assert!(dynamic.dynamic);
}

#[test]
fn test_tweaks_do_not_change_the_template_shape_for_small_schemas() {
    let schema = json!({"$defs": {"s": {"type": "string"}}, "items": {"$ref": "#/$defs/s"}});
    let default = compile_as(&schema, Mode::FastValidation).unwrap();
    let tweaked = compile(
        &schema,
        &MapResolver::new(),
        &CompileOptions::new(Mode::FastValidation)
            .with_default_dialect(DRAFT_2020_12)
            .with_tweaks(CompilerTweaks {
                precompile_min_references: 1000,
                ..CompilerTweaks::default()
            }),
    )
    .unwrap();
    assert_eq!(default, tweaked);
}

// =========================================================================
// Errors
// =========================================================================

#[test]
fn test_unknown_remote_reference_is_a_reference_error() {
    let error = compile_as(&json!({"$ref": "https://example.com/missing"}), Mode::FastValidation)
        .expect_err("the resolver knows nothing");
    match error {
        CompileError::Reference(error) => {
            assert_eq!(error.identifier, "https://example.com/missing");
        }
        other => panic!("expected a reference error, got {other:?}"),
    }
}

#[test]
fn test_required_unknown_vocabulary_is_a_vocabulary_error() {
    let mut resolver = MapResolver::new();
    resolver.add(json!({
        "$schema": DRAFT_2020_12,
        "$id": "https://example.com/meta",
        "$vocabulary": {
            "https://json-schema.org/draft/2020-12/vocab/core": true,
            "https://example.com/vocab/custom": true
        }
    }));
    let schema = json!({"$schema": "https://example.com/meta", "type": "string"});
    let error = compile(&schema, &resolver, &CompileOptions::new(Mode::FastValidation))
        .expect_err("the custom vocabulary is required");
    match error {
        CompileError::Vocabulary(error) => {
            assert_eq!(error.uri, "https://example.com/vocab/custom");
        }
        other => panic!("expected a vocabulary error, got {other:?}"),
    }
}

#[test]
fn test_optional_unknown_vocabulary_is_ignored() {
    let mut resolver = MapResolver::new();
    resolver.add(json!({
        "$schema": DRAFT_2020_12,
        "$id": "https://example.com/meta",
        "$vocabulary": {
            "https://json-schema.org/draft/2020-12/vocab/core": true,
            "https://json-schema.org/draft/2020-12/vocab/validation": true,
            "https://example.com/vocab/custom": false
        }
    }));
    let schema = json!({"$schema": "https://example.com/meta", "type": "string"});
    let template = compile(&schema, &resolver, &CompileOptions::new(Mode::FastValidation));
    assert!(template.is_ok());
}

#[test]
fn test_invalid_pattern_is_a_compiler_error() {
    let error = compile_as(&json!({"pattern": "("}), Mode::FastValidation)
        .expect_err("the pattern does not parse");
    match error {
        CompileError::Compiler(error) => assert_eq!(error.schema_location, "/pattern"),
        other => panic!("expected a compiler error, got {other:?}"),
    }
}

#[test]
fn test_missing_dialect_without_default_is_rejected() {
    let error = compile(
        &json!({"type": "string"}),
        &MapResolver::new(),
        &CompileOptions::new(Mode::FastValidation),
    )
    .expect_err("no dialect can be determined");
    assert!(matches!(error, CompileError::InvalidSchema(_)));
}

// =========================================================================
// Property tests
// =========================================================================

mod proptests {
    use super::*;

    fn schema_strategy() -> impl Strategy<Value = Json> {
        let leaf = prop_oneof![
            Just(json!(true)),
            Just(json!(false)),
            prop_oneof![
                Just("string"),
                Just("integer"),
                Just("number"),
                Just("object"),
                Just("array"),
                Just("null")
            ]
            .prop_map(|name| json!({"type": name})),
            (0u64..5).prop_map(|n| json!({"minimum": n})),
            (0u64..5).prop_map(|n| json!({"maxLength": n})),
            prop::collection::vec("[a-c]", 1..3).prop_map(|names| json!({"required": names})),
            Just(json!({"const": {"a": [1, 2]}})),
            Just(json!({"enum": [1, "a", null]})),
            Just(json!({"pattern": "^a"})),
        ];
        leaf.prop_recursive(3, 24, 3, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 1..3).prop_map(|all| json!({"allOf": all})),
                prop::collection::vec(inner.clone(), 1..3).prop_map(|any| json!({"anyOf": any})),
                prop::collection::vec(inner.clone(), 1..3).prop_map(|one| json!({"oneOf": one})),
                inner.clone().prop_map(|not| json!({"not": not})),
                inner.clone().prop_map(|items| json!({"items": items})),
                inner.clone().prop_map(|value| json!({"properties": {"a": value}})),
                inner.clone().prop_map(|value| json!({
                    "properties": {"b": value},
                    "unevaluatedProperties": false
                })),
                (inner.clone(), inner).prop_map(|(condition, then)| json!({
                    "if": condition,
                    "then": then
                })),
            ]
        })
    }

    proptest! {
        #[test]
        fn compile_is_idempotent(schema in schema_strategy()) {
            for mode in [Mode::FastValidation, Mode::Exhaustive] {
                let first = compile_as(&schema, mode).unwrap();
                let second = compile_as(&schema, mode).unwrap();
                prop_assert_eq!(first, second);
            }
        }

        #[test]
        fn templates_round_trip(schema in schema_strategy()) {
            for mode in [Mode::FastValidation, Mode::Exhaustive] {
                let template = compile_as(&schema, mode).unwrap();
                let restored = Template::from_json(&template.to_json().unwrap()).unwrap();
                prop_assert_eq!(restored, template);
            }
        }
    }
}
