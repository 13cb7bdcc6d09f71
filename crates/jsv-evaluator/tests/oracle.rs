//! # Differential Tests Against `jsonschema`
//!
//! Random instances are evaluated against a fixed corpus of 2020-12 schemas
//! with every compilation mode and evaluation profile, and the verdicts are
//! compared with the `jsonschema` crate.
//!
//! The corpus avoids `format` (annotation-only under 2020-12 in both
//! engines, but a source of needless disagreement) and remote references.

use jsv_compiler::{compile, CompileOptions, MapResolver, Mode};
use jsv_core::{Json, Template};
use jsv_evaluator::{EvaluationMode, Evaluator};
use proptest::prelude::*;
use serde_json::json;

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

fn corpus() -> Vec<Json> {
    vec![
        json!({"type": "integer", "minimum": 0}),
        json!({"type": ["string", "null"], "maxLength": 3}),
        json!({
            "type": "object",
            "required": ["a"],
            "properties": {"a": {"type": "string"}, "b": {"type": "array"}},
            "additionalProperties": {"type": "boolean"}
        }),
        json!({
            "type": "object",
            "properties": {"a": {"type": "string"}},
            "unevaluatedProperties": false
        }),
        json!({
            "anyOf": [
                {"properties": {"a": {"type": "integer"}}},
                {"properties": {"b": {"type": "string"}}}
            ],
            "unevaluatedProperties": {"type": "null"}
        }),
        json!({
            "prefixItems": [{"type": "integer"}, {"type": "string"}],
            "items": {"type": "boolean"}
        }),
        json!({
            "contains": {"type": "integer"},
            "minContains": 1,
            "maxContains": 2,
            "unevaluatedItems": {"type": "string"}
        }),
        json!({"uniqueItems": true, "maxItems": 3}),
        json!({
            "if": {"type": "object", "required": ["a"]},
            "then": {"properties": {"a": {"const": true}}},
            "else": {"not": {"type": "object"}}
        }),
        json!({
            "oneOf": [{"type": "number", "multipleOf": 2}, {"type": "integer", "maximum": 5}]
        }),
        json!({
            "propertyNames": {"maxLength": 1},
            "minProperties": 1,
            "patternProperties": {"^[a-c]$": {"type": "integer"}}
        }),
        json!({
            "dependentRequired": {"a": ["b"]},
            "dependentSchemas": {"b": {"required": ["c"]}}
        }),
        json!({
            "$id": "https://example.com/tree",
            "$ref": "#/$defs/tree",
            "$defs": {
                "tree": {
                    "anyOf": [
                        {"type": "integer"},
                        {"type": "array", "items": {"$ref": "#/$defs/tree"}}
                    ]
                }
            }
        }),
        json!({"enum": [null, 1, "a", [1], {"a": 1}]}),
    ]
}

fn compile_as(schema: &Json, mode: Mode) -> Template {
    compile(
        schema,
        &MapResolver::new(),
        &CompileOptions::new(mode).with_default_dialect(DRAFT_2020_12),
    )
    .expect("corpus schema should compile")
}

fn oracle(schema: &Json) -> jsonschema::Validator {
    let mut options = jsonschema::options();
    options.with_draft(jsonschema::Draft::Draft202012);
    options.build(schema).expect("corpus schema should be accepted by the oracle")
}

fn instance_strategy() -> impl Strategy<Value = Json> {
    let leaf = prop_oneof![
        Just(Json::Null),
        any::<bool>().prop_map(Json::Bool),
        (-8i64..8).prop_map(Json::from),
        prop_oneof![Just(2.5f64), Just(-0.5), Just(4.0)].prop_map(Json::from),
        "[a-d]{0,4}".prop_map(Json::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Json::Array),
            prop::collection::btree_map("[a-d]{1,2}", inner, 0..4)
                .prop_map(|map| Json::Object(map.into_iter().collect())),
        ]
    })
}

/// Whitelisted names. The long ones share their coarse fingerprint with
/// impostors of the same length and end bytes.
fn whitelist() -> Vec<String> {
    vec![
        "a".to_string(),
        "ab".to_string(),
        format!("p{}q", "a".repeat(40)),
        format!("p{}q", "a".repeat(39)),
    ]
}

fn name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("a".to_string()),
        Just("ab".to_string()),
        Just("ba".to_string()),
        Just(format!("p{}q", "a".repeat(40))),
        Just(format!("p{}q", "a".repeat(39))),
        Just(format!("p{}q", "b".repeat(40))),
        Just(format!("p{}p", "a".repeat(41))),
        "[a-b]{1,3}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn test_hashed_property_checks_agree_with_string_comparison(
        names in prop::collection::btree_set(name_strategy(), 0..5)
    ) {
        let allowed = whitelist();
        let properties: serde_json::Map<String, Json> = allowed
            .iter()
            .map(|name| (name.clone(), json!(true)))
            .collect();
        let schema = json!({
            "type": "object",
            "required": [allowed[0].clone(), allowed[2].clone()],
            "properties": properties,
            "additionalProperties": false
        });
        let instance = Json::Object(names.iter().map(|name| (name.clone(), json!(0))).collect());
        let expected = names.iter().all(|name| allowed.contains(name))
            && names.contains(&allowed[0])
            && names.contains(&allowed[2]);

        let evaluator = Evaluator::new();
        for mode in [Mode::FastValidation, Mode::Exhaustive] {
            let template = compile_as(&schema, mode);
            for profile in EvaluationMode::ALL {
                let valid = evaluator.evaluate_with_mode(&template, &instance, profile).unwrap();
                prop_assert_eq!(valid, expected, "{:?}/{:?} on {}", mode, profile, instance);
            }
        }
    }

    #[test]
    fn test_profiles_agree_with_each_other_and_with_the_oracle(instance in instance_strategy()) {
        let evaluator = Evaluator::new();
        for schema in corpus() {
            let expected = oracle(&schema).is_valid(&instance);
            for mode in [Mode::FastValidation, Mode::Exhaustive] {
                let template = compile_as(&schema, mode);
                for profile in EvaluationMode::ALL {
                    let valid = evaluator
                        .evaluate_with_mode(&template, &instance, profile)
                        .expect("corpus schemas never recurse without consuming input");
                    prop_assert_eq!(
                        valid, expected,
                        "{:?}/{:?} on {} against {}", mode, profile, instance, schema
                    );
                }
            }
        }
    }

    #[test]
    fn test_round_tripped_templates_evaluate_identically(instance in instance_strategy()) {
        let evaluator = Evaluator::new();
        for schema in corpus() {
            let template = compile_as(&schema, Mode::Exhaustive);
            let restored = Template::from_json(&template.to_json().unwrap()).unwrap();
            prop_assert_eq!(
                evaluator.evaluate(&template, &instance).unwrap(),
                evaluator.evaluate(&restored, &instance).unwrap()
            );
        }
    }
}
