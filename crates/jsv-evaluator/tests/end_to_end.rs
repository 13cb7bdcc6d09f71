//! # End-to-End Validation Tests
//!
//! Compile real schemas with `jsv-compiler` and evaluate them here. Every
//! verdict is checked under both compilation modes and all four evaluation
//! profiles, so a profile that skipped bookkeeping a template needs would
//! surface as a disagreement.

use jsv_compiler::{compile, CompileOptions, MapResolver, Mode};
use jsv_core::{Instruction, Json, Operation, Template};
use jsv_evaluator::{
    standard, EvaluationMode, Evaluator, SimpleOutput, StandardOutput, TraceEntryKind, TraceOutput,
};
use serde_json::json;

const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

fn compile_as(schema: &Json, mode: Mode) -> Template {
    compile(
        schema,
        &MapResolver::new(),
        &CompileOptions::new(mode).with_default_dialect(DRAFT_2020_12),
    )
    .expect("schema should compile")
}

/// Evaluate `instance` every way there is and insist on one answer.
fn verdict(schema: &Json, instance: &Json) -> bool {
    let evaluator = Evaluator::new();
    let mut verdicts = Vec::new();
    for mode in [Mode::FastValidation, Mode::Exhaustive] {
        let template = compile_as(schema, mode);
        for profile in EvaluationMode::ALL {
            let valid = evaluator
                .evaluate_with_mode(&template, instance, profile)
                .expect("evaluation should not fault");
            verdicts.push((mode, profile, valid));
        }
        let valid = evaluator
            .evaluate_with_callback(&template, instance, &mut |_| {})
            .expect("evaluation should not fault");
        verdicts.push((mode, EvaluationMode::Complete, valid));
    }
    let first = verdicts[0].2;
    for (mode, profile, valid) in &verdicts {
        assert_eq!(
            *valid, first,
            "{mode:?}/{profile:?} disagrees on {instance} against {schema}"
        );
    }
    first
}

fn simple_output(schema: &Json, instance: &Json) -> (bool, Vec<jsv_evaluator::SimpleError>) {
    let template = compile_as(schema, Mode::Exhaustive);
    let mut output = SimpleOutput::new(instance);
    let valid = Evaluator::new()
        .evaluate_with_callback(&template, instance, &mut |event| output.record(event))
        .expect("evaluation should not fault");
    (valid, output.errors().to_vec())
}

// =========================================================================
// Basic assertions
// =========================================================================

#[test]
fn test_integer_minimum() {
    let schema = json!({"type": "integer", "minimum": 0});
    assert!(verdict(&schema, &json!(5)));
    assert!(verdict(&schema, &json!(0)));
    assert!(!verdict(&schema, &json!(-1)));
    assert!(!verdict(&schema, &json!(2.5)));
    assert!(!verdict(&schema, &json!("5")));
}

#[test]
fn test_integer_minimum_failure_is_reported_at_the_root() {
    let schema = json!({"type": "integer", "minimum": 0});
    let template = compile_as(&schema, Mode::Exhaustive);
    let instance = json!(-1);
    let mut trace = TraceOutput::new();
    let valid = Evaluator::new()
        .evaluate_with_callback(&template, &instance, &mut |event| trace.record(event))
        .unwrap();
    assert!(!valid);

    let failure = trace
        .entries()
        .iter()
        .find(|entry| entry.kind == TraceEntryKind::Fail)
        .expect("one instruction should fail");
    assert_eq!(failure.name, "assertion-greater-equal");
    assert_eq!(failure.instance_location.to_string(), "");
    assert_eq!(failure.evaluate_path.to_string(), "/minimum");

    let (valid, errors) = simple_output(&schema, &instance);
    assert!(!valid);
    assert_eq!(errors.len(), 1);
    assert_eq!(
        errors[0].message,
        "The integer value -1 was expected to be greater than or equal to the integer 0"
    );
    assert_eq!(errors[0].instance_location.to_string(), "");
}

#[test]
fn test_standard_output_formats() {
    let schema = json!({
        "$id": "https://example.com/thing",
        "title": "Thing",
        "type": "integer",
        "minimum": 0
    });
    let template = compile_as(&schema, Mode::Exhaustive);
    let evaluator = Evaluator::new();
    let render = |instance: Json, format| standard(&evaluator, &template, &instance, format).unwrap();

    assert_eq!(render(json!(-1), StandardOutput::Flag), json!({"valid": false}));
    assert_eq!(render(json!(5), StandardOutput::Flag), json!({"valid": true}));

    assert_eq!(
        render(json!(-1), StandardOutput::Basic),
        json!({
            "valid": false,
            "errors": [{
                "keywordLocation": "/minimum",
                "absoluteKeywordLocation": "https://example.com/thing#/minimum",
                "instanceLocation": "",
                "error": "The integer value -1 was expected to be greater than or equal to the integer 0"
            }]
        })
    );
    assert_eq!(
        render(json!(5), StandardOutput::Basic),
        json!({
            "valid": true,
            "annotations": [{
                "keywordLocation": "/title",
                "absoluteKeywordLocation": "https://example.com/thing#/title",
                "instanceLocation": "",
                "annotation": ["Thing"]
            }]
        })
    );
}

#[test]
fn test_basic_output_omits_empty_annotations() {
    let template = compile_as(&json!({"type": "integer"}), Mode::FastValidation);
    let output = standard(&Evaluator::new(), &template, &json!(1), StandardOutput::Basic).unwrap();
    assert_eq!(output, json!({"valid": true}));
}

#[test]
fn test_boolean_schemas() {
    assert!(verdict(&json!(true), &json!({"anything": [1, 2]})));
    assert!(!verdict(&json!(false), &json!(null)));
    assert!(verdict(&json!({}), &json!("x")));
}

#[test]
fn test_required_and_properties() {
    let schema = json!({
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": {"type": "string", "minLength": 1},
            "tags": {"type": "array", "items": {"type": "string"}, "uniqueItems": true}
        },
        "additionalProperties": false
    });
    assert!(verdict(&schema, &json!({"name": "a"})));
    assert!(verdict(&schema, &json!({"name": "a", "tags": ["x", "y"]})));
    assert!(!verdict(&schema, &json!({"tags": []})));
    assert!(!verdict(&schema, &json!({"name": ""})));
    assert!(!verdict(&schema, &json!({"name": "a", "tags": ["x", "x"]})));
    assert!(!verdict(&schema, &json!({"name": "a", "extra": 1})));
    assert!(!verdict(&schema, &json!(["name"])));
}

#[test]
fn test_string_lengths_count_code_points() {
    let schema = json!({"type": "string", "maxLength": 2});
    assert!(verdict(&schema, &json!("éé")));
    assert!(!verdict(&schema, &json!("abc")));
}

#[test]
fn test_numbers_compare_across_representations() {
    let schema = json!({"const": 1});
    assert!(verdict(&schema, &json!(1)));
    assert!(verdict(&schema, &json!(1.0)));
    assert!(!verdict(&schema, &json!(true)));
    assert!(verdict(&json!({"multipleOf": 0.5}), &json!(2.5)));
    assert!(!verdict(&json!({"multipleOf": 0.5}), &json!(2.25)));
}

#[test]
fn test_patterns_follow_ecma_regex_semantics() {
    let schema = json!({"type": "string", "pattern": "^(?!internal-).+$"});
    assert!(verdict(&schema, &json!("public-api")));
    assert!(!verdict(&schema, &json!("internal-api")));

    let digits = json!({"patternProperties": {"^\\d+$": {"type": "integer"}}});
    assert!(!verdict(&digits, &json!({"12": "x"})));
    assert!(verdict(&digits, &json!({"\u{663}": "x"})));
    assert!(!verdict(&json!({"pattern": "^\\d$"}), &json!("\u{663}")));
}

#[test]
fn test_applicators() {
    let schema = json!({
        "anyOf": [{"type": "string"}, {"type": "integer"}],
        "not": {"const": 3}
    });
    assert!(verdict(&schema, &json!("x")));
    assert!(verdict(&schema, &json!(4)));
    assert!(!verdict(&schema, &json!(3)));
    assert!(!verdict(&schema, &json!(null)));

    let one_of = json!({"oneOf": [{"minimum": 2}, {"maximum": 5}]});
    assert!(verdict(&one_of, &json!(1)));
    assert!(verdict(&one_of, &json!(7)));
    assert!(!verdict(&one_of, &json!(3)));
}

#[test]
fn test_conditionals() {
    let schema = json!({
        "if": {"properties": {"kind": {"const": "a"}}},
        "then": {"required": ["alpha"]},
        "else": {"required": ["beta"]}
    });
    assert!(verdict(&schema, &json!({"kind": "a", "alpha": 1})));
    assert!(!verdict(&schema, &json!({"kind": "a", "beta": 1})));
    assert!(verdict(&schema, &json!({"kind": "b", "beta": 1})));
    assert!(!verdict(&schema, &json!({"kind": "b"})));
}

#[test]
fn test_draft4_exclusive_bounds() {
    let schema = json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "maximum": 10,
        "exclusiveMaximum": true
    });
    assert!(verdict(&schema, &json!(9)));
    assert!(!verdict(&schema, &json!(10)));
}

// =========================================================================
// References
// =========================================================================

#[test]
fn test_recursive_reference_terminates() {
    let schema = json!({
        "$id": "https://example.com/list",
        "$ref": "#/$defs/node",
        "$defs": {
            "node": {
                "type": "object",
                "required": ["value"],
                "properties": {
                    "value": {"type": "integer"},
                    "next": {"$ref": "#/$defs/node"}
                }
            }
        }
    });
    let valid = json!({"value": 1, "next": {"value": 2, "next": {"value": 3}}});
    let invalid = json!({"value": 1, "next": {"value": 2, "next": {"value": "3"}}});
    assert!(verdict(&schema, &valid));
    assert!(!verdict(&schema, &invalid));
    assert!(!verdict(&schema, &json!({"value": 1, "next": {}})));
}

#[test]
fn test_mutually_recursive_references_terminate() {
    let schema = json!({
        "$id": "https://example.com/pair",
        "$ref": "#/$defs/a",
        "$defs": {
            "a": {"type": "object", "properties": {"b": {"$ref": "#/$defs/b"}}},
            "b": {"type": "object", "properties": {"a": {"$ref": "#/$defs/a"}}}
        }
    });
    assert!(verdict(&schema, &json!({"b": {"a": {"b": {}}}})));
    assert!(!verdict(&schema, &json!({"b": {"a": {"b": 1}}})));
}

#[test]
fn test_remote_reference_through_resolver() {
    let mut resolver = MapResolver::new();
    resolver.add(json!({
        "$schema": DRAFT_2020_12,
        "$id": "https://example.com/positive",
        "type": "integer",
        "exclusiveMinimum": 0
    }));
    let schema = json!({"items": {"$ref": "https://example.com/positive"}});
    let template = compile(
        &schema,
        &resolver,
        &CompileOptions::new(Mode::FastValidation).with_default_dialect(DRAFT_2020_12),
    )
    .unwrap();
    let evaluator = Evaluator::new();
    assert!(evaluator.evaluate(&template, &json!([1, 2])).unwrap());
    assert!(!evaluator.evaluate(&template, &json!([1, 0])).unwrap());
}

#[test]
fn test_dynamic_anchor_binds_late() {
    let schema = json!({
        "$id": "https://example.com/root",
        "$ref": "list",
        "$defs": {
            "foo": {"$dynamicAnchor": "items", "type": "string"},
            "list": {
                "$id": "list",
                "type": "array",
                "items": {"$dynamicRef": "#items"},
                "$defs": {
                    "items": {"$dynamicAnchor": "items"}
                }
            }
        }
    });
    assert!(compile_as(&schema, Mode::FastValidation).dynamic);
    assert!(verdict(&schema, &json!(["foo", "bar"])));
    assert!(!verdict(&schema, &json!(["foo", 42])));

    // Without the outer resource the list's own anchor is the only one.
    let list = json!({
        "$id": "https://example.com/list",
        "type": "array",
        "items": {"$dynamicRef": "#items"},
        "$defs": {"items": {"$dynamicAnchor": "items"}}
    });
    assert!(verdict(&list, &json!(["foo", 42])));
}

fn clear_dynamic_flags(instructions: &mut [Instruction]) {
    for instruction in instructions {
        instruction.dynamic = false;
        clear_dynamic_flags(&mut instruction.children);
    }
}

#[test]
fn test_dynamic_scope_follows_the_template_not_the_instructions() {
    let schema = json!({
        "$id": "https://example.com/root",
        "$ref": "list",
        "$defs": {
            "foo": {"$dynamicAnchor": "items", "type": "string"},
            "list": {
                "$id": "list",
                "type": "array",
                "items": {"$dynamicRef": "#items"},
                "$defs": {"items": {"$dynamicAnchor": "items"}}
            }
        }
    });
    let mut template = compile_as(&schema, Mode::Exhaustive);
    clear_dynamic_flags(&mut template.instructions);
    let evaluator = Evaluator::new();
    for profile in EvaluationMode::ALL {
        assert!(!evaluator
            .evaluate_with_mode(&template, &json!(["foo", 42]), profile)
            .unwrap());
        assert!(evaluator
            .evaluate_with_mode(&template, &json!(["foo", "bar"]), profile)
            .unwrap());
    }
}

// =========================================================================
// Unevaluated keywords
// =========================================================================

#[test]
fn test_unevaluated_properties_sees_sibling_properties() {
    let schema = json!({
        "type": "object",
        "properties": {"a": {"type": "string"}},
        "unevaluatedProperties": false
    });
    assert!(verdict(&schema, &json!({"a": "x"})));
    assert!(!verdict(&schema, &json!({"a": "x", "b": 1})));

    let (valid, errors) = simple_output(&schema, &json!({"a": "x", "b": 1}));
    assert!(!valid);
    assert!(errors
        .iter()
        .any(|error| error.instance_location.to_string() == "/b"));
}

#[test]
fn test_unevaluated_properties_through_applicators() {
    let schema = json!({
        "allOf": [{"properties": {"a": true}}],
        "anyOf": [
            {"properties": {"b": {"type": "integer"}}, "required": ["b"]},
            {"properties": {"c": true}, "required": ["c"]}
        ],
        "unevaluatedProperties": false
    });
    assert!(verdict(&schema, &json!({"a": 1, "b": 2})));
    assert!(verdict(&schema, &json!({"a": 1, "c": 2})));
    // The failed branch must not count as having evaluated "b".
    assert!(!verdict(&schema, &json!({"b": "x", "c": 2})));
    assert!(!verdict(&schema, &json!({"a": 1, "c": 2, "d": 3})));
}

#[test]
fn test_unevaluated_properties_ignores_failed_not() {
    let schema = json!({
        "not": {"not": {"properties": {"a": true}}},
        "unevaluatedProperties": false
    });
    assert!(!verdict(&schema, &json!({"a": 1})));
    assert!(verdict(&schema, &json!({})));
}

#[test]
fn test_unevaluated_properties_in_nested_subschema_cannot_see_parent() {
    let schema = json!({
        "properties": {"a": true},
        "allOf": [{"unevaluatedProperties": false}]
    });
    assert!(!verdict(&schema, &json!({"a": 1})));
    assert!(verdict(&schema, &json!({})));
}

#[test]
fn test_unevaluated_properties_across_many_items() {
    let schema = json!({
        "type": "array",
        "items": {
            "properties": {"id": {"type": "integer"}},
            "unevaluatedProperties": false
        }
    });
    let mut items: Vec<Json> = (0..4000).map(|id| json!({"id": id})).collect();
    assert!(verdict(&schema, &Json::Array(items.clone())));
    items[3999] = json!({"id": 3999, "extra": true});
    assert!(!verdict(&schema, &Json::Array(items)));
}

#[test]
fn test_unevaluated_items_after_prefix() {
    let schema = json!({
        "prefixItems": [{"type": "string"}],
        "unevaluatedItems": false
    });
    assert!(verdict(&schema, &json!(["a"])));
    assert!(!verdict(&schema, &json!(["a", "b"])));

    let with_contains = json!({
        "contains": {"type": "integer"},
        "unevaluatedItems": {"type": "string"}
    });
    assert!(verdict(&with_contains, &json!([1, "a", 2])));
    assert!(!verdict(&with_contains, &json!([1, true])));
}

// =========================================================================
// Property hashing
// =========================================================================

#[test]
fn test_long_property_names_with_colliding_fingerprints() {
    // Same length, first byte and last byte: identical coarse fingerprints.
    let one = format!("p{}q", "a".repeat(40));
    let two = format!("p{}q", "b".repeat(40));
    // Different length, compensated by the last byte.
    let three = format!("p{}p", "a".repeat(41));

    let schema = json!({
        "required": [one.clone()],
        "properties": {one.clone(): {"type": "integer"}},
        "additionalProperties": false
    });
    let mut instance = serde_json::Map::new();
    instance.insert(one.clone(), json!(1));
    assert!(verdict(&schema, &Json::Object(instance)));

    for impostor in [&two, &three] {
        let mut instance = serde_json::Map::new();
        instance.insert(impostor.clone(), json!(1));
        assert!(!verdict(&schema, &Json::Object(instance)), "{impostor}");
    }
}

#[test]
fn test_short_property_names_that_differ_in_one_byte() {
    let schema = json!({
        "type": "object",
        "required": ["ab", "abc"],
        "properties": {"ab": {"type": "integer"}, "abc": {"type": "string"}},
        "additionalProperties": false
    });
    assert!(verdict(&schema, &json!({"ab": 1, "abc": "x"})));
    assert!(!verdict(&schema, &json!({"ab": 1, "abd": "x"})));
    assert!(!verdict(&schema, &json!({"ab": "1", "abc": "x"})));
    assert!(!verdict(&schema, &json!({"ab": 1, "abc": 2})));
}

// =========================================================================
// Contains bounds
// =========================================================================

#[test]
fn test_impossible_contains_bounds_reject_every_instance() {
    let schema = json!({"contains": {"type": "string"}, "minContains": 2, "maxContains": 1});
    let template = compile_as(&schema, Mode::FastValidation);
    assert!(template.contains(|operation| *operation == Operation::AssertionFail));
    assert!(!verdict(&schema, &json!(["a", "b"])));
    assert!(!verdict(&schema, &json!([])));
    assert!(!verdict(&schema, &json!("not an array")));
}

#[test]
fn test_contains_bounds() {
    let schema = json!({"contains": {"type": "string"}, "minContains": 2, "maxContains": 3});
    assert!(!verdict(&schema, &json!(["a", 1])));
    assert!(verdict(&schema, &json!(["a", "b", 1])));
    assert!(!verdict(&schema, &json!(["a", "b", "c", "d"])));
}

// =========================================================================
// Faults
// =========================================================================

#[test]
fn test_depth_limit_is_reported_as_an_error() {
    let schema = json!({
        "$id": "https://example.com/loop",
        "$ref": "#/$defs/loop",
        "$defs": {"loop": {"$ref": "#/$defs/loop"}}
    });
    let Ok(template) = compile(
        &schema,
        &MapResolver::new(),
        &CompileOptions::new(Mode::FastValidation).with_default_dialect(DRAFT_2020_12),
    ) else {
        // Rejecting the cycle at compile time is also acceptable.
        return;
    };
    let error = Evaluator::new()
        .evaluate(&template, &json!(1))
        .expect_err("a reference cycle that never consumes the instance must not validate");
    assert_eq!(
        error.message,
        "The evaluation path depth limit was reached likely due to infinite recursion"
    );
}

#[test]
fn test_template_survives_its_json_form() {
    let schema = json!({
        "properties": {"a": {"type": "string"}},
        "patternProperties": {"^x-": true},
        "unevaluatedProperties": false
    });
    let template = compile_as(&schema, Mode::FastValidation);
    let restored = Template::from_json(&template.to_json().unwrap()).unwrap();
    let evaluator = Evaluator::new();
    for instance in [json!({"a": "x"}), json!({"x-y": 1}), json!({"b": 1})] {
        assert_eq!(
            evaluator.evaluate(&template, &instance).unwrap(),
            evaluator.evaluate(&restored, &instance).unwrap()
        );
    }
}
