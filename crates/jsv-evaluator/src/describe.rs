//! # Describe — Human-Readable Instruction Outcomes
//!
//! Turns one evaluated instruction into an English sentence, for error
//! reports and traces. Instructions are shared between keywords (the same
//! `AssertionFail` serves `false`, `contains` and `additionalProperties`),
//! so the message also depends on the keyword the evaluate path ends in.
//!
//! Messages name JSON types the way JSON Schema does: a real number is a
//! `number`.

use std::collections::BTreeSet;

use jsv_core::json::{json_equal, json_type};
use jsv_core::{Instruction, Json, JsonType, Operation, Pointer, Range, StringSet, Token};

/// Describe the outcome of `instruction`, evaluated against `target` (the
/// value at `instance_location`).
pub fn describe(
    valid: bool,
    instruction: &Instruction,
    evaluate_path: &Pointer,
    instance_location: &Pointer,
    target: &Json,
    annotation: Option<&Json>,
) -> String {
    let keyword = evaluate_path
        .last()
        .map(|token| token.as_text().into_owned())
        .unwrap_or_default();
    let facts = Facts {
        valid,
        keyword: keyword.as_str(),
        evaluate_path,
        instance_location,
        target,
        annotation,
    };
    facts.describe(instruction)
}

struct Facts<'a> {
    valid: bool,
    keyword: &'a str,
    evaluate_path: &'a Pointer,
    instance_location: &'a Pointer,
    target: &'a Json,
    annotation: Option<&'a Json>,
}

impl Facts<'_> {
    fn target_type(&self) -> &'static str {
        json_type(self.target).schema_name()
    }

    fn within(&self, keyword: &str) -> bool {
        self.evaluate_path
            .tokens()
            .iter()
            .any(|token| matches!(token, Token::Property(name) if name == keyword))
    }

    fn describe(&self, instruction: &Instruction) -> String {
        let children = &instruction.children;
        match &instruction.operation {
            Operation::AssertionFail => self.fail(),
            Operation::AssertionDefines(property) | Operation::AssertionDefinesStrict(property) => {
                format!(
                    "The object value was expected to define the property {}",
                    quote(&property.name)
                )
            }
            Operation::AssertionDefinesAll(names) | Operation::AssertionDefinesAllStrict(names) => {
                self.defines_all(names)
            }
            Operation::AssertionDefinesExactly(names)
            | Operation::AssertionDefinesExactlyStrict(names)
            | Operation::AssertionDefinesExactlyStrictHash3(names) => format!(
                "The object value was expected to only define properties {}",
                list(names.iter().map(quote), "and")
            ),
            Operation::AssertionPropertyDependencies(dependencies) => {
                self.dependencies(dependencies.iter().map(|(key, value)| (key.as_str(), value)))
            }
            Operation::AssertionType(expected)
            | Operation::AssertionPropertyType(expected)
            | Operation::AssertionPropertyTypeEvaluate(expected) => self.type_check(*expected),
            Operation::AssertionTypeStrict(expected)
            | Operation::AssertionPropertyTypeStrict(expected)
            | Operation::AssertionPropertyTypeStrictEvaluate(expected) => {
                self.strict_type_check(*expected)
            }
            Operation::AssertionTypeAny(types)
            | Operation::AssertionTypeStrictAny(types)
            | Operation::AssertionPropertyTypeStrictAny(types)
            | Operation::AssertionPropertyTypeStrictAnyEvaluate(types) => self.types_check(types),
            Operation::AssertionTypeStringBounded(range) => {
                bounded("a string", range, "character", "characters")
            }
            Operation::AssertionTypeStringUpper(maximum) => {
                upper("a string", *maximum, "character", "characters")
            }
            Operation::AssertionTypeArrayBounded(range) => bounded("an array", range, "item", "items"),
            Operation::AssertionTypeArrayUpper(maximum) => upper("an array", *maximum, "item", "items"),
            Operation::AssertionTypeObjectBounded(range) => {
                bounded("an object", range, "property", "properties")
            }
            Operation::AssertionTypeObjectUpper(maximum) => {
                upper("an object", *maximum, "property", "properties")
            }
            Operation::AssertionRegex(pattern) => format!(
                "The string value {} was expected to match the regular expression {}",
                stringify(self.target),
                quote(pattern.source())
            ),
            Operation::AssertionStringSizeLess(bound) => {
                self.string_size("at most", bound.saturating_sub(1))
            }
            Operation::AssertionStringSizeGreater(bound) => self.string_size("at least", bound + 1),
            Operation::AssertionArraySizeLess(bound) => {
                self.container_size("array", "at most", bound.saturating_sub(1), "item", "items")
            }
            Operation::AssertionArraySizeGreater(bound) => {
                self.container_size("array", "at least", bound + 1, "item", "items")
            }
            Operation::AssertionObjectSizeLess(bound) => self.container_size(
                "object",
                "at most",
                bound.saturating_sub(1),
                "property",
                "properties",
            ),
            Operation::AssertionObjectSizeGreater(bound) => {
                self.container_size("object", "at least", bound + 1, "property", "properties")
            }
            Operation::AssertionEqual(value) => format!(
                "The {} value {} was expected to equal the {} constant {}",
                self.target_type(),
                stringify(self.target),
                json_type(value).schema_name(),
                stringify(value)
            ),
            Operation::AssertionEqualsAny(values) => self.equals_any(values),
            Operation::AssertionEqualsAnyStringHash(names) => {
                let values: Vec<Json> = names.iter().map(Json::from).collect();
                self.equals_any(&values)
            }
            Operation::AssertionGreaterEqual(limit) => self.compare("greater than or equal to", limit, false),
            Operation::AssertionLessEqual(limit) => self.compare("less than or equal to", limit, false),
            Operation::AssertionGreater(limit) => self.compare("greater than", limit, true),
            Operation::AssertionLess(limit) => self.compare("less than", limit, true),
            Operation::AssertionDivisible(divisor) => self.compare("divisible by", divisor, false),
            Operation::AssertionUnique => self.unique(),
            Operation::AssertionStringType(_) => format!(
                "The string value {} was expected to represent a valid URI",
                stringify(self.target)
            ),
            Operation::AssertionArrayPrefix | Operation::AssertionArrayPrefixEvaluate => {
                let prefixes = children.len().saturating_sub(1);
                if prefixes == 1 {
                    "The first item of the array value was expected to validate against the \
                     corresponding subschemas"
                        .to_string()
                } else {
                    format!(
                        "The first {prefixes} items of the array value were expected to validate \
                         against the corresponding subschemas"
                    )
                }
            }

            Operation::AnnotationEmit(value) => self.annotation_emit(self.annotation.unwrap_or(value)),
            Operation::AnnotationToParent(value) => {
                let value = self.annotation.unwrap_or(value);
                if self.keyword == "unevaluatedItems" && *value == Json::Bool(true) {
                    "At least one item of the array value successfully validated against the \
                     subschema for unevaluated items"
                        .to_string()
                } else {
                    self.unrecognized_annotation(value)
                }
            }
            Operation::AnnotationBasenameToParent => self.annotation_basename(),

            Operation::LogicalOr(_) => self.subschemas("at least one of the", children.len()),
            Operation::LogicalXor(_) => self.subschemas("one and only one of the", children.len()),
            Operation::LogicalAnd => self.and(children.len()),
            Operation::LogicalCondition(_) => format!(
                "The {} value was expected to validate against the given conditional",
                self.target_type()
            ),
            Operation::LogicalNot | Operation::LogicalNotEvaluate => {
                let mut message = format!(
                    "The {} value was expected to not validate against the given subschema",
                    self.target_type()
                );
                if !self.valid {
                    message.push_str(", but it did");
                }
                message
            }
            Operation::LogicalWhenType(expected) => match self.keyword {
                "dependencies" | "dependentSchemas" | "dependentRequired" => {
                    "The object value was expected to satisfy the declared property dependencies"
                        .to_string()
                }
                _ => format!(
                    "The {} value was expected to validate against the given subschemas \
                     that apply to {} values",
                    self.target_type(),
                    expected.schema_name()
                ),
            },
            Operation::LogicalWhenDefines(property) => format!(
                "The object value defined the property {}, so it was expected to validate \
                 against the corresponding subschema",
                quote(&property.name)
            ),
            Operation::LogicalWhenArraySizeGreater(size) => {
                let items = self.target.as_array().map_or(0, Vec::len);
                let rest = items.saturating_sub(*size);
                if self.valid && rest > 0 {
                    format!(
                        "The array value contains {rest} additional {} not described by \
                         related keywords",
                        plural(rest, "item", "items")
                    )
                } else {
                    "The array value does not contain additional items not described by \
                     related keywords"
                        .to_string()
                }
            }

            Operation::LoopProperties
            | Operation::LoopPropertiesEvaluate
            | Operation::LoopPropertiesExcept(_) => {
                if is_fail_only(children) {
                    "The object value was not expected to define additional properties".to_string()
                } else {
                    "The object properties not covered by other adjacent object keywords were \
                     expected to validate against this subschema"
                        .to_string()
                }
            }
            Operation::LoopPropertiesWhitelist(_) => {
                "The object value was not expected to define additional properties".to_string()
            }
            Operation::LoopPropertiesUnevaluated | Operation::LoopPropertiesUnevaluatedExcept(_) => {
                if children.first().is_some_and(|child| child.operation == Operation::AssertionFail) {
                    "The object value was not expected to define unevaluated properties".to_string()
                } else {
                    "The object properties not covered by other object keywords were expected \
                     to validate against this subschema"
                        .to_string()
                }
            }
            Operation::LoopPropertiesMatch(_) | Operation::LoopPropertiesMatchClosed(_) => {
                if children.len() == 1 {
                    "The object value was expected to validate against the single defined \
                     property subschema"
                        .to_string()
                } else {
                    format!(
                        "The object value was expected to validate against the {} defined \
                         properties subschemas",
                        children.len()
                    )
                }
            }
            Operation::LoopPropertiesRegex(pattern) | Operation::LoopPropertiesRegexClosed(pattern) => {
                format!(
                    "The object properties that match the regular expression {} were expected \
                     to validate against the defined pattern property subschema",
                    quote(pattern.source())
                )
            }
            Operation::LoopPropertiesStartsWith(prefix) => format!(
                "The object properties that start with the string {} were expected to validate \
                 against the defined pattern property subschema",
                quote(prefix)
            ),
            Operation::LoopPropertiesType(expected)
            | Operation::LoopPropertiesTypeEvaluate(expected)
            | Operation::LoopPropertiesTypeStrict(expected)
            | Operation::LoopPropertiesTypeStrictEvaluate(expected) => format!(
                "The object properties were expected to be of type {}",
                expected.schema_name()
            ),
            Operation::LoopPropertiesTypeStrictAny(types)
            | Operation::LoopPropertiesTypeStrictAnyEvaluate(types) => format!(
                "The object properties were expected to be of type {}",
                list(types.iter().map(JsonType::schema_name), "or")
            ),
            Operation::LoopPropertiesExactlyTypeStrict((expected, names))
            | Operation::LoopPropertiesExactlyTypeStrictHash((expected, names)) => format!(
                "The object value was expected to only define properties {} of type {}",
                list(names.iter().map(quote), "and"),
                expected.schema_name()
            ),
            Operation::LoopKeys => self.keys(),
            Operation::LoopItems => self.items_from(0),
            Operation::LoopItemsFrom(start) => self.items_from(*start),
            Operation::LoopItemsUnevaluated => {
                "The array items not covered by other array keywords, if any, were expected to \
                 validate against this subschema"
                    .to_string()
            }
            Operation::LoopItemsType(expected) | Operation::LoopItemsTypeStrict(expected) => format!(
                "The array items were expected to be of type {}",
                expected.schema_name()
            ),
            Operation::LoopItemsTypeStrictAny(types) => format!(
                "The array items were expected to be of type {}",
                list(types.iter().map(JsonType::schema_name), "or")
            ),
            Operation::LoopItemsPropertiesExactlyTypeStrictHash((expected, names))
            | Operation::LoopItemsPropertiesExactlyTypeStrictHash3((expected, names)) => format!(
                "Every item in the array value was expected to be an object that only defines \
                 properties {} of type {}",
                list(names.iter().map(quote), "and"),
                expected.schema_name()
            ),
            Operation::LoopContains(range) => contains(range),

            Operation::ControlLabel(_) | Operation::ControlJump(_) => self.reference(),
            Operation::ControlMark(_) => "The schema location was marked for future use".to_string(),
            Operation::ControlEvaluate(_) => "The instance location was marked as evaluated".to_string(),
            Operation::ControlDynamicAnchorJump(anchor) => {
                if self.keyword == "$recursiveRef" {
                    format!(
                        "The {} value was expected to validate against the first subschema in \
                         scope that declared a recursive anchor",
                        self.target_type()
                    )
                } else {
                    format!(
                        "The {} value was expected to validate against the first subschema in \
                         scope that declared the dynamic anchor {}",
                        self.target_type(),
                        quote(anchor)
                    )
                }
            }
            Operation::ControlGroup
            | Operation::ControlGroupWhenDefines(_)
            | Operation::ControlGroupWhenDefinesDirect(_)
            | Operation::ControlGroupWhenType(_) => "Group of instructions".to_string(),
        }
    }

    fn fail(&self) -> String {
        match self.keyword {
            "contains" => "The constraints declared for this keyword were not satisfiable".to_string(),
            "additionalProperties" | "unevaluatedProperties" => match self.instance_location.last() {
                Some(token) => format!(
                    "The object value was not expected to define the property {}",
                    quote(&token.as_text())
                ),
                None => "The object value was not expected to define additional properties".to_string(),
            },
            "unevaluatedItems" | "items" | "additionalItems" => match self.instance_location.last() {
                Some(Token::Index(index)) => format!(
                    "The array value was not expected to define the item at index {index}"
                ),
                _ => "The array value was not expected to define additional items".to_string(),
            },
            _ => "No instance is expected to succeed against the false schema".to_string(),
        }
    }

    fn reference(&self) -> String {
        format!(
            "The {} value was expected to validate against the statically referenced schema",
            self.target_type()
        )
    }

    fn subschemas(&self, quantifier: &str, count: usize) -> String {
        if count > 1 {
            format!(
                "The {} value was expected to validate against {quantifier} {count} given subschemas",
                self.target_type()
            )
        } else {
            format!(
                "The {} value was expected to validate against the given subschema",
                self.target_type()
            )
        }
    }

    fn and(&self, count: usize) -> String {
        match self.keyword {
            "$ref" => self.reference(),
            "properties" => {
                if count == 1 {
                    "The object value was expected to validate against the single defined \
                     property subschema"
                        .to_string()
                } else {
                    "The object value was expected to validate against the defined properties \
                     subschemas"
                        .to_string()
                }
            }
            _ if count > 1 => format!(
                "The {} value was expected to validate against the {count} given subschemas",
                self.target_type()
            ),
            _ => format!(
                "The {} value was expected to validate against the given subschema",
                self.target_type()
            ),
        }
    }

    fn type_check(&self, expected: JsonType) -> String {
        self.named_type_check(expected.schema_name())
    }

    fn named_type_check(&self, expected: &str) -> String {
        let mut message = format!("The value was expected to be of type {expected}");
        if !self.valid {
            message.push_str(&format!(" but it was of type {}", self.target_type()));
        }
        message
    }

    fn strict_type_check(&self, expected: JsonType) -> String {
        let actual = json_type(self.target);
        match (self.valid, expected, actual) {
            (false, JsonType::Real, JsonType::Integer) => {
                "The value was expected to be a real number but it was an integer".to_string()
            }
            (false, JsonType::Integer, JsonType::Real) => {
                "The value was expected to be an integer but it was a real number".to_string()
            }
            _ => self.type_check(expected),
        }
    }

    fn types_check(&self, types: &[JsonType]) -> String {
        // `number` compiles to integer-or-real; users wrote one type.
        let mut names: BTreeSet<&'static str> = types.iter().map(JsonType::schema_name).collect();
        if names.contains("number") {
            names.remove("integer");
        }
        let names: Vec<&str> = names.into_iter().collect();
        if let [only] = names.as_slice() {
            return self.named_type_check(only);
        }
        let mut message = format!(
            "The value was expected to be of type {}",
            list(names.iter().copied(), "or")
        );
        if self.valid {
            message.push_str(&format!(" and it was of type {}", self.target_type()));
        } else {
            message.push_str(&format!(" but it was of type {}", self.target_type()));
        }
        message
    }

    fn defines_all(&self, names: &StringSet) -> String {
        let mut message = format!(
            "The object value was expected to define properties {}",
            list(names.iter().map(quote), "and")
        );
        if self.valid {
            return message;
        }
        let Some(object) = self.target.as_object() else {
            return message;
        };
        let missing: Vec<&str> = names.iter().filter(|name| !object.contains_key(*name)).collect();
        match missing.as_slice() {
            [] => {}
            [only] => message.push_str(&format!(" but did not define the property {}", quote(only))),
            _ => message.push_str(&format!(
                " but did not define properties {}",
                list(missing.iter().map(|name| quote(name)), "and")
            )),
        }
        message
    }

    fn dependencies<'d>(&self, dependencies: impl Iterator<Item = (&'d str, &'d Vec<String>)>) -> String {
        let Some(object) = self.target.as_object() else {
            return "The object value was expected to satisfy the declared property dependencies"
                .to_string();
        };
        let mut present = BTreeSet::new();
        let mut required = BTreeSet::new();
        let mut triggers = BTreeSet::new();
        for (trigger, names) in dependencies {
            triggers.insert(trigger);
            if object.contains_key(trigger) {
                present.insert(trigger);
                required.extend(names.iter().map(String::as_str));
            }
        }
        if present.is_empty() {
            return format!(
                "The object value did not define the {} {}",
                plural(triggers.len(), "property", "properties"),
                list(triggers.into_iter().map(quote), "or")
            );
        }
        format!(
            "Because the object value defined the {} {}, it was also expected to define the {} {}",
            plural(present.len(), "property", "properties"),
            list(present.into_iter().map(quote), "and"),
            plural(required.len(), "property", "properties"),
            list(required.into_iter().map(quote), "and")
        )
    }

    fn string_size(&self, bound: &str, limit: usize) -> String {
        let (subject, length) = match (self.within("propertyNames"), self.instance_location.last()) {
            (true, Some(token)) => {
                let name = token.as_text();
                (
                    format!("The object property name {}", quote(&name)),
                    name.chars().count(),
                )
            }
            _ => (
                format!("The string value {}", stringify(self.target)),
                self.target.as_str().map_or(0, |text| text.chars().count()),
            ),
        };
        format!(
            "{subject} was expected to consist of {bound} {limit} {} {} it consisted of {length} {}",
            plural(limit, "character", "characters"),
            if self.valid { "and" } else { "but" },
            plural(length, "character", "characters")
        )
    }

    fn container_size(&self, kind: &str, bound: &str, limit: usize, one: &str, many: &str) -> String {
        let size = match self.target {
            Json::Array(items) => items.len(),
            Json::Object(members) => members.len(),
            _ => 0,
        };
        let mut message = format!(
            "The {kind} value was expected to contain {bound} {limit} {} {} it contained {size} {}",
            plural(limit, one, many),
            if self.valid { "and" } else { "but" },
            plural(size, one, many)
        );
        if let Json::Object(members) = self.target {
            let names: BTreeSet<&str> = members.keys().map(String::as_str).collect();
            if !names.is_empty() {
                message.push_str(": ");
                message.push_str(&list(names.into_iter().map(quote), "and"));
            }
        }
        message
    }

    fn equals_any(&self, values: &[Json]) -> String {
        let subject = format!("The {} value {}", self.target_type(), stringify(self.target));
        match values {
            [only] => format!(
                "{subject} was expected to equal the {} constant {}",
                json_type(only).schema_name(),
                stringify(only)
            ),
            _ if self.valid => format!(
                "{subject} was expected to equal one of the {} declared values",
                values.len()
            ),
            _ => format!(
                "{subject} was expected to equal one of the following values: {}",
                list(values.iter().map(stringify), "and")
            ),
        }
    }

    fn compare(&self, relation: &str, limit: &Json, strict: bool) -> String {
        let mut message = format!(
            "The {} value {} was expected to be {relation} the {} {}",
            self.target_type(),
            stringify(self.target),
            json_type(limit).schema_name(),
            stringify(limit)
        );
        if strict && !self.valid && json_equal(self.target, limit) {
            message.push_str(", but they were equal");
        }
        message
    }

    fn unique(&self) -> String {
        if self.valid {
            return "The array value was expected to not contain duplicate items".to_string();
        }
        let items = self.target.as_array().map_or(&[][..], Vec::as_slice);
        let mut duplicates: Vec<String> = Vec::new();
        for (index, item) in items.iter().enumerate() {
            if items[index + 1..].iter().any(|other| json_equal(item, other)) {
                let rendered = stringify(item);
                if !duplicates.contains(&rendered) {
                    duplicates.push(rendered);
                }
            }
        }
        duplicates.sort();
        format!(
            "The array value contained the following duplicate {}: {}",
            plural(duplicates.len(), "item", "items"),
            list(duplicates.into_iter(), "and")
        )
    }

    fn keys(&self) -> String {
        let names: Vec<&String> = self
            .target
            .as_object()
            .map(|object| object.keys().collect())
            .unwrap_or_default();
        match names.as_slice() {
            [] => "The object is empty and no properties were expected to validate against the \
                   given subschema"
                .to_string(),
            [only] => format!(
                "The object property {} was expected to validate against the given subschema",
                quote(only)
            ),
            _ => format!(
                "The object properties {} were expected to validate against the given subschema",
                list(names.iter().map(|name| quote(name)), "and")
            ),
        }
    }

    fn items_from(&self, start: usize) -> String {
        let except = match start {
            0 => String::new(),
            1 => " except for the first one".to_string(),
            _ => format!(" except for the first {start}"),
        };
        format!("Every item in the array value{except} was expected to validate against the given subschema")
    }

    fn location_phrase(&self) -> String {
        if self.instance_location.is_empty() {
            "instance".to_string()
        } else {
            format!("instance location \"{}\"", self.instance_location)
        }
    }

    fn annotation_emit(&self, value: &Json) -> String {
        match self.keyword {
            "properties" => format!(
                "The object property {} successfully validated against its property subschema",
                stringify(value)
            ),
            "items" | "additionalItems" if *value == Json::Bool(true) => {
                "Every item in the array value was successfully validated".to_string()
            }
            "prefixItems" if *value == Json::Bool(true) => {
                "Every item of the array value validated against the given positional subschemas"
                    .to_string()
            }
            "prefixItems" | "items" if value.is_u64() => match value.as_u64() {
                Some(0) => "The first item of the array value successfully validated against the \
                            first positional subschema"
                    .to_string(),
                Some(last) => format!(
                    "The first {} items of the array value successfully validated against the \
                     given positional subschemas",
                    last + 1
                ),
                None => self.unrecognized_annotation(value),
            },
            "title" | "description" | "contentEncoding" | "contentMediaType" => {
                let subject = match self.keyword {
                    "contentEncoding" => "content encoding",
                    "contentMediaType" => "content media type",
                    keyword => keyword,
                };
                format!("The {subject} of the {} was {}", self.location_phrase(), stringify(value))
            }
            "default" => format!(
                "The default value of the {} was {}",
                self.location_phrase(),
                stringify(value)
            ),
            "deprecated" | "readOnly" | "writeOnly" if value.is_boolean() => {
                let adjective = match self.keyword {
                    "deprecated" => "deprecated",
                    "readOnly" => "read-only",
                    _ => "write-only",
                };
                let negation = if *value == Json::Bool(true) { "" } else { "not " };
                format!(
                    "The {} was {negation}considered {adjective}",
                    self.location_phrase()
                )
            }
            "examples" => {
                let examples = value.as_array().map_or(&[][..], Vec::as_slice);
                format!(
                    "Examples of the {} were {}",
                    self.location_phrase(),
                    list(examples.iter().map(stringify), "and")
                )
            }
            "contentSchema" => format!(
                "When decoded, the {} was expected to validate against the schema {}",
                self.location_phrase(),
                stringify(value)
            ),
            _ => self.unrecognized_annotation(value),
        }
    }

    fn annotation_basename(&self) -> String {
        let Some(value) = self.annotation else {
            return "The basename of the instance location was collected as an annotation".to_string();
        };
        match self.keyword {
            "patternProperties" => format!(
                "The object property {} successfully validated against its pattern property subschema",
                stringify(value)
            ),
            "additionalProperties" => format!(
                "The object property {} successfully validated against the additional properties \
                 subschema",
                stringify(value)
            ),
            "unevaluatedProperties" => format!(
                "The object property {} successfully validated against the subschema for \
                 unevaluated properties",
                stringify(value)
            ),
            "contains" => format!(
                "The item at index {} of the array value successfully validated against the \
                 containment check subschema",
                stringify(value)
            ),
            _ => self.unrecognized_annotation(value),
        }
    }

    fn unrecognized_annotation(&self, value: &Json) -> String {
        format!(
            "The unrecognized keyword {} was collected as the annotation {}",
            quote(self.keyword),
            stringify(value)
        )
    }
}

fn contains(range: &Range) -> String {
    let (amount, singular) = match range.maximum {
        Some(0) if range.minimum == 0 => ("any number of".to_string(), false),
        Some(maximum) if maximum == range.minimum => (format!("exactly {maximum}"), maximum == 1),
        Some(maximum) if range.minimum == 0 => (format!("up to {maximum}"), maximum == 1),
        Some(maximum) => (format!("{} to {maximum}", range.minimum), maximum == 1),
        None => (format!("at least {}", range.minimum), range.minimum == 1),
    };
    if singular {
        format!("The array value was expected to contain {amount} item that validates against the given subschema")
    } else {
        format!("The array value was expected to contain {amount} items that validate against the given subschema")
    }
}

fn bounded(kind: &str, range: &Range, one: &str, many: &str) -> String {
    match range.maximum {
        Some(maximum) if range.minimum == 0 => upper(kind, maximum, one, many),
        Some(maximum) => format!(
            "The value was expected to consist of {kind} of {} to {maximum} {}",
            range.minimum,
            plural(maximum, one, many)
        ),
        None => format!(
            "The value was expected to consist of {kind} of at least {} {}",
            range.minimum,
            plural(range.minimum, one, many)
        ),
    }
}

fn upper(kind: &str, maximum: usize, one: &str, many: &str) -> String {
    format!(
        "The value was expected to consist of {kind} of at most {maximum} {}",
        plural(maximum, one, many)
    )
}

fn is_fail_only(children: &[Instruction]) -> bool {
    matches!(children, [only] if only.operation == Operation::AssertionFail)
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 {
        one
    } else {
        many
    }
}

fn quote(text: impl AsRef<str>) -> String {
    format!("\"{}\"", text.as_ref().replace('"', "\\\""))
}

fn stringify(value: &Json) -> String {
    value.to_string()
}

/// `a`, `a and b`, `a, b, and c`.
fn list<S: AsRef<str>>(items: impl Iterator<Item = S>, conjunction: &str) -> String {
    let items: Vec<S> = items.collect();
    match items.as_slice() {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [first, second] => format!("{} {conjunction} {}", first.as_ref(), second.as_ref()),
        [init @ .., last] => {
            let mut result = String::new();
            for item in init {
                result.push_str(item.as_ref());
                result.push_str(", ");
            }
            result.push_str(conjunction);
            result.push(' ');
            result.push_str(last.as_ref());
            result
        }
    }
}
