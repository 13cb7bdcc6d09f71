//! JSON helpers shared by the compiler and the evaluator.
//!
//! JSON Schema compares numbers by value (`1` equals `1.0`), counts string
//! length in code points, and distinguishes integers from reals. None of those
//! match `serde_json`'s defaults, so they live here.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The JSON document type used throughout the engine.
pub type Json = serde_json::Value;

/// Runtime type of a JSON value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Null,
    Boolean,
    Integer,
    Real,
    String,
    Array,
    Object,
}

impl JsonType {
    /// Parse a JSON Schema `type` keyword name. `number` maps to
    /// [`JsonType::Real`]; callers that need "any number" must add
    /// [`JsonType::Integer`] themselves.
    pub fn from_schema_name(name: &str) -> Option<Self> {
        match name {
            "null" => Some(Self::Null),
            "boolean" => Some(Self::Boolean),
            "integer" => Some(Self::Integer),
            "number" => Some(Self::Real),
            "string" => Some(Self::String),
            "array" => Some(Self::Array),
            "object" => Some(Self::Object),
            _ => None,
        }
    }

    /// The name JSON Schema uses for this type.
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Real => "number",
            Self::String => "string",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

impl fmt::Display for JsonType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_name())
    }
}

/// Strict runtime type of a value. Numbers written without a fractional part
/// or exponent are integers, everything else numeric is real.
pub fn json_type(value: &Json) -> JsonType {
    match value {
        Json::Null => JsonType::Null,
        Json::Bool(_) => JsonType::Boolean,
        Json::Number(n) if n.is_i64() || n.is_u64() => JsonType::Integer,
        Json::Number(_) => JsonType::Real,
        Json::String(_) => JsonType::String,
        Json::Array(_) => JsonType::Array,
        Json::Object(_) => JsonType::Object,
    }
}

/// Whether `value` is a real number with no fractional part, such as `1.0`.
pub fn is_integer_real(value: &Json) -> bool {
    match value {
        Json::Number(n) if !(n.is_i64() || n.is_u64()) => {
            n.as_f64().is_some_and(|f| f.is_finite() && f.fract() == 0.0)
        }
        _ => false,
    }
}

/// Strict type check: the value's runtime type must be exactly `expected`.
pub fn is_type_strict(value: &Json, expected: JsonType) -> bool {
    json_type(value) == expected
}

/// Lenient type check used by drafts 6 and later, where `1.0` is an integer
/// and every integer is a number.
pub fn is_type(value: &Json, expected: JsonType) -> bool {
    match expected {
        JsonType::Integer => {
            json_type(value) == JsonType::Integer || is_integer_real(value)
        }
        JsonType::Real => value.is_number(),
        other => json_type(value) == other,
    }
}

/// JSON Schema equality: numbers compare by value, objects ignore key order.
pub fn json_equal(left: &Json, right: &Json) -> bool {
    match (left, right) {
        (Json::Number(_), Json::Number(_)) => {
            compare_numbers(left, right) == Some(Ordering::Equal)
        }
        (Json::Array(a), Json::Array(b)) => {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| json_equal(x, y))
        }
        (Json::Object(a), Json::Object(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .all(|(key, x)| b.get(key).is_some_and(|y| json_equal(x, y)))
        }
        _ => left == right,
    }
}

fn as_i128(value: &Json) -> Option<i128> {
    match value {
        Json::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        _ => None,
    }
}

/// Order two numbers. Returns `None` when either side is not a number or the
/// comparison involves NaN.
pub fn compare_numbers(left: &Json, right: &Json) -> Option<Ordering> {
    if let (Some(a), Some(b)) = (as_i128(left), as_i128(right)) {
        return Some(a.cmp(&b));
    }
    let a = left.as_f64()?;
    let b = right.as_f64()?;
    a.partial_cmp(&b)
}

/// Whether `value` is an exact multiple of `divisor`.
pub fn is_divisible_by(value: &Json, divisor: &Json) -> bool {
    if let (Some(a), Some(b)) = (as_i128(value), as_i128(divisor)) {
        return b != 0 && a % b == 0;
    }
    let (Some(a), Some(b)) = (value.as_f64(), divisor.as_f64()) else {
        return false;
    };
    if b == 0.0 || !a.is_finite() || !b.is_finite() {
        return false;
    }
    let quotient = a / b;
    if !quotient.is_finite() {
        return false;
    }
    (quotient - quotient.round()).abs() <= f64::EPSILON * quotient.abs().max(1.0)
}

/// String length in Unicode code points.
pub fn string_length(value: &str) -> usize {
    value.chars().count()
}

/// Whether every element of the array is distinct under [`json_equal`].
pub fn is_unique(items: &[Json]) -> bool {
    for (index, item) in items.iter().enumerate() {
        if items[index + 1..].iter().any(|other| json_equal(item, other)) {
            return false;
        }
    }
    true
}

/// Size of a container value (string code points, array items, object
/// members). Scalars report `None`.
pub fn container_size(value: &Json) -> Option<usize> {
    match value {
        Json::String(s) => Some(string_length(s)),
        Json::Array(a) => Some(a.len()),
        Json::Object(o) => Some(o.len()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_and_real_are_distinguished() {
        assert_eq!(json_type(&json!(1)), JsonType::Integer);
        assert_eq!(json_type(&json!(1.5)), JsonType::Real);
        assert_eq!(json_type(&json!(1.0)), JsonType::Real);
        assert!(is_integer_real(&json!(1.0)));
        assert!(!is_integer_real(&json!(1.5)));
    }

    #[test]
    fn lenient_integer_accepts_integral_reals() {
        assert!(is_type(&json!(2.0), JsonType::Integer));
        assert!(!is_type_strict(&json!(2.0), JsonType::Integer));
        assert!(is_type(&json!(2), JsonType::Real));
    }

    #[test]
    fn equality_is_numeric_and_order_insensitive() {
        assert!(json_equal(&json!(1), &json!(1.0)));
        assert!(json_equal(&json!({"a": [1, 2], "b": null}), &json!({"b": null, "a": [1.0, 2]})));
        assert!(!json_equal(&json!([1, 2]), &json!([2, 1])));
        assert!(!json_equal(&json!("1"), &json!(1)));
    }

    #[test]
    fn number_comparisons_handle_mixed_representations() {
        assert_eq!(compare_numbers(&json!(-1), &json!(0)), Some(Ordering::Less));
        assert_eq!(compare_numbers(&json!(2.5), &json!(2)), Some(Ordering::Greater));
        assert_eq!(compare_numbers(&json!(u64::MAX), &json!(-1)), Some(Ordering::Greater));
        assert_eq!(compare_numbers(&json!("x"), &json!(1)), None);
    }

    #[test]
    fn divisibility() {
        assert!(is_divisible_by(&json!(10), &json!(5)));
        assert!(!is_divisible_by(&json!(10), &json!(3)));
        assert!(is_divisible_by(&json!(0.0075), &json!(0.0001)));
        assert!(!is_divisible_by(&json!(0.00751), &json!(0.0001)));
        assert!(is_divisible_by(&json!(4.5), &json!(1.5)));
        assert!(!is_divisible_by(&json!(1), &json!(0)));
    }

    #[test]
    fn string_length_counts_code_points() {
        assert_eq!(string_length("héllo"), 5);
        assert_eq!(string_length("💩"), 1);
    }

    #[test]
    fn uniqueness_uses_schema_equality() {
        assert!(is_unique(&[json!(1), json!("1"), json!([1])]));
        assert!(!is_unique(&[json!(1), json!(1.0)]));
        assert!(!is_unique(&[json!({"a": 1}), json!({"a": 1})]));
    }
}
