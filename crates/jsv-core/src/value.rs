//! Typed instruction payloads that need more than a primitive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hash::PropertyHash;
use crate::string_set::StringSet;

/// A property name with its precomputed hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Property {
    pub name: String,
    pub hash: PropertyHash,
}

impl Property {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let hash = PropertyHash::of(&name);
        Self { name, hash }
    }
}

impl From<String> for Property {
    fn from(name: String) -> Self {
        Self::new(name)
    }
}

impl From<Property> for String {
    fn from(property: Property) -> Self {
        property.name
    }
}

/// A compiled ECMA-262 regular expression that remembers its source text.
///
/// Lookaround and backreferences are supported. The shorthand classes `\d`
/// and `\w` (and their negations) are ASCII-only, as in ECMA-262.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Pattern {
    source: String,
    regex: fancy_regex::Regex,
}

impl Pattern {
    /// Compile `source`.
    ///
    /// # Errors
    ///
    /// Returns the regex engine's error when `source` is not a valid pattern.
    pub fn new(source: impl Into<String>) -> Result<Self, fancy_regex::Error> {
        let source = source.into();
        let regex = fancy_regex::Regex::new(&translate_ecma_classes(&source))?;
        Ok(Self { source, regex })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Unanchored search, as JSON Schema requires. A search that exceeds
    /// the backtracking limit counts as no match.
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text).unwrap_or(false)
    }
}

/// Rewrite `\d`, `\D`, `\w` and `\W` into explicit ASCII classes.
fn translate_ecma_classes(source: &str) -> String {
    let mut output = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_class = false;
    let mut class_start = false;
    while let Some(c) = chars.next() {
        let at_class_start = std::mem::take(&mut class_start);
        match c {
            '\\' => {
                let Some(next) = chars.next() else {
                    output.push(c);
                    break;
                };
                let replacement = match (next, in_class) {
                    ('d', false) => Some("[0-9]"),
                    ('d', true) => Some("0-9"),
                    ('w', false) => Some("[A-Za-z0-9_]"),
                    ('w', true) => Some("A-Za-z0-9_"),
                    ('D', _) => Some("[^0-9]"),
                    ('W', _) => Some("[^A-Za-z0-9_]"),
                    _ => None,
                };
                match replacement {
                    Some(replacement) => output.push_str(replacement),
                    None => {
                        output.push(c);
                        output.push(next);
                    }
                }
            }
            '[' if !in_class => {
                in_class = true;
                class_start = true;
                output.push(c);
                if chars.peek() == Some(&'^') {
                    chars.next();
                    output.push('^');
                }
            }
            ']' if in_class && !at_class_start => {
                in_class = false;
                output.push(c);
            }
            _ => output.push(c),
        }
    }
    output
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.source).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl TryFrom<String> for Pattern {
    type Error = fancy_regex::Error;

    fn try_from(source: String) -> Result<Self, Self::Error> {
        Pattern::new(source)
    }
}

impl From<Pattern> for String {
    fn from(pattern: Pattern) -> Self {
        pattern.source
    }
}

/// Inclusive size or count bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub minimum: usize,
    pub maximum: Option<usize>,
    /// Keep iterating after the bounds are satisfied, so every match is
    /// observed (annotations and evaluation marks).
    pub exhaustive: bool,
}

impl Range {
    pub fn contains(&self, value: usize) -> bool {
        value >= self.minimum && self.maximum.map_or(true, |maximum| value <= maximum)
    }
}

/// Property names a loop must skip: literal names, literal prefixes, and
/// regular expressions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PropertyFilter {
    pub names: StringSet,
    pub prefixes: Vec<String>,
    pub patterns: Vec<Pattern>,
}

impl PropertyFilter {
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.prefixes.is_empty() && self.patterns.is_empty()
    }

    /// Whether `name` is covered by any of the filter's rules.
    pub fn excludes(&self, name: &str, hash: &PropertyHash) -> bool {
        self.names.contains_hashed(name, hash)
            || self.prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
            || self.patterns.iter().any(|pattern| pattern.is_match(name))
    }
}

/// String formats with a dedicated assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringFormat {
    Uri,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn property_serializes_as_name() {
        let property = Property::new("foo");
        assert_eq!(serde_json::to_value(&property).unwrap(), json!("foo"));
        let decoded: Property = serde_json::from_value(json!("foo")).unwrap();
        assert_eq!(decoded, property);
    }

    #[test]
    fn invalid_pattern_fails_to_load() {
        assert!(serde_json::from_value::<Pattern>(json!("([a-z")).is_err());
        let pattern: Pattern = serde_json::from_value(json!("^a+$")).unwrap();
        assert!(pattern.is_match("aaa"));
        assert!(!pattern.is_match("aab"));
    }

    #[test]
    fn lookaround_and_backreferences_are_supported() {
        let pattern = Pattern::new("^(?!internal-).+$").unwrap();
        assert!(pattern.is_match("public-api"));
        assert!(!pattern.is_match("internal-api"));

        let repeated = Pattern::new("^(a+)-\\1$").unwrap();
        assert!(repeated.is_match("aa-aa"));
        assert!(!repeated.is_match("aa-a"));
    }

    #[test]
    fn shorthand_classes_are_ascii_only() {
        let digit = Pattern::new("^\\d$").unwrap();
        assert!(digit.is_match("3"));
        assert!(!digit.is_match("\u{663}"));

        let word = Pattern::new("^[\\w-]+$").unwrap();
        assert!(word.is_match("snake_case-1"));
        assert!(!word.is_match("caf\u{e9}"));

        let not_digit = Pattern::new("^\\D+$").unwrap();
        assert!(not_digit.is_match("\u{663}"));
        assert!(!not_digit.is_match("a1"));
    }

    #[test]
    fn class_translation_leaves_escapes_alone() {
        assert_eq!(translate_ecma_classes("\\\\d"), "\\\\d");
        assert_eq!(translate_ecma_classes("[]\\d]"), "[]0-9]");
        assert_eq!(translate_ecma_classes("[^\\w.]\\s"), "[^A-Za-z0-9_.]\\s");
        assert_eq!(translate_ecma_classes("\\D"), "[^0-9]");
    }

    #[test]
    fn range_bounds() {
        let range = Range { minimum: 1, maximum: Some(3), exhaustive: false };
        assert!(!range.contains(0));
        assert!(range.contains(3));
        assert!(!range.contains(4));
        let open = Range { minimum: 2, maximum: None, exhaustive: false };
        assert!(open.contains(1000));
    }

    #[test]
    fn filter_combines_rules() {
        let filter = PropertyFilter {
            names: StringSet::from_names(["id"]),
            prefixes: vec!["x-".to_string()],
            patterns: vec![Pattern::new("^[0-9]+$").unwrap()],
        };
        let check = |name: &str| filter.excludes(name, &PropertyHash::of(name));
        assert!(check("id"));
        assert!(check("x-custom"));
        assert!(check("42"));
        assert!(!check("name"));
    }
}
