//! RFC 6901 JSON Pointers.
//!
//! Tokens compare by their textual form, so `Index(0)` equals `Property("0")`.
//! That keeps a pointer equal to itself after a trip through its string
//! representation, where the two spellings cannot be told apart.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::json::Json;

/// One step of a pointer: an object member or an array index.
#[derive(Debug, Clone)]
pub enum Token {
    Property(String),
    Index(usize),
}

impl Token {
    /// Parse an unescaped token, treating canonical non-negative integers as
    /// indexes.
    pub fn parse(raw: &str) -> Self {
        let canonical = !raw.is_empty()
            && raw.bytes().all(|b| b.is_ascii_digit())
            && (raw == "0" || !raw.starts_with('0'));
        match raw.parse::<usize>() {
            Ok(index) if canonical => Self::Index(index),
            _ => Self::Property(raw.to_string()),
        }
    }

    /// The token's text without escaping.
    pub fn as_text(&self) -> std::borrow::Cow<'_, str> {
        match self {
            Self::Property(name) => std::borrow::Cow::Borrowed(name.as_str()),
            Self::Index(index) => std::borrow::Cow::Owned(index.to_string()),
        }
    }

    /// Numeric view of the token, if it has one.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Property(name) => match Self::parse(name) {
                Self::Index(index) => Some(index),
                Self::Property(_) => None,
            },
        }
    }

    /// Step into `value` by this token.
    pub fn step<'a>(&self, value: &'a Json) -> Option<&'a Json> {
        match value {
            Json::Object(map) => map.get(self.as_text().as_ref()),
            Json::Array(items) => self.as_index().and_then(|index| items.get(index)),
            _ => None,
        }
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Index(a), Self::Index(b)) => a == b,
            (Self::Property(a), Self::Property(b)) => a == b,
            _ => self.as_text() == other.as_text(),
        }
    }
}

impl Eq for Token {}

impl Hash for Token {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.as_text().hash(state);
    }
}

impl PartialOrd for Token {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Token {
    fn cmp(&self, other: &Self) -> Ordering {
        self.as_text().cmp(&other.as_text())
    }
}

impl From<&str> for Token {
    fn from(name: &str) -> Self {
        Self::Property(name.to_string())
    }
}

impl From<String> for Token {
    fn from(name: String) -> Self {
        Self::Property(name)
    }
}

impl From<usize> for Token {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// A sequence of tokens addressing a location inside a JSON document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    tokens: Vec<Token>,
}

impl Pointer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an RFC 6901 string. A leading `#` (URI fragment form) is
    /// accepted and percent-decoding is left to the caller.
    pub fn parse(input: &str) -> Option<Self> {
        let input = input.strip_prefix('#').unwrap_or(input);
        if input.is_empty() {
            return Some(Self::new());
        }
        let rest = input.strip_prefix('/')?;
        let tokens = rest
            .split('/')
            .map(|raw| Token::parse(&raw.replace("~1", "/").replace("~0", "~")))
            .collect();
        Some(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn last(&self) -> Option<&Token> {
        self.tokens.last()
    }

    pub fn push(&mut self, token: impl Into<Token>) {
        self.tokens.push(token.into());
    }

    pub fn pop(&mut self) -> Option<Token> {
        self.tokens.pop()
    }

    /// Drop the last `count` tokens.
    pub fn truncate_by(&mut self, count: usize) {
        let keep = self.tokens.len().saturating_sub(count);
        self.tokens.truncate(keep);
    }

    /// Append every token of `other`.
    pub fn extend(&mut self, other: &Pointer) {
        self.tokens.extend(other.tokens.iter().cloned());
    }

    /// A new pointer with `token` appended.
    pub fn join(&self, token: impl Into<Token>) -> Pointer {
        let mut result = self.clone();
        result.push(token);
        result
    }

    /// A new pointer with every token of `other` appended.
    pub fn concat(&self, other: &Pointer) -> Pointer {
        let mut result = self.clone();
        result.extend(other);
        result
    }

    /// Pointer to the parent location, or `None` at the root.
    pub fn parent(&self) -> Option<Pointer> {
        if self.tokens.is_empty() {
            return None;
        }
        let mut result = self.clone();
        result.tokens.pop();
        Some(result)
    }

    /// Whether `prefix` addresses this location or one of its ancestors.
    pub fn starts_with(&self, prefix: &Pointer) -> bool {
        self.tokens.len() >= prefix.tokens.len()
            && self.tokens.iter().zip(&prefix.tokens).all(|(a, b)| a == b)
    }

    /// Like [`Pointer::starts_with`], but ignoring the last token of
    /// `prefix`. Used to find marks made by siblings of the current keyword.
    pub fn starts_with_initial(&self, prefix: &Pointer) -> bool {
        let initial = prefix.tokens.len().saturating_sub(1);
        self.tokens.len() >= initial
            && self.tokens[..initial]
                .iter()
                .zip(&prefix.tokens[..initial])
                .all(|(a, b)| a == b)
    }

    /// Navigate `root` to the addressed location.
    pub fn resolve<'a>(&self, root: &'a Json) -> Option<&'a Json> {
        self.tokens
            .iter()
            .try_fold(root, |current, token| token.step(current))
    }

    /// Mutable navigation, used by the bundler to embed resources.
    pub fn resolve_mut<'a>(&self, root: &'a mut Json) -> Option<&'a mut Json> {
        let mut current = root;
        for token in &self.tokens {
            current = match current {
                Json::Object(map) => map.get_mut(token.as_text().as_ref())?,
                Json::Array(items) => items.get_mut(token.as_index()?)?,
                _ => return None,
            };
        }
        Some(current)
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            f.write_str("/")?;
            f.write_str(&token.as_text().replace('~', "~0").replace('/', "~1"))?;
        }
        Ok(())
    }
}

impl FromIterator<Token> for Pointer {
    fn from_iter<I: IntoIterator<Item = Token>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().collect(),
        }
    }
}

impl Serialize for Pointer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pointer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pointer::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid JSON Pointer: {raw}")))
    }
}
