//! Sets of property names with precomputed hashes.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::hash::PropertyHash;

/// An ordered, deduplicated set of strings, each paired with its
/// [`PropertyHash`].
///
/// Entries are sorted by byte length and then lexically, so membership checks
/// can jump straight to the run of candidates with the right length.
#[derive(Debug, Clone, Default)]
pub struct StringSet {
    entries: Vec<(String, PropertyHash)>,
    // (start, end) into `entries` for each length up to the perfect limit.
    by_length: Vec<(usize, usize)>,
}

impl StringSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from any collection of names.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: Vec<String> = names.into_iter().map(Into::into).collect();
        names.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
        names.dedup();
        let entries: Vec<(String, PropertyHash)> = names
            .into_iter()
            .map(|name| {
                let hash = PropertyHash::of(&name);
                (name, hash)
            })
            .collect();

        let mut by_length = Vec::new();
        let mut start = 0;
        for length in 0..32 {
            let end = entries[start..]
                .iter()
                .position(|(name, _)| name.len() != length)
                .map_or(entries.len(), |offset| start + offset);
            by_length.push((start, end));
            start = end;
        }
        Self { entries, by_length }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names in set order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Names paired with their hashes.
    pub fn hashed(&self) -> impl Iterator<Item = (&str, &PropertyHash)> {
        self.entries.iter().map(|(name, hash)| (name.as_str(), hash))
    }

    /// Whether every entry's hash decides equality on its own.
    pub fn all_perfect(&self) -> bool {
        self.entries.iter().all(|(_, hash)| hash.is_perfect())
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.contains_hashed(candidate, &PropertyHash::of(candidate))
    }

    /// Membership test with a hash the caller has already computed.
    pub fn contains_hashed(&self, candidate: &str, hash: &PropertyHash) -> bool {
        let range = match self.by_length.get(candidate.len()) {
            Some(&(start, end)) => start..end,
            None => {
                let start = self.by_length.last().map_or(0, |&(_, end)| end);
                start..self.entries.len()
            }
        };
        self.entries[range]
            .iter()
            .any(|(name, entry_hash)| entry_hash.matches(name, hash, candidate))
    }
}

impl PartialEq for StringSet {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for StringSet {}

impl Serialize for StringSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for StringSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let names = Vec::<String>::deserialize(deserializer)?;
        Ok(Self::from_names(names))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn membership_across_lengths() {
        let long = "a".repeat(40);
        let set = StringSet::from_names(["", "b", "foo", long.as_str(), "foo"]);
        assert_eq!(set.len(), 4);
        assert!(set.contains(""));
        assert!(set.contains("foo"));
        assert!(set.contains(&long));
        assert!(!set.contains("fo"));
        assert!(!set.contains(&"a".repeat(41)));
        assert!(!set.contains(&format!("{}b", "a".repeat(39))));
    }

    #[test]
    fn serializes_as_plain_names() {
        let set = StringSet::from_names(["zeta", "a"]);
        let encoded = serde_json::to_value(&set).unwrap();
        assert_eq!(encoded, serde_json::json!(["a", "zeta"]));
        let decoded: StringSet = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, set);
        assert!(decoded.contains("zeta"));
    }

    proptest! {
        #[test]
        fn agrees_with_naive_lookup(
            names in proptest::collection::vec("[ab\\x00]{0,36}", 0..8),
            probe in "[ab\\x00]{0,36}",
        ) {
            let set = StringSet::from_names(names.clone());
            prop_assert_eq!(set.contains(&probe), names.contains(&probe));
        }
    }
}
