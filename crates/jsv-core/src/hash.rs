//! Property-name hashing and label identifiers.
//!
//! A [`PropertyHash`] stores names of up to 31 bytes verbatim behind a length
//! byte, which makes it a perfect hash: two perfect hashes are equal exactly
//! when their names are. Longer names keep only a coarse fingerprint in the
//! length byte, so equal hashes there merely mean "maybe equal" and the
//! caller must compare strings.

const PERFECT_LIMIT: usize = 31;

/// Fixed-width fingerprint of a property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyHash([u8; 32]);

impl PropertyHash {
    /// Hash a property name.
    pub fn of(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut data = [0u8; 32];
        if bytes.len() <= PERFECT_LIMIT {
            data[0] = bytes.len() as u8;
            data[1..=bytes.len()].copy_from_slice(bytes);
        } else {
            let first = usize::from(bytes[0]);
            let last = usize::from(bytes[bytes.len() - 1]);
            data[0] = 32 + ((bytes.len() + first + last) % 224) as u8;
        }
        Self(data)
    }

    /// Whether the hash alone decides equality.
    pub fn is_perfect(&self) -> bool {
        usize::from(self.0[0]) <= PERFECT_LIMIT
    }

    /// Decide whether `candidate` (with hash `candidate_hash`) names the same
    /// property as `name` (with hash `self`).
    pub fn matches(&self, name: &str, candidate_hash: &PropertyHash, candidate: &str) -> bool {
        if self != candidate_hash {
            return false;
        }
        self.is_perfect() || name == candidate
    }
}

/// Identifier of a labelled instruction subtree.
pub type LabelId = u64;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(input: &str) -> u64 {
    input.bytes().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Label for a reference destination or dynamic anchor. `resource` is the
/// schema-resource index for dynamic anchors and `0` for plain destinations.
///
/// Compiler and evaluator both call this, so it must stay deterministic
/// across processes.
pub fn label_id(resource: usize, fragment: &str) -> LabelId {
    fnv1a(fragment).wrapping_add(resource as u64)
}
