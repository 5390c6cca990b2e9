//! Content hashing primitives
//!
//! Provides [`ContentHash`], a 32-byte Blake3 digest, and [`CanonicalHasher`],
//! the length-prefixed field encoder used to derive content identifiers.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte content hash (Blake3)
///
/// Immutable and cheap to clone (Copy).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContentHash([u8; 32]);

impl ContentHash {
    /// Create a new ContentHash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Create hash from byte slice
    ///
    /// # Errors
    /// Returns error if slice length is not exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, HashError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| HashError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }

    /// Compute Blake3 hash of arbitrary data
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self::new(*blake3::hash(data).as_bytes())
    }

    /// Short string representation (first 16 hex chars)
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl Display for ContentHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for ContentHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        Self::from_slice(&bytes)
    }
}

/// Incremental hasher with an unambiguous field encoding
///
/// Every field is written as a tag byte, a little-endian length and the raw
/// bytes, so `("ab", "c")` and `("a", "bc")` never collide.
#[derive(Debug, Default)]
pub struct CanonicalHasher {
    inner: blake3::Hasher,
}

impl CanonicalHasher {
    /// Create an empty hasher
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a string field
    pub fn field(&mut self, tag: u8, value: &str) -> &mut Self {
        self.bytes(tag, value.as_bytes())
    }

    /// Append an optional string field (absent and empty are distinct)
    pub fn opt_field(&mut self, tag: u8, value: Option<&str>) -> &mut Self {
        match value {
            Some(v) => self.bytes(tag, v.as_bytes()),
            None => self.bytes(tag | 0x80, &[]),
        }
    }

    /// Append an integer field
    pub fn number(&mut self, tag: u8, value: u64) -> &mut Self {
        self.bytes(tag, &value.to_le_bytes())
    }

    fn bytes(&mut self, tag: u8, data: &[u8]) -> &mut Self {
        self.inner.update(&[tag]);
        self.inner.update(&(data.len() as u64).to_le_bytes());
        self.inner.update(data);
        self
    }

    /// Finish and return the digest
    #[must_use]
    pub fn finish(&self) -> ContentHash {
        ContentHash::new(*self.inner.finalize().as_bytes())
    }
}

/// Errors that can occur when working with content hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Required byte length
        expected: usize,
        /// Byte length given
        actual: usize,
    },

    /// Hex encoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_hash_from_slice_invalid_length() {
        let bytes = vec![1u8; 31];
        let result = ContentHash::from_slice(&bytes);
        assert!(matches!(
            result,
            Err(HashError::InvalidLength { expected: 32, actual: 31 })
        ));
    }

    #[test]
    fn content_hash_display_and_parse() {
        let hash = ContentHash::compute(b"test");
        let parsed: ContentHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
        assert!(hash.to_string().starts_with(&hash.short()));
    }

    #[test]
    fn canonical_hasher_separates_fields() {
        let a = CanonicalHasher::new().field(1, "ab").field(1, "c").finish();
        let b = CanonicalHasher::new().field(1, "a").field(1, "bc").finish();
        assert_ne!(a, b);
    }

    #[test]
    fn canonical_hasher_absent_differs_from_empty() {
        let none = CanonicalHasher::new().opt_field(2, None).finish();
        let empty = CanonicalHasher::new().opt_field(2, Some("")).finish();
        assert_ne!(none, empty);
    }
}
