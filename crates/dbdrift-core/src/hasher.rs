//! Definition hashing
//!
//! View, routine and trigger bodies can be large. A digest is a cheap way to
//! prove two bodies differ, but it is only ever advisory: equal digests are
//! always confirmed with a full text comparison before two definitions are
//! treated as equal.

use crate::model::ObjectRecord;
use sha2::{Digest, Sha256};

/// Default minimum text length (bytes) at which the digest gate is used
pub const DEFAULT_DIGEST_THRESHOLD: usize = 1024;

/// SHA-256 of the UTF-8 bytes as 64 lowercase hex characters
///
/// Deterministic: equal texts always produce equal digests. Treated as a
/// non-cryptographic fingerprint.
pub fn digest(text: &str) -> String {
    hex::encode(Sha256::digest(text.as_bytes()))
}

/// Fingerprint of a whole record, computed over its canonical JSON form
pub fn record_digest(record: &ObjectRecord) -> Result<String, serde_json::Error> {
    let canonical = serde_json::to_string(record)?;
    Ok(digest(&canonical))
}

/// Equality gate for large text payloads
#[derive(Clone, Copy)]
pub struct DefinitionHasher {
    threshold: usize,
    digest_fn: fn(&str) -> String,
}

impl DefinitionHasher {
    /// Gate texts of at least `threshold` bytes through [`digest`]
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            digest_fn: digest,
        }
    }

    /// Replace the digest function
    pub fn with_digest_fn(mut self, digest_fn: fn(&str) -> String) -> Self {
        self.digest_fn = digest_fn;
        self
    }

    /// Minimum length at which digests are consulted
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Digest a text with the configured function
    pub fn digest(&self, text: &str) -> String {
        (self.digest_fn)(text)
    }

    /// Compare two texts
    ///
    /// Differing digests prove inequality. Equal digests (or texts below the
    /// threshold) fall through to a full comparison.
    pub fn texts_equal(&self, a: &str, b: &str) -> bool {
        if a.len() != b.len() {
            return false;
        }
        if a.len() >= self.threshold && self.digest(a) != self.digest(b) {
            return false;
        }
        a == b
    }
}

impl std::fmt::Debug for DefinitionHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefinitionHasher")
            .field("threshold", &self.threshold)
            .finish_non_exhaustive()
    }
}

impl Default for DefinitionHasher {
    fn default() -> Self {
        Self::new(DEFAULT_DIGEST_THRESHOLD)
    }
}
