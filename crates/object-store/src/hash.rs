//! SHA-256 content addressing.

use sha2::{Digest, Sha256};

/// Length of a hex encoded SHA-256 digest.
pub const HASH_HEX_LEN: usize = 64;

/// Incremental SHA-256 over a sequence of chunks.
#[derive(Debug, Clone, Default)]
pub struct ContentHasher {
    inner: Sha256,
}

impl ContentHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
    }

    /// Finish and return the lowercase hex digest.
    pub fn finalize(self) -> String {
        hex::encode(self.inner.finalize())
    }
}

/// Hash a complete buffer.
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = ContentHasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Whether `hash` looks like something [`content_hash`] produced.
///
/// Object paths are derived from the hash, so anything else (uppercase,
/// separators, wrong length) is rejected before it reaches the backend.
pub fn is_valid_hash(hash: &str) -> bool {
    hash.len() == HASH_HEX_LEN
        && hash
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
