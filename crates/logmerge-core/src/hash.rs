//! Stable hashing helpers for merged output and reports.

use std::fmt;

use blake3::Hasher;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// A blake3 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    /// Lowercase hex, 64 characters.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    Hash256(*blake3::hash(bytes).as_bytes())
}

/// Digest of a value's JSON encoding. Used for the config hash in reports.
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256> {
    Ok(hash_bytes(&serde_json::to_vec(v)?))
}

/// Incremental digest over everything a sink writes.
///
/// Two merges of identical inputs under the same config must produce equal digests.
#[derive(Debug, Default, Clone)]
pub struct OutputHasher {
    inner: Hasher,
}

impl OutputHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.inner.update(bytes);
    }

    pub fn digest(&self) -> Hash256 {
        Hash256(self.inner.finalize().into())
    }
}
