//! Domain-separated SHA-256 hashing and canonical JSON encoding.
//!
//! Every hash in this crate goes through [`domain_hash`] with a fixed tag
//! so that transactions, classic blocks, graph blocks, and graph seeds can
//! never collide even if their canonical JSON bytes happened to coincide.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length in bytes of every hash used in this crate.
pub const HASH_LEN: usize = 32;

/// A 256-bit SHA-256 digest.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; HASH_LEN]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; HASH_LEN]);

    /// Hashes `tag ‖ data` with SHA-256. `tag` is a fixed ASCII domain
    /// separator (e.g. `b"tx:"`) so different hash spaces never alias.
    pub fn domain_hash(tag: &[u8], data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(tag);
        hasher.update(data);
        let digest = hasher.finalize();
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&digest);
        Hash256(out)
    }

    pub fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(s: &str) -> Option<Self> {
        let bytes = hex::decode(s).ok()?;
        if bytes.len() != HASH_LEN {
            return None;
        }
        let mut out = [0u8; HASH_LEN];
        out.copy_from_slice(&bytes);
        Some(Hash256(out))
    }

    /// Counts the leading hex-zero characters of this hash's hex encoding.
    pub fn leading_hex_zeros(&self) -> usize {
        self.to_hex().chars().take_while(|c| *c == '0').count()
    }
}

impl fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Hash256({})", self.to_hex())
    }
}

impl fmt::Display for Hash256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Serializes `value` into canonical bytes: a `serde_json::Value` whose
/// object keys are sorted lexicographically (the default, non
/// `preserve_order` build of `serde_json` backs `Map` with a `BTreeMap`),
/// so the same logical value always produces byte-identical JSON.
pub fn canonical_json_bytes<T: Serialize>(value: &T) -> Vec<u8> {
    let as_value = serde_json::to_value(value).expect("value must be serializable to JSON");
    serde_json::to_vec(&as_value).expect("canonical JSON value must re-serialize")
}
