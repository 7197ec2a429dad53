//! Hashing and signing capability: domain-separated SHA-256 and ECDSA
//! over secp256k1, consumed by [`crate::types::transaction`] and the
//! node engine's own transaction-issuing path.

mod hash;
mod keys;

pub use hash::{canonical_json_bytes, Hash256, HASH_LEN};
pub use keys::{verify, Address, EcdsaWallet, Signature, Signer};
