//! Address and signature newtypes, plus the `Signer` trait that the
//! node engine's own wallet satisfies.
//!
//! Per the glossary, an address IS the hex encoding of a wallet's
//! public key (not a hash of it) — transactions carry addresses
//! directly as `sender`/`recipient`, and verification recovers the
//! curve point straight from that hex string.
//!
//! The spec treats wallet key generation as an external capability; this
//! module only supplies the trait boundary and one concrete ECDSA-over-
//! secp256k1 implementation so the crate is self-contained and testable.

use k256::ecdsa::{Signature as K256Signature, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use signature::{Signer as _, Verifier as _};
use std::fmt;

/// Hex-encoded compressed secp256k1 public key; doubles as the wallet's
/// address.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Address(pub String);

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Address {
    fn to_verifying_key(&self) -> Option<VerifyingKey> {
        let bytes = hex::decode(&self.0).ok()?;
        VerifyingKey::from_sec1_bytes(&bytes).ok()
    }
}

/// Hex-encoded fixed-size ECDSA signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Signature(pub String);

/// An external signing capability: a wallet that owns a private key and
/// can produce signatures attributed to its own address.
pub trait Signer {
    fn address(&self) -> Address;
    fn sign(&self, msg: &[u8]) -> Signature;
}

/// Verifies `sig` over `msg` against `address`; any malformed input (bad
/// hex, bad curve point, bad signature encoding) verifies false rather
/// than propagating an error, matching the spec's "false on any
/// verification error" rule.
pub fn verify(address: &Address, msg: &[u8], sig: &Signature) -> bool {
    let Some(verifying_key) = address.to_verifying_key() else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(&sig.0) else {
        return false;
    };
    let Ok(signature) = K256Signature::from_slice(&sig_bytes) else {
        return false;
    };
    verifying_key.verify(msg, &signature).is_ok()
}

/// Concrete ECDSA-over-secp256k1 wallet. Constructed once outside the
/// node engine (key generation is out of scope) and handed in.
pub struct EcdsaWallet {
    signing_key: SigningKey,
    address: Address,
}

impl EcdsaWallet {
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        Self::from_signing_key(signing_key)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = VerifyingKey::from(&signing_key);
        let compressed = verifying_key.to_encoded_point(true);
        let address = Address(hex::encode(compressed.as_bytes()));
        EcdsaWallet {
            signing_key,
            address,
        }
    }
}

impl Signer for EcdsaWallet {
    fn address(&self) -> Address {
        self.address.clone()
    }

    fn sign(&self, msg: &[u8]) -> Signature {
        let sig: K256Signature = self.signing_key.sign(msg);
        Signature(hex::encode(sig.to_bytes()))
    }
}
