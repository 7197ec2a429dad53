//! Transaction value object.
//!
//! `hash(tx)` is a pure function of `(sender, recipient, amount, inputs,
//! timestamp)` — the signature is deliberately excluded so that signing
//! does not change a transaction's identity.

use crate::crypto::{canonical_json_bytes, verify, Address, Hash256, Signature, Signer};
use crate::error::TxError;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

const TX_HASH_TAG: &[u8] = b"tx:";

/// The fields that participate in `hash(tx)`; kept as a separate struct
/// so the signature can never accidentally leak into the hash preimage.
#[derive(Serialize)]
struct TxHashPreimage<'a> {
    sender: &'a str,
    recipient: &'a str,
    amount: f64,
    inputs: &'a [String],
    timestamp: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: Address,
    pub recipient: Address,
    pub amount: f64,
    pub inputs: Vec<String>,
    pub timestamp: u64,
    pub signature: Option<Signature>,
}

impl Transaction {
    /// Builds an unsigned transaction stamped with the current time.
    pub fn new(sender: Address, recipient: Address, amount: f64, inputs: Vec<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock is before the unix epoch")
            .as_secs();
        Transaction {
            sender,
            recipient,
            amount,
            inputs,
            timestamp,
            signature: None,
        }
    }

    /// Canonical content hash, excluding the signature.
    pub fn hash(&self) -> Hash256 {
        let preimage = TxHashPreimage {
            sender: &self.sender.0,
            recipient: &self.recipient.0,
            amount: self.amount,
            inputs: &self.inputs,
            timestamp: self.timestamp,
        };
        let bytes = canonical_json_bytes(&preimage);
        Hash256::domain_hash(TX_HASH_TAG, &bytes)
    }

    /// Signs `hash(self)` with `wallet`. Fails with `WrongSigner` if the
    /// wallet's address does not match `self.sender` — the one hard,
    /// programmer-facing error in this crate's taxonomy.
    pub fn sign(&mut self, wallet: &dyn Signer) -> Result<(), TxError> {
        if wallet.address() != self.sender {
            return Err(TxError::WrongSigner);
        }
        let digest = self.hash();
        self.signature = Some(wallet.sign(digest.as_bytes()));
        Ok(())
    }

    /// False if unsigned; otherwise verifies the signature against
    /// `sender` over `hash(self)`, false on any verification error.
    pub fn is_valid(&self) -> bool {
        match &self.signature {
            None => false,
            Some(sig) => verify(&self.sender, self.hash().as_bytes(), sig),
        }
    }
}
