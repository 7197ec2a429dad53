//! Classic leading-zero-hash PoW variant.
//!
//! The full transaction list (not just `transactions_hash`) is included
//! directly in the header preimage: there is no separate
//! `transactions_hash` field in this variant's canonicalisation.

use super::{Block, PuzzleScheme};
use crate::cancel::CancelToken;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::thread;
use std::time::Duration;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClassicWitness {
    pub nonce: u64,
}

/// Classic blocks carry no puzzle parameters of their own; the leading-
/// zero `difficulty` is a fixed protocol parameter that lives on the
/// chain and is supplied as this scheme's validation context.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClassicParams;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ClassicContext {
    pub difficulty: usize,
}

/// `check_interval` controls checkpoint density (every `check_interval`
/// nonces, the global/per-task cancellation is checked); `pause_duration`
/// is a fixed throttle slept at each checkpoint. The two previously
/// conflated knobs are kept separate per the protocol's decision.
#[derive(Clone, Copy, Debug)]
pub struct ClassicMineContext {
    pub check_interval: u64,
    pub pause_duration: Duration,
}

#[derive(Clone, Debug)]
pub struct ClassicScheme;

impl PuzzleScheme for ClassicScheme {
    type Witness = ClassicWitness;
    type Params = ClassicParams;
    type Context = ClassicContext;
    type MineContext = ClassicMineContext;

    const HASH_TAG: &'static [u8] = b"block/classic:";
    const NEEDS_PUBLISH_WAIT: bool = false;

    fn trivial_witness() -> Self::Witness {
        ClassicWitness { nonce: 0 }
    }

    fn canonical_header_json(block: &Block<Self>) -> serde_json::Value {
        json!({
            "index": block.index,
            "timestamp": block.timestamp,
            "previous_hash": block.previous_hash.to_hex(),
            "mined_by": block.mined_by,
            "transactions": block.transactions,
            "nonce": block.witness.nonce,
        })
    }

    fn validate_puzzle(block: &Block<Self>, ctx: &Self::Context) -> bool {
        let target: String = std::iter::repeat('0').take(ctx.difficulty).collect();
        block.final_hash().to_hex().starts_with(&target)
    }

    fn mine(
        candidate: &mut Block<Self>,
        ctx: &Self::Context,
        mine_ctx: &Self::MineContext,
        cancel: &CancelToken,
    ) -> bool {
        let mut nonce: u64 = 0;
        loop {
            candidate.witness.nonce = nonce;
            if Self::validate_puzzle(candidate, ctx) {
                return true;
            }
            nonce = nonce.wrapping_add(1);
            if nonce % mine_ctx.check_interval == 0 {
                if cancel.is_cancelled() {
                    return false;
                }
                if !mine_ctx.pause_duration.is_zero() {
                    thread::sleep(mine_ctx.pause_duration);
                }
            }
        }
    }

    fn block_params(_config: &crate::config::NodeConfig) -> Self::Params {
        ClassicParams
    }
}
