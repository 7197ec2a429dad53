//! Block header + transaction list + puzzle witness, generic over the
//! puzzle scheme (classic leading-zero or graph Max-Cut).
//!
//! A [`PuzzleScheme`] is the pluggable strategy object that knows how
//! to canonicalise a header for hashing and how to validate its own
//! witness; [`Block<S>`], [`crate::chain::Chain<S>`] and
//! [`crate::node::NodeEngine<S>`] are each a single generic
//! implementation parameterised over it.

mod classic;
mod graph;

pub use classic::{ClassicContext, ClassicMineContext, ClassicParams, ClassicScheme, ClassicWitness};
pub use graph::{
    cut_size, generate_graph, target_cut, Graph, GraphMineContext, GraphParams, GraphScheme,
    GraphWitness,
};

use crate::cancel::CancelToken;
use crate::crypto::{canonical_json_bytes, Hash256};
use crate::types::Transaction;
use serde::{Deserialize, Serialize};
use std::fmt;

const TRANSACTIONS_HASH_TAG: &[u8] = b"block/transactions:";

/// The pluggable puzzle strategy. `Context` carries whatever external
/// parameter the scheme needs to validate a witness but does not itself
/// store on the block (classic: the chain's fixed `difficulty`; graph:
/// unit, since graph parameters travel with the block).
pub trait PuzzleScheme: Clone + fmt::Debug + Sized {
    type Witness: Clone + fmt::Debug + PartialEq + Serialize + for<'de> Deserialize<'de>;
    type Params: Clone + fmt::Debug + Serialize + for<'de> Deserialize<'de>;
    type Context: Clone + fmt::Debug;

    /// Whatever the mining worker needs that isn't already on the
    /// candidate block: checkpoint/throttle knobs for the classic
    /// variant, the solver handle for the graph variant.
    type MineContext: Clone;

    /// Fixed ASCII tag separating this scheme's final-hash domain from
    /// every other hash space in the crate.
    const HASH_TAG: &'static [u8];

    /// Whether a successful `mine` should defer publication behind the
    /// publish-wait barrier. Only the graph variant's heuristic search
    /// is slow/racy enough to need it.
    const NEEDS_PUBLISH_WAIT: bool;

    /// The witness used by genesis: a nonce of 0 or an all-zero partition.
    fn trivial_witness() -> Self::Witness;

    /// Canonical header value (lexicographically key-sorted once
    /// serialized) fed into the final hash. Includes the witness; for
    /// the classic variant includes the full transaction list, for the
    /// graph variant includes only `transactions_hash`.
    fn canonical_header_json(block: &Block<Self>) -> serde_json::Value;

    /// The puzzle predicate: true iff the witness satisfies the
    /// scheme's difficulty condition.
    fn validate_puzzle(block: &Block<Self>, ctx: &Self::Context) -> bool;

    /// Searches for a satisfying witness, mutating `candidate.witness`
    /// in place. Returns `true` on success, `false` if cancelled or if
    /// the search budget was exhausted without success (the block
    /// handler's subsequent `validate_puzzle` check is the final word;
    /// a `true` return here is expected, not re-derived, to always
    /// satisfy it). `cancel` is expected to be checked at every
    /// cooperative checkpoint; the caller links it to both the
    /// per-task cancellation and the node's global `stop_signal`
    /// (`CancelToken::linked`), so a single `is_cancelled()` check
    /// here covers both.
    fn mine(
        candidate: &mut Block<Self>,
        ctx: &Self::Context,
        mine_ctx: &Self::MineContext,
        cancel: &CancelToken,
    ) -> bool;

    /// Puzzle parameters for a freshly constructed candidate block,
    /// taken from the node's configuration.
    fn block_params(config: &crate::config::NodeConfig) -> Self::Params;
}

/// SHA-256 of the canonical JSON of the ordered transaction list.
pub fn transactions_hash(transactions: &[Transaction]) -> Hash256 {
    let bytes = canonical_json_bytes(transactions);
    Hash256::domain_hash(TRANSACTIONS_HASH_TAG, &bytes)
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(bound(
    serialize = "S::Witness: Serialize, S::Params: Serialize",
    deserialize = "S::Witness: Deserialize<'de>, S::Params: Deserialize<'de>"
))]
pub struct Block<S: PuzzleScheme> {
    pub index: u64,
    pub timestamp: u64,
    pub previous_hash: Hash256,
    pub mined_by: String,
    pub transactions: Vec<Transaction>,
    pub witness: S::Witness,
    pub params: S::Params,
}

impl<S: PuzzleScheme> Block<S> {
    /// Builds a candidate block with the scheme's trivial witness; the
    /// miner fills in a real witness before publishing.
    pub fn new_candidate(
        index: u64,
        timestamp: u64,
        previous_hash: Hash256,
        mined_by: impl Into<String>,
        transactions: Vec<Transaction>,
        params: S::Params,
    ) -> Self {
        Block {
            index,
            timestamp,
            previous_hash,
            mined_by: mined_by.into(),
            transactions,
            witness: S::trivial_witness(),
            params,
        }
    }

    pub fn transactions_hash(&self) -> Hash256 {
        transactions_hash(&self.transactions)
    }

    /// SHA-256 over the canonical header including the witness; this
    /// block's content address.
    pub fn final_hash(&self) -> Hash256 {
        let header = S::canonical_header_json(self);
        let bytes = canonical_json_bytes(&header);
        Hash256::domain_hash(S::HASH_TAG, &bytes)
    }

    pub fn validate_puzzle(&self, ctx: &S::Context) -> bool {
        S::validate_puzzle(self, ctx)
    }
}

/// Genesis block: index 0, previous_hash all zeros, empty transaction
/// list, trivial witness, miner "none".
pub fn genesis_block<S: PuzzleScheme>(params: S::Params) -> Block<S> {
    Block::new_candidate(0, 0, Hash256::ZERO, "none", Vec::new(), params)
}
