//! Chain replica: an append-only, single-lock-guarded sequence of
//! blocks plus the pending-transaction mempool.

use crate::block::{genesis_block, Block, PuzzleScheme};
use crate::error::ValidationError;
use crate::types::Transaction;
use std::collections::HashSet;

/// Append-only chain of blocks of one puzzle scheme, plus its mempool.
/// Every mutating operation here is meant to be called while holding
/// this chain's own lock (the node engine wraps it in a `Mutex`).
pub struct Chain<S: PuzzleScheme> {
    blocks: Vec<Block<S>>,
    context: S::Context,
    pending: Vec<Transaction>,
}

impl<S: PuzzleScheme> Chain<S> {
    /// Builds a fresh chain from deterministic genesis parameters: no
    /// cloning of a lock-bearing template, each node constructs its own
    /// genesis from the same `genesis_params`/`context`.
    pub fn new(genesis_params: S::Params, context: S::Context) -> Self {
        let genesis = genesis_block::<S>(genesis_params);
        Chain {
            blocks: vec![genesis],
            context,
            pending: Vec::new(),
        }
    }

    pub fn context(&self) -> &S::Context {
        &self.context
    }

    pub fn tip(&self) -> &Block<S> {
        self.blocks
            .last()
            .expect("chain always has at least the genesis block")
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn blocks(&self) -> &[Block<S>] {
        &self.blocks
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    /// Pushes `tx` onto the mempool unconditionally; validation and
    /// deduplication happen upstream in the node engine.
    pub fn add_transaction(&mut self, tx: Transaction) {
        self.pending.push(tx);
    }

    /// Walks the whole chain re-deriving every invariant from scratch:
    /// linkage, each block's own puzzle predicate, and every embedded
    /// transaction's signature. The source's `is_chain_valid` left the
    /// graph-PoW case as a stub; this resolves that open question by
    /// never special-casing the scheme — `S::validate_puzzle` already
    /// knows how to regenerate the graph and recheck the cut for
    /// `GraphScheme`, so a single walk covers both variants.
    pub fn validate_full(&self) -> Result<(), ValidationError> {
        let genesis = &self.blocks[0];
        if genesis.index != 0 || genesis.previous_hash != crate::crypto::Hash256::ZERO {
            return Err(ValidationError::LinkMismatch);
        }
        for window in self.blocks.windows(2) {
            let (parent, child) = (&window[0], &window[1]);
            if child.index != parent.index + 1 || child.previous_hash != parent.final_hash() {
                return Err(ValidationError::LinkMismatch);
            }
        }
        // Genesis is accepted by construction, not mined: its trivial
        // witness is never expected to satisfy the puzzle predicate,
        // so only non-genesis blocks are puzzle-checked here.
        for block in self.blocks.iter().filter(|b| b.index != 0) {
            if !block.validate_puzzle(&self.context) {
                return Err(ValidationError::PuzzleUnsatisfied);
            }
        }
        for block in &self.blocks {
            if !block.transactions.iter().all(|tx| tx.is_valid()) {
                return Err(ValidationError::InternalTxInvalid);
            }
        }
        Ok(())
    }

    /// Accepts `block` iff all five conditions hold; on acceptance,
    /// appends it and removes its transactions from `pending`.
    pub fn add_block(&mut self, block: Block<S>) -> Result<(), ValidationError> {
        let tip = self.tip();
        if block.index != tip.index + 1 || block.previous_hash != tip.final_hash() {
            return Err(ValidationError::LinkMismatch);
        }
        if !block.validate_puzzle(&self.context) {
            return Err(ValidationError::PuzzleUnsatisfied);
        }
        // final_hash is always recomputed below; a block is
        // self-consistent with the hash it was constructed from by
        // definition, so condition 3 is a structural invariant here
        // rather than a stored-vs-recomputed comparison. Callers that
        // received a block with a *claimed* separate hash (e.g. over
        // the wire) must compare it against `final_hash()` themselves
        // before calling `add_block`.
        if !block.transactions.iter().all(|tx| tx.is_valid()) {
            return Err(ValidationError::InternalTxInvalid);
        }

        let included: HashSet<_> = block.transactions.iter().map(|tx| tx.hash()).collect();
        self.pending.retain(|tx| !included.contains(&tx.hash()));
        self.blocks.push(block);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{ClassicContext, ClassicParams, ClassicScheme};
    use crate::crypto::{EcdsaWallet, Hash256, Signer};
    use crate::types::Transaction;

    fn new_chain(difficulty: usize) -> Chain<ClassicScheme> {
        Chain::new(ClassicParams, ClassicContext { difficulty })
    }

    fn mine_block(chain: &Chain<ClassicScheme>, txs: Vec<Transaction>) -> Block<ClassicScheme> {
        let tip = chain.tip();
        let mut candidate = Block::new_candidate(
            tip.index + 1,
            1,
            tip.final_hash(),
            "Node-test",
            txs,
            ClassicParams,
        );
        loop {
            if candidate.validate_puzzle(chain.context()) {
                return candidate;
            }
            candidate.witness.nonce += 1;
        }
    }

    #[test]
    fn genesis_has_index_zero_and_zero_previous_hash() {
        let chain = new_chain(0);
        assert_eq!(chain.tip().index, 0);
        assert_eq!(chain.tip().previous_hash, Hash256::ZERO);
        assert_eq!(chain.len(), 1);
    }

    #[test]
    fn accepts_a_valid_extension() {
        let mut chain = new_chain(1);
        let block = mine_block(&chain, Vec::new());
        assert!(chain.add_block(block).is_ok());
        assert_eq!(chain.len(), 2);
    }

    #[test]
    fn rejects_link_mismatch() {
        let mut chain = new_chain(0);
        let mut block = mine_block(&chain, Vec::new());
        block.previous_hash = Hash256::ZERO;
        assert_eq!(chain.add_block(block), Err(ValidationError::LinkMismatch));
    }

    #[test]
    fn rejects_wrong_index() {
        let mut chain = new_chain(0);
        let mut block = mine_block(&chain, Vec::new());
        block.index = 99;
        assert_eq!(chain.add_block(block), Err(ValidationError::LinkMismatch));
    }

    #[test]
    fn rejects_unsatisfied_puzzle() {
        let mut chain = new_chain(64);
        let tip = chain.tip();
        let candidate = Block::new_candidate(
            tip.index + 1,
            1,
            tip.final_hash(),
            "Node-test",
            Vec::new(),
            ClassicParams,
        );
        assert_eq!(
            chain.add_block(candidate),
            Err(ValidationError::PuzzleUnsatisfied)
        );
    }

    #[test]
    fn rejects_invalid_embedded_transaction() {
        let mut chain = new_chain(0);
        let alice = EcdsaWallet::generate();
        let bob = EcdsaWallet::generate();
        let tx = Transaction::new(alice.address(), bob.address(), 1.0, vec![]);
        let block = mine_block(&chain, vec![tx]);
        assert_eq!(
            chain.add_block(block),
            Err(ValidationError::InternalTxInvalid)
        );
    }

    #[test]
    fn validate_full_accepts_a_genesis_only_chain() {
        let chain = new_chain(4);
        assert_eq!(chain.validate_full(), Ok(()));
    }

    #[test]
    fn validate_full_walks_every_link_and_puzzle() {
        let mut chain = new_chain(1);
        for _ in 0..3 {
            let block = mine_block(&chain, Vec::new());
            chain.add_block(block).unwrap();
        }
        assert_eq!(chain.validate_full(), Ok(()));
    }

    #[test]
    fn validate_full_catches_a_tampered_link_bypassing_add_block() {
        let mut chain = new_chain(0);
        let block = mine_block(&chain, Vec::new());
        chain.add_block(block).unwrap();
        // Simulate corrupted/loaded state: break the stored link
        // directly, bypassing `add_block`'s own checks.
        chain.blocks[1].previous_hash = Hash256::domain_hash(b"tamper:", b"x");
        assert_eq!(chain.validate_full(), Err(ValidationError::LinkMismatch));
    }

    #[test]
    fn accepting_block_removes_its_transactions_from_pending() {
        let mut chain = new_chain(0);
        let alice = EcdsaWallet::generate();
        let bob = EcdsaWallet::generate();
        let mut tx = Transaction::new(alice.address(), bob.address(), 1.0, vec![]);
        tx.sign(&alice).unwrap();
        chain.add_transaction(tx.clone());
        assert_eq!(chain.pending().len(), 1);

        let block = mine_block(&chain, vec![tx]);
        chain.add_block(block).unwrap();
        assert!(chain.pending().is_empty());
    }
}
