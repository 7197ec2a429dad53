//! Mining scheduler and worker, generic over the puzzle scheme. The
//! scheme's own [`crate::block::PuzzleScheme::mine`] does the actual
//! search; this module owns the thread lifecycle, cancellation, and
//! (for schemes that need it) the publish-wait barrier.

use super::engine::NodeEngine;
use super::{now_secs, Envelope};
use crate::block::{Block, PuzzleScheme};
use crate::cancel::CancelToken;
use crate::crypto::Hash256;
use crate::types::Transaction;
use std::sync::Arc;
use std::time::Instant;

impl<S: PuzzleScheme + 'static> NodeEngine<S> {
    /// Rejects if already mining or the mempool is empty; otherwise
    /// takes an order-preserving mempool snapshot, flips `is_mining`,
    /// and spawns the worker under a fresh per-task cancellation token
    /// linked to the node's global `stop_signal`, so a single
    /// checkpoint check inside `S::mine` observes both a locally
    /// accepted extension and a node-wide shutdown.
    pub(crate) fn try_start_mining(self: &Arc<Self>) {
        let mut data = self.data.lock().expect("data lock poisoned");
        if data.is_mining {
            return;
        }
        let (snapshot, tip_index, tip_hash) = {
            let chain = self.chain.lock().expect("chain lock poisoned");
            if chain.pending().is_empty() {
                return;
            }
            (chain.pending().to_vec(), chain.tip().index, chain.tip().final_hash())
        };

        data.is_mining = true;
        let cancel = CancelToken::linked(Arc::clone(&self.stop_signal));
        data.mining_cancel = Some(cancel.clone());

        let node = Arc::clone(self);
        let handle = std::thread::spawn(move || node.run_mining_worker(snapshot, tip_index, tip_hash, cancel));
        data.mining_handle = Some(handle);
    }

    fn run_mining_worker(
        self: Arc<Self>,
        transactions: Vec<Transaction>,
        tip_index: u64,
        tip_hash: Hash256,
        cancel: CancelToken,
    ) {
        self.metrics.mining_attempts_total.inc();
        let started = Instant::now();

        let params = S::block_params(&self.config);
        let mut candidate = Block::new_candidate(
            tip_index + 1,
            now_secs(),
            tip_hash,
            self.id.clone(),
            transactions,
            params,
        );
        let ctx = self.chain.lock().expect("chain lock poisoned").context().clone();

        let found = S::mine(&mut candidate, &ctx, &self.mine_context, &cancel);
        self.metrics
            .mining_duration_seconds
            .observe(started.elapsed().as_secs_f64());

        {
            let mut data = self.data.lock().expect("data lock poisoned");
            data.is_mining = false;
            data.mining_cancel = None;
        }

        if !found {
            return;
        }

        if S::NEEDS_PUBLISH_WAIT {
            self.wait_for_publish_barrier();
        }

        if self.inbox_tx.try_send(Envelope::MinedBlock(candidate)).is_err() {
            tracing::warn!(node = %self.id, "mailbox full, dropping locally mined block");
        }
    }

    /// Up to `publish_wait.attempts` checks, spaced `publish_wait.interval`
    /// apart, deferring publication while the dispatcher is mid
    /// `handle_block`; publishes anyway once the budget is exhausted.
    fn wait_for_publish_barrier(&self) {
        for _ in 0..self.config.publish_wait.attempts {
            let handling = self.data.lock().expect("data lock poisoned").handling_block;
            if !handling {
                return;
            }
            std::thread::sleep(self.config.publish_wait.interval);
        }
    }
}
