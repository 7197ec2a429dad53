//! The dispatcher loop: a single thread per node polling its inbound
//! mailbox, and otherwise rolling dice on origination/mining.

use super::Envelope;
use crate::block::PuzzleScheme;
use super::engine::NodeEngine;
use crate::crypto::Address;
use crate::types::Transaction;
use crossbeam_channel::TryRecvError;
use rand::Rng;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

impl<S: PuzzleScheme + 'static> NodeEngine<S> {
    /// Spawns the dispatcher thread. The loop exits promptly once
    /// `stop_signal` is observed at the top of an iteration.
    pub fn start(self: &Arc<Self>) {
        let node = Arc::clone(self);
        let handle = std::thread::spawn(move || node.dispatcher_loop());
        *self
            .dispatcher_handle
            .lock()
            .expect("dispatcher handle lock poisoned") = Some(handle);
    }

    fn dispatcher_loop(self: Arc<Self>) {
        let mut rng = rand::thread_rng();
        while !self.stop_signal.load(Ordering::SeqCst) {
            match self.inbox_rx.try_recv() {
                Ok(Envelope::Transaction(tx)) => self.handle_transaction(tx),
                Ok(Envelope::Block(block)) => self.handle_block(block),
                Ok(Envelope::MinedBlock(block)) => self.handle_block(block),
                Err(TryRecvError::Empty) => {
                    let roll: f64 = rng.gen();
                    let p_tx = self.config.dispatcher.p_tx;
                    let p_mine = self.config.dispatcher.p_mine;
                    if roll < p_tx {
                        self.originate_transaction(&mut rng);
                    } else if roll < p_tx + p_mine {
                        self.try_start_mining();
                    }
                    let (lo, hi) = self.config.dispatcher.idle_sleep_range;
                    let lo_ms = lo.as_millis() as u64;
                    let hi_ms = hi.as_millis().max(lo.as_millis()) as u64;
                    let sleep_ms = if hi_ms > lo_ms {
                        rng.gen_range(lo_ms..=hi_ms)
                    } else {
                        lo_ms
                    };
                    std::thread::sleep(Duration::from_millis(sleep_ms));
                }
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Signs a new transaction and sends it to exactly one randomly
    /// chosen peer; that peer's own `handle_transaction` rebroadcast
    /// carries it the rest of the way across the network.
    fn originate_transaction(self: &Arc<Self>, rng: &mut impl Rng) {
        let target = {
            let peers = self.peers.read().expect("peer directory lock poisoned");
            if peers.is_empty() {
                return;
            }
            let ids: Vec<&String> = peers.keys().collect();
            let picked = ids[rng.gen_range(0..ids.len())].clone();
            (picked.clone(), peers[&picked].clone())
        };
        let (peer_id, mailbox) = target;

        let mut tx = Transaction::new(self.wallet.address(), Address(peer_id.clone()), 1.0, Vec::new());
        if tx.sign(self.wallet.as_ref()).is_err() {
            return;
        }

        if mailbox.try_send(Envelope::Transaction(tx)).is_err() {
            tracing::warn!(node = %self.id, peer = %peer_id, "mailbox full, dropping originated transaction");
        }
    }
}
