//! End-to-end scenario 1 (classic PoW consensus) and scenario 4 (link
//! rejection), driven deterministically: blocks are mined directly and
//! delivered to every node's `handle_block` rather than relying on
//! wall-clock dispatcher timing, since the full timed simulation
//! harness is out of scope for this crate.

use chain::block::{Block, ClassicContext, ClassicMineContext, ClassicParams, ClassicScheme};
use chain::chain::Chain;
use chain::config::NodeConfig;
use chain::crypto::{EcdsaWallet, Hash256, Signer};
use chain::node::NodeEngine;
use chain::types::Transaction;
use std::collections::HashSet;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

fn new_node(id: &str, difficulty: usize) -> Arc<NodeEngine<ClassicScheme>> {
    let wallet = Arc::new(EcdsaWallet::generate());
    let chain = Chain::<ClassicScheme>::new(ClassicParams, ClassicContext { difficulty });
    let mine_ctx = ClassicMineContext {
        check_interval: 1,
        pause_duration: Duration::from_millis(0),
    };
    let stop_signal = Arc::new(AtomicBool::new(false));
    NodeEngine::new(id, chain, wallet, mine_ctx, stop_signal, NodeConfig::default())
}

fn mine_extension(
    ctx: &ClassicContext,
    tip_index: u64,
    tip_hash: Hash256,
    transactions: Vec<Transaction>,
    mined_by: &str,
) -> Block<ClassicScheme> {
    let mut candidate =
        Block::new_candidate(tip_index + 1, 1, tip_hash, mined_by, transactions, ClassicParams);
    loop {
        if candidate.validate_puzzle(ctx) {
            return candidate;
        }
        candidate.witness.nonce += 1;
    }
}

fn connect_all_to_all(nodes: &[Arc<NodeEngine<ClassicScheme>>]) {
    for i in 0..nodes.len() {
        for j in 0..nodes.len() {
            if i != j {
                nodes[i].add_peer(nodes[j].id.clone(), nodes[j].inbox_sender());
            }
        }
    }
}

#[test]
fn four_nodes_converge_to_the_same_tip_after_gossip() {
    let difficulty = 1;
    let ctx = ClassicContext { difficulty };
    let nodes: Vec<_> = (0..4).map(|i| new_node(&format!("Node-{i}"), difficulty)).collect();
    connect_all_to_all(&nodes);

    let alice = EcdsaWallet::generate();
    let bob = EcdsaWallet::generate();
    let mut tx = Transaction::new(alice.address(), bob.address(), 2.5, vec!["in-0".into()]);
    tx.sign(&alice).unwrap();

    // Gossip the transaction to every node directly, modelling full
    // propagation without depending on the dispatcher's randomised
    // peer-to-peer fan-out.
    for node in &nodes {
        node.handle_transaction(tx.clone());
    }
    for node in &nodes {
        assert_eq!(node.mempool_len(), 1);
    }

    let tip_index = nodes[0].chain_len() as u64 - 1;
    let tip_hash = nodes[0].tip_hash();
    let block = mine_extension(&ctx, tip_index, tip_hash, vec![tx], "Node-0");

    for node in &nodes {
        node.handle_block(block.clone());
    }

    let tips: HashSet<_> = nodes.iter().map(|n| n.tip_hash()).collect();
    assert_eq!(tips.len(), 1, "all nodes must converge on the same tip hash");
    for node in &nodes {
        assert_eq!(node.chain_len(), 2);
        assert_eq!(node.mempool_len(), 0, "the mined transaction must be pruned everywhere");
    }

    // A second round: mine another block on top, deliver it, recheck
    // consensus still holds after more than one extension.
    let tip_index = nodes[0].chain_len() as u64 - 1;
    let tip_hash = nodes[0].tip_hash();
    let second = mine_extension(&ctx, tip_index, tip_hash, Vec::new(), "Node-1");
    for node in &nodes {
        node.handle_block(second.clone());
    }
    let tips: HashSet<_> = nodes.iter().map(|n| n.tip_hash()).collect();
    assert_eq!(tips.len(), 1);
    for node in &nodes {
        assert_eq!(node.chain_len(), 3);
    }
}

#[test]
fn a_block_with_a_stale_parent_link_is_dropped_without_mutating_the_chain() {
    // Build a node whose tip sits at index 3, matching scenario 4's
    // "tip has index 3" setup, then inject a handcrafted valid-puzzle
    // block whose previous_hash is all zeros instead of the real tip.
    let difficulty = 0;
    let ctx = ClassicContext { difficulty };
    let node = new_node("Node-0", difficulty);

    for _ in 0..3 {
        let tip_index = node.chain_len() as u64 - 1;
        let tip_hash = node.tip_hash();
        let block = mine_extension(&ctx, tip_index, tip_hash, Vec::new(), "Node-0");
        node.handle_block(block);
    }
    assert_eq!(node.chain_len(), 4);

    let forged = mine_extension(&ctx, 3, Hash256::ZERO, Vec::new(), "Attacker");
    let forged_hash = forged.final_hash();

    node.handle_block(forged);

    assert_eq!(node.chain_len(), 4, "a stale-link block must never be appended");
    // known_block_hashes is private to the engine; re-delivering the
    // same forged block is an independently observable no-op instead.
    let before = node.chain_len();
    let resend = mine_extension(&ctx, 3, Hash256::ZERO, Vec::new(), "Attacker");
    assert_eq!(resend.final_hash(), forged_hash);
    node.handle_block(resend);
    assert_eq!(node.chain_len(), before);
}
