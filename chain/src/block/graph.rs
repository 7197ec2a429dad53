//! Graph Max-Cut PoW variant.
//!
//! The puzzle graph is a deterministic function of
//! `(previous_hash, transactions_hash, graph_N, graph_p)`; every node
//! must derive the bit-identical graph to validate a block without
//! needing the miner's search trace.

use super::{transactions_hash, Block, PuzzleScheme};
use crate::cancel::CancelToken;
use crate::crypto::Hash256;
use crate::solver::MaxCutSolver;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

const GRAPH_SEED_TAG: &[u8] = b"graph-seed:";
const GRAPH_HASH_TAG: &[u8] = b"block/graph:";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphParams {
    pub graph_n: usize,
    pub graph_p: f64,
    pub difficulty_ratio: f64,
}

/// Partition bitstring of length `graph_n`: the graph-PoW witness.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct GraphWitness {
    pub partition: Vec<bool>,
}

/// An undirected simple graph over `0..node_count`, represented as an
/// edge list (small `graph_N` in every spec scenario, so no adjacency
/// structure is warranted).
#[derive(Clone, Debug)]
pub struct Graph {
    pub node_count: usize,
    pub edges: Vec<(usize, usize)>,
}

impl Graph {
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

/// Derives the seed bytes `SHA-256(previous_hash ‖ "-" ‖ transactions_hash)`.
fn seed_bytes(previous_hash: &Hash256, txs_hash: &Hash256) -> Hash256 {
    let mut preimage = Vec::with_capacity(2 * Hash256::ZERO.as_bytes().len() + 1);
    preimage.extend_from_slice(previous_hash.as_bytes());
    preimage.push(b'-');
    preimage.extend_from_slice(txs_hash.as_bytes());
    Hash256::domain_hash(GRAPH_SEED_TAG, &preimage)
}

/// Generates the deterministic graph for `(previous_hash, txs_hash,
/// graph_n, graph_p)`. Draws one uniform `[0, 1)` value per unordered
/// pair `(i, j)` with `i < j`, in lexicographic order, from a ChaCha20
/// stream seeded with the derived seed bytes; includes the edge iff
/// the draw is below `graph_p`.
pub fn generate_graph(previous_hash: &Hash256, txs_hash: &Hash256, graph_n: usize, graph_p: f64) -> Graph {
    let seed = seed_bytes(previous_hash, txs_hash);
    let mut rng = ChaCha20Rng::from_seed(*seed.as_bytes());
    let mut edges = Vec::new();
    for i in 0..graph_n {
        for j in (i + 1)..graph_n {
            let draw = (rng.next_u64() as f64) / (u64::MAX as f64 + 1.0);
            if draw < graph_p {
                edges.push((i, j));
            }
        }
    }
    Graph {
        node_count: graph_n,
        edges,
    }
}

/// `target = ceil(difficulty_ratio * |E(G)|)`; ceiling is used
/// everywhere, for both mining and validation.
pub fn target_cut(graph: &Graph, difficulty_ratio: f64) -> u64 {
    let edges = graph.edge_count() as f64;
    (difficulty_ratio * edges).ceil() as u64
}

/// Number of edges whose endpoints lie on different sides of `partition`.
pub fn cut_size(graph: &Graph, partition: &[bool]) -> u64 {
    graph
        .edges
        .iter()
        .filter(|(i, j)| partition[*i] != partition[*j])
        .count() as u64
}

/// The external oracle handle the graph miner delegates to.
#[derive(Clone)]
pub struct GraphMineContext {
    pub solver: Arc<dyn MaxCutSolver + Send + Sync>,
}

#[derive(Clone, Debug)]
pub struct GraphScheme;

impl PuzzleScheme for GraphScheme {
    type Witness = GraphWitness;
    type Params = GraphParams;
    type Context = ();
    type MineContext = GraphMineContext;

    const HASH_TAG: &'static [u8] = GRAPH_HASH_TAG;
    const NEEDS_PUBLISH_WAIT: bool = true;

    fn trivial_witness() -> Self::Witness {
        GraphWitness { partition: Vec::new() }
    }

    fn canonical_header_json(block: &Block<Self>) -> serde_json::Value {
        json!({
            "index": block.index,
            "timestamp": block.timestamp,
            "previous_hash": block.previous_hash.to_hex(),
            "mined_by": block.mined_by,
            "transactions_hash": transactions_hash(&block.transactions).to_hex(),
            "graph_n": block.params.graph_n,
            "graph_p": block.params.graph_p,
            "difficulty_ratio": block.params.difficulty_ratio,
            "partition": block.witness.partition,
        })
    }

    fn validate_puzzle(block: &Block<Self>, _ctx: &Self::Context) -> bool {
        if block.witness.partition.len() != block.params.graph_n {
            return false;
        }
        let txs_hash = transactions_hash(&block.transactions);
        let graph = generate_graph(
            &block.previous_hash,
            &txs_hash,
            block.params.graph_n,
            block.params.graph_p,
        );
        let target = target_cut(&graph, block.params.difficulty_ratio);
        cut_size(&graph, &block.witness.partition) >= target
    }

    /// Delegates to the external Max-Cut oracle. `None` from the solver
    /// (budget exhaustion, cancellation, internal failure) is not an
    /// error: the mining attempt simply produces nothing this round.
    fn mine(
        candidate: &mut Block<Self>,
        _ctx: &Self::Context,
        mine_ctx: &Self::MineContext,
        cancel: &CancelToken,
    ) -> bool {
        let txs_hash = transactions_hash(&candidate.transactions);
        let graph = generate_graph(
            &candidate.previous_hash,
            &txs_hash,
            candidate.params.graph_n,
            candidate.params.graph_p,
        );
        let target = target_cut(&graph, candidate.params.difficulty_ratio);
        match mine_ctx.solver.solve(&graph, target, cancel) {
            Some(partition) => {
                candidate.witness.partition = partition;
                true
            }
            None => false,
        }
    }

    fn block_params(config: &crate::config::NodeConfig) -> Self::Params {
        GraphParams {
            graph_n: config.graph.graph_n,
            graph_p: config.graph.graph_p,
            difficulty_ratio: config.graph.difficulty_ratio,
        }
    }
}
