//! The Max-Cut solver oracle boundary.
//!
//! Any algorithm that returns a partition achieving `cut >= target`
//! within a bounded budget and honours the cancellation token at
//! cooperative checkpoints is a compliant implementation; this module
//! supplies the trait and a greedy local-search instance so the
//! graph-PoW path is runnable without a real variational solver.

use crate::block::{cut_size, Graph};
use crate::cancel::CancelToken;
use rand::seq::SliceRandom;
use rand::Rng;

/// The external Max-Cut oracle. `solve` returns `None` on budget
/// exhaustion, cancellation, or internal failure; a `None` result is
/// never a hard error, it means the mining attempt produces nothing.
pub trait MaxCutSolver {
    fn solve(&self, graph: &Graph, target: u64, cancel: &CancelToken) -> Option<Vec<bool>>;
}

/// Greedy local search: starts from a random partition, then
/// repeatedly flips whichever single vertex most increases the cut
/// until no flip helps or the cut meets `target`. Checks `cancel`
/// between rounds and gives up after a bounded number of rounds.
pub struct GreedyLocalSearchSolver {
    pub max_rounds: usize,
}

impl Default for GreedyLocalSearchSolver {
    fn default() -> Self {
        GreedyLocalSearchSolver { max_rounds: 200 }
    }
}

impl GreedyLocalSearchSolver {
    fn delta_for_flip(graph: &Graph, partition: &[bool], vertex: usize) -> i64 {
        let mut delta = 0i64;
        for (i, j) in &graph.edges {
            let (other, touches) = if *i == vertex {
                (*j, true)
            } else if *j == vertex {
                (*i, true)
            } else {
                (0, false)
            };
            if !touches {
                continue;
            }
            let was_cut = partition[vertex] != partition[other];
            if was_cut {
                delta -= 1;
            } else {
                delta += 1;
            }
        }
        delta
    }
}

impl MaxCutSolver for GreedyLocalSearchSolver {
    fn solve(&self, graph: &Graph, target: u64, cancel: &CancelToken) -> Option<Vec<bool>> {
        if graph.node_count == 0 {
            return if target == 0 { Some(Vec::new()) } else { None };
        }
        let mut rng = rand::thread_rng();
        let mut order: Vec<usize> = (0..graph.node_count).collect();
        let mut partition: Vec<bool> = (0..graph.node_count).map(|_| rng.gen_bool(0.5)).collect();

        if cut_size(graph, &partition) >= target {
            return Some(partition);
        }

        for _round in 0..self.max_rounds {
            if cancel.is_cancelled() {
                return None;
            }
            order.shuffle(&mut rng);
            let mut improved = false;
            for &vertex in &order {
                let delta = Self::delta_for_flip(graph, &partition, vertex);
                if delta > 0 {
                    partition[vertex] = !partition[vertex];
                    improved = true;
                    if cut_size(graph, &partition) >= target {
                        return Some(partition);
                    }
                }
            }
            if !improved {
                break;
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Graph {
        Graph {
            node_count: 3,
            edges: vec![(0, 1), (0, 2), (1, 2)],
        }
    }

    #[test]
    fn solves_achievable_target() {
        let graph = triangle();
        let solver = GreedyLocalSearchSolver::default();
        let cancel = CancelToken::new();
        let partition = solver.solve(&graph, 2, &cancel).expect("should find a cut");
        assert!(cut_size(&graph, &partition) >= 2);
    }

    #[test]
    fn cancellation_stops_the_search() {
        let graph = triangle();
        let solver = GreedyLocalSearchSolver::default();
        let cancel = CancelToken::new();
        cancel.cancel();
        // An impossible target forces at least one round, which must
        // observe the cancellation and bail out with None.
        assert_eq!(solver.solve(&graph, 3, &cancel), None);
    }

    #[test]
    fn empty_graph_with_zero_target_solves_trivially() {
        let graph = Graph {
            node_count: 0,
            edges: vec![],
        };
        let solver = GreedyLocalSearchSolver::default();
        let cancel = CancelToken::new();
        assert_eq!(solver.solve(&graph, 0, &cancel), Some(Vec::new()));
    }
}
