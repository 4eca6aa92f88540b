// This code is part of Qiskit.
//
// (C) Copyright IBM 2024
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

// A reduced VF2-family matcher in the spirit of the implementations in petgraph and rustworkx,
// cut down to what layout selection needs: lazy enumeration of non-induced directed subgraph
// embeddings under a state-visit budget.

use std::cmp::Reverse;
use std::iter::FusedIterator;

use fixedbitset::FixedBitSet;
use rustworkx_core::petgraph::graph::{Graph, NodeIndex};
use rustworkx_core::petgraph::{Incoming, Outgoing};

/// Decide the order pattern nodes are matched in.  Connected-first, most-placed-neighbors first,
/// ties to the higher-degree then lower-index node; the VF2++ ordering heuristic without its
/// BFS-level bookkeeping.
fn matching_order<N, E>(pattern: &Graph<N, E>) -> Vec<NodeIndex> {
    let n = pattern.node_count();
    let degree: Vec<usize> = (0..n)
        .map(|i| pattern.neighbors_undirected(NodeIndex::new(i)).count())
        .collect();
    let mut placed = vec![false; n];
    let mut placed_neighbors = vec![0usize; n];
    let mut order = Vec::with_capacity(n);
    while order.len() < n {
        let next = (0..n)
            .filter(|i| !placed[*i])
            .max_by_key(|i| (placed_neighbors[*i], degree[*i], Reverse(*i)))
            .expect("loop condition guarantees an unplaced node");
        placed[next] = true;
        order.push(NodeIndex::new(next));
        for neighbor in pattern.neighbors_undirected(NodeIndex::new(next)) {
            placed_neighbors[neighbor.index()] += 1;
        }
    }
    order
}

struct Frame {
    candidates: Vec<NodeIndex>,
    next: usize,
    chosen: Option<NodeIndex>,
}

/// Lazy enumeration of the injective maps from `pattern` nodes onto `host` nodes under which
/// every directed pattern edge lands on a directed host edge (non-induced: extra host edges
/// between mapped nodes are fine).
///
/// Each yielded item is indexed by pattern node index and holds the matched host node.  The
/// iterator is restartable in the sense that it suspends between candidates and resumes exactly
/// where it stopped; dropping it part-way costs nothing.  `call_limit` caps the internal state
/// visits (candidate feasibility checks) across the whole enumeration; once spent, the iterator
/// fuses.  An empty pattern yields exactly one empty mapping.
///
/// Both graphs must be loop-free and without parallel edges; candidate ordering, and therefore
/// the full enumeration order, is deterministic in the node indices of both graphs.
pub struct Vf2Algorithm<'a, N1, E1, N2, E2> {
    pattern: &'a Graph<N1, E1>,
    host: &'a Graph<N2, E2>,
    call_limit: Option<usize>,
    calls: usize,
    order: Vec<NodeIndex>,
    /// Pattern node index -> host node, for the partial map built so far.
    assigned: Vec<Option<NodeIndex>>,
    used: FixedBitSet,
    stack: Vec<Frame>,
    started: bool,
    done: bool,
}

impl<'a, N1, E1, N2, E2> Vf2Algorithm<'a, N1, E1, N2, E2> {
    pub fn new(
        pattern: &'a Graph<N1, E1>,
        host: &'a Graph<N2, E2>,
        call_limit: Option<usize>,
    ) -> Self {
        Vf2Algorithm {
            pattern,
            host,
            call_limit,
            calls: 0,
            order: matching_order(pattern),
            assigned: vec![None; pattern.node_count()],
            used: FixedBitSet::with_capacity(host.node_count()),
            stack: Vec::new(),
            started: false,
            done: false,
        }
    }

    /// State visits consumed so far.
    pub fn calls(&self) -> usize {
        self.calls
    }

    fn candidates_for(&self, depth: usize) -> Vec<NodeIndex> {
        let p = self.order[depth];
        // Anchor on an already-placed neighbor when one exists; its image pins the candidates
        // down to a neighborhood instead of the whole host.
        for succ in self.pattern.neighbors_directed(p, Outgoing) {
            if let Some(h) = self.assigned[succ.index()] {
                let mut candidates: Vec<NodeIndex> =
                    self.host.neighbors_directed(h, Incoming).collect();
                candidates.sort_unstable();
                candidates.dedup();
                return candidates;
            }
        }
        for pred in self.pattern.neighbors_directed(p, Incoming) {
            if let Some(h) = self.assigned[pred.index()] {
                let mut candidates: Vec<NodeIndex> =
                    self.host.neighbors_directed(h, Outgoing).collect();
                candidates.sort_unstable();
                candidates.dedup();
                return candidates;
            }
        }
        (0..self.host.node_count())
            .map(NodeIndex::new)
            .filter(|n| !self.used.contains(n.index()))
            .collect()
    }

    fn feasible(&self, depth: usize, cand: NodeIndex) -> bool {
        if self.used.contains(cand.index()) {
            return false;
        }
        let p = self.order[depth];
        // Every pattern edge needs a distinct host edge, so the host node cannot have fewer
        // neighbors in either direction.
        if self.host.neighbors_directed(cand, Outgoing).count()
            < self.pattern.neighbors_directed(p, Outgoing).count()
            || self.host.neighbors_directed(cand, Incoming).count()
                < self.pattern.neighbors_directed(p, Incoming).count()
        {
            return false;
        }
        for succ in self.pattern.neighbors_directed(p, Outgoing) {
            if let Some(h) = self.assigned[succ.index()] {
                if self.host.find_edge(cand, h).is_none() {
                    return false;
                }
            }
        }
        for pred in self.pattern.neighbors_directed(p, Incoming) {
            if let Some(h) = self.assigned[pred.index()] {
                if self.host.find_edge(h, cand).is_none() {
                    return false;
                }
            }
        }
        true
    }
}

impl<N1, E1, N2, E2> Iterator for Vf2Algorithm<'_, N1, E1, N2, E2> {
    type Item = Vec<NodeIndex>;

    fn next(&mut self) -> Option<Vec<NodeIndex>> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if self.pattern.node_count() > self.host.node_count() {
                self.done = true;
                return None;
            }
            if self.order.is_empty() {
                self.done = true;
                return Some(Vec::new());
            }
            let candidates = self.candidates_for(0);
            self.stack.push(Frame {
                candidates,
                next: 0,
                chosen: None,
            });
        }
        loop {
            let depth = self.stack.len() - 1;
            // Resuming after a yield, or retrying after descent failed: release this depth's
            // previous choice before advancing.
            if let Some(prev) = self.stack[depth].chosen.take() {
                self.assigned[self.order[depth].index()] = None;
                self.used.set(prev.index(), false);
            }
            let mut advanced = None;
            while self.stack[depth].next < self.stack[depth].candidates.len() {
                let cand = self.stack[depth].candidates[self.stack[depth].next];
                self.stack[depth].next += 1;
                if self.call_limit.is_some_and(|limit| self.calls >= limit) {
                    self.done = true;
                    self.stack.clear();
                    return None;
                }
                self.calls += 1;
                if self.feasible(depth, cand) {
                    advanced = Some(cand);
                    break;
                }
            }
            match advanced {
                Some(cand) => {
                    self.assigned[self.order[depth].index()] = Some(cand);
                    self.used.insert(cand.index());
                    self.stack[depth].chosen = Some(cand);
                    if depth + 1 == self.order.len() {
                        return Some(
                            self.assigned
                                .iter()
                                .map(|h| h.expect("assignment is complete at full depth"))
                                .collect(),
                        );
                    }
                    let candidates = self.candidates_for(depth + 1);
                    self.stack.push(Frame {
                        candidates,
                        next: 0,
                        chosen: None,
                    });
                }
                None => {
                    self.stack.pop();
                    if self.stack.is_empty() {
                        self.done = true;
                        return None;
                    }
                }
            }
        }
    }
}

impl<N1, E1, N2, E2> FusedIterator for Vf2Algorithm<'_, N1, E1, N2, E2> {}

#[cfg(test)]
mod test {
    use super::*;

    fn graph_from_edges(nodes: usize, edges: &[(usize, usize)]) -> Graph<(), ()> {
        let mut graph = Graph::new();
        for _ in 0..nodes {
            graph.add_node(());
        }
        for (a, b) in edges {
            graph.add_edge(NodeIndex::new(*a), NodeIndex::new(*b), ());
        }
        graph
    }

    fn assert_valid_embedding(
        pattern: &Graph<(), ()>,
        host: &Graph<(), ()>,
        mapping: &[NodeIndex],
    ) {
        let mut seen = FixedBitSet::with_capacity(host.node_count());
        for h in mapping {
            assert!(!seen.contains(h.index()), "mapping is not injective");
            seen.insert(h.index());
        }
        for edge in pattern.edge_indices() {
            let (a, b) = pattern.edge_endpoints(edge).unwrap();
            assert!(
                host.find_edge(mapping[a.index()], mapping[b.index()]).is_some(),
                "pattern edge {:?} not preserved",
                (a, b),
            );
        }
    }

    #[test]
    fn path_into_cycle() {
        // Non-induced matching: the path embeds even though the cycle closes an extra edge.
        let pattern = graph_from_edges(3, &[(0, 1), (1, 2)]);
        let host = graph_from_edges(3, &[(0, 1), (1, 2), (2, 0)]);
        let mappings: Vec<_> = Vf2Algorithm::new(&pattern, &host, None).collect();
        assert_eq!(mappings.len(), 3);
        for mapping in &mappings {
            assert_valid_embedding(&pattern, &host, mapping);
        }
    }

    #[test]
    fn single_edge_into_line_enumerates_lazily() {
        let pattern = graph_from_edges(2, &[(0, 1)]);
        let host = graph_from_edges(3, &[(0, 1), (1, 2)]);
        let mut search = Vf2Algorithm::new(&pattern, &host, None);
        let first = search.next().unwrap();
        assert_valid_embedding(&pattern, &host, &first);
        let second = search.next().unwrap();
        assert_valid_embedding(&pattern, &host, &second);
        assert_ne!(first, second);
        assert_eq!(search.next(), None);
        // Fused after exhaustion.
        assert_eq!(search.next(), None);
    }

    #[test]
    fn pattern_larger_than_host_yields_nothing() {
        let pattern = graph_from_edges(3, &[(0, 1), (1, 2)]);
        let host = graph_from_edges(2, &[(0, 1)]);
        assert_eq!(Vf2Algorithm::new(&pattern, &host, None).next(), None);
    }

    #[test]
    fn direction_is_a_constraint() {
        let pattern = graph_from_edges(2, &[(0, 1)]);
        let host = graph_from_edges(2, &[(1, 0)]);
        let mappings: Vec<_> = Vf2Algorithm::new(&pattern, &host, None).collect();
        assert_eq!(mappings.len(), 1);
        // Only the orientation-respecting map exists.
        assert_eq!(mappings[0], vec![NodeIndex::new(1), NodeIndex::new(0)]);
    }

    #[test]
    fn empty_pattern_yields_one_empty_mapping() {
        let pattern = graph_from_edges(0, &[]);
        let host = graph_from_edges(3, &[(0, 1)]);
        let mut search = Vf2Algorithm::new(&pattern, &host, None);
        assert_eq!(search.next(), Some(Vec::new()));
        assert_eq!(search.next(), None);
    }

    #[test]
    fn call_limit_fuses_the_stream() {
        let pattern = graph_from_edges(2, &[(0, 1)]);
        let host = graph_from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        let unlimited = Vf2Algorithm::new(&pattern, &host, None).count();
        assert!(unlimited > 1);
        let mut limited = Vf2Algorithm::new(&pattern, &host, Some(0));
        assert_eq!(limited.next(), None);
        assert_eq!(limited.calls(), 0);
    }

    #[test]
    fn disconnected_pattern_components_are_matched() {
        let pattern = graph_from_edges(4, &[(0, 1), (2, 3)]);
        let host = graph_from_edges(4, &[(0, 1), (1, 2), (2, 3)]);
        let mappings: Vec<_> = Vf2Algorithm::new(&pattern, &host, None).collect();
        assert!(!mappings.is_empty());
        for mapping in &mappings {
            assert_valid_embedding(&pattern, &host, mapping);
        }
    }
}
