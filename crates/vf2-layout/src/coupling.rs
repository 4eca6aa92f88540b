// This code is part of Qiskit.
//
// (C) Copyright IBM 2023
//
// This code is licensed under the Apache License, Version 2.0. You may
// obtain a copy of this license in the LICENSE.txt file in the root directory
// of this source tree or at http://www.apache.org/licenses/LICENSE-2.0.
//
// Any modifications or derivative works of this code must retain this
// copyright notice, and modified files need to carry a notice indicating
// that they have been altered from the originals.

use rand::prelude::*;
use rand_pcg::Pcg64Mcg;
use rustworkx_core::petgraph::prelude::*;
use rustworkx_core::petgraph::visit::EdgeRef;

use crate::nlayout::PhysicalQubit;

/// How (and whether) the coupling graph's node indices are permuted before the subgraph search.
///
/// Shuffling exists purely for search diversity: the matching engine enumerates candidates in a
/// node-index-dependent order, so relabeling the device explores a different corner of the
/// embedding space first.  A seeded shuffle is a contractual guarantee, not an accident: the same
/// seed always produces the same permutation and therefore the same trial ordering downstream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Shuffle {
    /// Shuffle with a fresh seed from OS entropy.
    #[default]
    Entropy,
    /// Shuffle with a fixed seed.
    Seed(u64),
    /// Keep the device's own ordering.
    Disabled,
}

/// Directed graph over the physical qubits of a device; edges are the hardware's allowed
/// two-qubit operations.  Immutable once handed to the layout pass.
#[derive(Clone, Debug, Default)]
pub struct CouplingMap {
    graph: DiGraph<(), ()>,
}

impl CouplingMap {
    pub fn new(num_qubits: usize) -> Self {
        let mut graph = DiGraph::with_capacity(num_qubits, 0);
        for _ in 0..num_qubits {
            graph.add_node(());
        }
        Self { graph }
    }

    /// Build from a raw list of directed physical edges.  The qubit count is one more than the
    /// largest index mentioned.
    pub fn from_edges(edges: impl IntoIterator<Item = (u32, u32)> + Clone) -> Self {
        let num_qubits = edges
            .clone()
            .into_iter()
            .map(|(a, b)| a.max(b) as usize + 1)
            .max()
            .unwrap_or_default();
        let mut out = Self::new(num_qubits);
        for (a, b) in edges {
            out.add_edge(a, b);
        }
        out
    }

    /// A line of `num_qubits` qubits, coupled low index to high.
    pub fn linear(num_qubits: u32) -> Self {
        let mut out = Self::new(num_qubits as usize);
        for q in 1..num_qubits {
            out.add_edge(q - 1, q);
        }
        out
    }

    /// A ring of `num_qubits` qubits.
    pub fn ring(num_qubits: u32) -> Self {
        let mut out = Self::linear(num_qubits);
        if num_qubits > 2 {
            out.add_edge(num_qubits - 1, 0);
        }
        out
    }

    /// Add a directed coupling edge.  Parallel duplicates collapse.
    pub fn add_edge(&mut self, source: u32, target: u32) {
        self.graph.update_edge(
            NodeIndex::new(source as usize),
            NodeIndex::new(target as usize),
            (),
        );
    }

    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.graph.node_count()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains_edge(&self, source: PhysicalQubit, target: PhysicalQubit) -> bool {
        self.graph
            .find_edge(
                NodeIndex::new(source.index()),
                NodeIndex::new(target.index()),
            )
            .is_some()
    }

    /// The directed edges, as physical-qubit pairs.
    pub fn edges(&self) -> impl Iterator<Item = [PhysicalQubit; 2]> + '_ {
        self.graph.edge_references().map(|edge| {
            [
                PhysicalQubit::new(edge.source().index() as u32),
                PhysicalQubit::new(edge.target().index() as u32),
            ]
        })
    }

    #[inline]
    pub fn graph(&self) -> &DiGraph<(), ()> {
        &self.graph
    }

    /// A copy of the coupling graph with its node indices permuted, plus the table mapping each
    /// new node index back to the original physical qubit.  With [Shuffle::Disabled] the table is
    /// the identity.
    pub fn shuffled(&self, shuffle: &Shuffle) -> (DiGraph<(), ()>, Vec<PhysicalQubit>) {
        let num_qubits = self.num_qubits();
        let mut nodes: Vec<usize> = (0..num_qubits).collect();
        match shuffle {
            Shuffle::Disabled => (),
            Shuffle::Seed(seed) => nodes.shuffle(&mut Pcg64Mcg::seed_from_u64(*seed)),
            Shuffle::Entropy => nodes.shuffle(&mut Pcg64Mcg::from_entropy()),
        }
        // `nodes[new] == old`; invert it to relabel the edges.
        let mut old_to_new = vec![0usize; num_qubits];
        for (new, old) in nodes.iter().enumerate() {
            old_to_new[*old] = new;
        }
        let mut graph = DiGraph::with_capacity(num_qubits, self.graph.edge_count());
        for _ in 0..num_qubits {
            graph.add_node(());
        }
        for edge in self.graph.edge_references() {
            graph.add_edge(
                NodeIndex::new(old_to_new[edge.source().index()]),
                NodeIndex::new(old_to_new[edge.target().index()]),
                (),
            );
        }
        let table = nodes
            .into_iter()
            .map(|old| PhysicalQubit::new(old as u32))
            .collect();
        (graph, table)
    }
}

/// If an edge does not have a parallel but reversed counterpart, add one with the same weight.
///
/// This is how non-strict directionality is realized: the interaction graph keeps its edges
/// directed, and the coupling graph is closed under reversal so that either orientation of a
/// hardware link satisfies the matcher.
pub fn loosen_directionality<S, T: Clone>(graph: &mut Graph<S, T>) {
    graph
        .edge_references()
        .filter(|edge| graph.find_edge(edge.target(), edge.source()).is_none())
        .map(|edge| (edge.target(), edge.source(), edge.weight().clone()))
        .collect::<Vec<_>>()
        .into_iter()
        .for_each(|(source, target, weight)| {
            graph.add_edge(source, target, weight);
        })
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn linear_shape() {
        let line = CouplingMap::linear(4);
        assert_eq!(line.num_qubits(), 4);
        assert_eq!(line.edge_count(), 3);
        assert!(line.contains_edge(PhysicalQubit::new(1), PhysicalQubit::new(2)));
        assert!(!line.contains_edge(PhysicalQubit::new(2), PhysicalQubit::new(1)));
    }

    #[test]
    fn from_edges_infers_width() {
        let map = CouplingMap::from_edges([(0, 3), (1, 0)]);
        assert_eq!(map.num_qubits(), 4);
        assert_eq!(map.edge_count(), 2);
    }

    #[test]
    fn shuffle_same_seed_same_permutation() {
        let map = CouplingMap::ring(8);
        let (graph_a, table_a) = map.shuffled(&Shuffle::Seed(42));
        let (graph_b, table_b) = map.shuffled(&Shuffle::Seed(42));
        assert_eq!(table_a, table_b);
        let edges = |graph: &DiGraph<(), ()>| -> Vec<(usize, usize)> {
            graph
                .edge_references()
                .map(|e| (e.source().index(), e.target().index()))
                .collect()
        };
        assert_eq!(edges(&graph_a), edges(&graph_b));
    }

    #[test]
    fn shuffle_preserves_edge_structure() {
        let map = CouplingMap::linear(6);
        let (graph, table) = map.shuffled(&Shuffle::Seed(7));
        assert_eq!(graph.node_count(), 6);
        assert_eq!(graph.edge_count(), 5);
        for edge in graph.edge_references() {
            let source = table[edge.source().index()];
            let target = table[edge.target().index()];
            assert!(map.contains_edge(source, target));
        }
    }

    #[test]
    fn disabled_shuffle_is_identity() {
        let map = CouplingMap::linear(5);
        let (_, table) = map.shuffled(&Shuffle::Disabled);
        let identity: Vec<_> = (0..5).map(PhysicalQubit::new).collect();
        assert_eq!(table, identity);
    }

    #[test]
    fn loosening_adds_missing_reverses_only() {
        let mut graph = CouplingMap::linear(3).graph.clone();
        graph.add_edge(NodeIndex::new(1), NodeIndex::new(0), ());
        loosen_directionality(&mut graph);
        // 0-1 already had both directions; 1-2 gains its reverse.
        assert_eq!(graph.edge_count(), 4);
        assert!(graph
            .find_edge(NodeIndex::new(2), NodeIndex::new(1))
            .is_some());
    }
}
