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

use indexmap::{IndexMap, IndexSet};
use rustworkx_core::petgraph::prelude::*;
use thiserror::Error;

use crate::circuit::Circuit;
use crate::nlayout::VirtualQubit;

/// The layout pass only understands one- and two-qubit operations; anything wider has to be
/// decomposed before layout selection can run.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("circuit contains an operation acting on more than two qubits")]
pub struct MultiQEncountered;

/// A circuit's two-qubit interaction structure, plus the qubits that never make it into the
/// graph.
///
/// Nodes each correspond to a virtual qubit touched by at least one two-qubit operation (the
/// `nodes` set stores which); node weights count that qubit's single-qubit operations and edge
/// weights count the two-qubit operations on the pair.  Edges are always directed, even when
/// direction is not a matching constraint; the fuzzy directional matching is handled by closing
/// the coupling graph under edge reversal instead.
#[derive(Default, Debug, Clone)]
pub struct InteractionGraph {
    /// The graph of actual interactions.
    pub graph: Graph<usize, usize>,
    /// Map of node index to the qubit it represents.  We could store this on the nodes
    /// themselves, but the scorers would then need different weight types between nodes and
    /// edges.
    pub nodes: IndexSet<VirtualQubit>,
    /// The qubits that have only single-qubit operations on them, mapped to how many.  We
    /// iterate through this at the end, so need a consistent order.
    pub uncoupled: IndexMap<VirtualQubit, usize>,
    /// The qubits that have no operations on them at all.
    pub idle: IndexSet<VirtualQubit>,
}

impl InteractionGraph {
    /// Walk the circuit's operations once and accumulate the interaction structure.  Fails
    /// without producing any partial output if an operation touches more than two qubits.
    pub fn from_circuit(circuit: &Circuit) -> Result<Self, MultiQEncountered> {
        let mut out = Self::default();
        for inst in circuit.instructions() {
            match *inst.qubits() {
                [] => (),
                [q] => {
                    if let Some(index) = out.nodes.get_index_of(&q) {
                        let weight = out
                            .graph
                            .node_weight_mut(NodeIndex::new(index))
                            .expect("node must be in graph if tracked in 'nodes'");
                        *weight += 1;
                    } else {
                        *out.uncoupled.entry(q).or_default() += 1;
                    }
                }
                [q0, q1] => {
                    let node0 = out.ensure_in_graph(q0);
                    let node1 = out.ensure_in_graph(q1);
                    if let Some(edge) = out.graph.find_edge(node0, node1) {
                        let weight = out
                            .graph
                            .edge_weight_mut(edge)
                            .expect("this index came from a call to 'find_edge'");
                        *weight += 1;
                    } else {
                        out.graph.add_edge(node0, node1, 1);
                    }
                }
                _ => return Err(MultiQEncountered),
            }
        }
        out.idle.extend(
            (0..circuit.num_qubits())
                .map(VirtualQubit::new)
                .filter(|q| !(out.nodes.contains(q) || out.uncoupled.contains_key(q))),
        );
        Ok(out)
    }

    fn ensure_in_graph(&mut self, q: VirtualQubit) -> NodeIndex {
        if let Some(index) = self.nodes.get_index_of(&q) {
            return NodeIndex::new(index);
        }
        assert!(self.nodes.insert(q));
        self.graph
            .add_node(self.uncoupled.swap_remove(&q).unwrap_or_default())
    }
}
