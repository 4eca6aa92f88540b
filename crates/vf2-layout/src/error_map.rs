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

use hashbrown::HashMap;
use rustworkx_core::petgraph::prelude::*;

use crate::coupling::CouplingMap;
use crate::nlayout::PhysicalQubit;
use crate::target::{BackendProperties, Target};

/// The average error rates for the edges of a device's connectivity graph.
///
/// Each entry's key is a pair of qubit indices (order is significant) and its value the averaged
/// error rate of the edge connecting them.  Single-qubit error rates sit on the diagonal, keyed
/// `[q, q]`.  An edge or qubit known to be ideal can be recorded as `0.0` or as `NaN`; scoring
/// treats `NaN` as "no penalty".
#[derive(Clone, Debug, Default)]
pub struct ErrorMap {
    pub error_map: HashMap<[PhysicalQubit; 2], f64>,
}

impl ErrorMap {
    pub fn new(size_hint: Option<usize>) -> Self {
        match size_hint {
            Some(size) => ErrorMap {
                error_map: HashMap::with_capacity(size),
            },
            None => ErrorMap {
                error_map: HashMap::new(),
            },
        }
    }

    pub fn add_error(&mut self, index: [PhysicalQubit; 2], error_rate: f64) {
        self.error_map.insert(index, error_rate);
    }

    pub fn get(&self, index: &[PhysicalQubit; 2]) -> Option<f64> {
        self.error_map.get(index).copied()
    }

    pub fn len(&self) -> usize {
        self.error_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.error_map.is_empty()
    }
}

/// Aggregate whatever calibration data is available into one averaged error value per coupling
/// edge (plus the single-qubit diagonal).  The result is total over the coupling graph's edges,
/// deterministic, and independent of any candidate layout, so it is computed once per pass
/// instance and reused across runs.
///
/// Sources, in precedence order: a [Target]'s per-qarg instruction errors (averaged per qarg),
/// then [BackendProperties] readout/gate errors.  Coupling edges with no calibration entry
/// receive the mean of the known errors.  If there is no error data at all, a degree-based
/// penalty stands in: qubits get `degree / num_qubits` on the diagonal and edges the average of
/// their endpoints.  This originally supported devices that were unreliable at reporting error
/// rates but typically performed worst on their high-degree nodes.
pub fn build_average_error_map(
    target: Option<&Target>,
    properties: Option<&BackendProperties>,
    coupling: &CouplingMap,
) -> ErrorMap {
    let mut error_map = ErrorMap::new(Some(coupling.edge_count() + coupling.num_qubits()));
    let mut have_data = false;
    if let Some(target) = target {
        for qargs in target.qargs() {
            let mut qarg_error: f64 = 0.;
            let mut count: usize = 0;
            for error in target.errors_for_qargs(qargs) {
                count += 1;
                // An instruction without a recorded error is treated as errorless.
                if let Some(error) = error {
                    have_data = true;
                    qarg_error += error;
                }
            }
            let key = match qargs[..] {
                [q] => [q, q],
                [a, b] => [a, b],
                _ => continue,
            };
            if count > 0 {
                error_map.add_error(key, qarg_error / count as f64);
            }
        }
    } else if let Some(properties) = properties {
        for (qubit, error) in properties.readout_errors() {
            have_data = true;
            error_map.add_error([qubit, qubit], error);
        }
        for (edge, error) in properties.gate_errors() {
            have_data = true;
            error_map.add_error(edge, error);
        }
    }

    if !have_data {
        return degree_fallback_map(coupling);
    }

    // Fill edges the calibration data missed with the dataset mean, preferring the mean of the
    // two-qubit entries when any exist.
    let known: Vec<f64> = coupling
        .edges()
        .filter(|[a, b]| a != b)
        .filter_map(|edge| error_map.get(&edge).filter(|e| !e.is_nan()))
        .collect();
    let default = if known.is_empty() {
        let all: Vec<f64> = error_map
            .error_map
            .values()
            .filter(|e| !e.is_nan())
            .copied()
            .collect();
        all.iter().sum::<f64>() / all.len().max(1) as f64
    } else {
        known.iter().sum::<f64>() / known.len() as f64
    };
    for edge in coupling.edges() {
        if error_map.error_map.contains_key(&edge) {
            continue;
        }
        // Devices frequently calibrate a symmetric link in one direction only.
        let value = error_map.get(&[edge[1], edge[0]]).unwrap_or(default);
        error_map.add_error(edge, value);
    }
    error_map
}

fn degree_fallback_map(coupling: &CouplingMap) -> ErrorMap {
    let num_qubits = coupling.num_qubits();
    let mut error_map = ErrorMap::new(Some(coupling.edge_count() + num_qubits));
    // Use an undirected view so reversed duplicate edges don't double-count a neighbor.
    let mut undirected = Graph::<(), (), Undirected>::with_capacity(num_qubits, coupling.edge_count());
    for _ in 0..num_qubits {
        undirected.add_node(());
    }
    for [left, right] in coupling.edges() {
        undirected.update_edge(
            NodeIndex::new(left.index()),
            NodeIndex::new(right.index()),
            (),
        );
    }
    for index in undirected.node_indices() {
        let qubit = PhysicalQubit::new(index.index() as u32);
        let degree = undirected.neighbors(index).count();
        error_map.add_error([qubit, qubit], degree as f64 / num_qubits as f64);
    }
    // Directionality comes back from the coupling map itself.
    for [left, right] in coupling.edges() {
        let avg = 0.5 * (error_map.error_map[&[left, left]] + error_map.error_map[&[right, right]]);
        error_map.add_error([left, right], avg);
    }
    error_map
}

#[cfg(test)]
mod test {
    use super::*;

    fn q(index: u32) -> PhysicalQubit {
        PhysicalQubit::new(index)
    }

    #[test]
    fn properties_populate_map() {
        let coupling = CouplingMap::linear(3);
        let mut properties = BackendProperties::new();
        properties.set_readout_error(0, 0.01);
        properties.set_readout_error(1, 0.02);
        properties.set_gate_error(0, 1, 0.05);
        properties.set_gate_error(1, 2, 0.15);
        let map = build_average_error_map(None, Some(&properties), &coupling);
        assert_eq!(map.get(&[q(0), q(0)]), Some(0.01));
        assert_eq!(map.get(&[q(0), q(1)]), Some(0.05));
        assert_eq!(map.get(&[q(1), q(2)]), Some(0.15));
    }

    #[test]
    fn missing_edges_get_dataset_mean() {
        let coupling = CouplingMap::linear(4);
        let mut properties = BackendProperties::new();
        properties.set_gate_error(0, 1, 0.1);
        properties.set_gate_error(1, 2, 0.3);
        let map = build_average_error_map(None, Some(&properties), &coupling);
        // Edge 2-3 had no calibration; it gets the mean of the known edges.
        assert!((map.get(&[q(2), q(3)]).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn target_errors_average_per_qarg() {
        let mut target = Target::new(2);
        target.add_instruction("cx", &[0, 1], Some(0.02));
        target.add_instruction("ecr", &[0, 1], Some(0.04));
        let coupling = target.build_coupling_map();
        let map = build_average_error_map(Some(&target), None, &coupling);
        assert!((map.get(&[q(0), q(1)]).unwrap() - 0.03).abs() < 1e-12);
    }

    #[test]
    fn no_data_uses_degree_penalty() {
        let coupling = CouplingMap::linear(3);
        let map = build_average_error_map(None, None, &coupling);
        // The middle qubit of a line has degree 2 of 3 qubits.
        assert!((map.get(&[q(1), q(1)]).unwrap() - 2. / 3.).abs() < 1e-12);
        assert!((map.get(&[q(0), q(0)]).unwrap() - 1. / 3.).abs() < 1e-12);
        let expected_edge = 0.5 * (1. / 3. + 2. / 3.);
        assert!((map.get(&[q(0), q(1)]).unwrap() - expected_edge).abs() < 1e-12);
    }

    #[test]
    fn map_is_total_over_coupling_edges() {
        let coupling = CouplingMap::ring(5);
        let mut properties = BackendProperties::new();
        properties.set_gate_error(0, 1, 0.01);
        let map = build_average_error_map(None, Some(&properties), &coupling);
        for edge in coupling.edges() {
            assert!(map.get(&edge).is_some());
        }
    }
}
