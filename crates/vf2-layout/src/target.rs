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

use hashbrown::HashMap;
use indexmap::{IndexMap, IndexSet};
use smallvec::SmallVec;

use crate::coupling::CouplingMap;
use crate::nlayout::PhysicalQubit;

/// Concrete physical qubits an instruction is defined on.  One entry for single-qubit
/// operations, two for the couplings.
pub type Qargs = SmallVec<[PhysicalQubit; 2]>;

/// Measured calibration data for a backend: per-qubit readout error and per-directed-edge
/// two-qubit gate error.  All entries are optional; a device with no recorded data is legal and
/// simply gives the layout scorer no signal beyond topology.
#[derive(Clone, Debug, Default)]
pub struct BackendProperties {
    readout_errors: HashMap<PhysicalQubit, f64>,
    gate_errors: HashMap<[PhysicalQubit; 2], f64>,
}

impl BackendProperties {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_readout_error(&mut self, qubit: u32, error: f64) {
        self.readout_errors.insert(PhysicalQubit::new(qubit), error);
    }

    pub fn set_gate_error(&mut self, source: u32, target: u32, error: f64) {
        self.gate_errors.insert(
            [PhysicalQubit::new(source), PhysicalQubit::new(target)],
            error,
        );
    }

    pub fn readout_error(&self, qubit: PhysicalQubit) -> Option<f64> {
        self.readout_errors.get(&qubit).copied()
    }

    pub fn gate_error(&self, edge: &[PhysicalQubit; 2]) -> Option<f64> {
        self.gate_errors.get(edge).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.readout_errors.is_empty() && self.gate_errors.is_empty()
    }

    pub(crate) fn readout_errors(&self) -> impl Iterator<Item = (PhysicalQubit, f64)> + '_ {
        self.readout_errors.iter().map(|(q, e)| (*q, *e))
    }

    pub(crate) fn gate_errors(&self) -> impl Iterator<Item = ([PhysicalQubit; 2], f64)> + '_ {
        self.gate_errors.iter().map(|(edge, e)| (*edge, *e))
    }
}

/// A reduced device description: which instructions exist on which concrete qubits, with an
/// optional error rate each.  This is the richer alternative to a bare [CouplingMap]; when a
/// target is configured it supersedes both the raw coupling map and any [BackendProperties].
#[derive(Clone, Debug)]
pub struct Target {
    num_qubits: usize,
    // name -> (qargs -> error); insertion order kept so that iteration, and therefore every
    // derived artifact, is deterministic.
    instructions: IndexMap<String, IndexMap<Qargs, Option<f64>>>,
    qargs: IndexSet<Qargs>,
}

impl Target {
    pub fn new(num_qubits: usize) -> Self {
        Self {
            num_qubits,
            instructions: IndexMap::new(),
            qargs: IndexSet::new(),
        }
    }

    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Declare an instruction on concrete qubits, with an optional measured error rate.
    ///
    /// # Panics
    ///
    /// If a qarg is out of the device's range.
    pub fn add_instruction(&mut self, name: impl Into<String>, qargs: &[u32], error: Option<f64>) {
        let qargs: Qargs = qargs
            .iter()
            .map(|q| {
                assert!((*q as usize) < self.num_qubits, "qarg {q} out of range");
                PhysicalQubit::new(*q)
            })
            .collect();
        self.qargs.insert(qargs.clone());
        self.instructions
            .entry(name.into())
            .or_default()
            .insert(qargs, error);
    }

    /// Every distinct set of concrete qargs any instruction is defined on, in first-declaration
    /// order.
    pub fn qargs(&self) -> impl Iterator<Item = &Qargs> {
        self.qargs.iter()
    }

    /// The recorded errors of every instruction defined on exactly these qargs; `None` entries
    /// are instructions without measured error.
    pub fn errors_for_qargs<'a>(
        &'a self,
        qargs: &'a Qargs,
    ) -> impl Iterator<Item = Option<f64>> + 'a {
        self.instructions
            .values()
            .filter_map(move |by_qargs| by_qargs.get(qargs).copied())
    }

    pub fn get_error(&self, name: &str, qargs: &Qargs) -> Option<f64> {
        self.instructions.get(name)?.get(qargs).copied().flatten()
    }

    /// The coupling graph induced by the target's two-qubit instructions.
    pub fn build_coupling_map(&self) -> CouplingMap {
        let mut out = CouplingMap::new(self.num_qubits);
        for qargs in &self.qargs {
            if let [left, right] = qargs[..] {
                out.add_edge(left.0, right.0);
            }
        }
        out
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use smallvec::smallvec;

    fn toy_target() -> Target {
        let mut target = Target::new(3);
        target.add_instruction("sx", &[0], Some(1e-4));
        target.add_instruction("sx", &[1], Some(2e-4));
        target.add_instruction("cx", &[0, 1], Some(1e-2));
        target.add_instruction("cx", &[1, 2], None);
        target
    }

    #[test]
    fn coupling_map_from_two_qubit_qargs() {
        let map = toy_target().build_coupling_map();
        assert_eq!(map.num_qubits(), 3);
        assert_eq!(map.edge_count(), 2);
        assert!(map.contains_edge(PhysicalQubit::new(0), PhysicalQubit::new(1)));
        assert!(map.contains_edge(PhysicalQubit::new(1), PhysicalQubit::new(2)));
    }

    #[test]
    fn error_lookup() {
        let target = toy_target();
        let qargs: Qargs = smallvec![PhysicalQubit::new(0), PhysicalQubit::new(1)];
        assert_eq!(target.get_error("cx", &qargs), Some(1e-2));
        let unmeasured: Qargs = smallvec![PhysicalQubit::new(1), PhysicalQubit::new(2)];
        assert_eq!(target.get_error("cx", &unmeasured), None);
    }

    #[test]
    fn qargs_deduplicated_in_declaration_order() {
        let mut target = toy_target();
        target.add_instruction("ecr", &[0, 1], Some(5e-3));
        let qargs: Vec<_> = target.qargs().cloned().collect();
        assert_eq!(qargs.len(), 4);
        let first: Qargs = smallvec![PhysicalQubit::new(0)];
        assert_eq!(qargs[0], first);
    }
}
