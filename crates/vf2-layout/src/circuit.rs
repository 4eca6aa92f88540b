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

use smallvec::SmallVec;

use crate::nlayout::VirtualQubit;

/// A named, sized block of virtual qubits.  Registers only matter to the layout pass insofar as
/// the emitted layout must cover every qubit they declare, used or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantumRegister {
    pub name: String,
    pub size: u32,
}

impl QuantumRegister {
    pub fn new(name: impl Into<String>, size: u32) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}

/// One operation applied to an ordered list of virtual qubits.  Most operations act on one or two
/// qubits; the inline capacity of the operand list reflects that.
#[derive(Clone, Debug)]
pub struct Instruction {
    name: String,
    qubits: SmallVec<[VirtualQubit; 2]>,
}

impl Instruction {
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn qubits(&self) -> &[VirtualQubit] {
        &self.qubits
    }
}

/// The slice of a circuit that layout selection consumes: the declared registers and the flat
/// list of operations with their operand qubits.  Converting a full circuit or DAG into this
/// form is the caller's concern.
#[derive(Clone, Debug, Default)]
pub struct Circuit {
    registers: Vec<QuantumRegister>,
    instructions: Vec<Instruction>,
    num_qubits: u32,
}

impl Circuit {
    /// A circuit over a single anonymous register of the given width.
    pub fn new(num_qubits: u32) -> Self {
        Self::from_registers(vec![QuantumRegister::new("q", num_qubits)])
    }

    pub fn from_registers(registers: Vec<QuantumRegister>) -> Self {
        let num_qubits = registers.iter().map(|reg| reg.size).sum();
        Self {
            registers,
            instructions: Vec::new(),
            num_qubits,
        }
    }

    /// Append an operation acting on the given virtual qubits, in operand order.
    ///
    /// # Panics
    ///
    /// If an operand is out of range of the declared registers, or the same qubit appears twice
    /// in one operation.
    pub fn push(&mut self, name: impl Into<String>, qubits: impl IntoIterator<Item = u32>) {
        let name = name.into();
        let qubits: SmallVec<[VirtualQubit; 2]> = qubits
            .into_iter()
            .map(|q| {
                assert!(q < self.num_qubits, "operand qubit {q} is undeclared");
                VirtualQubit::new(q)
            })
            .collect();
        for (i, q) in qubits.iter().enumerate() {
            assert!(
                !qubits[..i].contains(q),
                "operation '{name}' repeats qubit {}",
                q.0,
            );
        }
        self.instructions.push(Instruction { name, qubits });
    }

    #[inline]
    pub fn num_qubits(&self) -> u32 {
        self.num_qubits
    }

    #[inline]
    pub fn registers(&self) -> &[QuantumRegister] {
        &self.registers
    }

    #[inline]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn register_widths_accumulate() {
        let circuit = Circuit::from_registers(vec![
            QuantumRegister::new("q", 3),
            QuantumRegister::new("anc", 2),
        ]);
        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.registers().len(), 2);
    }

    #[test]
    fn operands_recorded_in_order() {
        let mut circuit = Circuit::new(3);
        circuit.push("cx", [2, 0]);
        let inst = &circuit.instructions()[0];
        assert_eq!(inst.name(), "cx");
        assert_eq!(
            inst.qubits(),
            &[VirtualQubit::new(2), VirtualQubit::new(0)]
        );
    }

    #[test]
    #[should_panic(expected = "undeclared")]
    fn out_of_range_operand_panics() {
        let mut circuit = Circuit::new(2);
        circuit.push("cx", [0, 2]);
    }

    #[test]
    #[should_panic(expected = "repeats qubit")]
    fn repeated_operand_panics() {
        let mut circuit = Circuit::new(2);
        circuit.push("cx", [1, 1]);
    }
}
