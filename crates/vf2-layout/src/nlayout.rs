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

/// A newtype for the different categories of qubits used within layouts.  This is to enforce
/// significantly more type safety when dealing with mixtures of physical and virtual qubits, as we
/// typically are when dealing with layouts.  `NLayout` only works in terms of the correct newtype,
/// meaning that it's not possible to accidentally pass the wrong type of qubit to a lookup.
macro_rules! qubit_newtype {
    ($id: ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $id(pub u32);

        impl $id {
            #[inline]
            pub fn new(val: u32) -> Self {
                Self(val)
            }
            #[inline]
            pub fn index(&self) -> usize {
                self.0 as usize
            }
        }
    };
}

qubit_newtype!(PhysicalQubit);
impl PhysicalQubit {
    /// Get the virtual qubit that corresponds to this physical qubit in the given layout, if any
    /// virtual qubit is assigned to it.
    pub fn to_virt(self, layout: &NLayout) -> Option<VirtualQubit> {
        let virt = layout.phys_to_virt[self.index()];
        (virt.0 != u32::MAX).then_some(virt)
    }
}
qubit_newtype!(VirtualQubit);
impl VirtualQubit {
    /// Get the physical qubit that currently corresponds to this index of virtual qubit in the
    /// given layout.
    pub fn to_phys(self, layout: &NLayout) -> PhysicalQubit {
        layout.virt_to_phys[self.index()]
    }
}

/// An unsigned-integer-vector based layout.
///
/// This tracks the mapping between virtual qubits in the circuit and physical qubits on the
/// device efficiently in both directions.  Every virtual qubit is assigned; physical qubits
/// beyond the circuit width may be unassigned, which the reverse table records with a hole
/// sentinel.  Once emitted by the layout pass the object is immutable output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NLayout {
    virt_to_phys: Vec<PhysicalQubit>,
    phys_to_virt: Vec<VirtualQubit>,
}

impl NLayout {
    /// Build a layout from a complete virtual-to-physical assignment.
    ///
    /// # Panics
    ///
    /// If the map does not assign every virtual qubit below `virtual_qubits`, assigns one out of
    /// range of `physical_qubits`, or assigns two virtual qubits to the same physical qubit.
    pub fn from_virtual_map(
        qubit_indices: HashMap<VirtualQubit, PhysicalQubit>,
        virtual_qubits: usize,
        physical_qubits: usize,
    ) -> Self {
        let mut res = NLayout {
            virt_to_phys: vec![PhysicalQubit(u32::MAX); virtual_qubits],
            phys_to_virt: vec![VirtualQubit(u32::MAX); physical_qubits],
        };
        for (virt, phys) in qubit_indices {
            assert!(
                res.phys_to_virt[phys.index()].0 == u32::MAX,
                "two virtual qubits assigned to physical qubit {}",
                phys.0,
            );
            res.virt_to_phys[virt.index()] = phys;
            res.phys_to_virt[phys.index()] = virt;
        }
        assert!(
            res.virt_to_phys.iter().all(|phys| phys.0 != u32::MAX),
            "virtual-to-physical map is not total",
        );
        res
    }

    #[inline]
    pub fn num_virtual_qubits(&self) -> usize {
        self.virt_to_phys.len()
    }

    #[inline]
    pub fn num_physical_qubits(&self) -> usize {
        self.phys_to_virt.len()
    }

    /// Iterate over the `(virtual, physical)` assignment pairs, in virtual-qubit order.
    pub fn iter_virtual(
        &self,
    ) -> impl ExactSizeIterator<Item = (VirtualQubit, PhysicalQubit)> + '_ {
        self.virt_to_phys
            .iter()
            .enumerate()
            .map(|(v, phys)| (VirtualQubit::new(v as u32), *phys))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn layout_from(pairs: &[(u32, u32)], virts: usize, phys: usize) -> NLayout {
        NLayout::from_virtual_map(
            pairs
                .iter()
                .map(|(v, p)| (VirtualQubit::new(*v), PhysicalQubit::new(*p)))
                .collect(),
            virts,
            phys,
        )
    }

    #[test]
    fn roundtrip_lookups() {
        let layout = layout_from(&[(0, 2), (1, 0), (2, 1)], 3, 4);
        assert_eq!(VirtualQubit::new(0).to_phys(&layout), PhysicalQubit::new(2));
        assert_eq!(VirtualQubit::new(1).to_phys(&layout), PhysicalQubit::new(0));
        assert_eq!(
            PhysicalQubit::new(2).to_virt(&layout),
            Some(VirtualQubit::new(0))
        );
        // The fourth physical qubit has no virtual qubit on it.
        assert_eq!(PhysicalQubit::new(3).to_virt(&layout), None);
        assert_eq!(layout.num_virtual_qubits(), 3);
        assert_eq!(layout.num_physical_qubits(), 4);
    }

    #[test]
    fn iteration_in_virtual_order() {
        let layout = layout_from(&[(1, 0), (0, 1)], 2, 2);
        let pairs: Vec<_> = layout.iter_virtual().collect();
        assert_eq!(
            pairs,
            vec![
                (VirtualQubit::new(0), PhysicalQubit::new(1)),
                (VirtualQubit::new(1), PhysicalQubit::new(0)),
            ]
        );
    }

    #[test]
    #[should_panic(expected = "not total")]
    fn partial_map_panics() {
        layout_from(&[(0, 0)], 2, 2);
    }

    #[test]
    #[should_panic(expected = "two virtual qubits")]
    fn colliding_map_panics() {
        layout_from(&[(0, 1), (1, 1)], 2, 2);
    }
}
