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

//! Error-aware initial-layout selection for quantum circuits, as a subgraph isomorphism problem.
//!
//! The pass reduces a circuit to its two-qubit interaction graph, reduces the device to its
//! coupling graph, and asks a VF2-family matcher for embeddings of the former into the latter.
//! Any embedding is a "perfect layout": every two-qubit operation already sits on a hardware
//! coupling, so no routing is needed downstream.  When several embeddings exist, candidates are
//! scored against averaged hardware error rates under trial/time budgets and the best one wins.
//!
//! The entry point is [vf2_layout::Vf2Layout]; outcomes are published to a
//! [vf2_layout::PropertySet] as a layout (on success) and a
//! [vf2_layout::Vf2LayoutStopReason] (always).

pub mod circuit;
pub mod coupling;
pub mod error_map;
pub mod interaction;
pub mod nlayout;
pub mod target;
pub mod vf2;
pub mod vf2_layout;

pub use circuit::{Circuit, QuantumRegister};
pub use coupling::{CouplingMap, Shuffle};
pub use error_map::ErrorMap;
pub use nlayout::{NLayout, PhysicalQubit, VirtualQubit};
pub use target::{BackendProperties, Target};
pub use vf2_layout::{
    PropertySet, Vf2Configuration, Vf2Layout, Vf2LayoutError, Vf2LayoutStopReason,
};
