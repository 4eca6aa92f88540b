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

use std::fmt;
use std::time::Instant;

use hashbrown::HashMap;
use indexmap::IndexSet;
use log::debug;
use rayon::prelude::*;
use rustworkx_core::petgraph::visit::EdgeRef;
use thiserror::Error;

use crate::circuit::Circuit;
use crate::coupling::{loosen_directionality, CouplingMap, Shuffle};
use crate::error_map::{build_average_error_map, ErrorMap};
use crate::interaction::InteractionGraph;
use crate::nlayout::{NLayout, PhysicalQubit, VirtualQubit};
use crate::target::{BackendProperties, Target};
use crate::vf2::Vf2Algorithm;

const PARALLEL_THRESHOLD: usize = 50;

/// Why a layout run terminated.  Exactly one reason is published per run, whether or not a
/// layout was found; the surrounding pipeline branches on it, so handle every variant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Vf2LayoutStopReason {
    /// A perfect layout was found; no routing is needed downstream.
    SolutionFound,
    /// Every budget or the whole candidate stream was exhausted without a usable embedding.
    NoSolutionFound,
    /// The circuit contains operations wider than two qubits.
    MoreThan2qGates,
}

impl fmt::Display for Vf2LayoutStopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let as_str = match self {
            Vf2LayoutStopReason::SolutionFound => "solution found",
            Vf2LayoutStopReason::NoSolutionFound => "nonexistent solution",
            Vf2LayoutStopReason::MoreThan2qGates => ">2q gates in basis",
        };
        f.write_str(as_str)
    }
}

/// Configuration mistakes are fatal and reported before any graph construction; everything about
/// an unsatisfiable *input* is a [Vf2LayoutStopReason] instead.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vf2LayoutError {
    #[error("coupling_map or target must be specified")]
    MissingTopology,
}

/// Search budgets and matching semantics for one pass instance.
#[derive(Clone, Debug, Default)]
pub struct Vf2Configuration {
    /// Whether the direction of a coupling edge is a matching (and scoring) constraint.
    pub strict_direction: bool,
    /// Node-relabeling of the coupling graph for search diversity.
    pub shuffle: Shuffle,
    /// State-visit budget forwarded to the matching engine; not enforced by the controller.
    pub call_limit: Option<usize>,
    /// Wall-clock limit in seconds for the search phase, checked between candidates.
    pub time_limit: Option<f64>,
    /// Cap on scored candidates.  `None` derives a size-based default when no other budget is
    /// configured; zero or negative means unlimited.
    pub max_trials: Option<isize>,
}

/// The slots of the shared pipeline store this pass writes.  A successful run fills both;
/// anything else leaves `layout` untouched — absence, not a placeholder, is the failure signal.
#[derive(Clone, Debug, Default)]
pub struct PropertySet {
    pub layout: Option<NLayout>,
    pub vf2_stop_reason: Option<Vf2LayoutStopReason>,
}

/// A pass for choosing a layout of a circuit onto a coupling graph, as a subgraph isomorphism
/// problem solved by VF2.
///
/// If a solution is found, that means there is a "perfect layout" and no further swap mapping or
/// routing is needed.  The chosen layout, extended over every register qubit, is published to
/// the property set; when no solution exists only the stop reason is written.  Candidate
/// embeddings are scored against averaged hardware error rates and the search keeps the best
/// seen, under trial/time budgets, because the embedding space is combinatorially large.
pub struct Vf2Layout {
    coupling_map: Option<CouplingMap>,
    target: Option<Target>,
    properties: Option<BackendProperties>,
    config: Vf2Configuration,
    avg_error_map: Option<ErrorMap>,
}

impl Vf2Layout {
    /// Build a pass instance.  A configured [Target] supersedes both the raw coupling map and
    /// the [BackendProperties].
    pub fn new(
        coupling_map: Option<CouplingMap>,
        target: Option<Target>,
        properties: Option<BackendProperties>,
        config: Vf2Configuration,
    ) -> Self {
        let coupling_map = match &target {
            Some(target) => Some(target.build_coupling_map()),
            None => coupling_map,
        };
        Self {
            coupling_map,
            target,
            properties,
            config,
            avg_error_map: None,
        }
    }

    /// Replace the calibration data, invalidating the cached error map.
    pub fn set_properties(&mut self, properties: Option<BackendProperties>) {
        self.properties = properties;
        self.avg_error_map = None;
    }

    /// Replace the target, rebuilding the coupling map and invalidating the cached error map.
    pub fn set_target(&mut self, target: Option<Target>) {
        if let Some(target) = &target {
            self.coupling_map = Some(target.build_coupling_map());
        }
        self.target = target;
        self.avg_error_map = None;
    }

    /// The cached averaged error map, if a run has computed it already.
    pub fn average_error_map(&self) -> Option<&ErrorMap> {
        self.avg_error_map.as_ref()
    }

    /// Run the layout search and publish the outcome to `property_set`.
    pub fn run(
        &mut self,
        circuit: &Circuit,
        property_set: &mut PropertySet,
    ) -> Result<(), Vf2LayoutError> {
        let Some(coupling) = self.coupling_map.clone() else {
            return Err(Vf2LayoutError::MissingTopology);
        };
        if self.avg_error_map.is_none() {
            self.avg_error_map = Some(build_average_error_map(
                self.target.as_ref(),
                self.properties.as_ref(),
                &coupling,
            ));
        }
        let avg_error_map = self.avg_error_map.as_ref().expect("cache was just filled");

        let interactions = match InteractionGraph::from_circuit(circuit) {
            Ok(interactions) => interactions,
            Err(_) => {
                property_set.vf2_stop_reason = Some(Vf2LayoutStopReason::MoreThan2qGates);
                return Ok(());
            }
        };
        let (mut cm_graph, cm_nodes) = coupling.shuffled(&self.config.shuffle);
        if !self.config.strict_direction {
            loosen_directionality(&mut cm_graph);
        }

        // To avoid trying to over-optimize the result, by default limit the number of trials
        // based on the size of the graphs.  For circuits with simple layouts, like an all-1q
        // circuit, we don't want to sit forever trying every possible mapping in the search
        // space if no other limits are set.
        let max_trials: usize = match self.config.max_trials {
            Some(max_trials) => max_trials.try_into().unwrap_or(0),
            None if self.config.call_limit.is_none() && self.config.time_limit.is_none() => {
                interactions.graph.edge_count().max(coupling.edge_count()) + 15
            }
            None => 0,
        };

        debug!("Running VF2 to find mappings");
        let mappings = Vf2Algorithm::new(&interactions.graph, &cm_graph, self.config.call_limit);
        let equal_size = cm_graph.node_count() == interactions.graph.node_count();
        let start_time = Instant::now();
        let mut chosen: Option<(Vec<PhysicalQubit>, f64)> = None;
        let mut trials: usize = 0;
        for mapping in mappings {
            trials += 1;
            debug!("Running trial: {trials}");
            let assignment: Vec<PhysicalQubit> =
                mapping.iter().map(|host| cm_nodes[host.index()]).collect();
            // If the graphs have the same number of nodes we don't need to score or do multiple
            // trials: the score heuristic doesn't distinguish between full covers, so the
            // scores would always all be the same.
            if equal_size {
                chosen = Some((assignment, 0.));
                break;
            }
            let score = score_layout(
                avg_error_map,
                &assignment,
                &interactions,
                self.config.strict_direction,
            );
            debug!("Trial {trials} has score {score}");
            match &chosen {
                None => chosen = Some((assignment, score)),
                Some((_, best_score)) if score < *best_score => {
                    debug!(
                        "Found layout with a lower score ({score}) than previous best ({best_score})"
                    );
                    chosen = Some((assignment, score));
                }
                _ => (),
            }
            if max_trials > 0 && trials >= max_trials {
                debug!("Trial {trials} is >= configured max trials {max_trials}");
                break;
            }
            if let Some(time_limit) = self.config.time_limit {
                let elapsed = start_time.elapsed().as_secs_f64();
                if elapsed >= time_limit {
                    debug!("VF2Layout has taken {elapsed}s which exceeds max time: {time_limit}s");
                    break;
                }
            }
        }

        let stop_reason = match chosen {
            Some((assignment, _)) => {
                let partial: HashMap<VirtualQubit, PhysicalQubit> = assignment
                    .iter()
                    .enumerate()
                    .map(|(node, phys)| (interactions.nodes[node], *phys))
                    .collect();
                match map_free_qubits(coupling.num_qubits(), &interactions, partial, avg_error_map)
                {
                    Some(full) => {
                        property_set.layout = Some(NLayout::from_virtual_map(
                            full,
                            circuit.num_qubits() as usize,
                            coupling.num_qubits(),
                        ));
                        Vf2LayoutStopReason::SolutionFound
                    }
                    None => Vf2LayoutStopReason::NoSolutionFound,
                }
            }
            None => Vf2LayoutStopReason::NoSolutionFound,
        };
        property_set.vf2_stop_reason = Some(stop_reason);
        Ok(())
    }
}

/// Score a candidate embedding; lower is better.
///
/// The reduction is a reliability product: every interaction edge contributes `(1 - error)^count`
/// for its physical pair, every interaction node `(1 - error)^count` for its physical qubit's
/// diagonal entry, and the score is one minus the product.  A pair missing from the error map
/// (which a valid embedding should never produce) contributes nothing rather than failing.
fn score_layout(
    avg_error_map: &ErrorMap,
    assignment: &[PhysicalQubit],
    interactions: &InteractionGraph,
    strict_direction: bool,
) -> f64 {
    let edge_list: Vec<([PhysicalQubit; 2], i32)> = interactions
        .graph
        .edge_references()
        .map(|edge| {
            (
                [
                    assignment[edge.source().index()],
                    assignment[edge.target().index()],
                ],
                *edge.weight() as i32,
            )
        })
        .collect();
    let bit_list: Vec<(PhysicalQubit, i32)> = interactions
        .graph
        .node_indices()
        .map(|node| (assignment[node.index()], interactions.graph[node] as i32))
        .collect();
    let edge_filter_map = |(index_arr, gate_count): &([PhysicalQubit; 2], i32)| -> Option<f64> {
        let mut error = avg_error_map.get(index_arr);
        if !strict_direction && error.is_none() {
            error = avg_error_map.get(&[index_arr[1], index_arr[0]]);
        }
        error.map(|error| {
            if !error.is_nan() {
                (1. - error).powi(*gate_count)
            } else {
                1.
            }
        })
    };
    let bit_filter_map = |(qubit, gate_count): &(PhysicalQubit, i32)| -> Option<f64> {
        let error = avg_error_map.get(&[*qubit, *qubit]);
        error.map(|error| {
            if !error.is_nan() {
                (1. - error).powi(*gate_count)
            } else {
                1.
            }
        })
    };

    let mut fidelity: f64 = if edge_list.len() < PARALLEL_THRESHOLD {
        edge_list.iter().filter_map(edge_filter_map).product()
    } else {
        edge_list.par_iter().filter_map(edge_filter_map).product()
    };
    fidelity *= if bit_list.len() < PARALLEL_THRESHOLD {
        bit_list.iter().filter_map(bit_filter_map).product::<f64>()
    } else {
        bit_list.par_iter().filter_map(bit_filter_map).product()
    };
    1. - fidelity
}

/// Assign the virtual qubits the embedding did not cover to the physical qubits with the best
/// error rates.  Uncoupled qubits are ranked by how much they are used, so the busiest get first
/// pick; idle qubits take whatever is left.  Returns `None` when the registers demand more
/// qubits than the device has.
fn map_free_qubits(
    num_physical_qubits: usize,
    interactions: &InteractionGraph,
    mut partial_layout: HashMap<VirtualQubit, PhysicalQubit>,
    avg_error_map: &ErrorMap,
) -> Option<HashMap<VirtualQubit, PhysicalQubit>> {
    if num_physical_qubits
        < partial_layout.len() + interactions.uncoupled.len() + interactions.idle.len()
    {
        return None;
    }

    let normalize = |err: Option<f64>| -> f64 {
        let err = err.unwrap_or(f64::INFINITY);
        if err.is_nan() {
            0.0
        } else {
            err
        }
    };

    let mut free_physical = (0..num_physical_qubits)
        .map(|qubit| PhysicalQubit::new(qubit as u32))
        .collect::<IndexSet<_>>();
    partial_layout.values().for_each(|phys| {
        free_physical.swap_remove(phys);
    });
    let mut free_physical: Vec<_> = free_physical.into_iter().collect();
    free_physical.par_sort_by(|a, b| {
        let score_a = normalize(avg_error_map.get(&[*a, *a]));
        let score_b = normalize(avg_error_map.get(&[*b, *b]));
        score_a.partial_cmp(&score_b).expect("NaNs treated as zero")
    });

    let mut uncoupled_virtual: Vec<_> = interactions
        .uncoupled
        .iter()
        .map(|(virt, count)| (*virt, *count))
        .collect();
    uncoupled_virtual.par_sort_by_key(|(_, count)| *count);
    partial_layout.extend(
        uncoupled_virtual
            .into_iter()
            .rev() // We want the most used virtuals to get first pick.
            .map(|(virt, _)| virt)
            .chain(interactions.idle.iter().copied())
            .zip(free_physical),
    );
    Some(partial_layout)
}
