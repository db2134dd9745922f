//! The greedy service-chain placement heuristic.
//!
//! Demands are placed one after the other. Each demand gets up to `num_paths`
//! candidate routes, the cheapest candidate according to the blended cost function,
//! and an order-respecting assignment of the chain's functions onto that route.
//! Every reservation is final; there is no rollback.

mod assignment;
mod scoring;

use std::time::Instant;

use itertools::Itertools;
use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    algorithms::k_shortest_paths,
    chain::{expand_demands, Demand, ServiceChain},
    solver::{AssignmentSolver, SolverBackend},
    substrate::Substrate,
    Error, MyProgressIterator, Result,
};

/// # Service Chain Placement
///
/// This is a builder pattern to place a set of service chains onto a substrate
/// network. Create it with the loaded substrate and chains, adjust the knobs, and
/// call [`Kette::place`].
#[derive(Debug, Clone)]
pub struct Kette {
    /// The substrate network, including all reservations made so far.
    substrate: Substrate,
    /// The chains to place.
    chains: Vec<ServiceChain>,
    /// Balance between link cost (at 0.0) and node cost (at 1.0).
    alpha: f64,
    /// How many candidate paths to enumerate per demand.
    num_paths: usize,
    /// Which backend solves the assignment subproblem.
    backend: SolverBackend,
    /// Whether reservations may exceed node and link capacities.
    allow_oversubscription: bool,
    /// Whether a failed demand only counts as failed instead of aborting the run.
    continue_on_error: bool,
    /// Whether to show a progress bar.
    pub(crate) progress: bool,
}

impl Kette {
    /// Create a new instance with the default configuration: `alpha = 0.5`, three
    /// candidate paths, the dynamic-programming backend, strict capacities, and
    /// abort on the first failed demand.
    pub fn new(substrate: Substrate, chains: Vec<ServiceChain>) -> Self {
        Self {
            substrate,
            chains,
            alpha: 0.5,
            num_paths: 3,
            backend: SolverBackend::default(),
            allow_oversubscription: false,
            continue_on_error: false,
            progress: true,
        }
    }

    /// Set the balance between link cost and node cost. The value is clamped to
    /// `[0, 1]`.
    pub fn set_alpha(&mut self, alpha: f64) -> &mut Self {
        self.alpha = alpha.clamp(0.0, 1.0);
        self
    }

    /// Set how many candidate paths to enumerate per demand.
    pub fn set_num_paths(&mut self, num_paths: usize) -> &mut Self {
        self.num_paths = num_paths;
        self
    }

    /// Set the backend solving the assignment subproblem.
    pub fn set_backend(&mut self, backend: SolverBackend) -> &mut Self {
        self.backend = backend;
        self
    }

    /// Allow (or forbid) reservations beyond node and link capacities. When allowed,
    /// utilization may exceed 100% and no demand is ever rejected for capacity.
    pub fn allow_oversubscription(&mut self, allow: bool) -> &mut Self {
        self.allow_oversubscription = allow;
        self
    }

    /// Keep going when a demand cannot be placed, counting it as failed, instead of
    /// aborting the whole run. Reservations of earlier demands always remain.
    pub fn continue_on_error(&mut self, keep_going: bool) -> &mut Self {
        self.continue_on_error = keep_going;
        self
    }

    /// Do not display a progress bar.
    pub fn hide_progress(&mut self) -> &mut Self {
        self.progress = false;
        self
    }

    /// The substrate with all reservations made so far.
    pub fn substrate(&self) -> &Substrate {
        &self.substrate
    }

    /// Place all demands, in ascending order of their weight (ties keep discovery
    /// order). Returns the report over all processed demands.
    ///
    /// Without [`Kette::continue_on_error`], the first failing demand aborts the
    /// run with its error; reservations committed up to that point remain in the
    /// substrate.
    pub fn place(&mut self) -> Result<PlacementReport> {
        let start = Instant::now();
        let mut demands = expand_demands(&self.chains);
        demands.sort_by_key(|d| d.weight);
        debug!("placing {} demands", demands.len());
        let solver = self.backend.solver();

        let mut placements = Vec::with_capacity(demands.len());
        let mut num_failed = 0;
        for demand in demands
            .into_iter()
            .my_progress("Placing demands", true, self.progress)
        {
            match self.place_demand(&demand, solver.as_ref()) {
                Ok(placement) => placements.push(placement),
                Err(e) if self.continue_on_error => {
                    warn!(
                        "cannot place user {} of chain {}: {e}",
                        demand.user, self.chains[demand.chain].name
                    );
                    num_failed += 1;
                }
                Err(e) => return Err(e),
            }
        }

        info!("placed {} demands, {num_failed} failed", placements.len());
        Ok(PlacementReport {
            placements,
            num_failed,
            max_node_cpu_utilization: self.substrate.max_node_cpu_utilization(),
            max_node_mem_utilization: self.substrate.max_node_mem_utilization(),
            max_link_utilization: self.substrate.max_link_utilization(),
            elapsed_sec: start.elapsed().as_secs_f64(),
        })
    }

    /// Route and assign a single demand, committing all its reservations.
    fn place_demand(
        &mut self,
        demand: &Demand,
        solver: &dyn AssignmentSolver,
    ) -> Result<DemandPlacement> {
        let chain = &self.chains[demand.chain];
        let substrate = &mut self.substrate;

        let candidates =
            k_shortest_paths(substrate, demand.source, chain.egress, self.num_paths)?;
        let idx = scoring::select_path(substrate, &candidates, chain.per_unit_cpu(), self.alpha)
            .ok_or_else(|| Error::PathNotFound {
                src: substrate.name(demand.source).to_string(),
                dst: substrate.name(chain.egress).to_string(),
            })?;
        let path = &candidates[idx];
        debug!(
            "user {}: route {}",
            demand.user,
            path.iter().map(|n| substrate.name(n)).join(" -> ")
        );

        // check the whole path before reserving anything on it
        let links = substrate.path_links(path).unwrap();
        if !self.allow_oversubscription {
            for &l in &links {
                let state = substrate.link(l);
                if state.headroom() < chain.traffic_rate {
                    let (from, to) = substrate.edge_endpoints(l).unwrap();
                    return Err(Error::CapacityExceeded {
                        entity: format!("link {} -> {}", substrate.name(from), substrate.name(to)),
                        used: state.bandwidth_used,
                        capacity: state.bandwidth_capacity,
                        requested: chain.traffic_rate,
                    });
                }
            }
        }
        for &l in &links {
            substrate.reserve_link(l, chain.traffic_rate);
        }

        let problem =
            assignment::build_problem(substrate, path, chain, !self.allow_oversubscription);
        let solution = solver.solve(&problem)?;
        assignment::commit(substrate, path, demand.chain, chain, &solution);

        Ok(DemandPlacement {
            chain: chain.name.clone(),
            user: demand.user.clone(),
            source: substrate.name(demand.source).to_string(),
            path: path.iter().map(|n| substrate.name(n).to_string()).collect(),
            assigned: solution
                .node_of
                .iter()
                .map(|&pos| substrate.name(path[pos]).to_string())
                .collect(),
            objective: solution.objective,
        })
    }
}

/// The committed placement of a single demand.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandPlacement {
    /// The name of the chain the demand belongs to.
    pub chain: String,
    /// The ID of the user.
    pub user: String,
    /// The name of the node the user is attached to.
    pub source: String,
    /// The committed path, as node names from source to egress.
    pub path: Vec<String>,
    /// For every function of the chain, in order, the name of its node.
    pub assigned: Vec<String>,
    /// The worst utilization over the path's nodes after this assignment.
    pub objective: f64,
}

/// Summary of a full placement run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementReport {
    /// One entry per placed demand, in processing order.
    pub placements: Vec<DemandPlacement>,
    /// The number of demands that could not be placed.
    pub num_failed: usize,
    /// The worst CPU utilization over all nodes.
    pub max_node_cpu_utilization: f64,
    /// The worst memory utilization over all nodes.
    pub max_node_mem_utilization: f64,
    /// The worst bandwidth utilization over all links.
    pub max_link_utilization: f64,
    /// Wall-clock seconds spent placing.
    pub elapsed_sec: f64,
}

impl PlacementReport {
    /// The worst node CPU utilization, in percent.
    pub fn max_node_cpu_utilization_percent(&self) -> f64 {
        self.max_node_cpu_utilization * 100.0
    }

    /// The worst node memory utilization, in percent.
    pub fn max_node_mem_utilization_percent(&self) -> f64 {
        self.max_node_mem_utilization * 100.0
    }

    /// The worst link utilization, in percent.
    pub fn max_link_utilization_percent(&self) -> f64 {
        self.max_link_utilization * 100.0
    }
}
