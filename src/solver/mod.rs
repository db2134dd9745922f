//! Solvers for the per-path assignment subproblem.
//!
//! Once the scheduler has picked a candidate path, the functions of the chain still
//! need nodes on that path, in order, such that the worst resource utilization after
//! placement is as small as possible. Two interchangeable backends solve this: an
//! exact dynamic program over path positions, and a mixed-integer formulation handed
//! to an external solver.

use strum::{Display, EnumIter, EnumString};

use crate::Result;

pub mod dp;
pub mod milp;

pub use dp::DpSolver;
pub use milp::MilpSolver;

/// Resource state of one path node, as seen by the solver. All values are absolute,
/// in the unit of the respective capacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeResources {
    /// CPU already in use.
    pub cpu_used: f64,
    /// Total CPU capacity.
    pub cpu_capacity: f64,
    /// Memory already in use.
    pub mem_used: f64,
    /// Total memory capacity.
    pub mem_capacity: f64,
}

/// Absolute resource demand of one function at the demand's traffic rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionLoad {
    /// CPU demand.
    pub cpu: f64,
    /// Memory demand.
    pub mem: f64,
}

/// One assignment subproblem: map every function to a node such that function order
/// follows node order along the path.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentProblem {
    /// The nodes of the candidate path, in path order.
    pub nodes: Vec<NodeResources>,
    /// The functions of the chain, in traversal order.
    pub functions: Vec<FunctionLoad>,
    /// Whether assignments beyond a node's capacity are forbidden.
    pub enforce_capacity: bool,
}

/// A solved assignment.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// For every function, the index of its node within the path.
    pub node_of: Vec<usize>,
    /// The objective value: the worst CPU or memory utilization over the path's
    /// nodes after applying the assignment.
    pub objective: f64,
}

/// An exact solver for [`AssignmentProblem`]s.
pub trait AssignmentSolver {
    /// Compute an order-respecting assignment minimizing the worst utilization.
    ///
    /// Fails with [`crate::Error::SolverInfeasible`] when capacities are enforced
    /// and no assignment fits.
    fn solve(&self, problem: &AssignmentProblem) -> Result<Assignment>;
}

/// Which backend solves the assignment subproblem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SolverBackend {
    /// The dynamic program over path positions.
    #[default]
    Dp,
    /// The mixed-integer formulation, solved by CBC.
    Milp,
}

impl SolverBackend {
    /// Instantiate the chosen backend.
    pub fn solver(&self) -> Box<dyn AssignmentSolver> {
        match self {
            Self::Dp => Box::new(DpSolver),
            Self::Milp => Box::new(MilpSolver),
        }
    }
}
