//! Module containing all error types

use std::path::PathBuf;

use thiserror::Error;

/// Main error type
#[derive(Debug, Error)]
pub enum Error {
    /// The input data is inconsistent (unknown names, non-positive capacities, ...).
    #[error("invalid input: {0}")]
    InputFormat(String),
    /// There exists no route between two substrate nodes.
    #[error("no path from {src} to {dst}")]
    PathNotFound {
        /// Name of the source node.
        src: String,
        /// Name of the destination node.
        dst: String,
    },
    /// A reservation does not fit onto the chosen entity.
    #[error(
        "capacity exceeded on {entity}: {used}/{capacity} in use, {requested} more requested"
    )]
    CapacityExceeded {
        /// Human-readable name of the node or link.
        entity: String,
        /// Amount already reserved.
        used: f64,
        /// Total capacity.
        capacity: f64,
        /// Amount that was requested on top.
        requested: f64,
    },
    /// The assignment subproblem has no feasible solution.
    #[error("no feasible assignment of functions onto the path")]
    SolverInfeasible,
    /// The solver backend failed for a reason other than infeasibility.
    #[error("solver error: {0}")]
    Solver(String),
    /// Reading an input file failed.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying io error.
        source: std::io::Error,
    },
    /// Parsing an input file failed.
    #[error("cannot parse {}: {source}", path.display())]
    Json {
        /// The file that was parsed.
        path: PathBuf,
        /// The underlying parser error.
        source: serde_json::Error,
    },
}

/// Result type of this crate.
pub type Result<T> = std::result::Result<T, Error>;
