//! Exact assignment by dynamic programming over path positions.

use ndarray::Array2;

use super::{Assignment, AssignmentProblem, AssignmentSolver};
use crate::{Error, Result};

/// Slack for capacity comparisons.
const EPS: f64 = 1e-9;

/// Solves the assignment subproblem exactly by walking the path once per function
/// count.
///
/// The table entry at `(i, k)` holds the best achievable worst-utilization when
/// functions `i..` still need nodes and node `k` is the earliest allowed. At every
/// node the solver tries all prefix lengths of the remaining functions. Ties prefer
/// placing fewer functions on the earlier node.
#[derive(Debug, Clone, Copy, Default)]
pub struct DpSolver;

impl AssignmentSolver for DpSolver {
    fn solve(&self, problem: &AssignmentProblem) -> Result<Assignment> {
        let n = problem.nodes.len();
        let m = problem.functions.len();

        let mut cpu_pref = vec![0.0; m + 1];
        let mut mem_pref = vec![0.0; m + 1];
        for (i, f) in problem.functions.iter().enumerate() {
            cpu_pref[i + 1] = cpu_pref[i] + f.cpu;
            mem_pref[i + 1] = mem_pref[i] + f.mem;
        }

        // nodes that receive nothing still bound the objective with their current load
        let baseline: Vec<f64> = problem
            .nodes
            .iter()
            .map(|r| (r.cpu_used / r.cpu_capacity).max(r.mem_used / r.mem_capacity))
            .collect();
        let mut suffix = vec![0.0; n + 1];
        for k in (0..n).rev() {
            suffix[k] = baseline[k].max(suffix[k + 1]);
        }

        let mut value = Array2::from_elem((m + 1, n + 1), f64::INFINITY);
        let mut choice = Array2::<usize>::zeros((m + 1, n + 1));
        for k in 0..=n {
            value[[m, k]] = suffix[k];
        }

        for i in (0..m).rev() {
            for k in (0..n).rev() {
                let node = &problem.nodes[k];
                let mut best = f64::INFINITY;
                let mut best_j = 0;
                for j in 0..=(m - i) {
                    let cpu = node.cpu_used + cpu_pref[i + j] - cpu_pref[i];
                    let mem = node.mem_used + mem_pref[i + j] - mem_pref[i];
                    if j > 0
                        && problem.enforce_capacity
                        && (cpu > node.cpu_capacity + EPS || mem > node.mem_capacity + EPS)
                    {
                        // loads only grow with j
                        break;
                    }
                    let here = (cpu / node.cpu_capacity).max(mem / node.mem_capacity);
                    let bound = here.max(value[[i + j, k + 1]]);
                    if bound < best {
                        best = bound;
                        best_j = j;
                    }
                }
                value[[i, k]] = best;
                choice[[i, k]] = best_j;
            }
        }

        if !value[[0, 0]].is_finite() {
            return Err(Error::SolverInfeasible);
        }

        let mut node_of = Vec::with_capacity(m);
        let (mut i, mut k) = (0, 0);
        while i < m {
            let j = choice[[i, k]];
            node_of.extend(std::iter::repeat(k).take(j));
            i += j;
            k += 1;
        }

        Ok(Assignment {
            node_of,
            objective: value[[0, 0]],
        })
    }
}
