//! Assignment by mixed-integer programming.
//!
//! One binary variable per function and path node decides the assignment. A
//! continuous variable `t` bounds the CPU and memory utilization of every node on
//! the path, and the model minimizes `t`. Chain order is kept linear without big-M
//! tricks: the position of a function is the index sum of its selected node, and
//! positions must not decrease along the chain.

use good_lp::{
    constraint, solvers::lp_solvers::LpSolver, variable, Constraint, Expression,
    ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
};
use lp_solvers::solvers::CbcSolver;

use super::{Assignment, AssignmentProblem, AssignmentSolver};
use crate::{Error, Result};

/// Solves the assignment subproblem with an external MILP solver. The model is
/// written in lp format and handed to the `cbc` binary, so solving requires CBC on
/// the PATH.
#[derive(Debug, Clone, Copy, Default)]
pub struct MilpSolver;

struct MilpVars {
    /// `assign[i][k]` selects path node `k` for function `i`.
    assign: Vec<Vec<Variable>>,
    /// Upper bound on the worst utilization, the objective.
    t: Variable,
}

fn setup_vars(problem: &AssignmentProblem) -> (ProblemVariables, MilpVars) {
    let mut p = ProblemVariables::new();
    let assign = (0..problem.functions.len())
        .map(|_| {
            (0..problem.nodes.len())
                .map(|_| p.add(variable().binary()))
                .collect()
        })
        .collect();
    let t = p.add(variable().min(0.0));
    (p, MilpVars { assign, t })
}

/// Build all constraint rows of the model.
fn setup_constraints(problem: &AssignmentProblem, vars: &MilpVars) -> Vec<Constraint> {
    let n = problem.nodes.len();
    let m = problem.functions.len();
    let mut constraints = Vec::new();

    // every function sits on exactly one node
    for i in 0..m {
        let ones = vars.assign[i]
            .iter()
            .map(|x| Expression::from(*x))
            .sum::<Expression>();
        constraints.push(constraint!(ones == 1));
    }

    // functions appear along the path in chain order
    let positions: Vec<Expression> = (0..m)
        .map(|i| {
            vars.assign[i]
                .iter()
                .enumerate()
                .map(|(k, x)| (k as f64) * *x)
                .sum::<Expression>()
        })
        .collect();
    for i in 1..m {
        let (earlier, later) = (positions[i - 1].clone(), positions[i].clone());
        constraints.push(constraint!(earlier <= later));
    }

    // `t` bounds the utilization of every node, for cpu and memory alike
    for (k, node) in problem.nodes.iter().enumerate() {
        let cpu = (0..m)
            .map(|i| (problem.functions[i].cpu / node.cpu_capacity) * vars.assign[i][k])
            .sum::<Expression>();
        let cpu_bound = Expression::from(vars.t) - node.cpu_used / node.cpu_capacity;
        constraints.push(constraint!(cpu <= cpu_bound));

        let mem = (0..m)
            .map(|i| (problem.functions[i].mem / node.mem_capacity) * vars.assign[i][k])
            .sum::<Expression>();
        let mem_bound = Expression::from(vars.t) - node.mem_used / node.mem_capacity;
        constraints.push(constraint!(mem <= mem_bound));
    }

    // forbid assignments beyond the capacity
    if problem.enforce_capacity {
        for (k, node) in problem.nodes.iter().enumerate() {
            let cpu = (0..m)
                .map(|i| problem.functions[i].cpu * vars.assign[i][k])
                .sum::<Expression>();
            constraints.push(constraint!(cpu <= node.cpu_capacity - node.cpu_used));

            let mem = (0..m)
                .map(|i| problem.functions[i].mem * vars.assign[i][k])
                .sum::<Expression>();
            constraints.push(constraint!(mem <= node.mem_capacity - node.mem_used));
        }
    }

    constraints
}

impl AssignmentSolver for MilpSolver {
    fn solve(&self, problem: &AssignmentProblem) -> Result<Assignment> {
        let (p, vars) = setup_vars(problem);
        let mut model = p.minimise(vars.t).using(LpSolver(CbcSolver::default()));
        for c in setup_constraints(problem, &vars) {
            model.add_constraint(c);
        }

        match model.solve() {
            Ok(solution) => {
                let mut node_of = Vec::with_capacity(problem.functions.len());
                for row in &vars.assign {
                    let k = row
                        .iter()
                        .position(|x| solution.value(*x) > 0.5)
                        .ok_or_else(|| {
                            Error::Solver("no node selected for a function".to_string())
                        })?;
                    node_of.push(k);
                }
                Ok(Assignment {
                    node_of,
                    objective: solution.value(vars.t),
                })
            }
            Err(ResolutionError::Infeasible) => Err(Error::SolverInfeasible),
            Err(e) => Err(Error::Solver(e.to_string())),
        }
    }
}
