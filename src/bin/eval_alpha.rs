//! Sweep the cost blend and the number of candidate paths over random scenarios.

#![deny(missing_docs, missing_debug_implementations)]

use std::time::Instant;

use kette::{
    chain::expand_demands,
    explorer::{Explorer, ScenarioParams, Task},
    placement::Kette,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
struct Datapoint {
    /// Number of substrate nodes
    num_nodes: usize,
    /// Number of directed substrate links
    num_edges: usize,
    /// Number of service chains
    num_chains: usize,
    /// Number of demands expanded from the chains
    num_demands: usize,
    /// Random seed used to generate the scenario.
    seed: u64,
    /// Balance between link load and node load in the path cost
    alpha: f64,
    /// Number of candidate paths scored per demand
    num_paths: usize,
    /// Number of demands that were placed
    num_placed: usize,
    /// Number of demands that could not be placed
    num_failed: usize,
    /// The worst CPU utilization over all nodes
    max_node_cpu_utilization: f64,
    /// The worst memory utilization over all nodes
    max_node_mem_utilization: f64,
    /// The worst bandwidth utilization over all links
    max_link_utilization: f64,
    /// Mean assignment objective over all placed demands
    mean_objective: f64,
    /// The total time
    running_time_sec: f64,
}

#[derive(Debug, Clone, Copy)]
struct GridParams {
    alpha: f64,
    num_paths: usize,
}

fn main() {
    let sizes = [8usize, 12, 16];
    let seeds = 1u64..=10;
    let scenario_params = sizes.iter().flat_map(|&num_nodes| {
        seeds.clone().map(move |seed| ScenarioParams {
            num_nodes,
            num_chains: num_nodes / 2,
            seed,
        })
    });

    let alphas = [0.0, 0.25, 0.5, 0.75, 1.0];
    let path_counts = [1usize, 2, 3, 5, 8];
    let grid = alphas.iter().flat_map(|&alpha| {
        path_counts
            .iter()
            .map(move |&num_paths| GridParams { alpha, num_paths })
    });

    std::fs::create_dir_all("measurements").unwrap();

    Explorer::new()
        .filename_with_timestamp("measurements/alpha")
        .scenario_params(scenario_params)
        .grid_params(grid)
        .work(run);
}

fn run(task: &Task<ScenarioParams, GridParams>) -> Vec<Datapoint> {
    let scenario = task.scenario.as_ref().clone();
    let num_nodes = scenario.substrate.node_count();
    let num_edges = scenario.substrate.edge_count();
    let num_chains = scenario.chains.len();
    let num_demands = expand_demands(&scenario.chains).len();

    let mut kette = Kette::new(scenario.substrate, scenario.chains);
    kette
        .set_alpha(task.grid_params.alpha)
        .set_num_paths(task.grid_params.num_paths)
        .continue_on_error(true)
        .hide_progress();

    let start_time = Instant::now();
    let report = kette.place().unwrap();
    let running_time_sec = start_time.elapsed().as_secs_f64();

    let mean_objective = report.placements.iter().map(|p| p.objective).sum::<f64>()
        / report.placements.len().max(1) as f64;

    task.pb.inc(1);

    vec![Datapoint {
        num_nodes,
        num_edges,
        num_chains,
        num_demands,
        seed: task.scenario_params.seed,
        alpha: task.grid_params.alpha,
        num_paths: task.grid_params.num_paths,
        num_placed: report.placements.len(),
        num_failed: report.num_failed,
        max_node_cpu_utilization: report.max_node_cpu_utilization,
        max_node_mem_utilization: report.max_node_mem_utilization,
        max_link_utilization: report.max_link_utilization,
        mean_objective,
        running_time_sec,
    }]
}
