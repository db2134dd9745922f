//! Scoring and selection of candidate paths.

use itertools::Itertools;

use crate::substrate::{Path, Substrate};

/// The raw features of one candidate path, measured on the current substrate state.
/// Every candidate is scored in isolation; features of one candidate never feed into
/// another.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct PathFeatures {
    /// Mean bandwidth utilization over the path's links.
    pub link_util_avg: f64,
    /// Worst bandwidth utilization over the path's links.
    pub link_util_max: f64,
    /// Hop count of the best candidate relative to this one, scaled by the inverse
    /// CPU cost of the chain.
    pub length_term: f64,
    /// Mean CPU utilization over the path's nodes.
    pub node_cpu_avg: f64,
    /// Worst CPU utilization over the path's nodes.
    pub node_cpu_max: f64,
}

impl PathFeatures {
    /// Measure a candidate path. `shortest_hops` is the hop count of the best
    /// candidate for the same demand, `per_unit_cpu` the CPU cost of the whole chain
    /// per unit of traffic.
    pub(super) fn measure(
        substrate: &Substrate,
        path: &Path,
        shortest_hops: usize,
        per_unit_cpu: f64,
    ) -> Self {
        let link_utils: Vec<f64> = path
            .iter()
            .copied()
            .tuple_windows()
            .filter_map(|(a, b)| substrate.find_edge(a, b))
            .map(|e| substrate.link(e).utilization())
            .collect();
        let link_util_avg = match link_utils.len() {
            0 => 0.0,
            n => link_utils.iter().sum::<f64>() / n as f64,
        };
        let link_util_max = link_utils.iter().copied().fold(0.0, f64::max);

        let hops = path.len() - 1;
        let length_term = match hops {
            0 => 0.0,
            _ => (shortest_hops as f64 / hops as f64) * (1.0 / per_unit_cpu),
        };

        let node_utils: Vec<f64> = path
            .iter()
            .map(|n| substrate.node(n).cpu_utilization())
            .collect();
        let node_cpu_avg = node_utils.iter().sum::<f64>() / node_utils.len() as f64;
        let node_cpu_max = node_utils.iter().copied().fold(0.0, f64::max);

        Self {
            link_util_avg,
            link_util_max,
            length_term,
            node_cpu_avg,
            node_cpu_max,
        }
    }

    /// Blend the features into a single cost. `alpha` shifts the balance from the
    /// link side (`alpha = 0`) to the node side (`alpha = 1`).
    pub(super) fn cost(&self, alpha: f64) -> f64 {
        let link_side = (self.link_util_avg + self.link_util_max + self.length_term) / 3.0;
        let node_side = (self.node_cpu_max + self.node_cpu_avg) / 2.0;
        (1.0 - alpha) * link_side + alpha * node_side
    }
}

/// Pick the cheapest candidate and return its index. Equal costs resolve to the
/// earlier candidate.
pub(super) fn select_path(
    substrate: &Substrate,
    candidates: &[Path],
    per_unit_cpu: f64,
    alpha: f64,
) -> Option<usize> {
    let shortest_hops = candidates.first()?.len() - 1;
    let mut best_idx = 0;
    let mut best_cost =
        PathFeatures::measure(substrate, &candidates[0], shortest_hops, per_unit_cpu).cost(alpha);
    for (i, path) in candidates.iter().enumerate().skip(1) {
        let cost = PathFeatures::measure(substrate, path, shortest_hops, per_unit_cpu).cost(alpha);
        if cost < best_cost {
            best_idx = i;
            best_cost = cost;
        }
    }
    Some(best_idx)
}
