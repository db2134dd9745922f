//! Yen's algorithm for enumerating the k shortest loop-free paths.

use std::collections::{BinaryHeap, HashSet};

use itertools::Itertools;
use petgraph::{
    prelude::*,
    visit::{VisitMap, Visitable},
    EdgeType,
};

use super::{
    dijkstra::{shortest_path, MinScored},
    EdgeList, Weight,
};
use crate::{
    substrate::{NodeId, Path, Substrate, SubstrateIx},
    Error, Result,
};

/// Enumerate the `k` shortest loop-free paths from `src` to `dst`, ordered by
/// ascending total distance. Ties are broken by discovery order, so repeated calls
/// on the same substrate return the same list.
///
/// Returns fewer than `k` paths when the substrate does not contain that many
/// distinct simple paths, and fails with [`Error::PathNotFound`] when `dst` is not
/// reachable from `src` at all.
pub fn k_shortest_paths(
    substrate: &Substrate,
    src: NodeId,
    dst: NodeId,
    k: usize,
) -> Result<Vec<Path>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    let graph = &substrate.graph;
    let nothing_removed: EdgeList<bool, SubstrateIx> = EdgeList::from_fn(graph, |_| false);

    let (_, first) = shortest_path(graph, src, dst, graph.visit_map(), &nothing_removed)
        .ok_or_else(|| Error::PathNotFound {
            src: substrate.name(src).to_string(),
            dst: substrate.name(dst).to_string(),
        })?;

    let mut shortest = vec![first];
    // spur candidates, keyed by total distance with a discovery counter as tie breaker
    let mut candidates: BinaryHeap<MinScored<(Weight, usize), Path>> = BinaryHeap::new();
    let mut seen: HashSet<Path> = shortest.iter().cloned().collect();
    let mut discovered = 0_usize;

    while shortest.len() < k {
        let prev = shortest.last().unwrap().clone();
        for spur_idx in 0..prev.len() - 1 {
            let spur_node = prev[spur_idx];
            let root = &prev[..=spur_idx];

            // remove the edges that would reproduce an already accepted path
            let mut removed = nothing_removed.clone();
            for p in &shortest {
                if p.len() > spur_idx + 1 && p[..=spur_idx] == *root {
                    if let Some(e) = graph.find_edge(p[spur_idx], p[spur_idx + 1]) {
                        removed[e] = true;
                    }
                }
            }
            // remove the root (except the spur node itself) to keep paths loop-free
            let mut ignored = graph.visit_map();
            for node in &root[..spur_idx] {
                ignored.visit(*node);
            }

            if let Some((_, spur_path)) = shortest_path(graph, spur_node, dst, ignored, &removed) {
                let mut candidate = root[..spur_idx].to_vec();
                candidate.extend(spur_path);
                if seen.insert(candidate.clone()) {
                    let weight = path_weight(graph, &candidate);
                    candidates.push(MinScored((weight, discovered), candidate));
                    discovered += 1;
                }
            }
        }
        match candidates.pop() {
            Some(MinScored(_, path)) => shortest.push(path),
            None => break,
        }
    }

    Ok(shortest)
}

/// The total weight of a path. The path must only step between adjacent nodes.
fn path_weight<N, D: EdgeType>(
    graph: &Graph<N, Weight, D, SubstrateIx>,
    path: &[NodeId],
) -> Weight {
    path.iter()
        .copied()
        .tuple_windows()
        .map(|(a, b)| graph[graph.find_edge(a, b).unwrap()])
        .fold(Weight::default(), |acc, w| acc + w)
}

#[cfg(test)]
mod test {
    use petgraph::algo::astar;
    use proptest::prelude::*;

    use super::*;
    use crate::substrate::{LinkSpec, NodeSpec};

    fn sub(nodes: &[&str], links: &[(&str, &str, f64)]) -> Substrate {
        Substrate::new(
            nodes
                .iter()
                .map(|name| NodeSpec {
                    name: name.to_string(),
                    cpu_capacity: 1.0,
                    mem_capacity: 1.0,
                })
                .collect(),
            links
                .iter()
                .map(|(a, b, d)| LinkSpec::new(*a, *b, 1.0, *d))
                .collect(),
        )
        .unwrap()
    }

    fn names<'a>(s: &'a Substrate, path: &[NodeId]) -> Vec<&'a str> {
        path.iter().map(|n| s.name(n)).collect()
    }

    /// The classic six-node example, with three distinct routes from c to h below
    /// weight 8.
    fn yen_example() -> Substrate {
        sub(
            &["c", "d", "e", "f", "g", "h"],
            &[
                ("c", "d", 3.0),
                ("c", "e", 2.0),
                ("d", "f", 4.0),
                ("e", "d", 1.0),
                ("e", "f", 2.0),
                ("e", "g", 3.0),
                ("f", "g", 2.0),
                ("f", "h", 1.0),
                ("g", "h", 2.0),
            ],
        )
    }

    #[test]
    fn finds_the_three_shortest() {
        let s = yen_example();
        let (c, h) = (s.node_id("c").unwrap(), s.node_id("h").unwrap());
        let paths = k_shortest_paths(&s, c, h, 3).unwrap();
        assert_eq!(paths.len(), 3);
        assert_eq!(names(&s, &paths[0]), vec!["c", "e", "f", "h"]);
        assert_eq!(names(&s, &paths[1]), vec!["c", "e", "g", "h"]);
        assert_eq!(names(&s, &paths[2]), vec!["c", "d", "f", "h"]);
        assert_eq!(path_weight(&s.graph, &paths[0]).into_inner(), 5.0);
        assert_eq!(path_weight(&s.graph, &paths[1]).into_inner(), 7.0);
        assert_eq!(path_weight(&s.graph, &paths[2]).into_inner(), 8.0);
    }

    #[test]
    fn paths_are_simple_sorted_and_unique() {
        let s = yen_example();
        let (c, h) = (s.node_id("c").unwrap(), s.node_id("h").unwrap());
        let paths = k_shortest_paths(&s, c, h, 10).unwrap();
        assert!(paths.len() >= 5);
        let weights: Vec<_> = paths.iter().map(|p| path_weight(&s.graph, p)).collect();
        assert!(weights.windows(2).all(|w| w[0] <= w[1]));
        let unique: HashSet<_> = paths.iter().collect();
        assert_eq!(unique.len(), paths.len());
        for p in &paths {
            let nodes: HashSet<_> = p.iter().collect();
            assert_eq!(nodes.len(), p.len(), "path revisits a node: {p:?}");
        }
    }

    #[test]
    fn deterministic_across_calls() {
        let s = yen_example();
        let (c, h) = (s.node_id("c").unwrap(), s.node_id("h").unwrap());
        assert_eq!(
            k_shortest_paths(&s, c, h, 10).unwrap(),
            k_shortest_paths(&s, c, h, 10).unwrap(),
        );
    }

    #[test]
    fn k_zero_and_k_larger_than_available() {
        let s = sub(&["a", "b"], &[("a", "b", 1.0)]);
        let (a, b) = (s.node_id("a").unwrap(), s.node_id("b").unwrap());
        assert!(k_shortest_paths(&s, a, b, 0).unwrap().is_empty());
        let paths = k_shortest_paths(&s, a, b, 10).unwrap();
        assert_eq!(paths.len(), 1);
        assert_eq!(names(&s, &paths[0]), vec!["a", "b"]);
    }

    #[test]
    fn source_equals_destination() {
        let s = yen_example();
        let c = s.node_id("c").unwrap();
        let paths = k_shortest_paths(&s, c, c, 3).unwrap();
        assert_eq!(paths, vec![vec![c]]);
    }

    #[test]
    fn disconnected_pair_fails() {
        let s = sub(&["a", "b", "x"], &[("a", "b", 1.0)]);
        let (a, x) = (s.node_id("a").unwrap(), s.node_id("x").unwrap());
        match k_shortest_paths(&s, a, x, 2) {
            Err(Error::PathNotFound { src, dst }) => {
                assert_eq!(src, "a");
                assert_eq!(dst, "x");
            }
            other => panic!("expected PathNotFound, got {other:?}"),
        }
    }

    /// Build a ten-node substrate from a string of `from:to:distance;` triples,
    /// skipping self-loops and repeated node pairs.
    fn substrate_from_string(s: &str) -> Substrate {
        let nodes = (0..10)
            .map(|i| NodeSpec {
                name: format!("n{i}"),
                cpu_capacity: 1.0,
                mem_capacity: 1.0,
            })
            .collect();
        let mut pairs = HashSet::new();
        let links = s
            .split_terminator(';')
            .filter_map(|triple| {
                let (a, b, d) = triple.split(':').collect_tuple()?;
                (a != b && pairs.insert((a.to_string(), b.to_string()))).then(|| {
                    LinkSpec::new(format!("n{a}"), format!("n{b}"), 1.0, d.parse().unwrap())
                })
            })
            .collect();
        Substrate::new(nodes, links).unwrap()
    }

    proptest! {
        /// The first enumerated path must match an independent shortest-path search.
        #[test]
        fn proptest_first_path_is_shortest(s in "([0-9]:[0-9]:[1-9][0-9]{0,2};){1,20}") {
            let substrate = substrate_from_string(&s);
            let src = substrate.node_id("n0").unwrap();
            let dst = substrate.node_id("n9").unwrap();
            let reference = astar(
                &substrate.graph,
                src,
                |n| n == dst,
                |e| *e.weight(),
                |_| Weight::default(),
            );
            match k_shortest_paths(&substrate, src, dst, 1) {
                Ok(paths) => {
                    prop_assert_eq!(paths.len(), 1);
                    let (cost, _) = reference.expect("astar must agree on reachability");
                    prop_assert_eq!(path_weight(&substrate.graph, &paths[0]), cost);
                }
                Err(Error::PathNotFound { .. }) => prop_assert!(reference.is_none()),
                Err(e) => prop_assert!(false, "unexpected error: {}", e),
            }
        }
    }
}
