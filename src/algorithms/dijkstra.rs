//! Dijkstra shortest paths that honor node and edge masks.
//!
//! The k-shortest-path enumeration repeatedly removes nodes and edges from the
//! substrate graph. Instead of rebuilding the graph for every spur computation, the
//! search here takes the set of ignored nodes as a pre-filled visited map, and a
//! boolean [`EdgeList`] marking removed edges.

use std::{cmp::Ordering, collections::BinaryHeap};

use fixedbitset::FixedBitSet;
use petgraph::{
    graph::IndexType,
    prelude::*,
    visit::{VisitMap, Visitable},
    EdgeType,
};

use super::{inf, EdgeList, NodeList, Weight};

/// Compute the shortest path from `source` to `target`, skipping all nodes in
/// `ignored` and all edges marked in `removed`.
///
/// Returns the total path weight together with the node sequence (including both
/// endpoints), or `None` if `target` is unreachable. For `source == target`, the
/// trivial single-node path with weight zero is returned.
pub fn shortest_path<N, D: EdgeType, Ix: IndexType>(
    graph: &Graph<N, Weight, D, Ix>,
    source: NodeIndex<Ix>,
    target: NodeIndex<Ix>,
    ignored: FixedBitSet,
    removed: &EdgeList<bool, Ix>,
) -> Option<(Weight, Vec<NodeIndex<Ix>>)> {
    let mut visited = ignored;
    if visited.is_visited(&source) || visited.is_visited(&target) {
        return None;
    }
    let mut scores: NodeList<Weight, Ix> = NodeList::from_fn(graph, |_| inf());
    let mut prev: NodeList<Option<NodeIndex<Ix>>, Ix> = NodeList::from_fn(graph, |_| None);
    let mut visit_next = BinaryHeap::new();
    scores[source] = Weight::default();
    visit_next.push(MinScored(Weight::default(), source));

    while let Some(MinScored(node_score, node)) = visit_next.pop() {
        if visited.is_visited(&node) {
            continue;
        }
        if node == target {
            // the popped score is final
            let mut path = vec![target];
            let mut cur = target;
            while let Some(p) = prev[cur] {
                path.push(p);
                cur = p;
            }
            path.reverse();
            return Some((node_score, path));
        }
        for edge in graph.edges(node) {
            if removed[edge.id()] {
                continue;
            }
            let next = edge.target();
            if visited.is_visited(&next) {
                continue;
            }
            let next_score = node_score + *edge.weight();
            let old_score = scores[next];
            if old_score < inf() {
                // occupied
                if next_score < old_score {
                    scores[next] = next_score;
                    prev[next] = Some(node);
                    visit_next.push(MinScored(next_score, next));
                }
            } else {
                // vacant
                scores[next] = next_score;
                prev[next] = Some(node);
                visit_next.push(MinScored(next_score, next));
            }
        }
        visited.visit(node);
    }

    None
}

/// `MinScored<K, T>` holds a score `K` and a scored object `T` in
/// a pair for use with a `BinaryHeap`.
///
/// `MinScored` compares in reverse order by the score, so that we can
/// use `BinaryHeap` as a min-heap to extract the score-value pair with the
/// least score.
///
/// **Note:** `MinScored` implements a total order (`Ord`), so that it is
/// possible to use float types as scores.
#[derive(Copy, Clone, Debug)]
pub struct MinScored<K, T>(pub K, pub T);

impl<K: PartialOrd, T> PartialEq for MinScored<K, T> {
    #[inline]
    fn eq(&self, other: &MinScored<K, T>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd, T> Eq for MinScored<K, T> {}

impl<K: PartialOrd, T> PartialOrd for MinScored<K, T> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K, T>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd, T> Ord for MinScored<K, T> {
    #[inline]
    fn cmp(&self, other: &MinScored<K, T>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        if a == b {
            Ordering::Equal
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // these are the NaN cases
            Ordering::Equal
        } else if a.ne(a) {
            // Order NaN less, so that it is last in the MinScore order
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn w(x: f64) -> Weight {
        Weight::new(x).unwrap()
    }

    /// A diamond with a cheap upper route (0-1-3, weight 2) and an expensive lower
    /// route (0-2-3, weight 4).
    fn diamond() -> Graph<(), Weight, Directed, u16> {
        let mut g = Graph::default();
        let n: Vec<_> = (0..4).map(|_| g.add_node(())).collect();
        g.add_edge(n[0], n[1], w(1.0));
        g.add_edge(n[1], n[3], w(1.0));
        g.add_edge(n[0], n[2], w(2.0));
        g.add_edge(n[2], n[3], w(2.0));
        g
    }

    fn no_removed(g: &Graph<(), Weight, Directed, u16>) -> EdgeList<bool, u16> {
        EdgeList::from_fn(g, |_| false)
    }

    #[test]
    fn picks_the_cheap_route() {
        let g = diamond();
        let (cost, path) = shortest_path(&g, 0.into(), 3.into(), g.visit_map(), &no_removed(&g))
            .expect("connected");
        assert_eq!(cost, w(2.0));
        assert_eq!(path, vec![0.into(), 1.into(), 3.into()]);
    }

    #[test]
    fn masked_node_forces_detour() {
        let g = diamond();
        let mut ignored = g.visit_map();
        ignored.visit(NodeIndex::<u16>::from(1));
        let (cost, path) =
            shortest_path(&g, 0.into(), 3.into(), ignored, &no_removed(&g)).expect("connected");
        assert_eq!(cost, w(4.0));
        assert_eq!(path, vec![0.into(), 2.into(), 3.into()]);
    }

    #[test]
    fn masked_edge_forces_detour() {
        let g = diamond();
        let mut removed = no_removed(&g);
        let e = g.find_edge(1.into(), 3.into()).unwrap();
        removed[e] = true;
        let (cost, path) =
            shortest_path(&g, 0.into(), 3.into(), g.visit_map(), &removed).expect("connected");
        assert_eq!(cost, w(4.0));
        assert_eq!(path, vec![0.into(), 2.into(), 3.into()]);
    }

    #[test]
    fn unreachable_is_none() {
        let mut g = diamond();
        let lonely = g.add_node(());
        assert_eq!(
            shortest_path(&g, 0.into(), lonely, g.visit_map(), &no_removed(&g)),
            None
        );
    }

    #[test]
    fn trivial_path_to_self() {
        let g = diamond();
        let (cost, path) = shortest_path(&g, 2.into(), 2.into(), g.visit_map(), &no_removed(&g))
            .expect("trivially reachable");
        assert_eq!(cost, w(0.0));
        assert_eq!(path, vec![2.into()]);
    }
}
