//! Graph algorithms and graph-indexed containers used by the placement heuristic.

use std::{borrow::Borrow, marker::PhantomData};

use ordered_float::NotNan;
use petgraph::{prelude::*, stable_graph::IndexType, EdgeType};

pub mod dijkstra;
pub mod ksp;

pub use ksp::k_shortest_paths;

/// Edge weight used for path selection. `NotNan` keeps the ordering total, so weights
/// can live in binary heaps and be compared without surprises.
pub type Weight = NotNan<f64>;

/// The unreachable sentinel for distances.
pub(crate) fn inf() -> Weight {
    NotNan::new(f64::INFINITY).unwrap()
}

/// Datastructure storing type `T` for each edge in a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct EdgeList<T, Ix> {
    d: Vec<T>,
    ix: PhantomData<Ix>,
}

/// Datastructure storing type `T` for each node in a graph.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeList<T, Ix> {
    d: Vec<T>,
    ix: PhantomData<Ix>,
}

impl<T, Ix> From<Vec<T>> for NodeList<T, Ix> {
    fn from(d: Vec<T>) -> Self {
        Self { d, ix: PhantomData }
    }
}

impl<T, Ix> From<Vec<T>> for EdgeList<T, Ix> {
    fn from(d: Vec<T>) -> Self {
        Self { d, ix: PhantomData }
    }
}

impl<I, T, Ix> std::ops::Index<I> for EdgeList<T, Ix>
where
    I: Borrow<EdgeIndex<Ix>>,
    Ix: IndexType,
{
    type Output = T;

    fn index(&self, idx: I) -> &Self::Output {
        &self.d[EdgeIndex::<Ix>::index(*idx.borrow())]
    }
}

impl<I, T, Ix> std::ops::IndexMut<I> for EdgeList<T, Ix>
where
    I: Borrow<EdgeIndex<Ix>>,
    Ix: IndexType,
{
    fn index_mut(&mut self, idx: I) -> &mut Self::Output {
        &mut self.d[EdgeIndex::<Ix>::index(*idx.borrow())]
    }
}

impl<'a, T, Ix> IntoIterator for &'a EdgeList<T, Ix> {
    type Item = &'a T;

    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.d.iter()
    }
}

impl<I, T, Ix> std::ops::Index<I> for NodeList<T, Ix>
where
    I: Borrow<NodeIndex<Ix>>,
    Ix: IndexType,
{
    type Output = T;

    fn index(&self, idx: I) -> &Self::Output {
        &self.d[NodeIndex::<Ix>::index(*idx.borrow())]
    }
}

impl<I, T, Ix> std::ops::IndexMut<I> for NodeList<T, Ix>
where
    I: Borrow<NodeIndex<Ix>>,
    Ix: IndexType,
{
    fn index_mut(&mut self, idx: I) -> &mut Self::Output {
        &mut self.d[NodeIndex::<Ix>::index(*idx.borrow())]
    }
}

impl<'a, T, Ix> IntoIterator for &'a NodeList<T, Ix> {
    type Item = &'a T;

    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.d.iter()
    }
}

impl<T, Ix> EdgeList<T, Ix> {
    /// Get the number of elements in the list
    pub fn len(&self) -> usize {
        self.d.len()
    }

    /// Returns `true` if the edge list is empty
    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }

    /// Create a new `EdgeList` by calling `f` for each edge in the graph.
    pub fn from_fn<N, E, D, F>(graph: &Graph<N, E, D, Ix>, f: F) -> Self
    where
        F: FnMut(EdgeIndex<Ix>) -> T,
        D: EdgeType,
        Ix: IndexType,
    {
        Self {
            d: graph.edge_indices().map(f).collect(),
            ix: PhantomData,
        }
    }

    /// Iterate over all elements in the `EdgeList`.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.d.iter()
    }

    /// Iterate over all elements in the `EdgeList`, along with the `EdgeIndex`.
    pub fn idx_iter(&self) -> impl Iterator<Item = (EdgeIndex<Ix>, &T)>
    where
        Ix: IndexType,
    {
        self.d.iter().enumerate().map(|(i, t)| (EdgeIndex::<Ix>::new(i), t))
    }
}

impl<T, Ix> NodeList<T, Ix> {
    /// Get the number of elements in the list
    pub fn len(&self) -> usize {
        self.d.len()
    }

    /// Returns `true` if `self` is empty.
    pub fn is_empty(&self) -> bool {
        self.d.is_empty()
    }

    /// Create a new `NodeList` by calling `f` for each node in the graph.
    pub fn from_fn<N, E, D, F>(graph: &Graph<N, E, D, Ix>, f: F) -> Self
    where
        D: EdgeType,
        F: FnMut(NodeIndex<Ix>) -> T,
        Ix: IndexType,
    {
        Self {
            d: graph.node_indices().map(f).collect(),
            ix: PhantomData,
        }
    }

    /// Iterate over all elements in the `NodeList`.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> {
        self.d.iter()
    }

    /// Iterate over all elements in the `NodeList`, along with the `NodeIndex`.
    pub fn idx_iter(&self) -> impl ExactSizeIterator<Item = (NodeIndex<Ix>, &T)>
    where
        Ix: IndexType,
    {
        self.d.iter().enumerate().map(|(i, t)| (NodeIndex::<Ix>::new(i), t))
    }
}
