//! The substrate network: nodes and links with static capacities and mutable usage.

use std::collections::BTreeMap;

use bimap::BiHashMap;
use itertools::Itertools;
use ordered_float::NotNan;
use petgraph::prelude::*;
use smallvec::SmallVec;

use crate::{
    algorithms::{EdgeList, NodeList, Weight},
    chain::ChainId,
    Error, Result,
};

/// The index type for the substrate graph.
pub type SubstrateIx = u16;
/// The ID of a node within the substrate.
pub type NodeId = NodeIndex<SubstrateIx>;
/// The ID of a link within the substrate.
pub type EdgeId = EdgeIndex<SubstrateIx>;
/// A path through the substrate: the visited nodes, from source to destination inclusive.
pub type Path = Vec<NodeId>;

/// Static description of a substrate node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSpec {
    /// Unique node name.
    pub name: String,
    /// Total CPU capacity.
    pub cpu_capacity: f64,
    /// Total memory capacity.
    pub mem_capacity: f64,
}

/// Static description of a directed substrate link.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkSpec {
    /// Name of the node the link starts at.
    pub from: String,
    /// Name of the node the link ends at.
    pub to: String,
    /// Total bandwidth capacity.
    pub bandwidth_capacity: f64,
    /// Path-selection weight of the link.
    pub distance: f64,
}

impl LinkSpec {
    /// Convenience constructor.
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        bandwidth_capacity: f64,
        distance: f64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            bandwidth_capacity,
            distance,
        }
    }
}

/// Resource state of a substrate node. Usage only ever increases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodeState {
    /// Total CPU capacity.
    pub cpu_capacity: f64,
    /// Total memory capacity.
    pub mem_capacity: f64,
    /// CPU in use, in the same unit as the capacity.
    pub cpu_used: f64,
    /// Memory in use, in the same unit as the capacity.
    pub mem_used: f64,
    /// Functions committed to this node, as chain-local function indices per chain.
    pub placed: BTreeMap<ChainId, SmallVec<[usize; 4]>>,
}

impl NodeState {
    /// The fraction of CPU in use.
    pub fn cpu_utilization(&self) -> f64 {
        self.cpu_used / self.cpu_capacity
    }

    /// The fraction of memory in use.
    pub fn mem_utilization(&self) -> f64 {
        self.mem_used / self.mem_capacity
    }
}

/// Resource state of a substrate link. Usage only ever increases.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LinkState {
    /// Total bandwidth capacity.
    pub bandwidth_capacity: f64,
    /// Bandwidth reserved so far.
    pub bandwidth_used: f64,
}

impl LinkState {
    /// The fraction of bandwidth reserved.
    pub fn utilization(&self) -> f64 {
        self.bandwidth_used / self.bandwidth_capacity
    }

    /// The bandwidth that is still unreserved.
    pub fn headroom(&self) -> f64 {
        self.bandwidth_capacity - self.bandwidth_used
    }
}

/// The substrate network, represented as a directed graph with link distances as edge
/// weights, together with the resource state of every node and link.
///
/// The structure (node, link and name sets) is immutable after construction. Only the
/// usage counters mutate, strictly increasing, through [`Substrate::reserve_link`] and
/// [`Substrate::place_function`].
#[derive(Debug, Clone)]
pub struct Substrate {
    /// The topology, stored as a directed graph.
    pub graph: Graph<(), Weight, Directed, SubstrateIx>,
    lut: BiHashMap<String, NodeId>,
    nodes: NodeList<NodeState, SubstrateIx>,
    links: EdgeList<LinkState, SubstrateIx>,
}

impl std::ops::Deref for Substrate {
    type Target = Graph<(), Weight, Directed, SubstrateIx>;

    fn deref(&self) -> &Self::Target {
        &self.graph
    }
}

impl Substrate {
    /// Build a substrate from node and link descriptions. All names must be unique,
    /// all capacities positive, all link endpoints known, and at most one directed
    /// link may connect any ordered node pair.
    pub fn new(node_specs: Vec<NodeSpec>, link_specs: Vec<LinkSpec>) -> Result<Self> {
        let mut graph = Graph::with_capacity(node_specs.len(), link_specs.len());
        let mut lut: BiHashMap<String, NodeId> = BiHashMap::with_capacity(node_specs.len());
        let mut nodes = Vec::with_capacity(node_specs.len());
        for spec in node_specs {
            if !(spec.cpu_capacity > 0.0) || !(spec.mem_capacity > 0.0) {
                return Err(Error::InputFormat(format!(
                    "node {} must have positive cpu and memory capacities",
                    spec.name
                )));
            }
            if lut.contains_left(&spec.name) {
                return Err(Error::InputFormat(format!("duplicate node {}", spec.name)));
            }
            let id = graph.add_node(());
            lut.insert(spec.name, id);
            nodes.push(NodeState {
                cpu_capacity: spec.cpu_capacity,
                mem_capacity: spec.mem_capacity,
                ..Default::default()
            });
        }

        let mut links = Vec::with_capacity(link_specs.len());
        for spec in link_specs {
            let from = *lut.get_by_left(&spec.from).ok_or_else(|| {
                Error::InputFormat(format!("link references unknown node {}", spec.from))
            })?;
            let to = *lut.get_by_left(&spec.to).ok_or_else(|| {
                Error::InputFormat(format!("link references unknown node {}", spec.to))
            })?;
            if from == to {
                return Err(Error::InputFormat(format!("node {} links to itself", spec.from)));
            }
            if graph.find_edge(from, to).is_some() {
                return Err(Error::InputFormat(format!(
                    "duplicate link from {} to {}",
                    spec.from, spec.to
                )));
            }
            if !(spec.bandwidth_capacity > 0.0) {
                return Err(Error::InputFormat(format!(
                    "link from {} to {} must have positive bandwidth capacity",
                    spec.from, spec.to
                )));
            }
            let distance = NotNan::new(spec.distance)
                .ok()
                .filter(|d| d.into_inner() >= 0.0)
                .ok_or_else(|| {
                    Error::InputFormat(format!(
                        "link from {} to {} must have a non-negative distance",
                        spec.from, spec.to
                    ))
                })?;
            graph.add_edge(from, to, distance);
            links.push(LinkState {
                bandwidth_capacity: spec.bandwidth_capacity,
                ..Default::default()
            });
        }

        Ok(Self {
            graph,
            lut,
            nodes: nodes.into(),
            links: links.into(),
        })
    }

    /// Lookup a node by its name.
    pub fn node_id(&self, name: &str) -> Option<NodeId> {
        self.lut.get_by_left(name).copied()
    }

    /// The name of a node.
    pub fn name(&self, id: impl std::borrow::Borrow<NodeId>) -> &str {
        self.lut.get_by_right(id.borrow()).unwrap()
    }

    /// The resource state of a node.
    pub fn node(&self, id: impl std::borrow::Borrow<NodeId>) -> &NodeState {
        &self.nodes[id.borrow()]
    }

    /// The resource state of a link.
    pub fn link(&self, id: impl std::borrow::Borrow<EdgeId>) -> &LinkState {
        &self.links[id.borrow()]
    }

    /// Iterate over all nodes with their resource state.
    pub fn nodes(&self) -> impl ExactSizeIterator<Item = (NodeId, &NodeState)> {
        self.nodes.idx_iter()
    }

    /// Iterate over all links with their resource state.
    pub fn links(&self) -> impl Iterator<Item = (EdgeId, &LinkState)> {
        self.links.idx_iter()
    }

    /// Translate a path (list of node IDs) to the list of traversed links. Returns
    /// `None` when two consecutive nodes are not connected.
    pub fn path_links(&self, path: &[NodeId]) -> Option<Vec<EdgeId>> {
        path.iter()
            .copied()
            .tuple_windows()
            .map(|(a, b)| self.graph.find_edge(a, b))
            .collect()
    }

    /// Reserve bandwidth on a link.
    pub fn reserve_link(&mut self, id: EdgeId, amount: f64) {
        self.links[id].bandwidth_used += amount;
    }

    /// Commit one function of a chain to a node, reserving the given absolute CPU and
    /// memory amounts.
    pub fn place_function(
        &mut self,
        id: NodeId,
        chain: ChainId,
        function: usize,
        cpu: f64,
        mem: f64,
    ) {
        let state = &mut self.nodes[id];
        state.cpu_used += cpu;
        state.mem_used += mem;
        state.placed.entry(chain).or_default().push(function);
    }

    /// The worst CPU utilization over all nodes.
    pub fn max_node_cpu_utilization(&self) -> f64 {
        self.nodes.iter().map(NodeState::cpu_utilization).fold(0.0, f64::max)
    }

    /// The worst memory utilization over all nodes.
    pub fn max_node_mem_utilization(&self) -> f64 {
        self.nodes.iter().map(NodeState::mem_utilization).fold(0.0, f64::max)
    }

    /// The worst bandwidth utilization over all links.
    pub fn max_link_utilization(&self) -> f64 {
        self.links.iter().map(LinkState::utilization).fold(0.0, f64::max)
    }
}
