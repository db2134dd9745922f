//! Service chains, the function catalog, and the per-user demands derived from them.

use std::collections::HashMap;

use ordered_float::NotNan;

use crate::{
    substrate::{NodeId, Substrate},
    Error, Result,
};

/// The ID of a service chain, its position in the scenario's chain list.
pub type ChainId = usize;

/// Resource usage of a single function type, per unit of traffic.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FunctionSpec {
    /// CPU usage per unit of traffic.
    pub cpu: f64,
    /// Memory usage per unit of traffic.
    pub mem: f64,
}

/// The catalog of known function types, indexed by name.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VnfCatalog {
    specs: HashMap<String, FunctionSpec>,
}

impl VnfCatalog {
    /// Build a catalog, checking that every function has positive CPU usage and
    /// non-negative memory usage.
    pub fn new(specs: HashMap<String, FunctionSpec>) -> Result<Self> {
        for (name, spec) in &specs {
            if !(spec.cpu > 0.0) || spec.mem < 0.0 {
                return Err(Error::InputFormat(format!(
                    "function {name} must have positive cpu and non-negative memory usage"
                )));
            }
        }
        Ok(Self { specs })
    }

    /// Lookup a function type by name.
    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.specs.get(name)
    }

    /// The number of known function types.
    pub fn len(&self) -> usize {
        self.specs.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

/// A group of users attached to the same substrate node.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The node the users are attached to.
    pub node: NodeId,
    /// One ID per user. Every ID becomes one demand.
    pub ids: Vec<String>,
}

/// An ordered service chain: traffic of every user traverses the functions in order
/// and leaves the network at the egress node.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceChain {
    /// Human-readable chain name.
    pub name: String,
    /// The function types to traverse, in order.
    pub functions: Vec<String>,
    /// The resolved resource usage of each function, in the same order.
    specs: Vec<FunctionSpec>,
    /// Traffic rate of a single user of this chain.
    pub traffic_rate: f64,
    /// The node where all traffic of this chain leaves the network.
    pub egress: NodeId,
    /// The users subscribed to this chain.
    pub users: Vec<User>,
}

impl ServiceChain {
    /// Build a chain, resolving its function types against the catalog. The function
    /// list must be non-empty, the traffic rate positive, and no user may sit on the
    /// egress node itself.
    pub fn new(
        name: impl Into<String>,
        functions: Vec<String>,
        traffic_rate: f64,
        egress: NodeId,
        users: Vec<User>,
        catalog: &VnfCatalog,
        substrate: &Substrate,
    ) -> Result<Self> {
        let name = name.into();
        if functions.is_empty() {
            return Err(Error::InputFormat(format!("chain {name} has no functions")));
        }
        if !(traffic_rate > 0.0) {
            return Err(Error::InputFormat(format!(
                "chain {name} must have a positive traffic rate"
            )));
        }
        let specs = functions
            .iter()
            .map(|f| {
                catalog.get(f).copied().ok_or_else(|| {
                    Error::InputFormat(format!("chain {name} references unknown function {f}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        for user in &users {
            if user.node == egress {
                return Err(Error::InputFormat(format!(
                    "chain {name} attaches users to its own egress {}",
                    substrate.name(user.node)
                )));
            }
        }
        Ok(Self {
            name,
            functions,
            specs,
            traffic_rate,
            egress,
            users,
        })
    }

    /// The resource usage of the `i`-th function of this chain.
    pub fn function(&self, i: usize) -> &FunctionSpec {
        &self.specs[i]
    }

    /// The number of functions in this chain.
    pub fn num_functions(&self) -> usize {
        self.functions.len()
    }

    /// The CPU usage of the entire chain, per unit of traffic.
    pub fn per_unit_cpu(&self) -> f64 {
        self.specs.iter().map(|s| s.cpu).sum()
    }
}

/// A single unit of work for the scheduler: one user of one chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Demand {
    /// The chain this demand belongs to.
    pub chain: ChainId,
    /// The ID of the user.
    pub user: String,
    /// The node the user is attached to.
    pub source: NodeId,
    /// Scheduling weight, the CPU demand of the chain's first function at the
    /// chain's traffic rate.
    pub weight: NotNan<f64>,
}

/// Expand all users of all chains into individual demands, in the order they appear.
pub fn expand_demands(chains: &[ServiceChain]) -> Vec<Demand> {
    chains
        .iter()
        .enumerate()
        .flat_map(|(chain, c)| {
            let weight = NotNan::new(c.function(0).cpu * c.traffic_rate)
                .unwrap_or_else(|_| NotNan::new(0.0).unwrap());
            c.users.iter().flat_map(move |user| {
                user.ids.iter().map(move |id| Demand {
                    chain,
                    user: id.clone(),
                    source: user.node,
                    weight,
                })
            })
        })
        .collect()
}

#[cfg(test)]
mod test {
    use maplit::hashmap;

    use super::*;
    use crate::substrate::{LinkSpec, NodeSpec};

    fn substrate() -> Substrate {
        Substrate::new(
            ["a", "b", "c"]
                .into_iter()
                .map(|name| NodeSpec {
                    name: name.to_string(),
                    cpu_capacity: 100.0,
                    mem_capacity: 100.0,
                })
                .collect(),
            vec![
                LinkSpec::new("a", "b", 100.0, 1.0),
                LinkSpec::new("b", "c", 100.0, 1.0),
            ],
        )
        .unwrap()
    }

    fn catalog() -> VnfCatalog {
        VnfCatalog::new(hashmap! {
            "fw".to_string() => FunctionSpec { cpu: 2.0, mem: 1.0 },
            "nat".to_string() => FunctionSpec { cpu: 3.0, mem: 0.5 },
        })
        .unwrap()
    }

    #[test]
    fn resolves_functions() {
        let s = substrate();
        let chain = ServiceChain::new(
            "web",
            vec!["fw".to_string(), "nat".to_string()],
            2.0,
            s.node_id("c").unwrap(),
            vec![User {
                node: s.node_id("a").unwrap(),
                ids: vec!["u0".to_string()],
            }],
            &catalog(),
            &s,
        )
        .unwrap();
        assert_eq!(chain.num_functions(), 2);
        assert_eq!(chain.function(1).cpu, 3.0);
        assert_eq!(chain.per_unit_cpu(), 5.0);
    }

    #[test]
    fn rejects_invalid_chains() {
        let s = substrate();
        let c = catalog();
        let egress = s.node_id("c").unwrap();
        // empty function list
        assert!(ServiceChain::new("x", vec![], 1.0, egress, vec![], &c, &s).is_err());
        // unknown function
        assert!(
            ServiceChain::new("x", vec!["dpi".to_string()], 1.0, egress, vec![], &c, &s).is_err()
        );
        // zero rate
        assert!(
            ServiceChain::new("x", vec!["fw".to_string()], 0.0, egress, vec![], &c, &s).is_err()
        );
        // user on the egress
        assert!(ServiceChain::new(
            "x",
            vec!["fw".to_string()],
            1.0,
            egress,
            vec![User {
                node: egress,
                ids: vec!["u0".to_string()]
            }],
            &c,
            &s,
        )
        .is_err());
    }

    #[test]
    fn rejects_invalid_catalog() {
        assert!(VnfCatalog::new(hashmap! {
            "fw".to_string() => FunctionSpec { cpu: 0.0, mem: 1.0 },
        })
        .is_err());
        assert!(VnfCatalog::new(hashmap! {
            "fw".to_string() => FunctionSpec { cpu: 1.0, mem: -1.0 },
        })
        .is_err());
    }

    #[test]
    fn demands_in_discovery_order() {
        let s = substrate();
        let c = catalog();
        let a = s.node_id("a").unwrap();
        let b = s.node_id("b").unwrap();
        let egress = s.node_id("c").unwrap();
        let chains = vec![
            ServiceChain::new(
                "one",
                vec!["fw".to_string()],
                2.0,
                egress,
                vec![
                    User {
                        node: a,
                        ids: vec!["u0".to_string(), "u1".to_string()],
                    },
                    User {
                        node: b,
                        ids: vec!["u2".to_string()],
                    },
                ],
                &c,
                &s,
            )
            .unwrap(),
            ServiceChain::new(
                "two",
                vec!["nat".to_string()],
                1.0,
                egress,
                vec![User {
                    node: b,
                    ids: vec!["u3".to_string()],
                }],
                &c,
                &s,
            )
            .unwrap(),
        ];
        let demands = expand_demands(&chains);
        assert_eq!(
            demands.iter().map(|d| d.user.as_str()).collect::<Vec<_>>(),
            vec!["u0", "u1", "u2", "u3"],
        );
        assert_eq!(demands[0].weight.into_inner(), 4.0);
        assert_eq!(demands[3].weight.into_inner(), 3.0);
        assert_eq!(demands[3].chain, 1);
        assert_eq!(demands[2].source, b);
    }
}
