//! Module to create scenarios on the fly

use anyhow::{ensure, Context};
use rand::prelude::*;
use rand_distr::LogNormal;

use crate::{
    chain::{FunctionSpec, ServiceChain, User, VnfCatalog},
    substrate::{LinkSpec, NodeSpec, Substrate},
};

/// A self-contained placement scenario: a substrate network together with the
/// function catalog and the service chains to place.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// The substrate network.
    pub substrate: Substrate,
    /// The function catalog referenced by the chains.
    pub catalog: VnfCatalog,
    /// The service chains to place.
    pub chains: Vec<ServiceChain>,
}

/// Builder pattern to create a scenario
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioBuilder {
    /// Number of substrate nodes
    num_nodes: usize,
    /// Number of extra bidirectional links on top of the ring
    num_chords: usize,
    /// Number of function types in the catalog
    num_functions: usize,
    /// Number of service chains
    num_chains: usize,
    /// Number of user attachment points per chain
    num_users: usize,
    /// Seed for the RNG
    seed: Option<u64>,
}

impl ScenarioBuilder {
    /// Create a new scenario builder with the following default values:
    ///
    /// - 12 substrate nodes, connected in a bidirectional ring with 3 extra chords
    /// - 6 function types
    /// - 4 service chains of 2 to 4 functions each
    /// - 2 user attachment points per chain
    /// - Randomized seed.
    pub fn new() -> Self {
        Self {
            num_nodes: 12,
            num_chords: 3,
            num_functions: 6,
            num_chains: 4,
            num_users: 2,
            seed: None,
        }
    }

    /// Set the number of substrate nodes. The default value is 12.
    pub fn nodes(&mut self, num: usize) -> &mut Self {
        self.num_nodes = num;
        self
    }

    /// Set the number of extra bidirectional links on top of the ring. The default
    /// value is 3.
    pub fn chords(&mut self, num: usize) -> &mut Self {
        self.num_chords = num;
        self
    }

    /// Set the number of function types in the catalog. The default value is 6.
    pub fn functions(&mut self, num: usize) -> &mut Self {
        self.num_functions = num;
        self
    }

    /// Set the number of service chains. The default value is 4.
    pub fn chains(&mut self, num: usize) -> &mut Self {
        self.num_chains = num;
        self
    }

    /// Set the number of user attachment points per chain. The default value is 2.
    pub fn users_per_chain(&mut self, num: usize) -> &mut Self {
        self.num_users = num;
        self
    }

    /// Set the random seed for the generation
    pub fn seed(&mut self, seed: u64) -> &mut Self {
        self.seed = Some(seed);
        self
    }

    /// Build the scenario.
    pub fn build(&self) -> anyhow::Result<Scenario> {
        ensure!(self.num_nodes >= 2, "a scenario needs at least two nodes");
        ensure!(self.num_functions >= 1, "a scenario needs at least one function type");
        let mut rng = if let Some(seed) = self.seed {
            StdRng::seed_from_u64(seed)
        } else {
            StdRng::from_entropy()
        };

        let n = self.num_nodes;
        let nodes = (0..n)
            .map(|i| NodeSpec {
                name: format!("n{i:02}"),
                cpu_capacity: rng.gen_range(50.0..=150.0_f64).round(),
                mem_capacity: rng.gen_range(50.0..=150.0_f64).round(),
            })
            .collect::<Vec<_>>();

        // the ring keeps the substrate strongly connected, chords add path diversity
        let mut pairs: Vec<(usize, usize)> = (0..n).map(|i| (i, (i + 1) % n)).collect();
        for _ in 0..self.num_chords {
            for _ in 0..10 {
                let a = rng.gen_range(0..n);
                let b = rng.gen_range(0..n);
                if a != b && !pairs.contains(&(a, b)) && !pairs.contains(&(b, a)) {
                    pairs.push((a, b));
                    break;
                }
            }
        }
        let links = pairs
            .iter()
            .flat_map(|&(a, b)| {
                let bandwidth = rng.gen_range(80.0..=120.0_f64).round();
                let distance = rng.gen_range(1.0..=10.0_f64).round();
                [
                    LinkSpec::new(format!("n{a:02}"), format!("n{b:02}"), bandwidth, distance),
                    LinkSpec::new(format!("n{b:02}"), format!("n{a:02}"), bandwidth, distance),
                ]
            })
            .collect();
        let substrate = Substrate::new(nodes, links).context("create the substrate")?;

        let catalog = VnfCatalog::new(
            (0..self.num_functions)
                .map(|i| {
                    (
                        format!("f{i:02}"),
                        FunctionSpec {
                            cpu: rng.gen_range(5.0..=20.0_f64).round(),
                            mem: rng.gen_range(2.0..=10.0_f64).round(),
                        },
                    )
                })
                .collect(),
        )
        .context("create the function catalog")?;

        let rate_dist = LogNormal::new(0.0, 0.5).context("create the rate distribution")?;
        let mut uid = 0_usize;
        let chains = (0..self.num_chains)
            .map(|i| {
                let functions = (0..rng.gen_range(2..=4_usize))
                    .map(|_| format!("f{:02}", rng.gen_range(0..self.num_functions)))
                    .collect();
                let egress = rng.gen_range(0..n);
                let users = (0..self.num_users)
                    .map(|_| {
                        let mut node = rng.gen_range(0..n);
                        while node == egress {
                            node = rng.gen_range(0..n);
                        }
                        let ids = vec![format!("u{uid:03}")];
                        uid += 1;
                        User {
                            node: substrate.node_id(&format!("n{node:02}")).unwrap(),
                            ids,
                        }
                    })
                    .collect();
                ServiceChain::new(
                    format!("c{i:02}"),
                    functions,
                    rate_dist.sample(&mut rng),
                    substrate.node_id(&format!("n{egress:02}")).unwrap(),
                    users,
                    &catalog,
                    &substrate,
                )
                .with_context(|| format!("create chain c{i:02}"))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;

        Ok(Scenario {
            substrate,
            catalog,
            chains,
        })
    }
}

impl Default for ScenarioBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn respects_the_requested_sizes() {
        let scenario = ScenarioBuilder::new()
            .nodes(8)
            .chords(2)
            .functions(4)
            .chains(3)
            .users_per_chain(2)
            .seed(42)
            .build()
            .unwrap();
        assert_eq!(scenario.substrate.node_count(), 8);
        // the ring plus up to two chords, each in both directions
        assert!(scenario.substrate.edge_count() >= 16);
        assert!(scenario.substrate.edge_count() <= 20);
        assert_eq!(scenario.catalog.len(), 4);
        assert_eq!(scenario.chains.len(), 3);
        for chain in &scenario.chains {
            assert_eq!(chain.users.len(), 2);
            assert!(chain.users.iter().all(|u| u.node != chain.egress));
            assert!(chain.traffic_rate > 0.0);
        }
    }

    #[test]
    fn same_seed_same_scenario() {
        let a = ScenarioBuilder::new().seed(7).build().unwrap();
        let b = ScenarioBuilder::new().seed(7).build().unwrap();
        assert_eq!(a.chains, b.chains);
        assert_eq!(a.catalog, b.catalog);
        assert_eq!(a.substrate.node_count(), b.substrate.node_count());
        assert_eq!(a.substrate.edge_count(), b.substrate.edge_count());
    }

    #[test]
    fn different_seeds_differ() {
        let a = ScenarioBuilder::new().seed(1).build().unwrap();
        let b = ScenarioBuilder::new().seed(2).build().unwrap();
        assert_ne!(a.chains, b.chains);
    }

    #[test]
    fn too_small_is_rejected() {
        assert!(ScenarioBuilder::new().nodes(1).build().is_err());
    }
}
