//! Building assignment subproblems and committing their solutions.

use crate::{
    chain::{ChainId, ServiceChain},
    solver::{Assignment, AssignmentProblem, FunctionLoad, NodeResources},
    substrate::{Path, Substrate},
};

/// Capture the state of all path nodes and the chain's resource demands at the
/// chain's traffic rate.
pub(super) fn build_problem(
    substrate: &Substrate,
    path: &Path,
    chain: &ServiceChain,
    enforce_capacity: bool,
) -> AssignmentProblem {
    AssignmentProblem {
        nodes: path
            .iter()
            .map(|n| {
                let state = substrate.node(n);
                NodeResources {
                    cpu_used: state.cpu_used,
                    cpu_capacity: state.cpu_capacity,
                    mem_used: state.mem_used,
                    mem_capacity: state.mem_capacity,
                }
            })
            .collect(),
        functions: (0..chain.num_functions())
            .map(|i| {
                let f = chain.function(i);
                FunctionLoad {
                    cpu: f.cpu * chain.traffic_rate,
                    mem: f.mem * chain.traffic_rate,
                }
            })
            .collect(),
        enforce_capacity,
    }
}

/// Apply a solved assignment to the substrate, reserving CPU and memory for every
/// function on its node.
pub(super) fn commit(
    substrate: &mut Substrate,
    path: &Path,
    chain_id: ChainId,
    chain: &ServiceChain,
    assignment: &Assignment,
) {
    for (i, &pos) in assignment.node_of.iter().enumerate() {
        let f = chain.function(i);
        substrate.place_function(
            path[pos],
            chain_id,
            i,
            f.cpu * chain.traffic_rate,
            f.mem * chain.traffic_rate,
        );
    }
}

#[cfg(test)]
mod test {
    use maplit::hashmap;

    use super::*;
    use crate::{
        chain::{FunctionSpec, User, VnfCatalog},
        solver::Assignment,
        substrate::{LinkSpec, NodeSpec},
    };

    fn setup() -> (Substrate, ServiceChain) {
        let substrate = Substrate::new(
            ["a", "b", "c"]
                .into_iter()
                .map(|name| NodeSpec {
                    name: name.to_string(),
                    cpu_capacity: 100.0,
                    mem_capacity: 50.0,
                })
                .collect(),
            vec![
                LinkSpec::new("a", "b", 100.0, 1.0),
                LinkSpec::new("b", "c", 100.0, 1.0),
            ],
        )
        .unwrap();
        let catalog = VnfCatalog::new(hashmap! {
            "fw".to_string() => FunctionSpec { cpu: 10.0, mem: 4.0 },
            "nat".to_string() => FunctionSpec { cpu: 20.0, mem: 2.0 },
        })
        .unwrap();
        let chain = ServiceChain::new(
            "web",
            vec!["fw".to_string(), "nat".to_string()],
            2.0,
            substrate.node_id("c").unwrap(),
            vec![User {
                node: substrate.node_id("a").unwrap(),
                ids: vec!["u0".to_string()],
            }],
            &catalog,
            &substrate,
        )
        .unwrap();
        (substrate, chain)
    }

    #[test]
    fn problem_scales_with_the_traffic_rate() {
        let (substrate, chain) = setup();
        let path: Path = ["a", "b", "c"]
            .into_iter()
            .map(|n| substrate.node_id(n).unwrap())
            .collect();
        let problem = build_problem(&substrate, &path, &chain, true);
        assert_eq!(problem.nodes.len(), 3);
        assert_eq!(problem.functions.len(), 2);
        assert!(problem.enforce_capacity);
        assert_eq!(problem.functions[0].cpu, 20.0);
        assert_eq!(problem.functions[0].mem, 8.0);
        assert_eq!(problem.functions[1].cpu, 40.0);
        assert_eq!(problem.nodes[0].cpu_capacity, 100.0);
        assert_eq!(problem.nodes[0].mem_capacity, 50.0);
    }

    #[test]
    fn commit_reserves_on_the_right_nodes() {
        let (mut substrate, chain) = setup();
        let path: Path = ["a", "b", "c"]
            .into_iter()
            .map(|n| substrate.node_id(n).unwrap())
            .collect();
        let assignment = Assignment {
            node_of: vec![1, 2],
            objective: 0.4,
        };
        commit(&mut substrate, &path, 7, &chain, &assignment);

        let b = substrate.node_id("b").unwrap();
        let c = substrate.node_id("c").unwrap();
        assert_eq!(substrate.node(b).cpu_used, 20.0);
        assert_eq!(substrate.node(b).mem_used, 8.0);
        assert_eq!(substrate.node(b).placed[&7].as_slice(), &[0]);
        assert_eq!(substrate.node(c).cpu_used, 40.0);
        assert_eq!(substrate.node(c).mem_used, 4.0);
        assert_eq!(substrate.node(c).placed[&7].as_slice(), &[1]);
        assert_eq!(substrate.node(substrate.node_id("a").unwrap()).cpu_used, 0.0);
    }
}
