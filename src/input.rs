//! Loading the substrate, the function table, and the service chains from JSON.

use std::{collections::HashMap, fs, path::Path as FsPath};

use serde::Deserialize;

use crate::{
    chain::{FunctionSpec, ServiceChain, User, VnfCatalog},
    substrate::{LinkSpec, NodeSpec, Substrate},
    Error, Result,
};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopologyFile {
    nodes: Vec<NodeEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeEntry {
    name: String,
    cpu_capacity: f64,
    mem_capacity: f64,
    /// Outgoing links, named after the neighbor they lead to.
    #[serde(default)]
    links: Vec<LinkEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkEntry {
    name: String,
    bandwidth_capacity: f64,
    distance: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FunctionEntry {
    cpu_usage: f64,
    mem_usage: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainFile {
    chains: Vec<ChainEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainEntry {
    name: String,
    functions: Vec<String>,
    traffic_rate: f64,
    egress: String,
    #[serde(default)]
    users: Vec<UserEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserEntry {
    node: String,
    ids: Vec<String>,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &FsPath) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Load a substrate network from a JSON topology file. The file lists every node
/// with its capacities and its outgoing links.
pub fn load_topology(path: impl AsRef<FsPath>) -> Result<Substrate> {
    build_substrate(read_json(path.as_ref())?)
}

fn build_substrate(file: TopologyFile) -> Result<Substrate> {
    let nodes = file
        .nodes
        .iter()
        .map(|n| NodeSpec {
            name: n.name.clone(),
            cpu_capacity: n.cpu_capacity,
            mem_capacity: n.mem_capacity,
        })
        .collect();
    let links = file
        .nodes
        .iter()
        .flat_map(|n| {
            n.links.iter().map(|l| {
                LinkSpec::new(n.name.clone(), l.name.clone(), l.bandwidth_capacity, l.distance)
            })
        })
        .collect();
    Substrate::new(nodes, links)
}

/// Load the function resource table from a JSON file mapping function names to their
/// per-unit-traffic usage.
pub fn load_functions(path: impl AsRef<FsPath>) -> Result<VnfCatalog> {
    let table: HashMap<String, FunctionEntry> = read_json(path.as_ref())?;
    VnfCatalog::new(
        table
            .into_iter()
            .map(|(name, f)| {
                (
                    name,
                    FunctionSpec {
                        cpu: f.cpu_usage,
                        mem: f.mem_usage,
                    },
                )
            })
            .collect(),
    )
}

/// Load all service chains from a JSON file and validate them against the substrate
/// and the function catalog.
pub fn load_chains(
    path: impl AsRef<FsPath>,
    substrate: &Substrate,
    catalog: &VnfCatalog,
) -> Result<Vec<ServiceChain>> {
    build_chains(read_json(path.as_ref())?, substrate, catalog)
}

fn build_chains(
    file: ChainFile,
    substrate: &Substrate,
    catalog: &VnfCatalog,
) -> Result<Vec<ServiceChain>> {
    file.chains
        .into_iter()
        .map(|c| {
            let egress = substrate.node_id(&c.egress).ok_or_else(|| {
                Error::InputFormat(format!(
                    "chain {} exits at unknown node {}",
                    c.name, c.egress
                ))
            })?;
            let users = c
                .users
                .into_iter()
                .map(|u| {
                    let node = substrate.node_id(&u.node).ok_or_else(|| {
                        Error::InputFormat(format!(
                            "chain {} attaches users to unknown node {}",
                            c.name, u.node
                        ))
                    })?;
                    Ok(User { node, ids: u.ids })
                })
                .collect::<Result<Vec<_>>>()?;
            ServiceChain::new(c.name, c.functions, c.traffic_rate, egress, users, catalog, substrate)
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    const TOPOLOGY: &str = r#"{
        "nodes": [
            {
                "name": "a",
                "cpuCapacity": 100,
                "memCapacity": 100,
                "links": [{"name": "b", "bandwidthCapacity": 100, "distance": 1}]
            },
            {
                "name": "b",
                "cpuCapacity": 100,
                "memCapacity": 100,
                "links": [{"name": "c", "bandwidthCapacity": 100, "distance": 2}]
            },
            {"name": "c", "cpuCapacity": 100, "memCapacity": 100}
        ]
    }"#;

    const FUNCTIONS: &str = r#"{
        "fw": {"cpuUsage": 10, "memUsage": 5},
        "nat": {"cpuUsage": 20, "memUsage": 5}
    }"#;

    const CHAINS: &str = r#"{
        "chains": [
            {
                "name": "web",
                "functions": ["fw", "nat"],
                "trafficRate": 1,
                "egress": "c",
                "users": [{"node": "a", "ids": ["u0", "u1"]}]
            }
        ]
    }"#;

    fn substrate() -> Substrate {
        build_substrate(serde_json::from_str(TOPOLOGY).unwrap()).unwrap()
    }

    fn catalog() -> VnfCatalog {
        let table: HashMap<String, FunctionEntry> = serde_json::from_str(FUNCTIONS).unwrap();
        VnfCatalog::new(
            table
                .into_iter()
                .map(|(name, f)| {
                    (
                        name,
                        FunctionSpec {
                            cpu: f.cpu_usage,
                            mem: f.mem_usage,
                        },
                    )
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn parses_the_topology() {
        let s = substrate();
        assert_eq!(s.node_count(), 3);
        assert_eq!(s.edge_count(), 2);
        let (b, c) = (s.node_id("b").unwrap(), s.node_id("c").unwrap());
        let bc = s.find_edge(b, c).unwrap();
        assert_eq!(s.link(bc).bandwidth_capacity, 100.0);
        assert_eq!(s.graph[bc].into_inner(), 2.0);
    }

    #[test]
    fn parses_the_chains() {
        let s = substrate();
        let chains =
            build_chains(serde_json::from_str(CHAINS).unwrap(), &s, &catalog()).unwrap();
        assert_eq!(chains.len(), 1);
        assert_eq!(chains[0].functions, vec!["fw", "nat"]);
        assert_eq!(chains[0].egress, s.node_id("c").unwrap());
        assert_eq!(chains[0].users[0].ids.len(), 2);
        assert_eq!(chains[0].per_unit_cpu(), 30.0);
    }

    #[test]
    fn rejects_unknown_references() {
        let s = substrate();
        let c = catalog();
        let bad_egress = r#"{"chains": [{
            "name": "web", "functions": ["fw"], "trafficRate": 1, "egress": "z", "users": []
        }]}"#;
        assert!(matches!(
            build_chains(serde_json::from_str(bad_egress).unwrap(), &s, &c),
            Err(Error::InputFormat(_))
        ));

        let bad_user = r#"{"chains": [{
            "name": "web", "functions": ["fw"], "trafficRate": 1, "egress": "c",
            "users": [{"node": "z", "ids": ["u0"]}]
        }]}"#;
        assert!(matches!(
            build_chains(serde_json::from_str(bad_user).unwrap(), &s, &c),
            Err(Error::InputFormat(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let dir = std::env::temp_dir();
        let topo_path = dir.join("kette_input_test_topology.json");
        let fun_path = dir.join("kette_input_test_functions.json");
        let chain_path = dir.join("kette_input_test_chains.json");
        fs::write(&topo_path, TOPOLOGY).unwrap();
        fs::write(&fun_path, FUNCTIONS).unwrap();
        fs::write(&chain_path, CHAINS).unwrap();

        let substrate = load_topology(&topo_path).unwrap();
        let catalog = load_functions(&fun_path).unwrap();
        let chains = load_chains(&chain_path, &substrate, &catalog).unwrap();
        assert_eq!(chains.len(), 1);

        fs::remove_file(topo_path).ok();
        fs::remove_file(fun_path).ok();
        fs::remove_file(chain_path).ok();
    }

    #[test]
    fn missing_and_malformed_files() {
        assert!(matches!(
            load_topology("/nonexistent/kette/topology.json"),
            Err(Error::Io { .. })
        ));

        let path = std::env::temp_dir().join("kette_input_test_malformed.json");
        fs::write(&path, "{ nodes: oops").unwrap();
        assert!(matches!(load_topology(&path), Err(Error::Json { .. })));
        fs::remove_file(path).ok();
    }
}
