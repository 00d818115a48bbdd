//! Builders for domain fixtures.

use crate::domain::demand::DemandMatrix;
use crate::domain::topology::{Pair, PathPolicy, Topology};

fn build(edges: &[(&str, &str, f64)]) -> Topology {
    let mut topology = Topology::new();
    for (from, to, capacity) in edges {
        if let Err(e) = topology.add_edge(from, to, *capacity) {
            panic!("invalid fixture edge {from}->{to}: {e}");
        }
    }
    topology
}

/// `a -> b` with capacity 10.
pub fn two_node() -> Topology {
    build(&[("a", "b", 10.0)])
}

/// `a -> {b, c} -> d`, every edge with capacity 10.
pub fn diamond() -> Topology {
    build(&[
        ("a", "b", 10.0),
        ("a", "c", 10.0),
        ("b", "d", 10.0),
        ("c", "d", 10.0),
    ])
}

/// Every routable pair of `topology` (two shortest paths) at `value`.
pub fn uniform_demands(topology: &Topology, value: f64) -> DemandMatrix {
    let pairs: Vec<Pair> = topology
        .compute_paths(PathPolicy::KShortest, 2)
        .into_iter()
        .filter(|(_, paths)| !paths.is_empty())
        .map(|(pair, _)| pair)
        .collect();
    DemandMatrix::uniform(&pairs, value)
}
