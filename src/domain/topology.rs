//! Network topology collaborator.
//!
//! A directed graph with per-edge capacities, candidate-path enumeration
//! and the helpers the partitioned heuristic needs. Path enumeration is a
//! plain depth-first search over simple paths and is meant for the small
//! topologies adversarial gap search is run on.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ConfigError, Result};

const PAIR_SEPARATOR: &str = "->";

/// Ordered (origin, destination) node pair.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Pair {
    pub origin: String,
    pub destination: String,
}

impl Pair {
    pub fn new(origin: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            destination: destination.into(),
        }
    }
}

impl fmt::Display for Pair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{PAIR_SEPARATOR}{}", self.origin, self.destination)
    }
}

impl FromStr for Pair {
    type Err = ConfigError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.split_once(PAIR_SEPARATOR) {
            Some((o, d)) if !o.is_empty() && !d.is_empty() => Ok(Self::new(o, d)),
            _ => Err(ConfigError::invalid(
                "pair",
                format!("expected `origin->destination`, got `{s}`"),
            )),
        }
    }
}

// Pairs serialize as `origin->destination` so that pair-keyed maps become
// plain key/value objects.
impl Serialize for Pair {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Pair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Ordered list of node identifiers. Identity is order-sensitive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(Vec<String>);

impl Path {
    #[must_use]
    pub fn new(nodes: Vec<String>) -> Self {
        Self(nodes)
    }

    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.0
    }

    /// Number of edges on the path.
    #[must_use]
    pub fn hops(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    /// Consecutive `(from, to)` edges.
    pub fn edges(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.windows(2).map(|w| (w[0].as_str(), w[1].as_str()))
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("-"))
    }
}

/// How candidate paths are selected for each pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathPolicy {
    /// The `k` paths with fewest hops (ties broken lexicographically).
    #[default]
    KShortest,
    /// Every simple path, ranked as above; `k` is ignored.
    All,
}

/// Directed graph with edge capacities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topology {
    nodes: BTreeSet<String>,
    edges: BTreeMap<(String, String), f64>,
}

impl Topology {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, node: impl Into<String>) -> Result<()> {
        let node = node.into();
        if node.is_empty() || node.contains(PAIR_SEPARATOR) {
            return Err(ConfigError::invalid("node", format!("invalid node name `{node}`")).into());
        }
        self.nodes.insert(node);
        Ok(())
    }

    /// Add (or overwrite) the directed edge `from -> to`.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite capacities, self-loops and invalid node names.
    pub fn add_edge(&mut self, from: &str, to: &str, capacity: f64) -> Result<()> {
        if !capacity.is_finite() || capacity < 0.0 {
            return Err(
                ConfigError::invalid("capacity", format!("{from}->{to}: {capacity}")).into(),
            );
        }
        if from == to {
            return Err(ConfigError::invalid("edge", format!("self-loop on {from}")).into());
        }
        self.add_node(from)?;
        self.add_node(to)?;
        self.edges.insert((from.to_string(), to.to_string()), capacity);
        Ok(())
    }

    /// Builder form of [`add_edge`](Self::add_edge).
    pub fn with_edge(mut self, from: &str, to: &str, capacity: f64) -> Result<Self> {
        self.add_edge(from, to, capacity)?;
        Ok(self)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &str> + '_ {
        self.nodes.iter().map(String::as_str)
    }

    /// `((from, to), capacity)` for every edge.
    pub fn edges(&self) -> impl Iterator<Item = ((&str, &str), f64)> + '_ {
        self.edges
            .iter()
            .map(|((f, t), c)| ((f.as_str(), t.as_str()), *c))
    }

    #[must_use]
    pub fn capacity(&self, from: &str, to: &str) -> Option<f64> {
        self.edges.get(&(from.to_string(), to.to_string())).copied()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Every ordered pair of distinct nodes.
    #[must_use]
    pub fn pairs(&self) -> Vec<Pair> {
        self.nodes
            .iter()
            .flat_map(|o| {
                self.nodes
                    .iter()
                    .filter(move |d| *d != o)
                    .map(move |d| Pair::new(o.clone(), d.clone()))
            })
            .collect()
    }

    fn successors<'a>(&'a self, node: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.edges
            .keys()
            .filter(move |(f, _)| f == node)
            .map(|(_, t)| t.as_str())
    }

    /// Candidate paths for every pair; unreachable pairs map to an empty list.
    #[must_use]
    pub fn compute_paths(&self, policy: PathPolicy, k: usize) -> BTreeMap<Pair, Vec<Path>> {
        self.pairs()
            .into_iter()
            .map(|pair| {
                let mut paths = self.simple_paths(&pair.origin, &pair.destination);
                paths.sort_by(|a, b| a.hops().cmp(&b.hops()).then_with(|| a.cmp(b)));
                if policy == PathPolicy::KShortest {
                    paths.truncate(k);
                }
                (pair, paths)
            })
            .collect()
    }

    fn simple_paths(&self, origin: &str, destination: &str) -> Vec<Path> {
        let mut found = Vec::new();
        let mut stack = vec![origin.to_string()];
        self.extend_paths(destination, &mut stack, &mut found);
        found
    }

    fn extend_paths(&self, destination: &str, stack: &mut Vec<String>, found: &mut Vec<Path>) {
        let Some(last) = stack.last().cloned() else {
            return;
        };
        if last == destination {
            found.push(Path::new(stack.clone()));
            return;
        }
        for next in self.successors(&last) {
            if stack.iter().any(|n| n == next) {
                continue;
            }
            stack.push(next.to_string());
            self.extend_paths(destination, stack, found);
            stack.pop();
        }
    }

    /// Assign every pair to one of `partitions` groups uniformly at random,
    /// making sure no group is empty.
    ///
    /// # Errors
    ///
    /// Fails when `partitions` is zero or exceeds the number of pairs.
    pub fn random_partition<R: Rng + ?Sized>(
        &self,
        partitions: usize,
        rng: &mut R,
    ) -> Result<BTreeMap<Pair, usize>> {
        let mut pairs = self.pairs();
        if partitions == 0 || partitions > pairs.len() {
            return Err(ConfigError::invalid(
                "partitions",
                format!("must be in 1..={}, got {partitions}", pairs.len()),
            )
            .into());
        }
        pairs.shuffle(rng);
        Ok(pairs
            .into_iter()
            .enumerate()
            .map(|(i, pair)| (pair, i % partitions))
            .collect())
    }

    /// Copy of this topology with every capacity divided by `parts`.
    ///
    /// # Errors
    ///
    /// Fails when `parts` is zero.
    pub fn split_capacity(&self, parts: usize) -> Result<Topology> {
        if parts == 0 {
            return Err(ConfigError::invalid("partitions", "must be at least 1").into());
        }
        let mut split = self.clone();
        for capacity in split.edges.values_mut() {
            *capacity /= parts as f64;
        }
        Ok(split)
    }
}
