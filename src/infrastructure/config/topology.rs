//! Inline topology description.

use serde::Deserialize;

use crate::domain::topology::Topology;
use crate::error::{ConfigError, Result};

/// One directed edge.
#[derive(Debug, Clone, Deserialize)]
pub struct EdgeConfig {
    pub from: String,
    pub to: String,
    pub capacity: f64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopologyConfig {
    #[serde(default)]
    pub edges: Vec<EdgeConfig>,
}

impl TopologyConfig {
    /// Build the graph.
    ///
    /// # Errors
    ///
    /// Fails for an empty edge list or any invalid edge.
    pub fn build(&self) -> Result<Topology> {
        if self.edges.is_empty() {
            return Err(ConfigError::MissingField {
                field: "topology.edges",
            }
            .into());
        }
        let mut topology = Topology::new();
        for edge in &self.edges {
            topology.add_edge(&edge.from, &edge.to, edge.capacity)?;
        }
        Ok(topology)
    }
}
