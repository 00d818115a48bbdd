//! Allocation encoder configuration.

use serde::Deserialize;

use crate::domain::topology::PathPolicy;

/// Heuristic compared against optimal max-flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    #[default]
    DemandPinning,
    Pop,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EncoderConfig {
    #[serde(default)]
    pub heuristic: HeuristicKind,

    #[serde(default)]
    pub path_policy: PathPolicy,

    /// Candidate paths per pair under `k_shortest`.
    #[serde(default = "default_paths_per_pair")]
    pub paths_per_pair: usize,

    /// Demand pinning threshold.
    #[serde(default)]
    pub threshold: f64,

    /// Pinning big-M; defaults to twice the demand upper bound.
    #[serde(default)]
    pub pin_big_m: Option<f64>,

    /// POP partition count.
    #[serde(default = "default_partitions")]
    pub partitions: usize,

    /// Per-pair demand upper bound.
    pub demand_upper_bound: Option<f64>,

    /// Demand levels for the primal-dual rewrite.
    #[serde(default)]
    pub quantization_levels: Vec<f64>,
}

fn default_paths_per_pair() -> usize {
    2
}

fn default_partitions() -> usize {
    2
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            heuristic: HeuristicKind::default(),
            path_policy: PathPolicy::default(),
            paths_per_pair: default_paths_per_pair(),
            threshold: 0.0,
            pin_big_m: None,
            partitions: default_partitions(),
            demand_upper_bound: None,
            quantization_levels: Vec::new(),
        }
    }
}

impl EncoderConfig {
    /// Pinning big-M, derived from the demand bound when not set.
    #[must_use]
    pub fn pin_big_m(&self, demand_upper_bound: f64) -> f64 {
        self.pin_big_m
            .unwrap_or_else(|| 2.0 * demand_upper_bound.max(self.threshold) + 1.0)
    }
}
