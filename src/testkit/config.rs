//! Canonical test configurations.
//!
//! Single source of truth for config documents and search parameters used
//! across tests.

use crate::application::gap::SearchConfig;

/// Diamond topology, demand pinning at threshold 5, demands up to 10.
pub fn diamond_toml() -> String {
    r#"
[logging]
level = "warn"

[encoder]
heuristic = "demand_pinning"
demand_upper_bound = 10.0
threshold = 5.0
paths_per_pair = 2

[search]
method = "random"
trials = 3
seed = 1

[[topology.edges]]
from = "a"
to = "b"
capacity = 10.0

[[topology.edges]]
from = "a"
to = "c"
capacity = 10.0

[[topology.edges]]
from = "b"
to = "d"
capacity = 10.0

[[topology.edges]]
from = "c"
to = "d"
capacity = 10.0
"#
    .to_string()
}

/// Small, seeded search with no time budget.
pub fn quick_search(seed: u64) -> SearchConfig {
    SearchConfig {
        trials: 3,
        neighbors: 3,
        std_dev: 2.0,
        temperature_steps: 3,
        seed,
        ..SearchConfig::default()
    }
}
