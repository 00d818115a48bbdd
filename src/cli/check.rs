//! Handler for the `check` command.

use std::path::Path;

use crate::error::Result;
use crate::infrastructure::config::settings::Config;
use crate::infrastructure::factory::encoder::build_engine;

/// Validate configuration file without running a search.
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    println!("Checking configuration: {}", path.display());
    println!();

    let config = Config::load(path)?;
    let engine = build_engine(&config)?;
    let topology = config.topology.build()?;

    println!("✓ Configuration file is valid");
    println!();
    println!("Summary:");
    println!("  Nodes: {}", topology.nodes().count());
    println!("  Edges: {}", topology.edge_count());
    println!("  Routable pairs: {}", engine.pairs().len());
    println!("  Heuristic: {:?}", config.encoder.heuristic);
    println!("  Method: {}", config.search.method.name());
    println!("  Rewrite: {}", config.search.rewrite.name());
    println!("  Demand upper bound: {}", engine.demand_upper_bound());
    if let Some(limit) = config.solver.time_limit_secs {
        println!("  Solver time limit: {limit}s");
    }
    println!();
    println!("Configuration is ready to use.");
    Ok(())
}
