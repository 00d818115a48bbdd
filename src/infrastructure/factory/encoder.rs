//! Encoder and gap engine factory.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::application::encoder::{
    AllocationEncoder, DemandPinningEncoder, MaxFlowEncoder, PopEncoder,
};
use crate::application::gap::GapEngine;
use crate::error::Result;
use crate::infrastructure::config::encoder::HeuristicKind;
use crate::infrastructure::config::settings::Config;

/// Build the configured heuristic encoder.
///
/// POP partitions are drawn from the search seed so runs are reproducible.
///
/// # Errors
///
/// Returns configuration errors from topology or encoder validation.
pub fn build_heuristic(config: &Config) -> Result<Box<dyn AllocationEncoder>> {
    let topology = config.topology.build()?;
    let paths = topology.compute_paths(config.encoder.path_policy, config.encoder.paths_per_pair);
    let encoder: Box<dyn AllocationEncoder> = match config.encoder.heuristic {
        HeuristicKind::DemandPinning => {
            let upper = config.demand_upper_bound()?;
            Box::new(DemandPinningEncoder::new(
                topology,
                paths,
                config.encoder.threshold,
                config.encoder.pin_big_m(upper),
            )?)
        }
        HeuristicKind::Pop => {
            let mut rng = StdRng::seed_from_u64(config.search.seed);
            Box::new(PopEncoder::random(
                topology,
                paths,
                config.encoder.partitions,
                &mut rng,
            )?)
        }
    };
    Ok(encoder)
}

/// Build the optimal encoder.
///
/// # Errors
///
/// Returns configuration errors from topology validation.
pub fn build_optimal(config: &Config) -> Result<Box<dyn AllocationEncoder>> {
    let topology = config.topology.build()?;
    let paths = topology.compute_paths(config.encoder.path_policy, config.encoder.paths_per_pair);
    Ok(Box::new(MaxFlowEncoder::new(topology, paths)))
}

/// Build the gap engine pitting max-flow against the configured heuristic.
///
/// # Errors
///
/// Returns configuration errors from any of the parts.
pub fn build_engine(config: &Config) -> Result<GapEngine> {
    let optimal = build_optimal(config)?;
    let heuristic = build_heuristic(config)?;
    info!(
        optimal = optimal.name(),
        heuristic = heuristic.name(),
        pairs = optimal.routable_pairs().len(),
        "Built gap engine"
    );
    Ok(GapEngine::new(optimal, heuristic, config.demand_upper_bound()?)?
        .tolerate_time_limit(config.search.tolerate_time_limit))
}
