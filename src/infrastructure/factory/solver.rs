//! Solver factory.

use crate::adapter::solver::{DisjunctionEncoding, HiGHSSolver, NonNegativeSplit, SignedBigM};
use crate::infrastructure::config::solver::{DisjunctionKind, SolverBackend, SolverConfig};
use crate::error::Result;
use crate::port::solver::Solver;

/// Build the configured solver backend.
///
/// # Errors
///
/// Returns a configuration error for an unusable time limit.
pub fn build_solver(config: &SolverConfig) -> Result<Box<dyn Solver>> {
    let disjunction: Box<dyn DisjunctionEncoding> = match config.disjunction {
        DisjunctionKind::SignedBigM => Box::new(SignedBigM::new(config.disjunction_big_m)),
        DisjunctionKind::NonNegativeSplit => {
            Box::new(NonNegativeSplit::new(config.disjunction_big_m))
        }
    };
    let mut solver = match config.backend {
        SolverBackend::Highs => HiGHSSolver::with_disjunction(disjunction).verbose(config.verbose),
    };
    if let Some(limit) = config.time_limit()? {
        solver.set_time_limit(limit);
    }
    Ok(Box::new(solver))
}
