//! Adversarial gap engine.
//!
//! Searches for the demand vector that maximizes `optimal - heuristic`,
//! either exactly (one bilevel model solved at once) or with
//! metaheuristics that evaluate concrete candidates.

mod neighbor;
mod search;

pub use neighbor::GaussianNeighbor;
pub use search::{
    Candidate, NoProgress, ProgressSink, SearchConfig, SearchMethod, SearchOutcome, TrialRecord,
};

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::{info, warn};

use crate::application::encoder::{
    create_demand, AllocationEncoder, EncodeRequest, Encoding, FlowSolution,
};
use crate::application::rewrite::{RewriteStrategy, DEFAULT_DUAL_BIG_M};
use crate::domain::demand::{DemandExpr, DemandMatrix};
use crate::domain::polynomial::{Polynomial, Term};
use crate::domain::topology::Pair;
use crate::error::{ConfigError, Result};
use crate::port::solver::{Solution, SolveStatus, Solver};

/// Parameters of the single-solve exact mode.
#[derive(Debug, Clone)]
pub struct ExactConfig {
    pub rewrite: RewriteStrategy,
    /// Demand levels for the primal-dual rewrite.
    pub quantization: Vec<f64>,
    pub dual_big_m: f64,
    pub verbose: bool,
}

impl Default for ExactConfig {
    fn default() -> Self {
        Self {
            rewrite: RewriteStrategy::Kkt,
            quantization: Vec::new(),
            dual_big_m: DEFAULT_DUAL_BIG_M,
            verbose: false,
        }
    }
}

/// Gap between the two policies for one demand vector.
#[derive(Debug, Clone, Serialize)]
pub struct GapResult {
    pub gap: f64,
    pub demands: DemandMatrix,
    pub optimal: FlowSolution,
    pub heuristic: FlowSolution,
    #[serde(serialize_with = "serialize_status")]
    pub status: SolveStatus,
}

fn serialize_status<S: serde::Serializer>(
    status: &SolveStatus,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(status)
}

/// Couples an optimal and a heuristic encoder over one demand space.
pub struct GapEngine {
    optimal: Box<dyn AllocationEncoder>,
    heuristic: Box<dyn AllocationEncoder>,
    demand_upper_bound: f64,
    tolerate_time_limit: bool,
}

impl std::fmt::Debug for GapEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GapEngine")
            .field("optimal", &self.optimal.name())
            .field("heuristic", &self.heuristic.name())
            .field("demand_upper_bound", &self.demand_upper_bound)
            .field("tolerate_time_limit", &self.tolerate_time_limit)
            .finish()
    }
}

impl GapEngine {
    /// # Errors
    ///
    /// Rejects a negative or non-finite demand upper bound.
    pub fn new(
        optimal: Box<dyn AllocationEncoder>,
        heuristic: Box<dyn AllocationEncoder>,
        demand_upper_bound: f64,
    ) -> Result<Self> {
        if !demand_upper_bound.is_finite() || demand_upper_bound < 0.0 {
            return Err(ConfigError::invalid(
                "demand_upper_bound",
                format!("must be non-negative, got {demand_upper_bound}"),
            )
            .into());
        }
        Ok(Self {
            optimal,
            heuristic,
            demand_upper_bound,
            tolerate_time_limit: false,
        })
    }

    /// Accept the incumbent of solves that hit the solver time limit.
    #[must_use]
    pub fn tolerate_time_limit(mut self, tolerate: bool) -> Self {
        self.tolerate_time_limit = tolerate;
        self
    }

    #[must_use]
    pub fn demand_upper_bound(&self) -> f64 {
        self.demand_upper_bound
    }

    /// Pairs routable by either encoder.
    #[must_use]
    pub fn pairs(&self) -> Vec<Pair> {
        let pairs: BTreeSet<Pair> = self
            .optimal
            .routable_pairs()
            .into_iter()
            .chain(self.heuristic.routable_pairs())
            .collect();
        pairs.into_iter().collect()
    }

    /// Solve the bilevel gap problem as one single-level model.
    ///
    /// The solver is reset first.
    ///
    /// # Errors
    ///
    /// Configuration errors (missing quantization levels, outer variables
    /// the rewrite cannot handle) and solver failures are returned as is.
    pub fn exact(&mut self, solver: &mut dyn Solver, config: &ExactConfig) -> Result<GapResult> {
        solver.reset();

        let mut request = EncodeRequest {
            rewrite: config.rewrite,
            quantization: config.quantization.clone(),
            dual_big_m: config.dual_big_m,
            demand_upper_bound: Some(self.demand_upper_bound),
            verbose: config.verbose,
            ..EncodeRequest::default()
        };
        let demands = self
            .pairs()
            .into_iter()
            .map(|pair| Ok((pair, create_demand(solver, &request)?)))
            .collect::<Result<BTreeMap<Pair, DemandExpr>>>()?;
        request.demands = Some(demands);

        let optimal = self.optimal.encode(solver, &request)?;
        let heuristic = self.heuristic.encode(solver, &request)?;
        let objective = Polynomial::from(optimal.objective_var)
            .with(Term::linear(-1.0, heuristic.objective_var));
        solver.set_objective(objective)?;

        let solution = self.maximize(solver)?;
        let optimal = self.optimal.solution(solver, &solution)?;
        let heuristic = self.heuristic.solution(solver, &solution)?;
        let result = GapResult {
            gap: optimal.objective - heuristic.objective,
            demands: optimal.demands.clone(),
            optimal,
            heuristic,
            status: solution.status(),
        };
        info!(
            optimal = self.optimal.name(),
            heuristic = self.heuristic.name(),
            rewrite = config.rewrite.name(),
            gap = %result.gap,
            status = %result.status,
            "Exact gap solved"
        );
        Ok(result)
    }

    /// Gap for one concrete demand vector: each encoder is solved on its
    /// own with feasibility-only constraints and fixed demands.
    ///
    /// # Errors
    ///
    /// Returns the first encoding or solver failure.
    pub fn evaluate(
        &mut self,
        solver: &mut dyn Solver,
        demands: &DemandMatrix,
    ) -> Result<GapResult> {
        let request = EncodeRequest::fixed(demands.clone());

        solver.reset();
        let encoding = self.optimal.encode(solver, &request)?;
        let optimal_solution = self.solve(solver, encoding)?;
        let optimal = self.optimal.solution(solver, &optimal_solution)?;

        solver.reset();
        let encoding = self.heuristic.encode(solver, &request)?;
        let heuristic_solution = self.solve(solver, encoding)?;
        let heuristic = self.heuristic.solution(solver, &heuristic_solution)?;

        let status = if optimal_solution.is_optimal() {
            heuristic_solution.status()
        } else {
            optimal_solution.status()
        };
        Ok(GapResult {
            gap: optimal.objective - heuristic.objective,
            demands: demands.clone(),
            optimal,
            heuristic,
            status,
        })
    }

    fn solve(&self, solver: &mut dyn Solver, encoding: Encoding) -> Result<Solution> {
        solver.set_objective(encoding.objective)?;
        self.maximize(solver)
    }

    fn maximize(&self, solver: &mut dyn Solver) -> Result<Solution> {
        match solver.maximize() {
            Ok(solution) => Ok(solution),
            Err(err) if self.tolerate_time_limit => {
                let solution = err.into_degraded_solution()?;
                warn!(
                    objective = %solution.objective(),
                    "Accepting time-limited incumbent"
                );
                Ok(solution)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::solver::HiGHSSolver;
    use crate::application::encoder::{DemandPinningEncoder, MaxFlowEncoder, PopEncoder};
    use crate::domain::topology::PathPolicy;
    use crate::error::Error;
    use crate::testkit::{diamond, two_node};

    fn pinning_engine() -> GapEngine {
        let topology = diamond();
        let paths = topology.compute_paths(PathPolicy::KShortest, 2);
        let optimal = MaxFlowEncoder::new(topology.clone(), paths.clone());
        let heuristic = DemandPinningEncoder::new(topology, paths, 5.0, 100.0).unwrap();
        GapEngine::new(Box::new(optimal), Box::new(heuristic), 10.0).unwrap()
    }

    #[test]
    fn evaluate_reports_pinning_loss() {
        let mut engine = pinning_engine();
        let mut solver = HiGHSSolver::new();
        let mut demands = DemandMatrix::uniform(&engine.pairs(), 10.0);
        demands.insert(Pair::new("a", "d"), 5.0);
        let result = engine.evaluate(&mut solver, &demands).unwrap();
        assert!((result.optimal.objective - 40.0).abs() < 1e-6);
        assert!((result.heuristic.objective - 35.0).abs() < 1e-6);
        assert!((result.gap - 5.0).abs() < 1e-6);
    }

    #[test]
    fn exact_gap_dominates_any_evaluated_gap() {
        let mut engine = pinning_engine();
        let mut solver = HiGHSSolver::new();
        let exact = engine.exact(&mut solver, &ExactConfig::default()).unwrap();

        let mut demands = DemandMatrix::uniform(&engine.pairs(), 10.0);
        demands.insert(Pair::new("a", "d"), 5.0);
        let sampled = engine.evaluate(&mut solver, &demands).unwrap();
        assert!(exact.gap + 1e-4 >= sampled.gap, "exact {} < sampled {}", exact.gap, sampled.gap);
    }

    #[test]
    fn single_partition_pop_has_no_gap() {
        let topology = two_node();
        let paths = topology.compute_paths(PathPolicy::KShortest, 1);
        let assignment = topology.pairs().into_iter().map(|p| (p, 0)).collect();
        let pop = PopEncoder::new(topology.clone(), paths.clone(), 1, assignment).unwrap();
        let optimal = MaxFlowEncoder::new(topology, paths);
        let mut engine = GapEngine::new(Box::new(optimal), Box::new(pop), 20.0).unwrap();
        let mut solver = HiGHSSolver::new();
        let exact = engine.exact(&mut solver, &ExactConfig::default()).unwrap();
        assert!(exact.gap.abs() < 1e-5, "got {}", exact.gap);
    }

    #[test]
    fn primal_dual_without_levels_is_a_config_error() {
        let mut engine = pinning_engine();
        let mut solver = HiGHSSolver::new();
        let config = ExactConfig {
            rewrite: RewriteStrategy::PrimalDual,
            ..ExactConfig::default()
        };
        assert!(matches!(
            engine.exact(&mut solver, &config),
            Err(Error::Config(ConfigError::MissingField { .. }))
        ));
    }

    #[test]
    fn negative_upper_bound_is_rejected() {
        let topology = two_node();
        let paths = topology.compute_paths(PathPolicy::KShortest, 1);
        let a = MaxFlowEncoder::new(topology.clone(), paths.clone());
        let b = MaxFlowEncoder::new(topology, paths);
        assert!(GapEngine::new(Box::new(a), Box::new(b), -1.0).is_err());
    }
}
