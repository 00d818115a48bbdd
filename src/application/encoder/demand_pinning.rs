//! Demand pinning heuristic.
//!
//! Every pair whose demand is at or below a threshold is routed entirely
//! on its shortest path; the remaining pairs are optimized like max-flow
//! over the capacity left over. Whether a pair is pinned depends on its
//! demand, so the pin indicator is derived from the demand representation:
//!
//! | demand      | indicator `b` (1 = pinned)                          |
//! |-------------|-----------------------------------------------------|
//! | fixed       | decided when encoding                               |
//! | quantized   | `1 - Σ z_l` over levels above the threshold         |
//! | continuous  | new binary tied to `d` by two big-M rows            |

use std::collections::BTreeMap;

use tracing::debug;

use super::{
    current, ensure_fresh, resolve_demands, AllocationEncoder, EncodeRequest, EncodedState,
    Encoding, FlowSolution, FlowVariables,
};
use crate::application::rewrite::InnerProblem;
use crate::domain::demand::DemandExpr;
use crate::domain::polynomial::{Polynomial, Term};
use crate::domain::topology::{Pair, Path, Topology};
use crate::domain::variable::{Var, VarKind};
use crate::error::{ConfigError, Result};
use crate::port::solver::{Solution, Solver};

/// Gap kept between "pinned" and "not pinned" continuous demands.
pub const PIN_EPSILON: f64 = 1e-3;

/// How one pair's pinning is expressed.
enum Pin {
    /// Statically pinned (fixed demand at or below the threshold).
    Always,
    /// Statically unpinned.
    Never,
    /// Pinned unless `relax` is one; `relax` is `1 - b` as an expression
    /// over binaries.
    Unless(Polynomial),
}

#[derive(Debug)]
pub struct DemandPinningEncoder {
    topology: Topology,
    paths: BTreeMap<Pair, Vec<Path>>,
    threshold: f64,
    big_m: f64,
    state: Option<EncodedState>,
}

impl DemandPinningEncoder {
    pub const NAME: &'static str = "demand_pinning";

    /// `big_m` must dominate every demand the encoder can see.
    ///
    /// # Errors
    ///
    /// Rejects negative or non-finite thresholds and a `big_m` that does
    /// not exceed the threshold.
    pub fn new(
        topology: Topology,
        paths: BTreeMap<Pair, Vec<Path>>,
        threshold: f64,
        big_m: f64,
    ) -> Result<Self> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(ConfigError::invalid(
                "threshold",
                format!("must be non-negative, got {threshold}"),
            )
            .into());
        }
        if !big_m.is_finite() || big_m <= threshold {
            return Err(ConfigError::invalid(
                "pin_big_m",
                format!("{big_m} must exceed threshold {threshold}"),
            )
            .into());
        }
        Ok(Self {
            topology,
            paths,
            threshold,
            big_m,
            state: None,
        })
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn pin_for(&self, solver: &mut dyn Solver, demand: &DemandExpr) -> Result<Pin> {
        match demand {
            DemandExpr::Fixed(d) if *d <= self.threshold => Ok(Pin::Always),
            DemandExpr::Fixed(_) => Ok(Pin::Never),
            DemandExpr::Quantized { levels } => {
                let above: Vec<Var> = levels
                    .iter()
                    .filter(|(level, _)| *level > self.threshold)
                    .map(|(_, z)| *z)
                    .collect();
                if above.is_empty() {
                    Ok(Pin::Always)
                } else {
                    Ok(Pin::Unless(Polynomial::sum_of(above)))
                }
            }
            DemandExpr::Variable(d) => {
                let b = solver.create_variable(VarKind::Binary, Some(0.0), Some(1.0));
                let m = self.big_m;
                // b = 1 => d <= T
                solver.add_leq_zero(Polynomial::from_terms([
                    Term::linear(1.0, *d),
                    Term::linear(m, b),
                    Term::constant(-self.threshold - m),
                ]))?;
                // b = 0 => d >= T + eps
                solver.add_leq_zero(Polynomial::from_terms([
                    Term::linear(-1.0, *d),
                    Term::linear(-m, b),
                    Term::constant(self.threshold + PIN_EPSILON),
                ]))?;
                Ok(Pin::Unless(Polynomial::from_terms([
                    Term::constant(1.0),
                    Term::linear(-1.0, b),
                ])))
            }
        }
    }

    /// `d - x_shortest <= M * relax` and `x_other <= M * relax`.
    fn add_pinning(
        &self,
        solver: &mut dyn Solver,
        inner: &mut InnerProblem,
        vars: &FlowVariables,
    ) -> Result<usize> {
        let mut pinned = 0;
        for (pair, path_vars) in &vars.paths {
            let Some(demand) = vars.demands.get(pair) else {
                continue;
            };
            let relax = match self.pin_for(solver, demand)? {
                Pin::Never => continue,
                Pin::Always => Polynomial::new(),
                Pin::Unless(relax) => relax.scaled(self.big_m),
            };
            pinned += 1;

            for (i, (_, x)) in path_vars.iter().enumerate() {
                let mut row = if i == 0 {
                    demand.polynomial().with(Term::linear(-1.0, *x))
                } else {
                    Polynomial::from(*x)
                };
                row.add(&relax.negate());
                inner.add_leq_zero(solver, row)?;
            }
        }
        Ok(pinned)
    }
}

impl AllocationEncoder for DemandPinningEncoder {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn paths(&self) -> &BTreeMap<Pair, Vec<Path>> {
        &self.paths
    }

    fn encode(&mut self, solver: &mut dyn Solver, request: &EncodeRequest) -> Result<Encoding> {
        ensure_fresh(self.state.as_ref(), solver, Self::NAME)?;

        let mut inner = InnerProblem::new(request.rewrite, request.dual_big_m)?;
        let demands = resolve_demands(solver, &self.paths, request)?;
        let vars = FlowVariables::build(solver, &mut inner, &self.paths, demands)?;
        vars.add_capacity(solver, &mut inner, &self.topology, |_| 0)?;
        let candidates = self.add_pinning(solver, &mut inner, &vars)?;

        let objective = Polynomial::from(vars.total);
        inner.add_maximization_constraints(
            solver,
            &objective,
            request.skip_optimality,
            request.verbose,
        )?;

        debug!(
            encoder = Self::NAME,
            threshold = self.threshold,
            pin_candidates = candidates,
            inner_constraints = inner.constraint_count(),
            "Encoded allocation"
        );

        let encoding = Encoding {
            objective_var: vars.total,
            objective,
            demands: vars.demands.clone(),
        };
        self.state = Some(EncodedState {
            generation: solver.generation(),
            vars,
        });
        Ok(encoding)
    }

    fn solution(&self, solver: &dyn Solver, solution: &Solution) -> Result<FlowSolution> {
        current(self.state.as_ref(), solver, Self::NAME)?.read(solver, solution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::solver::HiGHSSolver;
    use crate::domain::demand::DemandMatrix;
    use crate::domain::topology::PathPolicy;
    use crate::testkit::diamond;

    fn encoder(threshold: f64) -> DemandPinningEncoder {
        let topology = diamond();
        let paths = topology.compute_paths(PathPolicy::KShortest, 2);
        DemandPinningEncoder::new(topology, paths, threshold, 100.0).unwrap()
    }

    fn solve(enc: &mut DemandPinningEncoder, demands: DemandMatrix) -> FlowSolution {
        let mut solver = HiGHSSolver::new();
        let encoding = enc.encode(&mut solver, &EncodeRequest::fixed(demands)).unwrap();
        solver.set_objective(encoding.objective).unwrap();
        let solution = solver.maximize().unwrap();
        enc.solution(&solver, &solution).unwrap()
    }

    #[test]
    fn small_demands_are_forced_onto_shortest_path() {
        let mut enc = encoder(5.0);
        let pairs = enc.routable_pairs();
        let mut demands = DemandMatrix::uniform(&pairs, 10.0);
        demands.insert(Pair::new("a", "d"), 5.0);
        let sol = solve(&mut enc, demands);

        // a->d is pinned to a-b-d, eating 5 units of a-b and b-d.
        let ad = &sol.path_flows[&Pair::new("a", "d")];
        assert_eq!(ad[0].path.to_string(), "a-b-d");
        assert!((ad[0].flow - 5.0).abs() < 1e-6);
        assert!(ad[1].flow.abs() < 1e-6);
        assert!((sol.objective - 35.0).abs() < 1e-6, "got {}", sol.objective);
    }

    #[test]
    fn large_demands_are_optimized_freely() {
        let mut enc = encoder(1.0);
        let pairs = enc.routable_pairs();
        let sol = solve(&mut enc, DemandMatrix::uniform(&pairs, 10.0));
        assert!((sol.objective - 40.0).abs() < 1e-6, "got {}", sol.objective);
    }

    #[test]
    fn continuous_demand_indicator_follows_threshold() {
        let mut enc = encoder(5.0);
        let mut solver = HiGHSSolver::new();
        let mut request = EncodeRequest::default();
        request.demand_upper_bound = Some(10.0);
        request.skip_optimality = true;
        let encoding = enc.encode(&mut solver, &request).unwrap();

        // Push a->d to 4: pinned, so it must ride a-b-d in full.
        let ad = encoding.demands[&Pair::new("a", "d")].polynomial();
        solver.add_eq_zero(ad.with(Term::constant(-4.0))).unwrap();
        solver.set_objective(encoding.objective).unwrap();
        let solution = solver.maximize().unwrap();
        let sol = enc.solution(&solver, &solution).unwrap();
        let flows = &sol.path_flows[&Pair::new("a", "d")];
        assert!((flows[0].flow - 4.0).abs() < 1e-6);
        assert!(flows[1].flow.abs() < 1e-6);
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let topology = diamond();
        let paths = topology.compute_paths(PathPolicy::KShortest, 2);
        assert!(DemandPinningEncoder::new(topology.clone(), paths.clone(), -1.0, 10.0).is_err());
        assert!(DemandPinningEncoder::new(topology, paths, 5.0, 5.0).is_err());
    }
}
