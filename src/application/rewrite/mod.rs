//! Inner-problem optimality rewrites.
//!
//! A bilevel model asks that the inner allocation variables be *optimal*
//! for the current outer decision (the demands), not merely feasible.
//! [`InnerProblem`] records the inner linear program as it is built and,
//! when finalized, appends the constraints that single out its optimal
//! points:
//!
//! - [`RewriteStrategy::Kkt`]: dual feasibility, stationarity and
//!   complementary slackness (`λ_i = 0 ∨ slack_i = 0`) through the solver's
//!   disjunction constraint.
//! - [`RewriteStrategy::PrimalDual`]: dual feasibility plus strong duality
//!   (`primal objective = dual objective`); dual × outer-binary products are
//!   linearized with big-M.
//!
//! Inner variables are treated as free; sign restrictions must be recorded
//! as explicit constraints (`-x <= 0`) so that they get their own dual.

mod kkt;
mod primal_dual;

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use tracing::debug;

use crate::domain::polynomial::{Polynomial, Term};
use crate::domain::variable::{Var, VarKind};
use crate::error::{ConfigError, ProtocolError, Result};
use crate::port::solver::Solver;

/// Default bound on dual multipliers and dual products.
pub const DEFAULT_DUAL_BIG_M: f64 = 1e4;

/// Technique used to force inner optimality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteStrategy {
    /// Karush-Kuhn-Tucker conditions with complementary slackness.
    #[default]
    Kkt,
    /// Dual feasibility plus strong duality.
    PrimalDual,
}

impl RewriteStrategy {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Kkt => "kkt",
            Self::PrimalDual => "primal_dual",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Finalized,
}

/// Recorder for one inner linear program.
///
/// Lifecycle: created empty, accumulates inner constraints in any order,
/// then [`add_maximization_constraints`](Self::add_maximization_constraints)
/// is called exactly once.
#[derive(Debug)]
pub struct InnerProblem {
    strategy: RewriteStrategy,
    big_m: f64,
    inner: BTreeSet<Var>,
    equalities: Vec<Polynomial>,
    inequalities: Vec<Polynomial>,
    state: State,
}

impl InnerProblem {
    /// Create an empty recorder.
    ///
    /// `big_m` bounds the dual multipliers and must dominate the magnitude of
    /// every optimal dual value and every inner constraint slack.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a negative or non-finite `big_m`.
    pub fn new(strategy: RewriteStrategy, big_m: f64) -> Result<Self> {
        if !big_m.is_finite() || big_m <= 0.0 {
            return Err(
                ConfigError::invalid("big_m", format!("must be positive, got {big_m}")).into(),
            );
        }
        Ok(Self {
            strategy,
            big_m,
            inner: BTreeSet::new(),
            equalities: Vec::new(),
            inequalities: Vec::new(),
            state: State::Open,
        })
    }

    #[must_use]
    pub const fn strategy(&self) -> RewriteStrategy {
        self.strategy
    }

    /// Mark `var` as an inner (follower) variable.
    pub fn declare_inner(&mut self, var: Var) {
        self.inner.insert(var);
    }

    #[must_use]
    pub fn is_finalized(&self) -> bool {
        self.state == State::Finalized
    }

    /// Number of recorded inner constraints.
    #[must_use]
    pub fn constraint_count(&self) -> usize {
        self.equalities.len() + self.inequalities.len()
    }

    /// Record `poly == 0` and pass it to the solver.
    ///
    /// # Errors
    ///
    /// Fails after finalization or when the solver rejects the constraint.
    pub fn add_eq_zero(&mut self, solver: &mut dyn Solver, poly: Polynomial) -> Result<()> {
        self.ensure_open()?;
        solver.add_eq_zero(poly.clone())?;
        self.equalities.push(poly);
        Ok(())
    }

    /// Record `poly <= 0` and pass it to the solver.
    ///
    /// # Errors
    ///
    /// Fails after finalization or when the solver rejects the constraint.
    pub fn add_leq_zero(&mut self, solver: &mut dyn Solver, poly: Polynomial) -> Result<()> {
        self.ensure_open()?;
        solver.add_leq_zero(poly.clone())?;
        self.inequalities.push(poly);
        Ok(())
    }

    /// Force the recorded feasible region to be optimal for `objective`.
    ///
    /// With `skip_optimality` nothing is appended: the region stays
    /// feasibility-only, which is what candidate evaluation in the
    /// metaheuristic searches uses. Either way the recorder is finalized.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::AlreadyFinalized`] on a second call, and
    /// configuration errors for outer variables the strategy cannot handle.
    pub fn add_maximization_constraints(
        &mut self,
        solver: &mut dyn Solver,
        objective: &Polynomial,
        skip_optimality: bool,
        verbose: bool,
    ) -> Result<()> {
        if self.is_finalized() {
            return Err(ProtocolError::AlreadyFinalized.into());
        }
        self.state = State::Finalized;

        if skip_optimality {
            debug!(
                constraints = self.constraint_count(),
                "Skipping inner optimality constraints"
            );
            return Ok(());
        }

        let duals = self.dual_feasibility(solver, objective)?;
        match self.strategy {
            RewriteStrategy::Kkt => {
                kkt::complementary_slackness(solver, &self.inequalities, &duals)?;
            }
            RewriteStrategy::PrimalDual => {
                primal_dual::strong_duality(solver, self, objective, &duals, verbose)?;
            }
        }

        if verbose {
            debug!(
                strategy = self.strategy.name(),
                inner_vars = self.inner.len(),
                equalities = self.equalities.len(),
                inequalities = self.inequalities.len(),
                "Added inner optimality constraints"
            );
        }
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_finalized() {
            return Err(ProtocolError::ConstraintAfterFinalize.into());
        }
        Ok(())
    }

    /// Create one dual per recorded constraint and assert, for every inner
    /// variable `x_j`: `c_j - Σ λ_i a_ij - Σ μ_k e_kj = 0`.
    fn dual_feasibility(&self, solver: &mut dyn Solver, objective: &Polynomial) -> Result<Duals> {
        let m = self.big_m;
        let leq: Vec<Var> = self
            .inequalities
            .iter()
            .map(|_| solver.create_variable(VarKind::Continuous, Some(0.0), Some(m)))
            .collect();
        let eq: Vec<Var> = self
            .equalities
            .iter()
            .map(|_| solver.create_variable(VarKind::Continuous, Some(-m), Some(m)))
            .collect();

        let mut gradient: BTreeMap<Var, Polynomial> = self
            .inner
            .iter()
            .map(|&x| (x, Polynomial::from(Term::constant(objective.coefficient(x)))))
            .collect();
        let rows = self
            .inequalities
            .iter()
            .zip(&leq)
            .chain(self.equalities.iter().zip(&eq));
        for (constraint, &dual) in rows {
            for (x, a) in constraint.linear_coefficients() {
                if let Some(g) = gradient.get_mut(&x) {
                    g.add_term(Term::linear(-a, dual));
                }
            }
        }
        for (x, g) in gradient {
            if g.variables().is_empty() {
                let c = g.constant();
                if c != 0.0 {
                    return Err(ConfigError::invalid(
                        "inner_variable",
                        format!("{x} has objective coefficient {c} but no inner constraint"),
                    )
                    .into());
                }
                continue;
            }
            solver.add_eq_zero(g)?;
        }

        Ok(Duals { leq, eq })
    }
}

/// Dual multipliers, aligned with the recorded constraints.
#[derive(Debug)]
struct Duals {
    leq: Vec<Var>,
    eq: Vec<Var>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::solver::HiGHSSolver;
    use crate::error::Error;

    /// Inner: max x + y s.t. x <= 3*b, y <= 2, x + y <= 4, x, y >= 0.
    /// Returns (x, y, b).
    fn build(
        solver: &mut HiGHSSolver,
        inner: &mut InnerProblem,
        b_fixed: Option<f64>,
    ) -> (Var, Var, Var) {
        let x = solver.create_variable(VarKind::Continuous, None, None);
        let y = solver.create_variable(VarKind::Continuous, None, None);
        let b = match b_fixed {
            Some(v) => solver.create_variable(VarKind::Binary, Some(v), Some(v)),
            None => solver.create_variable(VarKind::Binary, None, None),
        };
        inner.declare_inner(x);
        inner.declare_inner(y);
        let rows = [
            Polynomial::from_terms([Term::linear(1.0, x), Term::linear(-3.0, b)]),
            Polynomial::from_terms([Term::linear(1.0, y), Term::constant(-2.0)]),
            Polynomial::from_terms([
                Term::linear(1.0, x),
                Term::linear(1.0, y),
                Term::constant(-4.0),
            ]),
            Polynomial::from(Term::linear(-1.0, x)),
            Polynomial::from(Term::linear(-1.0, y)),
        ];
        for row in rows {
            inner.add_leq_zero(solver, row).unwrap();
        }
        (x, y, b)
    }

    fn outer_min_flow(strategy: RewriteStrategy, skip: bool) -> f64 {
        let mut solver = HiGHSSolver::new();
        let mut inner = InnerProblem::new(strategy, 100.0).unwrap();
        let (x, y, b) = build(&mut solver, &mut inner, None);
        inner
            .add_maximization_constraints(&mut solver, &Polynomial::sum_of([x, y]), skip, true)
            .unwrap();
        // Outer: prefer small inner flow, small bonus for b = 1.
        let outer = Polynomial::sum_of([x, y]).negate().with(Term::linear(0.5, b));
        solver.set_objective(outer).unwrap();
        solver.maximize().unwrap().objective()
    }

    #[test]
    fn feasibility_only_lets_outer_pick_zero_flow() {
        let value = outer_min_flow(RewriteStrategy::Kkt, true);
        assert!((value - 0.5).abs() < 1e-6, "got {value}");
    }

    #[test]
    fn both_strategies_force_inner_optimality() {
        for strategy in [RewriteStrategy::Kkt, RewriteStrategy::PrimalDual] {
            let value = outer_min_flow(strategy, false);
            // b = 0: inner optimum 2 -> -2; b = 1: inner optimum 4 -> -3.5
            assert!((value + 2.0).abs() < 1e-5, "{}: got {value}", strategy.name());
        }
    }

    #[test]
    fn fixed_outer_variables_are_constants_for_primal_dual() {
        let mut solver = HiGHSSolver::new();
        let mut inner = InnerProblem::new(RewriteStrategy::PrimalDual, 100.0).unwrap();
        let (x, y, _) = build(&mut solver, &mut inner, Some(1.0));
        inner
            .add_maximization_constraints(&mut solver, &Polynomial::sum_of([x, y]), false, false)
            .unwrap();
        solver.set_objective(Polynomial::sum_of([x, y]).negate()).unwrap();
        let value = solver.maximize().unwrap().objective();
        assert!((value + 4.0).abs() < 1e-5, "got {value}");
    }

    #[test]
    fn continuous_outer_variable_is_rejected_by_primal_dual() {
        let mut solver = HiGHSSolver::new();
        let mut inner = InnerProblem::new(RewriteStrategy::PrimalDual, 100.0).unwrap();
        let x = solver.create_variable(VarKind::Continuous, None, None);
        let d = solver.create_variable(VarKind::Continuous, Some(0.0), Some(10.0));
        inner.declare_inner(x);
        let row = Polynomial::from_terms([Term::linear(1.0, x), Term::linear(-1.0, d)]);
        inner.add_leq_zero(&mut solver, row).unwrap();
        let err = inner
            .add_maximization_constraints(&mut solver, &Polynomial::from(x), false, false)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field: "outer_variable", .. })
        ));
    }

    #[test]
    fn finalizing_twice_is_a_protocol_error() {
        let mut solver = HiGHSSolver::new();
        let mut inner = InnerProblem::new(RewriteStrategy::Kkt, 100.0).unwrap();
        let x = solver.create_variable(VarKind::Continuous, None, None);
        inner.declare_inner(x);
        inner
            .add_maximization_constraints(&mut solver, &Polynomial::from(x), true, false)
            .unwrap();

        assert!(matches!(
            inner.add_maximization_constraints(&mut solver, &Polynomial::from(x), true, false),
            Err(Error::Protocol(ProtocolError::AlreadyFinalized))
        ));
        assert!(matches!(
            inner.add_leq_zero(&mut solver, Polynomial::from(x)),
            Err(Error::Protocol(ProtocolError::ConstraintAfterFinalize))
        ));
    }

    #[test]
    fn non_positive_big_m_is_rejected() {
        assert!(InnerProblem::new(RewriteStrategy::Kkt, 0.0).is_err());
        assert!(InnerProblem::new(RewriteStrategy::Kkt, f64::NAN).is_err());
    }

    #[test]
    fn unconstrained_inner_variable_in_objective_is_rejected() {
        for strategy in [RewriteStrategy::Kkt, RewriteStrategy::PrimalDual] {
            let mut solver = HiGHSSolver::new();
            let mut inner = InnerProblem::new(strategy, 100.0).unwrap();
            let x = solver.create_variable(VarKind::Continuous, None, None);
            inner.declare_inner(x);
            let err = inner
                .add_maximization_constraints(&mut solver, &Polynomial::from(x), false, false)
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Config(ConfigError::InvalidValue { field: "inner_variable", .. })
            ));
        }
    }
}
