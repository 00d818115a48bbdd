//! Solver port for linear and mixed-integer programming.
//!
//! Defines the contract every backend implements. Encoders, the
//! linearization library and the rewrite generator only talk to this trait,
//! so any backend (HiGHS, a commercial solver, a mock) can be plugged in.
//!
//! # Overview
//!
//! - [`Solver`]: incremental model building and maximization
//! - [`Solution`]: values of one successful (or degraded) solve
//! - [`SolveStatus`]: termination status
//! - [`ConstraintName`]: stable handle for removal and rhs updates

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::domain::polynomial::Polynomial;
use crate::domain::variable::{Var, VarKind, VariableSpec};
use crate::error::{Result, SolverError};

/// Linear and mixed-integer programming backend.
///
/// A backend instance owns one model at a time. Methods take `&mut self`,
/// so a session cannot be mutated or solved concurrently; independent
/// sessions may run on separate threads (`Send`).
///
/// # Implementation Notes
///
/// - Names and handles must stay stable until [`reset`](Solver::reset) and
///   must never be reused while referenced.
/// - [`reset`](Solver::reset) clears variables, auxiliary variables,
///   constraints, counters and the objective together.
/// - Native resources are released on `Drop`.
pub trait Solver: Send {
    /// Return the solver name for logging and configuration.
    fn name(&self) -> &'static str;

    /// Create a variable. `None` bounds are unbounded on that side.
    fn create_variable(&mut self, kind: VarKind, lower: Option<f64>, upper: Option<f64>) -> Var;

    /// Kind and current bounds of `var`.
    fn variable(&self, var: Var) -> Option<VariableSpec>;

    /// Change the bounds of an existing variable.
    ///
    /// # Errors
    ///
    /// Fails for unknown handles or inconsistent bounds.
    fn set_variable_bounds(&mut self, var: Var, lower: Option<f64>, upper: Option<f64>)
        -> Result<()>;

    /// Assert `poly <= 0`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NonLinear`] for terms of degree above one.
    fn add_leq_zero(&mut self, poly: Polynomial) -> Result<ConstraintName>;

    /// Assert `poly == 0`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NonLinear`] for terms of degree above one.
    fn add_eq_zero(&mut self, poly: Polynomial) -> Result<ConstraintName>;

    /// Assert that at least one of `a`, `b` equals zero.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NonLinear`] for terms of degree above one.
    fn add_disjunction(&mut self, a: Polynomial, b: Polynomial) -> Result<()>;

    /// Replace the objective to maximize.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::NonLinear`] for terms of degree above one.
    fn set_objective(&mut self, objective: Polynomial) -> Result<()>;

    /// Maximize the current objective.
    ///
    /// # Errors
    ///
    /// - [`SolverError::InfeasibleOrUnbounded`] when no optimum exists.
    /// - [`SolverError::NonOptimal`] for any other non-optimal termination;
    ///   time-limited runs carry their incumbent.
    fn maximize(&mut self) -> Result<Solution>;

    /// Drop the constraint called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::UnknownConstraint`] if no such constraint exists.
    fn remove_constraint(&mut self, name: &ConstraintName) -> Result<()>;

    /// Change the right-hand side of `name` (`linear part <= rhs` / `== rhs`).
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::UnknownConstraint`] if no such constraint exists.
    fn set_constraint_bound(&mut self, name: &ConstraintName, rhs: f64) -> Result<()>;

    /// Drop the whole model while keeping the session alive.
    fn reset(&mut self);

    /// Wall-clock limit applied to each subsequent solve.
    fn set_time_limit(&mut self, limit: Duration);

    /// Model generation; bumped by every [`reset`](Solver::reset).
    fn generation(&self) -> u64;

    /// Read the value of `var` from `solution`.
    ///
    /// # Errors
    ///
    /// Fails when the solution predates the last reset or does not cover `var`.
    fn value(&self, solution: &Solution, var: Var) -> Result<f64> {
        if solution.generation != self.generation() {
            return Err(SolverError::StaleSolution {
                solution: solution.generation,
                current: self.generation(),
            }
            .into());
        }
        solution.value(var)
    }
}

/// Solver-unique constraint name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConstraintName(String);

impl ConstraintName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConstraintName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Termination status of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Solver proved optimality.
    Optimal,

    /// Solver stopped at its time limit (or another work limit).
    TimeLimit,

    /// Solver stopped at its MIP gap tolerance.
    GapLimit,

    /// No feasible optimum exists.
    InfeasibleOrUnbounded,

    /// Solver encountered an internal error.
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Optimal => "optimal",
            Self::TimeLimit => "time_limit",
            Self::GapLimit => "gap_limit",
            Self::InfeasibleOrUnbounded => "infeasible_or_unbounded",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Values of one solve.
#[derive(Debug, Clone)]
pub struct Solution {
    values: BTreeMap<Var, f64>,
    objective: f64,
    status: SolveStatus,
    generation: u64,
}

impl Solution {
    #[must_use]
    pub fn new(
        values: BTreeMap<Var, f64>,
        objective: f64,
        status: SolveStatus,
        generation: u64,
    ) -> Self {
        Self {
            values,
            objective,
            status,
            generation,
        }
    }

    /// Objective value at this solution.
    #[must_use]
    pub const fn objective(&self) -> f64 {
        self.objective
    }

    #[must_use]
    pub const fn status(&self) -> SolveStatus {
        self.status
    }

    #[must_use]
    pub fn is_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// Value of `var`.
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::UnknownVariable`] when the solve did not cover `var`.
    pub fn value(&self, var: Var) -> Result<f64> {
        self.values
            .get(&var)
            .copied()
            .ok_or_else(|| SolverError::UnknownVariable(var.to_string()).into())
    }

    /// Evaluate `poly` at this solution.
    ///
    /// # Errors
    ///
    /// Fails if `poly` mentions a variable the solve did not cover.
    pub fn evaluate(&self, poly: &Polynomial) -> Result<f64> {
        for var in poly.variables() {
            self.value(var)?;
        }
        Ok(poly.evaluate(|v| self.values.get(&v).copied().unwrap_or(0.0)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::polynomial::Term;

    #[test]
    fn solution_reports_unknown_variables() {
        let x = Var::from_index(0);
        let solution = Solution::new(BTreeMap::from([(x, 2.0)]), 2.0, SolveStatus::Optimal, 0);
        assert_eq!(solution.value(x).unwrap(), 2.0);
        assert!(solution.value(Var::from_index(1)).is_err());
    }

    #[test]
    fn solution_evaluates_polynomials() {
        let x = Var::from_index(0);
        let solution = Solution::new(BTreeMap::from([(x, 2.0)]), 2.0, SolveStatus::Optimal, 0);
        let p = Polynomial::from_terms([Term::linear(3.0, x), Term::constant(1.0)]);
        assert_eq!(solution.evaluate(&p).unwrap(), 7.0);
    }

    #[test]
    fn status_display_is_snake_case() {
        assert_eq!(SolveStatus::TimeLimit.to_string(), "time_limit");
    }
}
