//! Solver double that injects failures into chosen `maximize` calls.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::adapter::solver::HiGHSSolver;
use crate::domain::polynomial::Polynomial;
use crate::domain::variable::{Var, VarKind, VariableSpec};
use crate::error::{Result, SolverError};
use crate::port::solver::{ConstraintName, Solution, SolveStatus, Solver};

/// What a scripted `maximize` call does instead of returning the optimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Injected {
    /// Fail with a backend error and no incumbent.
    Failure,
    /// Solve, then report the optimum as a time-limited incumbent.
    TimeLimit,
}

/// HiGHS session whose `maximize` calls can be scripted by call index.
///
/// Call indexes count from zero across resets.
#[derive(Debug, Default)]
pub struct ScriptedSolver {
    inner: HiGHSSolver,
    script: BTreeMap<usize, Injected>,
    calls: usize,
}

impl ScriptedSolver {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn fail_on(mut self, call: usize) -> Self {
        self.script.insert(call, Injected::Failure);
        self
    }

    #[must_use]
    pub fn time_limit_on(mut self, call: usize) -> Self {
        self.script.insert(call, Injected::TimeLimit);
        self
    }

    /// Number of `maximize` calls so far.
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl Solver for ScriptedSolver {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn create_variable(&mut self, kind: VarKind, lower: Option<f64>, upper: Option<f64>) -> Var {
        self.inner.create_variable(kind, lower, upper)
    }

    fn variable(&self, var: Var) -> Option<VariableSpec> {
        self.inner.variable(var)
    }

    fn set_variable_bounds(
        &mut self,
        var: Var,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<()> {
        self.inner.set_variable_bounds(var, lower, upper)
    }

    fn add_leq_zero(&mut self, poly: Polynomial) -> Result<ConstraintName> {
        self.inner.add_leq_zero(poly)
    }

    fn add_eq_zero(&mut self, poly: Polynomial) -> Result<ConstraintName> {
        self.inner.add_eq_zero(poly)
    }

    fn add_disjunction(&mut self, a: Polynomial, b: Polynomial) -> Result<()> {
        self.inner.add_disjunction(a, b)
    }

    fn set_objective(&mut self, objective: Polynomial) -> Result<()> {
        self.inner.set_objective(objective)
    }

    fn maximize(&mut self) -> Result<Solution> {
        let call = self.calls;
        self.calls += 1;
        match self.script.get(&call) {
            None => self.inner.maximize(),
            Some(Injected::Failure) => Err(SolverError::NonOptimal {
                status: SolveStatus::Error,
                reason: format!("injected failure on call {call}"),
                solution: None,
            }
            .into()),
            Some(Injected::TimeLimit) => {
                let optimum = self.inner.maximize()?;
                let values = (0..self.inner.model().variables().len())
                    .map(Var::from_index)
                    .map(|var| -> Result<(Var, f64)> { Ok((var, optimum.value(var)?)) })
                    .collect::<Result<BTreeMap<_, _>>>()?;
                let incumbent = Solution::new(
                    values,
                    optimum.objective(),
                    SolveStatus::TimeLimit,
                    optimum.generation(),
                );
                Err(SolverError::NonOptimal {
                    status: SolveStatus::TimeLimit,
                    reason: format!("injected time limit on call {call}"),
                    solution: Some(Box::new(incumbent)),
                }
                .into())
            }
        }
    }

    fn remove_constraint(&mut self, name: &ConstraintName) -> Result<()> {
        self.inner.remove_constraint(name)
    }

    fn set_constraint_bound(&mut self, name: &ConstraintName, rhs: f64) -> Result<()> {
        self.inner.set_constraint_bound(name, rhs)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }

    fn set_time_limit(&mut self, limit: Duration) {
        self.inner.set_time_limit(limit);
    }

    fn generation(&self) -> u64 {
        self.inner.generation()
    }
}
