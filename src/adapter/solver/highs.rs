//! HiGHS solver implementation via good_lp.
//!
//! HiGHS is a high-performance open-source linear/mixed-integer programming solver.
//! The model is kept in a [`ModelRegistry`] and translated into a good_lp
//! problem on every [`maximize`](Solver::maximize), which is what allows
//! constraints to be removed or retargeted between solves.

use std::collections::BTreeMap;
use std::time::Duration;

use good_lp::solvers::highs::highs;
use good_lp::{
    constraint, variable, variables, Expression, ResolutionError, Solution as _, SolutionStatus,
    SolverModel, Variable,
};
use tracing::{debug, warn};

use super::disjunction::{DisjunctionEncoding, SignedBigM};
use super::model::{ConstraintSense, ModelRegistry};
use crate::domain::polynomial::Polynomial;
use crate::domain::variable::{Var, VarKind, VariableSpec};
use crate::error::{Result, SolverError};
use crate::port::solver::{ConstraintName, Solution, SolveStatus, Solver};

/// Default big-M of the disjunction encoding.
pub const DEFAULT_DISJUNCTION_BIG_M: f64 = 1e5;

/// HiGHS-based LP/MILP solver session.
#[derive(Debug)]
pub struct HiGHSSolver {
    model: ModelRegistry,
    disjunction: Box<dyn DisjunctionEncoding>,
    time_limit: Option<Duration>,
    verbose: bool,
}

impl Default for HiGHSSolver {
    fn default() -> Self {
        Self::new()
    }
}

impl HiGHSSolver {
    /// Create a new HiGHS session using the signed big-M disjunction encoding.
    pub fn new() -> Self {
        Self::with_disjunction(Box::new(SignedBigM::new(DEFAULT_DISJUNCTION_BIG_M)))
    }

    /// Create a session with an explicit disjunction encoding.
    pub fn with_disjunction(disjunction: Box<dyn DisjunctionEncoding>) -> Self {
        Self {
            model: ModelRegistry::new(),
            disjunction,
            time_limit: None,
            verbose: false,
        }
    }

    /// Let HiGHS print its own log output.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Read-only view of the recorded model.
    pub fn model(&self) -> &ModelRegistry {
        &self.model
    }

    fn solve_recorded(&self) -> Result<Solution> {
        let generation = self.model.generation();
        let objective = self.model.objective();

        // Handle empty problem
        if self.model.variables().is_empty() {
            return Ok(Solution::new(
                BTreeMap::new(),
                objective.constant(),
                SolveStatus::Optimal,
                generation,
            ));
        }

        let mut vars = variables!();
        let handles: Vec<Variable> = self
            .model
            .variables()
            .iter()
            .map(|spec| vars.add(definition(spec)))
            .collect();

        let objective_expr: Expression = objective
            .linear_coefficients()
            .iter()
            .map(|(v, c)| *c * handles[v.index()])
            .sum();

        let mut problem = vars.maximise(&objective_expr).using(highs);
        problem.set_verbose(self.verbose);
        if let Some(limit) = self.time_limit {
            problem = problem.set_time_limit(limit.as_secs_f64());
        }

        for constr in self.model.constraints().values() {
            let lhs: Expression = constr
                .coefficients
                .iter()
                .map(|(v, c)| *c * handles[v.index()])
                .sum();
            let rhs = constr.rhs;
            problem = match constr.sense {
                ConstraintSense::LessEqual => problem.with(constraint!(lhs <= rhs)),
                ConstraintSense::Equal => problem.with(constraint!(lhs == rhs)),
            };
        }

        debug!(
            variables = handles.len(),
            constraints = self.model.constraints().len(),
            mixed_integer = self.model.is_mixed_integer(),
            "Solving with HiGHS"
        );

        match problem.solve() {
            Ok(solved) => {
                let values: BTreeMap<Var, f64> = handles
                    .iter()
                    .enumerate()
                    .map(|(i, h)| (Var::from_index(i), solved.value(*h)))
                    .collect();
                let objective_value =
                    objective.evaluate(|v| values.get(&v).copied().unwrap_or(0.0));
                let status = termination(solved.status());
                let solution = Solution::new(values, objective_value, status, generation);
                if status == SolveStatus::Optimal {
                    return Ok(solution);
                }
                warn!(
                    %status,
                    objective = objective_value,
                    "HiGHS stopped before proving optimality"
                );
                Err(SolverError::NonOptimal {
                    status,
                    reason: "stopped at a configured limit".to_string(),
                    solution: Some(Box::new(solution)),
                }
                .into())
            }
            Err(ResolutionError::Infeasible) | Err(ResolutionError::Unbounded) => {
                Err(SolverError::InfeasibleOrUnbounded.into())
            }
            Err(other) => Err(SolverError::NonOptimal {
                status: SolveStatus::Error,
                reason: other.to_string(),
                solution: None,
            }
            .into()),
        }
    }
}

/// HiGHS reports every work limit (time, iterations, solutions, memory,
/// interrupt) as `TimeLimit`.
fn termination(status: SolutionStatus) -> SolveStatus {
    match status {
        SolutionStatus::Optimal => SolveStatus::Optimal,
        SolutionStatus::TimeLimit => SolveStatus::TimeLimit,
        SolutionStatus::GapLimit => SolveStatus::GapLimit,
    }
}

/// Translate a recorded variable into a good_lp definition.
fn definition(spec: &VariableSpec) -> good_lp::VariableDefinition {
    let (lower, upper) = match spec.kind {
        VarKind::Binary => (
            Some(spec.lower.unwrap_or(0.0).max(0.0)),
            Some(spec.upper.unwrap_or(1.0).min(1.0)),
        ),
        _ => (spec.lower, spec.upper),
    };

    let mut v = variable();
    if matches!(spec.kind, VarKind::Integer | VarKind::Binary) {
        v = v.integer();
    }
    if let Some(lb) = lower {
        v = v.min(lb);
    }
    if let Some(ub) = upper {
        v = v.max(ub);
    }
    v
}

impl Solver for HiGHSSolver {
    fn name(&self) -> &'static str {
        "highs"
    }

    fn create_variable(&mut self, kind: VarKind, lower: Option<f64>, upper: Option<f64>) -> Var {
        self.model.add_variable(VariableSpec::new(kind, lower, upper))
    }

    fn variable(&self, var: Var) -> Option<VariableSpec> {
        self.model.variable(var)
    }

    fn set_variable_bounds(
        &mut self,
        var: Var,
        lower: Option<f64>,
        upper: Option<f64>,
    ) -> Result<()> {
        self.model.set_bounds(var, lower, upper)
    }

    fn add_leq_zero(&mut self, poly: Polynomial) -> Result<ConstraintName> {
        self.model.add_constraint(&poly, ConstraintSense::LessEqual)
    }

    fn add_eq_zero(&mut self, poly: Polynomial) -> Result<ConstraintName> {
        self.model.add_constraint(&poly, ConstraintSense::Equal)
    }

    fn add_disjunction(&mut self, a: Polynomial, b: Polynomial) -> Result<()> {
        self.disjunction.encode(&mut self.model, &a, &b)
    }

    fn set_objective(&mut self, objective: Polynomial) -> Result<()> {
        self.model.set_objective(objective)
    }

    fn maximize(&mut self) -> Result<Solution> {
        self.solve_recorded()
    }

    fn remove_constraint(&mut self, name: &ConstraintName) -> Result<()> {
        self.model.remove_constraint(name)
    }

    fn set_constraint_bound(&mut self, name: &ConstraintName, rhs: f64) -> Result<()> {
        self.model.set_rhs(name, rhs)
    }

    fn reset(&mut self) {
        self.model.reset();
    }

    fn set_time_limit(&mut self, limit: Duration) {
        self.time_limit = Some(limit);
    }

    fn generation(&self) -> u64 {
        self.model.generation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::solver::disjunction::NonNegativeSplit;
    use crate::domain::polynomial::Term;
    use crate::error::Error;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_solver_name() {
        let solver = HiGHSSolver::new();
        assert_eq!(solver.name(), "highs");
    }

    #[test]
    fn test_simple_lp() {
        // Maximize: x + y
        // Subject to: x + 2y <= 4, x <= 3
        let mut solver = HiGHSSolver::new();
        let x = solver.create_variable(VarKind::Continuous, Some(0.0), None);
        let y = solver.create_variable(VarKind::Continuous, Some(0.0), None);
        solver
            .add_leq_zero(Polynomial::from_terms([
                Term::linear(1.0, x),
                Term::linear(2.0, y),
                Term::constant(-4.0),
            ]))
            .unwrap();
        solver
            .add_leq_zero(Polynomial::from_terms([Term::linear(1.0, x), Term::constant(-3.0)]))
            .unwrap();
        solver.set_objective(Polynomial::sum_of([x, y])).unwrap();

        let solution = solver.maximize().unwrap();

        assert!(solution.is_optimal());
        assert!(close(solution.objective(), 3.5), "got {}", solution.objective());
        assert!(close(solver.value(&solution, x).unwrap(), 3.0));
        assert!(close(solver.value(&solution, y).unwrap(), 0.5));
    }

    #[test]
    fn test_binary_milp() {
        // Maximize: x + y, x + y <= 1, x, y binary
        let mut solver = HiGHSSolver::new();
        let x = solver.create_variable(VarKind::Binary, None, None);
        let y = solver.create_variable(VarKind::Binary, None, None);
        solver
            .add_leq_zero(Polynomial::sum_of([x, y]).with(Term::constant(-1.0)))
            .unwrap();
        solver.set_objective(Polynomial::sum_of([x, y])).unwrap();

        let solution = solver.maximize().unwrap();
        assert!(close(solution.objective(), 1.0));
    }

    #[test]
    fn test_infeasible_is_distinct() {
        let mut solver = HiGHSSolver::new();
        let x = solver.create_variable(VarKind::Continuous, Some(0.0), Some(1.0));
        solver
            .add_eq_zero(Polynomial::from(x).with(Term::constant(-5.0)))
            .unwrap();
        solver.set_objective(Polynomial::from(x)).unwrap();

        let err = solver.maximize().unwrap_err();
        assert!(err.is_infeasible(), "got {err}");
    }

    #[test]
    fn test_constraint_bound_and_removal() {
        let mut solver = HiGHSSolver::new();
        let x = solver.create_variable(VarKind::Continuous, Some(0.0), Some(100.0));
        let cap = solver
            .add_leq_zero(Polynomial::from(x).with(Term::constant(-10.0)))
            .unwrap();
        solver.set_objective(Polynomial::from(x)).unwrap();
        assert!(close(solver.maximize().unwrap().objective(), 10.0));

        solver.set_constraint_bound(&cap, 4.0).unwrap();
        assert!(close(solver.maximize().unwrap().objective(), 4.0));

        solver.remove_constraint(&cap).unwrap();
        assert!(close(solver.maximize().unwrap().objective(), 100.0));
    }

    #[test]
    fn test_reset_makes_old_solutions_stale() {
        let mut solver = HiGHSSolver::new();
        let x = solver.create_variable(VarKind::Continuous, Some(0.0), Some(1.0));
        solver.set_objective(Polynomial::from(x)).unwrap();
        let solution = solver.maximize().unwrap();

        solver.reset();

        assert!(matches!(
            solver.value(&solution, x),
            Err(Error::Solver(SolverError::StaleSolution { .. }))
        ));
        assert!(solver.model().variables().is_empty());
    }

    #[test]
    fn test_disjunction_forces_one_side_to_zero() {
        for encoding in [
            Box::new(SignedBigM::new(100.0)) as Box<dyn DisjunctionEncoding>,
            Box::new(NonNegativeSplit::new(100.0)),
        ] {
            let mut solver = HiGHSSolver::with_disjunction(encoding);
            let x = solver.create_variable(VarKind::Continuous, Some(0.0), Some(5.0));
            let y = solver.create_variable(VarKind::Continuous, Some(0.0), Some(3.0));
            solver
                .add_disjunction(Polynomial::from(x), Polynomial::from(y))
                .unwrap();
            solver.set_objective(Polynomial::sum_of([x, y])).unwrap();

            let solution = solver.maximize().unwrap();
            assert!(close(solution.objective(), 5.0), "got {}", solution.objective());
            assert!(close(solver.value(&solution, y).unwrap(), 0.0));
        }
    }

    #[test]
    fn test_termination_status_comes_from_highs() {
        assert_eq!(termination(SolutionStatus::Optimal), SolveStatus::Optimal);
        assert_eq!(termination(SolutionStatus::TimeLimit), SolveStatus::TimeLimit);
        assert_eq!(termination(SolutionStatus::GapLimit), SolveStatus::GapLimit);
    }

    #[test]
    fn test_generous_time_limit_stays_optimal() {
        let mut solver = HiGHSSolver::new();
        solver.set_time_limit(Duration::from_secs(60));
        let x = solver.create_variable(VarKind::Integer, Some(0.0), Some(7.0));
        solver.set_objective(Polynomial::from(x)).unwrap();
        let solution = solver.maximize().unwrap();
        assert_eq!(solution.status(), SolveStatus::Optimal);
        assert!(close(solution.objective(), 7.0));
    }

    #[test]
    fn test_empty_problem() {
        let mut solver = HiGHSSolver::new();
        solver
            .set_objective(Polynomial::from(Term::constant(2.5)))
            .unwrap();
        let solution = solver.maximize().unwrap();

        assert!(solution.is_optimal());
        assert_eq!(solution.objective(), 2.5);
    }
}
