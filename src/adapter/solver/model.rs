//! Backend-agnostic model registry.
//!
//! Backends record variables, constraints and the objective here and
//! translate the registry into their native form at solve time. Keeping the
//! registry separate from the native session lets constraints be removed or
//! have their right-hand side changed between solves.

use std::collections::BTreeMap;

use crate::domain::polynomial::Polynomial;
use crate::domain::variable::{Var, VarKind, VariableSpec};
use crate::error::{Result, SolverError};
use crate::port::solver::ConstraintName;

/// Constraint sense (comparison operator against the right-hand side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintSense {
    /// Less than or equal (<=).
    LessEqual,
    /// Equal (=).
    Equal,
}

/// A linear constraint: `sum(coefficients[v] * v) {<=, =} rhs`.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedConstraint {
    pub coefficients: BTreeMap<Var, f64>,
    pub sense: ConstraintSense,
    pub rhs: f64,
}

/// Variables, auxiliary variables, constraints and objective of one model.
///
/// [`reset`](ModelRegistry::reset) clears all of them together and bumps
/// the generation.
#[derive(Debug, Default)]
pub struct ModelRegistry {
    variables: Vec<VariableSpec>,
    auxiliary: Vec<Var>,
    constraints: BTreeMap<ConstraintName, RecordedConstraint>,
    constraint_count: usize,
    objective: Polynomial,
    generation: u64,
}

impl ModelRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, spec: VariableSpec) -> Var {
        let var = Var::from_index(self.variables.len());
        self.variables.push(spec);
        var
    }

    /// Add a variable owned by the backend itself (e.g. a disjunction selector).
    pub fn add_auxiliary(&mut self, spec: VariableSpec) -> Var {
        let var = self.add_variable(spec);
        self.auxiliary.push(var);
        var
    }

    #[must_use]
    pub fn variable(&self, var: Var) -> Option<VariableSpec> {
        self.variables.get(var.index()).copied()
    }

    #[must_use]
    pub fn variables(&self) -> &[VariableSpec] {
        &self.variables
    }

    #[must_use]
    pub fn auxiliary(&self) -> &[Var] {
        &self.auxiliary
    }

    pub fn set_bounds(&mut self, var: Var, lower: Option<f64>, upper: Option<f64>) -> Result<()> {
        let spec = self
            .variables
            .get_mut(var.index())
            .ok_or_else(|| SolverError::UnknownVariable(var.to_string()))?;
        let updated = VariableSpec::new(spec.kind, lower, upper);
        if !updated.is_consistent() {
            return Err(SolverError::InvalidBounds { lower, upper }.into());
        }
        *spec = updated;
        Ok(())
    }

    /// Validate `poly` and record `poly {<=, =} 0` under a fresh name.
    pub fn add_constraint(
        &mut self,
        poly: &Polynomial,
        sense: ConstraintSense,
    ) -> Result<ConstraintName> {
        self.validate(poly)?;
        let name = ConstraintName::new(format!("c{}", self.constraint_count));
        self.constraint_count += 1;
        self.constraints.insert(
            name.clone(),
            RecordedConstraint {
                coefficients: poly.linear_coefficients(),
                sense,
                rhs: -poly.constant(),
            },
        );
        Ok(name)
    }

    pub fn remove_constraint(&mut self, name: &ConstraintName) -> Result<()> {
        self.constraints
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| SolverError::UnknownConstraint(name.to_string()).into())
    }

    pub fn set_rhs(&mut self, name: &ConstraintName, rhs: f64) -> Result<()> {
        let constraint = self
            .constraints
            .get_mut(name)
            .ok_or_else(|| SolverError::UnknownConstraint(name.to_string()))?;
        constraint.rhs = rhs;
        Ok(())
    }

    #[must_use]
    pub fn constraints(&self) -> &BTreeMap<ConstraintName, RecordedConstraint> {
        &self.constraints
    }

    pub fn set_objective(&mut self, objective: Polynomial) -> Result<()> {
        self.validate(&objective)?;
        self.objective = objective;
        Ok(())
    }

    #[must_use]
    pub fn objective(&self) -> &Polynomial {
        &self.objective
    }

    #[must_use]
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// True when the model has integer or binary variables.
    #[must_use]
    pub fn is_mixed_integer(&self) -> bool {
        self.variables
            .iter()
            .any(|s| matches!(s.kind, VarKind::Integer | VarKind::Binary))
    }

    pub fn reset(&mut self) {
        self.variables.clear();
        self.auxiliary.clear();
        self.constraints.clear();
        self.constraint_count = 0;
        self.objective = Polynomial::new();
        self.generation += 1;
    }

    /// Reject nonlinear terms and handles this model never issued.
    pub fn validate(&self, poly: &Polynomial) -> Result<()> {
        if let Some(term) = poly.first_nonlinear() {
            return Err(SolverError::NonLinear {
                exponent: term.exponent(),
            }
            .into());
        }
        if let Some(var) = poly
            .variables()
            .into_iter()
            .find(|v| v.index() >= self.variables.len())
        {
            return Err(SolverError::UnknownVariable(var.to_string()).into());
        }
        Ok(())
    }
}
