//! Strong duality for the primal-dual rewrite.
//!
//! With every inner constraint written as `a_iᵀx + r_i <= 0` (or `= 0`),
//! where `r_i` collects outer variables and constants, the dual objective
//! is `-Σ λ_i r_i - Σ μ_k s_k`. Products of a dual with an outer variable
//! are only linear when the outer variable is fixed; a binary outer variable
//! is handled with a big-M product, anything else has to be quantized by
//! the caller first.

use std::collections::BTreeMap;

use tracing::debug;

use crate::application::linearize;
use crate::domain::polynomial::{Polynomial, Term};
use crate::domain::variable::{Var, VarKind};
use crate::error::{ConfigError, Result};
use crate::port::solver::Solver;

use super::{Duals, InnerProblem};

pub(super) fn strong_duality(
    solver: &mut dyn Solver,
    problem: &InnerProblem,
    objective: &Polynomial,
    duals: &Duals,
    verbose: bool,
) -> Result<()> {
    let (primal, _) = objective.partition(&problem.inner);
    let mut products: BTreeMap<(Var, Var), Var> = BTreeMap::new();
    let mut dual_objective = Polynomial::new();

    let rows = problem
        .inequalities
        .iter()
        .zip(duals.leq.iter().map(|&d| (d, true)))
        .chain(
            problem
                .equalities
                .iter()
                .zip(duals.eq.iter().map(|&d| (d, false))),
        );
    for (constraint, (dual, non_negative)) in rows {
        let (_, outer) = constraint.partition(&problem.inner);
        for term in outer.terms() {
            let coefficient = term.coefficient();
            let Some(var) = term.linear_variable() else {
                // constant part of r_i
                dual_objective.add_term(Term::linear(-coefficient, dual));
                continue;
            };
            let spec = solver.variable(var).ok_or_else(|| {
                ConfigError::invalid("outer_variable", format!("{var} is not known to the solver"))
            })?;
            if let Some(value) = spec.fixed_value() {
                dual_objective.add_term(Term::linear(-coefficient * value, dual));
                continue;
            }
            if spec.kind != VarKind::Binary {
                return Err(ConfigError::invalid(
                    "outer_variable",
                    format!(
                        "{var} is {:?}; quantize it before using the primal-dual rewrite",
                        spec.kind
                    ),
                )
                .into());
            }
            let product = match products.get(&(dual, var)) {
                Some(&p) => p,
                None => {
                    let x = Polynomial::from(dual);
                    let y = Polynomial::from(var);
                    let p = if non_negative {
                        linearize::nonneg_times_binary(solver, &x, &y, problem.big_m, false)?
                    } else {
                        linearize::signed_times_binary(solver, &x, &y, problem.big_m, false)?
                    };
                    products.insert((dual, var), p);
                    p
                }
            };
            dual_objective.add_term(Term::linear(-coefficient, product));
        }
    }

    if verbose {
        debug!(
            products = products.len(),
            dual_terms = dual_objective.terms().len(),
            "Asserting strong duality"
        );
    }

    let mut gap = primal;
    gap.add(&dual_objective.negate());
    solver.add_eq_zero(gap)?;
    Ok(())
}
