//! Complementary slackness for the KKT rewrite.

use crate::domain::polynomial::Polynomial;
use crate::error::Result;
use crate::port::solver::Solver;

use super::Duals;

/// `λ_i = 0 ∨ -g_i = 0` for every recorded `g_i <= 0`.
///
/// Both sides are non-negative on the feasible region (dual feasibility and
/// primal feasibility), so any disjunction encoding applies.
pub(super) fn complementary_slackness(
    solver: &mut dyn Solver,
    inequalities: &[Polynomial],
    duals: &Duals,
) -> Result<()> {
    for (g, &lambda) in inequalities.iter().zip(&duals.leq) {
        solver.add_disjunction(Polynomial::from(lambda), g.negate())?;
    }
    Ok(())
}
