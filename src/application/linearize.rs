//! Big-M linearization primitives.
//!
//! Each function expresses a nonlinear relation between affine operands
//! with linear constraints over the [`Solver`] contract. The functions are
//! stateless and compose: the output of one can be the operand of another.
//!
//! Binary operands are affine expressions that take values in {0, 1}
//! (a binary variable, `1 - b`, a sum of mutually exclusive binaries, ...).
//!
//! # Big-M
//!
//! `big_m` must strictly dominate the magnitude of the continuous operand
//! over its feasible domain. An undersized value does not make the model
//! infeasible, it silently produces a wrong product. Only a negative or
//! non-finite `big_m` is rejected.

use crate::domain::polynomial::{Polynomial, Term};
use crate::domain::variable::{Var, VarKind};
use crate::error::{ConfigError, Result};
use crate::port::solver::Solver;

fn check_big_m(big_m: f64) -> Result<()> {
    if !big_m.is_finite() || big_m < 0.0 {
        return Err(ConfigError::invalid(
            "big_m",
            format!("must be a finite non-negative number, got {big_m}"),
        )
        .into());
    }
    Ok(())
}

/// `y`, or `1 - y` when `complement` is set.
fn selector(y: &Polynomial, complement: bool) -> Polynomial {
    if complement {
        y.negate().with(Term::constant(1.0))
    } else {
        y.clone()
    }
}

/// `lhs - rhs <= 0`
fn leq(solver: &mut dyn Solver, lhs: &Polynomial, rhs: &Polynomial) -> Result<()> {
    let mut p = lhs.clone();
    p.add(&rhs.negate());
    solver.add_leq_zero(p)?;
    Ok(())
}

/// `out = x * y` (or `x * (1 - y)`) for `0 <= x < big_m` and binary `y`.
///
/// ```text
/// 0 <= out <= x
/// out <= M * y
/// out >= x - M * (1 - y)
/// ```
pub fn nonneg_times_binary_into(
    solver: &mut dyn Solver,
    out: Var,
    x: &Polynomial,
    y: &Polynomial,
    big_m: f64,
    complement: bool,
) -> Result<()> {
    check_big_m(big_m)?;
    let y = selector(y, complement);
    let out_p = Polynomial::from(out);

    solver.add_leq_zero(out_p.negate())?;
    leq(solver, &out_p, x)?;
    leq(solver, &out_p, &y.scaled(big_m))?;
    // x - M (1 - y) <= out
    let mut lower = x.clone();
    lower
        .add(&y.scaled(big_m))
        .add_term(Term::constant(-big_m));
    leq(solver, &lower, &out_p)
}

/// Create `out` and constrain it to `x * y` (see [`nonneg_times_binary_into`]).
pub fn nonneg_times_binary(
    solver: &mut dyn Solver,
    x: &Polynomial,
    y: &Polynomial,
    big_m: f64,
    complement: bool,
) -> Result<Var> {
    check_big_m(big_m)?;
    let out = solver.create_variable(VarKind::Continuous, Some(0.0), None);
    nonneg_times_binary_into(solver, out, x, y, big_m, complement)?;
    Ok(out)
}

/// `out = x * y` (or `x * (1 - y)`) for `|x| < big_m` and binary `y`.
///
/// ```text
/// x - M * (1 - y) <= out <= x + M * (1 - y)
/// -M * y          <= out <= M * y
/// ```
pub fn signed_times_binary_into(
    solver: &mut dyn Solver,
    out: Var,
    x: &Polynomial,
    y: &Polynomial,
    big_m: f64,
    complement: bool,
) -> Result<()> {
    check_big_m(big_m)?;
    let y = selector(y, complement);
    let out_p = Polynomial::from(out);
    let slack = y.scaled(big_m).with(Term::constant(-big_m)); // -M (1 - y)

    let mut low = x.clone();
    low.add(&slack);
    leq(solver, &low, &out_p)?;
    let mut high = x.clone();
    high.add(&slack.negate());
    leq(solver, &out_p, &high)?;
    leq(solver, &out_p, &y.scaled(big_m))?;
    leq(solver, &y.scaled(-big_m), &out_p)
}

/// Create `out` and constrain it to `x * y` (see [`signed_times_binary_into`]).
pub fn signed_times_binary(
    solver: &mut dyn Solver,
    x: &Polynomial,
    y: &Polynomial,
    big_m: f64,
    complement: bool,
) -> Result<Var> {
    check_big_m(big_m)?;
    let out = solver.create_variable(VarKind::Continuous, None, None);
    signed_times_binary_into(solver, out, x, y, big_m, complement)?;
    Ok(out)
}

/// `out = x * y` (or `x * (1 - y)`) for binary `x` and `y`.
///
/// ```text
/// out <= y
/// out <= x
/// out >= x + y - 1
/// ```
pub fn binary_times_binary_into(
    solver: &mut dyn Solver,
    out: Var,
    x: &Polynomial,
    y: &Polynomial,
    complement: bool,
) -> Result<()> {
    let y = selector(y, complement);
    let out_p = Polynomial::from(out);

    leq(solver, &out_p, &y)?;
    leq(solver, &out_p, x)?;
    let mut both = x.clone();
    both.add(&y).add_term(Term::constant(-1.0));
    leq(solver, &both, &out_p)
}

/// Create a binary `out` constrained to `x * y` (see [`binary_times_binary_into`]).
pub fn binary_times_binary(
    solver: &mut dyn Solver,
    x: &Polynomial,
    y: &Polynomial,
    complement: bool,
) -> Result<Var> {
    let out = solver.create_variable(VarKind::Binary, Some(0.0), Some(1.0));
    binary_times_binary_into(solver, out, x, y, complement)?;
    Ok(out)
}

/// `out = max(x, y)` using one auxiliary binary `b`.
///
/// ```text
/// out >= x,  out >= y
/// out <= x + M * b
/// out <= y + M * (1 - b)
/// ```
pub fn max_of_into(
    solver: &mut dyn Solver,
    out: Var,
    x: &Polynomial,
    y: &Polynomial,
    big_m: f64,
) -> Result<()> {
    check_big_m(big_m)?;
    let b = solver.create_variable(VarKind::Binary, Some(0.0), Some(1.0));
    let out_p = Polynomial::from(out);

    leq(solver, x, &out_p)?;
    leq(solver, y, &out_p)?;
    leq(solver, &out_p, &x.clone().with(Term::linear(big_m, b)))?;
    let y_side = y
        .clone()
        .with(Term::constant(big_m))
        .with(Term::linear(-big_m, b));
    leq(solver, &out_p, &y_side)
}

/// Create `out` constrained to `max(x, y)`.
pub fn max_of(solver: &mut dyn Solver, x: &Polynomial, y: &Polynomial, big_m: f64) -> Result<Var> {
    check_big_m(big_m)?;
    let out = solver.create_variable(VarKind::Continuous, None, None);
    max_of_into(solver, out, x, y, big_m)?;
    Ok(out)
}

/// `out = min(x, y)` using one auxiliary binary `b`.
///
/// ```text
/// out <= x,  out <= y
/// out >= x - M * b
/// out >= y - M * (1 - b)
/// ```
pub fn min_of_into(
    solver: &mut dyn Solver,
    out: Var,
    x: &Polynomial,
    y: &Polynomial,
    big_m: f64,
) -> Result<()> {
    check_big_m(big_m)?;
    let b = solver.create_variable(VarKind::Binary, Some(0.0), Some(1.0));
    let out_p = Polynomial::from(out);

    leq(solver, &out_p, x)?;
    leq(solver, &out_p, y)?;
    leq(solver, &x.clone().with(Term::linear(-big_m, b)), &out_p)?;
    let y_side = y
        .clone()
        .with(Term::constant(-big_m))
        .with(Term::linear(big_m, b));
    leq(solver, &y_side, &out_p)
}

/// Create `out` constrained to `min(x, y)`.
pub fn min_of(solver: &mut dyn Solver, x: &Polynomial, y: &Polynomial, big_m: f64) -> Result<Var> {
    check_big_m(big_m)?;
    let out = solver.create_variable(VarKind::Continuous, None, None);
    min_of_into(solver, out, x, y, big_m)?;
    Ok(out)
}

/// `out = a OR b` for {0, 1}-valued `a` and `b`.
///
/// ```text
/// out >= a,  out >= b
/// out <= a + b
/// ```
pub fn or_of_into(solver: &mut dyn Solver, out: Var, a: &Polynomial, b: &Polynomial) -> Result<()> {
    let out_p = Polynomial::from(out);
    leq(solver, a, &out_p)?;
    leq(solver, b, &out_p)?;
    let mut sum = a.clone();
    sum.add(b);
    leq(solver, &out_p, &sum)
}

/// Create `out` in `[0, 1]` constrained to `a OR b`.
pub fn or_of(solver: &mut dyn Solver, a: &Polynomial, b: &Polynomial) -> Result<Var> {
    let out = solver.create_variable(VarKind::Continuous, Some(0.0), Some(1.0));
    or_of_into(solver, out, a, b)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::solver::HiGHSSolver;
    use crate::error::Error;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    const M: f64 = 1_000.0;

    fn fixed(solver: &mut dyn Solver, value: f64) -> Var {
        solver.create_variable(VarKind::Continuous, Some(value), Some(value))
    }

    fn fixed_binary(solver: &mut dyn Solver, value: f64) -> Var {
        solver.create_variable(VarKind::Binary, Some(value), Some(value))
    }

    /// Both the largest and smallest feasible value of `out`.
    fn range_of(solver: &mut HiGHSSolver, out: Var) -> (f64, f64) {
        solver.set_objective(Polynomial::from(out)).unwrap();
        let hi = solver.maximize().unwrap().objective();
        solver.set_objective(Polynomial::from(out).negate()).unwrap();
        let lo = -solver.maximize().unwrap().objective();
        (lo, hi)
    }

    fn assert_pinned(solver: &mut HiGHSSolver, out: Var, expected: f64) {
        let (lo, hi) = range_of(solver, out);
        assert!((lo - expected).abs() < 1e-4, "min {lo} != {expected}");
        assert!((hi - expected).abs() < 1e-4, "max {hi} != {expected}");
    }

    #[test]
    fn nonneg_times_binary_selects_x_or_zero() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..5 {
            let xv = rng.gen_range(0.0..M);
            for y in [0.0, 1.0] {
                for complement in [false, true] {
                    let mut solver = HiGHSSolver::new();
                    let x = fixed(&mut solver, xv);
                    let b = fixed_binary(&mut solver, y);
                    let out = nonneg_times_binary(
                        &mut solver,
                        &Polynomial::from(x),
                        &Polynomial::from(b),
                        M,
                        complement,
                    )
                    .unwrap();
                    let selected = if complement { 1.0 - y } else { y };
                    assert_pinned(&mut solver, out, xv * selected);
                }
            }
        }
    }

    #[test]
    fn signed_times_binary_handles_negative_x() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..5 {
            let xv = rng.gen_range(-M..M);
            for y in [0.0, 1.0] {
                let mut solver = HiGHSSolver::new();
                let x = fixed(&mut solver, xv);
                let b = fixed_binary(&mut solver, y);
                let out = signed_times_binary(
                    &mut solver,
                    &Polynomial::from(x),
                    &Polynomial::from(b),
                    M,
                    false,
                )
                .unwrap();
                assert_pinned(&mut solver, out, xv * y);
            }
        }
    }

    #[test]
    fn binary_times_binary_truth_table() {
        for (xv, yv) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            for complement in [false, true] {
                let mut solver = HiGHSSolver::new();
                let x = fixed_binary(&mut solver, xv);
                let y = fixed_binary(&mut solver, yv);
                let out = binary_times_binary(
                    &mut solver,
                    &Polynomial::from(x),
                    &Polynomial::from(y),
                    complement,
                )
                .unwrap();
                let expected = if complement { xv * (1.0 - yv) } else { xv * yv };
                assert_pinned(&mut solver, out, expected);
            }
        }
    }

    #[test]
    fn max_and_min_match_exactly() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..5 {
            let a = rng.gen_range(-100.0..100.0);
            let b = rng.gen_range(-100.0..100.0);

            let mut solver = HiGHSSolver::new();
            let x = fixed(&mut solver, a);
            let y = fixed(&mut solver, b);
            // affine operands: 2x + 1 and y - 3
            let px = Polynomial::from_terms([Term::linear(2.0, x), Term::constant(1.0)]);
            let py = Polynomial::from_terms([Term::linear(1.0, y), Term::constant(-3.0)]);
            let hi = max_of(&mut solver, &px, &py, M).unwrap();
            assert_pinned(&mut solver, hi, (2.0 * a + 1.0).max(b - 3.0));

            let mut solver = HiGHSSolver::new();
            let x = fixed(&mut solver, a);
            let y = fixed(&mut solver, b);
            let px = Polynomial::from_terms([Term::linear(2.0, x), Term::constant(1.0)]);
            let py = Polynomial::from_terms([Term::linear(1.0, y), Term::constant(-3.0)]);
            let lo = min_of(&mut solver, &px, &py, M).unwrap();
            assert_pinned(&mut solver, lo, (2.0 * a + 1.0).min(b - 3.0));
        }
    }

    #[test]
    fn or_truth_table() {
        for (av, bv) in [(0.0, 0.0), (0.0, 1.0), (1.0, 0.0), (1.0, 1.0)] {
            let mut solver = HiGHSSolver::new();
            let a = fixed_binary(&mut solver, av);
            let b = fixed_binary(&mut solver, bv);
            let out = or_of(&mut solver, &Polynomial::from(a), &Polynomial::from(b)).unwrap();
            assert_pinned(&mut solver, out, f64::max(av, bv));
        }
    }

    #[test]
    fn primitives_compose() {
        // max(x, y) * b with x = 3, y = 7, b = 1
        let mut solver = HiGHSSolver::new();
        let x = fixed(&mut solver, 3.0);
        let y = fixed(&mut solver, 7.0);
        let b = fixed_binary(&mut solver, 1.0);
        let m = max_of(&mut solver, &Polynomial::from(x), &Polynomial::from(y), M).unwrap();
        let out =
            nonneg_times_binary(&mut solver, &Polynomial::from(m), &Polynomial::from(b), M, false)
                .unwrap();
        assert_pinned(&mut solver, out, 7.0);
    }

    #[test]
    fn negative_big_m_is_a_configuration_error() {
        let mut solver = HiGHSSolver::new();
        let x = solver.create_variable(VarKind::Continuous, Some(0.0), None);
        let y = solver.create_variable(VarKind::Binary, None, None);
        let err = nonneg_times_binary(
            &mut solver,
            &Polynomial::from(x),
            &Polynomial::from(y),
            -1.0,
            false,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Config(ConfigError::InvalidValue { field: "big_m", .. })
        ));
    }
}
