use netgap::adapter::solver::{HiGHSSolver, NonNegativeSplit};
use netgap::application::linearize::{max_of, min_of, nonneg_times_binary, signed_times_binary};
use netgap::domain::{Polynomial, Term, VarKind};
use netgap::port::Solver;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const M: f64 = 100.0;

#[test]
fn products_track_every_binary_and_sampled_operand() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..10 {
        let x_value: f64 = rng.gen_range(0.0..50.0);
        for y_value in [0.0, 1.0] {
            let mut solver = HiGHSSolver::new();
            let x = solver.create_variable(VarKind::Continuous, Some(x_value), Some(x_value));
            let y = solver.create_variable(VarKind::Binary, Some(y_value), Some(y_value));
            let out = nonneg_times_binary(&mut solver, &x.into(), &y.into(), M, false).unwrap();
            let signed = signed_times_binary(
                &mut solver,
                &Polynomial::from(Term::linear(-1.0, x)),
                &y.into(),
                M,
                true,
            )
            .unwrap();

            let expectations = [(out, x_value * y_value), (signed, -x_value * (1.0 - y_value))];
            for (var, expected) in expectations {
                solver.set_objective(var.into()).unwrap();
                let hi = solver.maximize().unwrap().objective();
                solver.set_objective(Polynomial::from(var).negate()).unwrap();
                let lo = -solver.maximize().unwrap().objective();
                assert!((hi - expected).abs() < 1e-4 && (lo - expected).abs() < 1e-4);
            }
        }
    }
}

#[test]
fn solver_picks_the_larger_operand_through_max() {
    // maximize min(x, 6 - x) + max(x, 2) - x over x in [0, 6]
    // = min(x, 6 - x) + max(0, 2 - x): best at x = 3 with value 3.
    let mut solver = HiGHSSolver::new();
    let x = solver.create_variable(VarKind::Continuous, Some(0.0), Some(6.0));
    let x_p = Polynomial::from(x);
    let mirrored = x_p.negate().with(Term::constant(6.0));
    let low = min_of(&mut solver, &x_p, &mirrored, M).unwrap();
    let high = max_of(&mut solver, &x_p, &Polynomial::from(Term::constant(2.0)), M).unwrap();

    let objective = Polynomial::from_terms([
        Term::linear(1.0, low),
        Term::linear(1.0, high),
        Term::linear(-1.0, x),
    ]);
    solver.set_objective(objective).unwrap();
    let solution = solver.maximize().unwrap();
    assert!((solution.objective() - 3.0).abs() < 1e-4, "got {}", solution.objective());
}

#[test]
fn disjunction_strategies_agree() {
    for nonneg in [false, true] {
        let mut solver = if nonneg {
            HiGHSSolver::with_disjunction(Box::new(NonNegativeSplit::new(M)))
        } else {
            HiGHSSolver::new()
        };
        let a = solver.create_variable(VarKind::Continuous, Some(0.0), Some(5.0));
        let b = solver.create_variable(VarKind::Continuous, Some(0.0), Some(3.0));
        solver.add_disjunction(a.into(), b.into()).unwrap();
        solver.set_objective(Polynomial::sum_of([a, b])).unwrap();
        let value = solver.maximize().unwrap().objective();
        assert!((value - 5.0).abs() < 1e-6, "nonneg={nonneg}: got {value}");
    }
}
