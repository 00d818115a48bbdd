//! Gap engine properties across search methods.

use netgap::adapter::solver::HiGHSSolver;
use netgap::application::encoder::{DemandPinningEncoder, MaxFlowEncoder};
use netgap::application::gap::{ExactConfig, GapEngine, NoProgress, SearchMethod};
use netgap::application::rewrite::RewriteStrategy;
use netgap::domain::PathPolicy;
use netgap::infrastructure::persist::ProgressLog;
use netgap::testkit::config::quick_search;
use netgap::testkit::diamond;

fn pinning_engine() -> GapEngine {
    let topology = diamond();
    let paths = topology.compute_paths(PathPolicy::KShortest, 2);
    let optimal = MaxFlowEncoder::new(topology.clone(), paths.clone());
    let heuristic = DemandPinningEncoder::new(topology, paths, 5.0, 100.0).unwrap();
    GapEngine::new(Box::new(optimal), Box::new(heuristic), 10.0).unwrap()
}

#[test]
fn best_gap_history_is_monotone_for_local_search() {
    for method in [SearchMethod::HillClimbing, SearchMethod::SimulatedAnnealing] {
        let mut engine = pinning_engine();
        let mut solver = HiGHSSolver::new();
        let outcome = engine
            .search(method, &mut solver, &quick_search(21), &mut NoProgress)
            .unwrap();
        assert!(!outcome.history.is_empty(), "{}", method.name());
        for window in outcome.history.windows(2) {
            assert!(window[1].best_gap >= window[0].best_gap, "{}", method.name());
        }
    }
}

#[test]
fn exact_gap_dominates_every_metaheuristic() {
    let mut engine = pinning_engine();
    let mut solver = HiGHSSolver::new();
    let exact = engine.exact(&mut solver, &ExactConfig::default()).unwrap();

    for method in [
        SearchMethod::Random,
        SearchMethod::HillClimbing,
        SearchMethod::SimulatedAnnealing,
    ] {
        let outcome = engine
            .search(method, &mut solver, &quick_search(3), &mut NoProgress)
            .unwrap();
        let best = outcome.best_gap().unwrap();
        assert!(exact.gap + 1e-4 >= best, "{}: exact {} < {best}", method.name(), exact.gap);
    }
}

#[test]
fn quantized_primal_dual_stays_within_continuous_kkt() {
    let mut engine = pinning_engine();
    let mut solver = HiGHSSolver::new();
    let kkt = engine.exact(&mut solver, &ExactConfig::default()).unwrap();
    let pd = engine
        .exact(
            &mut solver,
            &ExactConfig {
                rewrite: RewriteStrategy::PrimalDual,
                quantization: vec![5.0, 10.0],
                ..ExactConfig::default()
            },
        )
        .unwrap();

    // The grid contains a->d = 5 with everything else at 10, worth 5.
    assert!(pd.gap >= 5.0 - 1e-4, "primal-dual gap {}", pd.gap);
    assert!(pd.gap <= kkt.gap + 1e-4, "primal-dual {} > kkt {}", pd.gap, kkt.gap);
    for (_, demand) in pd.demands.iter() {
        assert!([0.0, 5.0, 10.0].iter().any(|l| (demand - l).abs() < 1e-4));
    }
}

#[test]
fn exact_method_is_not_a_metaheuristic() {
    let mut engine = pinning_engine();
    let mut solver = HiGHSSolver::new();
    assert!(engine
        .search(SearchMethod::Exact, &mut solver, &quick_search(0), &mut NoProgress)
        .is_err());
}

#[test]
fn progress_log_gets_one_line_per_trial() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("progress.log");
    let mut engine = pinning_engine();
    let mut solver = HiGHSSolver::new();
    let outcome = {
        let mut log = ProgressLog::open(&path).unwrap();
        engine
            .random_search(&mut solver, &quick_search(8), &mut log)
            .unwrap()
    };

    let content = std::fs::read_to_string(&path).unwrap();
    assert_eq!(content.lines().count(), outcome.history.len());
    assert!(content.lines().all(|l| l.ends_with("\trandom")));
}
