//! Metaheuristic gap search.
//!
//! All three methods share one loop: propose a demand vector, evaluate
//! both policies on it, accept or reject, report the trial, check the
//! budget. A failed evaluation is logged and skipped.

use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{GapEngine, GaussianNeighbor};
use crate::domain::demand::DemandMatrix;
use crate::error::{ConfigError, Result};
use crate::port::solver::Solver;

/// Gap search method.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Single bilevel solve.
    Exact,
    #[default]
    Random,
    HillClimbing,
    SimulatedAnnealing,
}

impl SearchMethod {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Random => "random",
            Self::HillClimbing => "hill_climbing",
            Self::SimulatedAnnealing => "simulated_annealing",
        }
    }
}

/// Parameters shared by the metaheuristics.
#[derive(Debug, Clone)]
pub struct SearchConfig {
    /// Independent samples (random search) or restarts (hill climbing,
    /// simulated annealing).
    pub trials: usize,
    /// Wall-clock budget for the whole search.
    pub time_budget: Option<Duration>,
    /// Neighbors drawn per step.
    pub neighbors: usize,
    pub std_dev: f64,
    pub initial_temperature: f64,
    /// Multiplicative temperature decay per step.
    pub cooling_factor: f64,
    pub temperature_steps: usize,
    pub seed: u64,
    /// Starting point of the first restart; random when absent.
    pub initial_demands: Option<DemandMatrix>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            trials: 10,
            time_budget: None,
            neighbors: 5,
            std_dev: 1.0,
            initial_temperature: 1.0,
            cooling_factor: 0.9,
            temperature_steps: 10,
            seed: 0,
            initial_demands: None,
        }
    }
}

impl SearchConfig {
    /// # Errors
    ///
    /// Returns the first out-of-range parameter.
    pub fn validate(&self) -> Result<()> {
        if self.trials == 0 {
            return Err(ConfigError::invalid("trials", "must be at least 1").into());
        }
        if self.neighbors == 0 {
            return Err(ConfigError::invalid("neighbors", "must be at least 1").into());
        }
        if !self.std_dev.is_finite() || self.std_dev < 0.0 {
            return Err(ConfigError::invalid("std_dev", format!("{}", self.std_dev)).into());
        }
        if !self.initial_temperature.is_finite() || self.initial_temperature <= 0.0 {
            return Err(ConfigError::invalid(
                "initial_temperature",
                format!("must be positive, got {}", self.initial_temperature),
            )
            .into());
        }
        if !(self.cooling_factor > 0.0 && self.cooling_factor <= 1.0) {
            return Err(ConfigError::invalid(
                "cooling_factor",
                format!("must be in (0, 1], got {}", self.cooling_factor),
            )
            .into());
        }
        Ok(())
    }
}

/// One finished trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub trial: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub trial_gap: f64,
    pub best_gap: f64,
}

fn serialize_secs<S: serde::Serializer>(
    elapsed: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Receives every finished trial.
pub trait ProgressSink {
    /// # Errors
    ///
    /// Sink failures abort the search.
    fn record(&mut self, method: SearchMethod, record: &TrialRecord) -> Result<()>;
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn record(&mut self, _: SearchMethod, _: &TrialRecord) -> Result<()> {
        Ok(())
    }
}

/// A demand vector with its evaluated gap.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub gap: f64,
    pub demands: DemandMatrix,
}

/// Result of a metaheuristic search.
#[derive(Debug, Clone, Serialize)]
pub struct SearchOutcome {
    #[serde(serialize_with = "serialize_method")]
    pub method: SearchMethod,
    /// Best candidate; `None` when every evaluation failed.
    pub best: Option<Candidate>,
    pub evaluations: usize,
    pub failures: usize,
    /// Per-trial records; `best_gap` never decreases.
    pub history: Vec<TrialRecord>,
}

fn serialize_method<S: serde::Serializer>(
    method: &SearchMethod,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(method.name())
}

impl SearchOutcome {
    #[must_use]
    pub fn best_gap(&self) -> Option<f64> {
        self.best.as_ref().map(|c| c.gap)
    }
}

/// State of one running search.
struct Run<'a> {
    engine: &'a mut GapEngine,
    solver: &'a mut dyn Solver,
    sink: &'a mut dyn ProgressSink,
    method: SearchMethod,
    deadline: Option<Instant>,
    started: Instant,
    rng: StdRng,
    best: Option<Candidate>,
    evaluations: usize,
    failures: usize,
    history: Vec<TrialRecord>,
}

impl<'a> Run<'a> {
    fn new(
        engine: &'a mut GapEngine,
        solver: &'a mut dyn Solver,
        sink: &'a mut dyn ProgressSink,
        method: SearchMethod,
        config: &SearchConfig,
    ) -> Self {
        let started = Instant::now();
        Self {
            engine,
            solver,
            sink,
            method,
            deadline: config.time_budget.map(|b| started + b),
            started,
            rng: StdRng::seed_from_u64(config.seed),
            best: None,
            evaluations: 0,
            failures: 0,
            history: Vec::new(),
        }
    }

    fn expired(&self) -> bool {
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    fn random_demands(&mut self) -> DemandMatrix {
        let pairs = self.engine.pairs();
        let upper = self.engine.demand_upper_bound();
        DemandMatrix::random(&pairs, upper, &mut self.rng)
    }

    /// Gap of `demands`, or `None` when the evaluation failed.
    fn evaluate(&mut self, demands: &DemandMatrix) -> Option<f64> {
        self.evaluations += 1;
        match self.engine.evaluate(&mut *self.solver, demands) {
            Ok(result) => {
                let improved = self.best.as_ref().map_or(true, |b| result.gap > b.gap);
                if improved {
                    info!(
                        method = self.method.name(),
                        evaluation = self.evaluations,
                        gap = %result.gap,
                        total_demand = %demands.total(),
                        "New best gap"
                    );
                    self.best = Some(Candidate {
                        gap: result.gap,
                        demands: demands.clone(),
                    });
                }
                Some(result.gap)
            }
            Err(err) => {
                self.failures += 1;
                warn!(
                    method = self.method.name(),
                    evaluation = self.evaluations,
                    error = %err,
                    "Skipping candidate"
                );
                None
            }
        }
    }

    fn finish_trial(&mut self, trial: usize, trial_gap: f64) -> Result<()> {
        let Some(best_gap) = self.best.as_ref().map(|b| b.gap) else {
            return Ok(());
        };
        let record = TrialRecord {
            trial,
            elapsed: self.started.elapsed(),
            trial_gap,
            best_gap,
        };
        debug!(
            method = self.method.name(),
            trial,
            trial_gap = %trial_gap,
            best_gap = %best_gap,
            "Trial finished"
        );
        self.sink.record(self.method, &record)?;
        self.history.push(record);
        Ok(())
    }

    fn outcome(self) -> SearchOutcome {
        info!(
            method = self.method.name(),
            evaluations = self.evaluations,
            failures = self.failures,
            best_gap = ?self.best.as_ref().map(|b| b.gap),
            "Search finished"
        );
        SearchOutcome {
            method: self.method,
            best: self.best,
            evaluations: self.evaluations,
            failures: self.failures,
            history: self.history,
        }
    }
}

impl GapEngine {
    /// Dispatch to the metaheuristic named by `method`.
    ///
    /// # Errors
    ///
    /// [`SearchMethod::Exact`] is not a metaheuristic and is rejected; use
    /// [`GapEngine::exact`].
    pub fn search(
        &mut self,
        method: SearchMethod,
        solver: &mut dyn Solver,
        config: &SearchConfig,
        sink: &mut dyn ProgressSink,
    ) -> Result<SearchOutcome> {
        match method {
            SearchMethod::Random => self.random_search(solver, config, sink),
            SearchMethod::HillClimbing => self.hill_climb(solver, config, sink),
            SearchMethod::SimulatedAnnealing => self.simulated_annealing(solver, config, sink),
            SearchMethod::Exact => {
                Err(ConfigError::invalid("method", "exact is not a metaheuristic").into())
            }
        }
    }

    /// Evaluate independent uniform samples.
    ///
    /// # Errors
    ///
    /// Invalid configuration or a failing progress sink.
    pub fn random_search(
        &mut self,
        solver: &mut dyn Solver,
        config: &SearchConfig,
        sink: &mut dyn ProgressSink,
    ) -> Result<SearchOutcome> {
        config.validate()?;
        let mut run = Run::new(self, solver, sink, SearchMethod::Random, config);
        for trial in 0..config.trials {
            if run.expired() {
                break;
            }
            let demands = match (trial, &config.initial_demands) {
                (0, Some(initial)) => initial.clone(),
                _ => run.random_demands(),
            };
            if let Some(gap) = run.evaluate(&demands) {
                run.finish_trial(trial, gap)?;
            }
        }
        Ok(run.outcome())
    }

    /// Steepest ascent with random restarts.
    ///
    /// Each step draws `neighbors` Gaussian neighbors and moves to the best
    /// one if it improves; a step without improvement ends the restart.
    ///
    /// # Errors
    ///
    /// Invalid configuration or a failing progress sink.
    pub fn hill_climb(
        &mut self,
        solver: &mut dyn Solver,
        config: &SearchConfig,
        sink: &mut dyn ProgressSink,
    ) -> Result<SearchOutcome> {
        config.validate()?;
        let neighbor = GaussianNeighbor::new(config.std_dev, self.demand_upper_bound())?;
        let mut run = Run::new(self, solver, sink, SearchMethod::HillClimbing, config);

        'trials: for trial in 0..config.trials {
            if run.expired() {
                break;
            }
            let mut current = match (trial, &config.initial_demands) {
                (0, Some(initial)) => initial.clone(),
                _ => run.random_demands(),
            };
            let Some(mut current_gap) = run.evaluate(&current) else {
                continue;
            };

            loop {
                let mut step_best: Option<(f64, DemandMatrix)> = None;
                for _ in 0..config.neighbors {
                    if run.expired() {
                        run.finish_trial(trial, current_gap)?;
                        break 'trials;
                    }
                    let candidate = neighbor.propose(&current, &mut run.rng);
                    if let Some(gap) = run.evaluate(&candidate) {
                        if step_best.as_ref().map_or(true, |(g, _)| gap > *g) {
                            step_best = Some((gap, candidate));
                        }
                    }
                }
                match step_best {
                    Some((gap, candidate)) if gap > current_gap => {
                        current = candidate;
                        current_gap = gap;
                    }
                    _ => break,
                }
            }
            run.finish_trial(trial, current_gap)?;
        }
        Ok(run.outcome())
    }

    /// Annealing with random restarts.
    ///
    /// A neighbor that loses `Δ` is accepted with probability `exp(Δ / T)`;
    /// `T` is multiplied by the cooling factor after every step.
    ///
    /// # Errors
    ///
    /// Invalid configuration or a failing progress sink.
    pub fn simulated_annealing(
        &mut self,
        solver: &mut dyn Solver,
        config: &SearchConfig,
        sink: &mut dyn ProgressSink,
    ) -> Result<SearchOutcome> {
        config.validate()?;
        let neighbor = GaussianNeighbor::new(config.std_dev, self.demand_upper_bound())?;
        let mut run = Run::new(self, solver, sink, SearchMethod::SimulatedAnnealing, config);

        'trials: for trial in 0..config.trials {
            if run.expired() {
                break;
            }
            let mut current = match (trial, &config.initial_demands) {
                (0, Some(initial)) => initial.clone(),
                _ => run.random_demands(),
            };
            let Some(mut current_gap) = run.evaluate(&current) else {
                continue;
            };
            let mut trial_best = current_gap;
            let mut temperature = config.initial_temperature;

            for _ in 0..config.temperature_steps {
                for _ in 0..config.neighbors {
                    if run.expired() {
                        run.finish_trial(trial, trial_best)?;
                        break 'trials;
                    }
                    let candidate = neighbor.propose(&current, &mut run.rng);
                    let Some(gap) = run.evaluate(&candidate) else {
                        continue;
                    };
                    let delta = gap - current_gap;
                    if delta > 0.0 || run.rng.gen::<f64>() < (delta / temperature).exp() {
                        current = candidate;
                        current_gap = gap;
                        trial_best = trial_best.max(gap);
                    }
                }
                temperature *= config.cooling_factor;
            }
            run.finish_trial(trial, trial_best)?;
        }
        Ok(run.outcome())
    }
}
