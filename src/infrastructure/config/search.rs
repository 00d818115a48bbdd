//! Gap search configuration.

use std::path::PathBuf;

use serde::Deserialize;

use crate::application::gap::{SearchConfig, SearchMethod};
use crate::application::rewrite::RewriteStrategy;
use crate::domain::demand::DemandMatrix;
use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub method: SearchMethod,

    /// Inner-optimality rewrite used by the exact method.
    #[serde(default)]
    pub rewrite: RewriteStrategy,

    #[serde(default = "default_trials")]
    pub trials: usize,

    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    #[serde(default = "default_std_dev")]
    pub std_dev: f64,

    #[serde(default = "default_initial_temperature")]
    pub initial_temperature: f64,

    #[serde(default = "default_cooling_factor")]
    pub cooling_factor: f64,

    #[serde(default = "default_temperature_steps")]
    pub temperature_steps: usize,

    /// Wall-clock budget for the whole search in seconds.
    #[serde(default)]
    pub time_budget_secs: Option<f64>,

    #[serde(default)]
    pub seed: u64,

    /// Accept incumbents of time-limited solves.
    #[serde(default)]
    pub tolerate_time_limit: bool,

    /// Append-only per-trial log.
    #[serde(default)]
    pub progress_log: Option<PathBuf>,

    /// Where the best demand vector is written.
    #[serde(default)]
    pub demands_output: Option<PathBuf>,

    /// Starting demand vector (JSON) for the first trial.
    #[serde(default)]
    pub initial_demands: Option<PathBuf>,
}

fn default_trials() -> usize {
    10
}

fn default_neighbors() -> usize {
    5
}

fn default_std_dev() -> f64 {
    1.0
}

fn default_initial_temperature() -> f64 {
    1.0
}

fn default_cooling_factor() -> f64 {
    0.9
}

fn default_temperature_steps() -> usize {
    10
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            method: SearchMethod::default(),
            rewrite: RewriteStrategy::default(),
            trials: default_trials(),
            neighbors: default_neighbors(),
            std_dev: default_std_dev(),
            initial_temperature: default_initial_temperature(),
            cooling_factor: default_cooling_factor(),
            temperature_steps: default_temperature_steps(),
            time_budget_secs: None,
            seed: 0,
            tolerate_time_limit: false,
            progress_log: None,
            demands_output: None,
            initial_demands: None,
        }
    }
}

impl SearchSettings {
    /// Metaheuristic parameters.
    ///
    /// # Errors
    ///
    /// Rejects a time budget that is negative, not finite, or out of range.
    pub fn search_config(&self, initial_demands: Option<DemandMatrix>) -> Result<SearchConfig> {
        Ok(SearchConfig {
            trials: self.trials,
            time_budget: super::seconds("time_budget_secs", self.time_budget_secs)?,
            neighbors: self.neighbors,
            std_dev: self.std_dev,
            initial_temperature: self.initial_temperature,
            cooling_factor: self.cooling_factor,
            temperature_steps: self.temperature_steps,
            seed: self.seed,
            initial_demands,
        })
    }
}
