//! Solver backend configuration.

use std::time::Duration;

use serde::Deserialize;

use crate::adapter::solver::DEFAULT_DISJUNCTION_BIG_M;
use crate::application::rewrite::DEFAULT_DUAL_BIG_M;
use crate::error::Result;

/// Available solver backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverBackend {
    /// Open-source HiGHS via good_lp.
    #[default]
    Highs,
}

/// How `a = 0 ∨ b = 0` is linearized.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisjunctionKind {
    /// Four big-M rows; operands may take either sign.
    #[default]
    SignedBigM,
    /// Two big-M rows; operands must be non-negative.
    NonNegativeSplit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SolverConfig {
    #[serde(default)]
    pub backend: SolverBackend,

    /// Per-solve wall-clock limit in seconds.
    #[serde(default)]
    pub time_limit_secs: Option<f64>,

    #[serde(default)]
    pub disjunction: DisjunctionKind,

    /// Bound on disjunction operands.
    #[serde(default = "default_disjunction_big_m")]
    pub disjunction_big_m: f64,

    /// Bound on dual multipliers of the optimality rewrite.
    #[serde(default = "default_dual_big_m")]
    pub dual_big_m: f64,

    /// Backend output and per-constraint debug logging.
    #[serde(default)]
    pub verbose: bool,
}

fn default_disjunction_big_m() -> f64 {
    DEFAULT_DISJUNCTION_BIG_M
}

fn default_dual_big_m() -> f64 {
    DEFAULT_DUAL_BIG_M
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            backend: SolverBackend::default(),
            time_limit_secs: None,
            disjunction: DisjunctionKind::default(),
            disjunction_big_m: default_disjunction_big_m(),
            dual_big_m: default_dual_big_m(),
            verbose: false,
        }
    }
}

impl SolverConfig {
    /// Per-solve time limit.
    ///
    /// # Errors
    ///
    /// Rejects a limit that is negative, not finite, or out of range.
    pub fn time_limit(&self) -> Result<Option<Duration>> {
        super::seconds("time_limit_secs", self.time_limit_secs)
    }
}
