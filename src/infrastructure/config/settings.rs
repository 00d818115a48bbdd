//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings of a
//! gap search run.
//!
//! # Example
//!
//! ```no_run
//! use netgap::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("netgap.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::path::Path;

use serde::Deserialize;

use super::encoder::{EncoderConfig, HeuristicKind};
use super::logging::LoggingConfig;
use super::search::SearchSettings;
use super::solver::SolverConfig;
use super::topology::TopologyConfig;
use crate::application::gap::SearchMethod;
use crate::application::rewrite::RewriteStrategy;
use crate::error::{ConfigError, Result};

/// Main application configuration.
///
/// Load from a TOML file using [`Config::load`] or parse directly with
/// [`Config::parse_toml`].
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Solver backend and big-M constants.
    #[serde(default)]
    pub solver: SolverConfig,

    /// Heuristic selection and demand space.
    #[serde(default)]
    pub encoder: EncoderConfig,

    /// Search method and its parameters.
    #[serde(default)]
    pub search: SearchSettings,

    /// Network under study.
    #[serde(default)]
    pub topology: TopologyConfig,
}

impl Config {
    /// Parse configuration from TOML content.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML content is malformed or validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The file cannot be read
    /// - The TOML content is malformed
    /// - Validation fails
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    /// Initialize logging based on configuration.
    pub fn init_logging(&self) {
        self.logging.init();
    }

    /// Per-pair demand upper bound.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingField`] when it is not configured.
    pub fn demand_upper_bound(&self) -> Result<f64> {
        self.encoder.demand_upper_bound.ok_or_else(|| {
            ConfigError::MissingField {
                field: "encoder.demand_upper_bound",
            }
            .into()
        })
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        self.logging.filter()?;
        self.topology.build()?;

        let upper = self.demand_upper_bound()?;
        if !upper.is_finite() || upper < 0.0 {
            return Err(invalid("demand_upper_bound", "must be a non-negative number"));
        }
        if self.encoder.paths_per_pair == 0 {
            return Err(invalid("paths_per_pair", "must be greater than 0"));
        }
        match self.encoder.heuristic {
            HeuristicKind::DemandPinning => {
                if !self.encoder.threshold.is_finite() || self.encoder.threshold < 0.0 {
                    return Err(invalid("threshold", "must be 0 or greater"));
                }
                let pin_big_m = self.encoder.pin_big_m(upper);
                if !(pin_big_m.is_finite() && pin_big_m > upper.max(self.encoder.threshold)) {
                    return Err(invalid("pin_big_m", "must exceed the demand upper bound"));
                }
            }
            HeuristicKind::Pop => {
                if self.encoder.partitions == 0 {
                    return Err(invalid("partitions", "must be greater than 0"));
                }
            }
        }

        if self.search.method == SearchMethod::Exact
            && self.search.rewrite == RewriteStrategy::PrimalDual
            && self.encoder.quantization_levels.is_empty()
        {
            return Err(ConfigError::MissingField {
                field: "encoder.quantization_levels",
            }
            .into());
        }
        if self.encoder.quantization_levels.iter().any(|l| !l.is_finite() || *l <= 0.0) {
            return Err(invalid("quantization_levels", "levels must be greater than 0"));
        }

        self.solver.time_limit()?;
        for (field, value) in [
            ("disjunction_big_m", self.solver.disjunction_big_m),
            ("dual_big_m", self.solver.dual_big_m),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(invalid(field, "must be a finite number greater than 0"));
            }
        }

        self.search.search_config(None)?.validate()
    }
}

fn invalid(field: &'static str, reason: &str) -> crate::error::Error {
    ConfigError::InvalidValue {
        field,
        reason: reason.to_string(),
    }
    .into()
}
