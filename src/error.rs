use thiserror::Error;

use crate::port::solver::{Solution, SolveStatus};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors reported by a solver backend.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The model has no feasible optimum.
    #[error("model is infeasible or unbounded")]
    InfeasibleOrUnbounded,

    /// The solver stopped without proving optimality.
    ///
    /// A time-limited run carries its incumbent, which callers may accept
    /// as a degraded solution.
    #[error("solver terminated with status {status}: {reason}")]
    NonOptimal {
        status: SolveStatus,
        reason: String,
        solution: Option<Box<Solution>>,
    },

    #[error("term of degree {exponent} cannot be passed to a linear solver")]
    NonLinear { exponent: u8 },

    #[error("unknown constraint: {0}")]
    UnknownConstraint(String),

    #[error("unknown variable: {0}")]
    UnknownVariable(String),

    #[error("solution belongs to model generation {solution}, solver is at {current}")]
    StaleSolution { solution: u64, current: u64 },

    #[error("invalid bounds [{lower:?}, {upper:?}]")]
    InvalidBounds {
        lower: Option<f64>,
        upper: Option<f64>,
    },
}

/// Misuse of a stateful protocol. These are programmer errors and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("optimality constraints were already added")]
    AlreadyFinalized,

    #[error("cannot add inner constraints after finalization")]
    ConstraintAfterFinalize,

    #[error("{encoder} already encoded into solver generation {generation}; reset first")]
    AlreadyEncoded {
        encoder: &'static str,
        generation: u64,
    },

    #[error("{encoder} has no encoding for the current solver generation")]
    NotEncoded { encoder: &'static str },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Solver(#[from] SolverError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Recover the incumbent of a solve that stopped at its time or gap limit.
    ///
    /// Returns the error unchanged for any other failure or when no
    /// incumbent was found.
    pub fn into_degraded_solution(self) -> std::result::Result<Solution, Error> {
        match self {
            Error::Solver(SolverError::NonOptimal {
                status: SolveStatus::TimeLimit | SolveStatus::GapLimit,
                solution: Some(solution),
                ..
            }) => Ok(*solution),
            other => Err(other),
        }
    }

    /// True for the solver-reported "no feasible optimum" failure.
    #[must_use]
    pub fn is_infeasible(&self) -> bool {
        matches!(self, Error::Solver(SolverError::InfeasibleOrUnbounded))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
