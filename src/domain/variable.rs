//! Decision variable handles.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque handle to a scalar decision variable.
///
/// Handles are issued by a solver backend and are only meaningful for the
/// model generation that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Var(usize);

impl Var {
    /// Wrap a backend index. Only solver backends should call this.
    #[must_use]
    pub const fn from_index(index: usize) -> Self {
        Self(index)
    }

    /// Backend index of this variable.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Domain of a decision variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarKind {
    Continuous,
    Integer,
    Binary,
}

/// Kind and bounds of a variable (`None` = unbounded on that side).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableSpec {
    pub kind: VarKind,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

impl VariableSpec {
    #[must_use]
    pub const fn new(kind: VarKind, lower: Option<f64>, upper: Option<f64>) -> Self {
        Self { kind, lower, upper }
    }

    /// Continuous variable in `[0, +inf)`.
    #[must_use]
    pub const fn non_negative() -> Self {
        Self::new(VarKind::Continuous, Some(0.0), None)
    }

    /// Binary variable in `{0, 1}`.
    #[must_use]
    pub const fn binary() -> Self {
        Self::new(VarKind::Binary, Some(0.0), Some(1.0))
    }

    /// Continuous variable without bounds.
    #[must_use]
    pub const fn free() -> Self {
        Self::new(VarKind::Continuous, None, None)
    }

    /// The single value this variable can take, if its bounds coincide.
    #[must_use]
    pub fn fixed_value(&self) -> Option<f64> {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    /// True when `lower <= upper` (or either side is open).
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        match (self.lower, self.upper) {
            (Some(lo), Some(hi)) => lo <= hi && !lo.is_nan() && !hi.is_nan(),
            (Some(b), None) | (None, Some(b)) => !b.is_nan(),
            (None, None) => true,
        }
    }
}
