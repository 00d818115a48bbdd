//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! - [`Solver`] - LP/MILP optimization backend

pub mod solver;

pub use solver::{ConstraintName, Solution, SolveStatus, Solver};
