//! Solver implementations for linear and mixed-integer programming.
//!
//! Implements the `port::solver::Solver` trait with concrete backends.

mod disjunction;
mod highs;
pub mod model;

pub use disjunction::{DisjunctionEncoding, NonNegativeSplit, SignedBigM};
pub use highs::{HiGHSSolver, DEFAULT_DISJUNCTION_BIG_M};
