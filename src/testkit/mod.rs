//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`domain`] — Canonical topologies and demand vectors.
//! - [`config`] — Canonical TOML configurations and search parameters.
//! - [`solver`] — Solver double with scripted failures.

pub mod config;
pub mod domain;
pub mod solver;

pub use domain::{diamond, two_node};
pub use solver::ScriptedSolver;
