//! Netgap - adversarial gap search between network allocation policies.
//!
//! Given a capacitated network, netgap looks for the demand vector on which
//! a heuristic allocation policy falls furthest behind the optimal one.
//! The exact mode reduces the bilevel problem to one mixed-integer program;
//! the metaheuristics evaluate concrete demand vectors.
//!
//! # Architecture
//!
//! - **`domain`** - Expressions, variables, topology and demands
//! - **`port::solver`** - LP/MILP solver contract
//!   - `HiGHSSolver` - Open-source HiGHS via good_lp
//! - **`application::linearize`** - Big-M products, max/min, logical OR
//! - **`application::rewrite`** - KKT and primal-dual inner optimality
//! - **`application::encoder`** - Max-flow, demand pinning and POP policies
//! - **`application::gap`** - Exact and metaheuristic gap search
//!
//! # Modules
//!
//! - [`adapter`] - Solver backends
//! - [`application`] - Model-building services
//! - [`cli`] - Command-line interface
//! - [`domain`] - Core value types
//! - [`error`] - Error types for the crate
//! - [`infrastructure`] - Configuration, factories and persistence
//! - [`port`] - Trait definitions
//!
//! # Features
//!
//! - `testkit` - Expose shared fixtures to integration tests
//!
//! # Example
//!
//! ```no_run
//! use netgap::adapter::solver::HiGHSSolver;
//! use netgap::application::encoder::{DemandPinningEncoder, MaxFlowEncoder};
//! use netgap::application::gap::{ExactConfig, GapEngine};
//! use netgap::domain::{PathPolicy, Topology};
//!
//! # fn main() -> netgap::error::Result<()> {
//! let topology = Topology::new().with_edge("a", "b", 10.0)?;
//! let paths = topology.compute_paths(PathPolicy::KShortest, 2);
//! let optimal = MaxFlowEncoder::new(topology.clone(), paths.clone());
//! let heuristic = DemandPinningEncoder::new(topology, paths, 5.0, 25.0)?;
//! let mut engine = GapEngine::new(Box::new(optimal), Box::new(heuristic), 10.0)?;
//! let result = engine.exact(&mut HiGHSSolver::new(), &ExactConfig::default())?;
//! println!("gap = {}", result.gap);
//! # Ok(())
//! # }
//! ```

pub mod adapter;
pub mod application;
pub mod cli;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod port;

#[cfg(any(test, feature = "testkit"))]
pub mod testkit;
