//! Factory modules for building infrastructure components.
//!
//! Provides factory functions that construct fully-configured components
//! from application configuration.
//!
//! # Submodules
//!
//! - [`encoder`] - Encoder and gap engine construction
//! - [`solver`] - Solver backend construction

pub mod encoder;
pub mod solver;
