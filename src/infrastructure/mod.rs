//! Infrastructure layer.
//!
//! Provides technical concerns that support the application without containing
//! model-building logic.
//!
//! # Submodules
//!
//! - [`config`] - Configuration loading and validation
//! - [`factory`] - Component factory functions
//! - [`persist`] - Progress log and demand files

pub mod config;
pub mod factory;
pub mod persist;
