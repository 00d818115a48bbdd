//! Model-building services on top of the solver port.
//!
//! Layered bottom-up: [`linearize`] products and selections,
//! [`rewrite`] inner-optimality reductions, [`encoder`] allocation
//! policies, and the [`gap`] engine that pits two policies against each
//! other.

pub mod encoder;
pub mod gap;
pub mod linearize;
pub mod rewrite;
