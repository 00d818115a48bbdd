//! Core value types: expressions, variables, topology and demands.

pub mod demand;
pub mod polynomial;
pub mod topology;
pub mod variable;

pub use demand::{DemandExpr, DemandMatrix};
pub use polynomial::{Polynomial, Term};
pub use topology::{Pair, Path, PathPolicy, Topology};
pub use variable::{Var, VarKind, VariableSpec};
