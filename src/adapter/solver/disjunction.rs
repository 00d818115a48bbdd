//! Encodings of the "at least one of `a`, `b` is zero" constraint.
//!
//! The technique is picked when a backend is constructed. Every encoding
//! introduces one auxiliary selector binary `z`: `z = 0` forces `a = 0`,
//! `z = 1` forces `b = 0`.

use std::fmt::Debug;

use crate::domain::polynomial::{Polynomial, Term};
use crate::domain::variable::VariableSpec;
use crate::error::Result;

use super::model::{ConstraintSense, ModelRegistry};

/// Strategy for encoding a disjunction into linear constraints.
pub trait DisjunctionEncoding: Send + Sync + Debug {
    /// Return the encoding name for logging and configuration.
    fn name(&self) -> &'static str;

    /// Record constraints enforcing `a == 0 || b == 0`.
    ///
    /// # Errors
    ///
    /// Fails if either polynomial is rejected by the model.
    fn encode(&self, model: &mut ModelRegistry, a: &Polynomial, b: &Polynomial) -> Result<()>;
}

/// Big-M encoding valid for expressions of either sign.
///
/// ```text
/// -M*z     <= a <= M*z
/// -M*(1-z) <= b <= M*(1-z)
/// ```
///
/// `M` must dominate `|a|` and `|b|` over the feasible region.
#[derive(Debug, Clone, Copy)]
pub struct SignedBigM {
    big_m: f64,
}

impl SignedBigM {
    #[must_use]
    pub const fn new(big_m: f64) -> Self {
        Self { big_m }
    }
}

impl DisjunctionEncoding for SignedBigM {
    fn name(&self) -> &'static str {
        "signed_big_m"
    }

    fn encode(&self, model: &mut ModelRegistry, a: &Polynomial, b: &Polynomial) -> Result<()> {
        model.validate(a)?;
        model.validate(b)?;
        let z = model.add_auxiliary(VariableSpec::binary());
        let m = self.big_m;

        // a <= M z, -a <= M z
        for side in [a.clone(), a.negate()] {
            let p = side.with(Term::linear(-m, z));
            model.add_constraint(&p, ConstraintSense::LessEqual)?;
        }
        // b <= M (1 - z), -b <= M (1 - z)
        for side in [b.clone(), b.negate()] {
            let p = side.with(Term::constant(-m)).with(Term::linear(m, z));
            model.add_constraint(&p, ConstraintSense::LessEqual)?;
        }
        Ok(())
    }
}

/// Two-constraint encoding for expressions known to be non-negative.
///
/// ```text
/// a <= M*z
/// b <= M*(1-z)
/// ```
///
/// Only valid when both `a >= 0` and `b >= 0` hold on the feasible region,
/// as for a dual multiplier and a constraint slack.
#[derive(Debug, Clone, Copy)]
pub struct NonNegativeSplit {
    big_m: f64,
}

impl NonNegativeSplit {
    #[must_use]
    pub const fn new(big_m: f64) -> Self {
        Self { big_m }
    }
}

impl DisjunctionEncoding for NonNegativeSplit {
    fn name(&self) -> &'static str {
        "non_negative_split"
    }

    fn encode(&self, model: &mut ModelRegistry, a: &Polynomial, b: &Polynomial) -> Result<()> {
        model.validate(a)?;
        model.validate(b)?;
        let z = model.add_auxiliary(VariableSpec::binary());
        let m = self.big_m;

        let first = a.clone().with(Term::linear(-m, z));
        model.add_constraint(&first, ConstraintSense::LessEqual)?;
        let second = b
            .clone()
            .with(Term::constant(-m))
            .with(Term::linear(m, z));
        model.add_constraint(&second, ConstraintSense::LessEqual)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_big_m_adds_one_selector_and_four_rows() {
        let mut model = ModelRegistry::new();
        let x = model.add_variable(VariableSpec::free());
        let y = model.add_variable(VariableSpec::free());
        SignedBigM::new(100.0)
            .encode(&mut model, &Polynomial::from(x), &Polynomial::from(y))
            .unwrap();
        assert_eq!(model.auxiliary().len(), 1);
        assert_eq!(model.constraints().len(), 4);
    }

    #[test]
    fn non_negative_split_adds_two_rows() {
        let mut model = ModelRegistry::new();
        let x = model.add_variable(VariableSpec::non_negative());
        let y = model.add_variable(VariableSpec::non_negative());
        NonNegativeSplit::new(100.0)
            .encode(&mut model, &Polynomial::from(x), &Polynomial::from(y))
            .unwrap();
        assert_eq!(model.auxiliary().len(), 1);
        assert_eq!(model.constraints().len(), 2);
        let z = model.auxiliary()[0];
        let rows: Vec<_> = model.constraints().values().collect();
        assert_eq!(rows[0].coefficients[&z], -100.0);
        assert_eq!(rows[1].rhs, 100.0);
    }
}
