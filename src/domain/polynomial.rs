//! Affine expressions shared by every encoder.
//!
//! A [`Polynomial`] is an ordered sum of [`Term`]s. Only degree-0 and
//! degree-1 terms are meaningful to a linear solver; this layer does not
//! validate degree, the solver backend does when a polynomial is handed to
//! it.
//!
//! Polynomials are plain values: combining two of them copies terms and
//! never aliases the receiver's term list.
//!
//! ```
//! use netgap::domain::polynomial::{Polynomial, Term};
//! use netgap::domain::variable::Var;
//!
//! let x = Var::from_index(0);
//! let mut p = Polynomial::from_terms([Term::linear(2.0, x), Term::constant(-1.0)]);
//! p.add(&p.negate());
//! assert_eq!(p.evaluate(|_| 5.0), 0.0);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::ops::{AddAssign, Neg};

use super::variable::Var;

/// `coefficient * variable^exponent`, exponent in {0, 1}.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Term {
    coefficient: f64,
    variable: Option<Var>,
    exponent: u8,
}

impl Term {
    #[must_use]
    pub const fn new(coefficient: f64, variable: Option<Var>, exponent: u8) -> Self {
        Self {
            coefficient,
            variable,
            exponent,
        }
    }

    /// `coefficient * variable`.
    #[must_use]
    pub const fn linear(coefficient: f64, variable: Var) -> Self {
        Self::new(coefficient, Some(variable), 1)
    }

    #[must_use]
    pub const fn constant(value: f64) -> Self {
        Self::new(value, None, 0)
    }

    #[must_use]
    pub const fn coefficient(&self) -> f64 {
        self.coefficient
    }

    #[must_use]
    pub const fn variable(&self) -> Option<Var> {
        self.variable
    }

    #[must_use]
    pub const fn exponent(&self) -> u8 {
        self.exponent
    }

    /// The variable this term scales, if it is a degree-1 term.
    #[must_use]
    pub fn linear_variable(&self) -> Option<Var> {
        match (self.variable, self.exponent) {
            (Some(v), 1) => Some(v),
            _ => None,
        }
    }

    /// True for a constant term (no variable, or exponent 0).
    #[must_use]
    pub fn is_constant(&self) -> bool {
        self.variable.is_none() || self.exponent == 0
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        Self::new(-self.coefficient, self.variable, self.exponent)
    }

    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::new(self.coefficient * factor, self.variable, self.exponent)
    }

    fn evaluate(&self, value: impl Fn(Var) -> f64) -> f64 {
        match self.variable {
            Some(v) if self.exponent > 0 => {
                self.coefficient * value(v).powi(i32::from(self.exponent))
            }
            _ => self.coefficient,
        }
    }
}

impl From<Var> for Term {
    fn from(var: Var) -> Self {
        Self::linear(1.0, var)
    }
}

/// Ordered sum of terms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Polynomial {
    terms: Vec<Term>,
}

impl Polynomial {
    /// The zero polynomial.
    #[must_use]
    pub const fn new() -> Self {
        Self { terms: Vec::new() }
    }

    #[must_use]
    pub fn from_terms(terms: impl IntoIterator<Item = Term>) -> Self {
        Self {
            terms: terms.into_iter().collect(),
        }
    }

    /// Sum of `1 * v` over the given variables.
    #[must_use]
    pub fn sum_of(vars: impl IntoIterator<Item = Var>) -> Self {
        Self::from_terms(vars.into_iter().map(Term::from))
    }

    #[must_use]
    pub fn terms(&self) -> &[Term] {
        &self.terms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn add_term(&mut self, term: Term) -> &mut Self {
        self.terms.push(term);
        self
    }

    /// Append every term of `other` (copied).
    pub fn add(&mut self, other: &Polynomial) -> &mut Self {
        self.terms.extend_from_slice(&other.terms);
        self
    }

    #[must_use]
    pub fn negate(&self) -> Self {
        Self::from_terms(self.terms.iter().map(Term::negate))
    }

    #[must_use]
    pub fn scaled(&self, factor: f64) -> Self {
        Self::from_terms(self.terms.iter().map(|t| t.scaled(factor)))
    }

    /// Builder form of [`add_term`](Self::add_term).
    #[must_use]
    pub fn with(mut self, term: Term) -> Self {
        self.terms.push(term);
        self
    }

    /// Sum of all constant terms.
    #[must_use]
    pub fn constant(&self) -> f64 {
        self.terms
            .iter()
            .filter(|t| t.is_constant())
            .map(Term::coefficient)
            .sum()
    }

    /// Combined coefficient of `var` across degree-1 terms.
    #[must_use]
    pub fn coefficient(&self, var: Var) -> f64 {
        self.terms
            .iter()
            .filter(|t| t.linear_variable() == Some(var))
            .map(Term::coefficient)
            .sum()
    }

    /// Degree-1 coefficients merged per variable, zeros dropped.
    #[must_use]
    pub fn linear_coefficients(&self) -> BTreeMap<Var, f64> {
        let mut merged = BTreeMap::new();
        for term in &self.terms {
            if let Some(v) = term.linear_variable() {
                *merged.entry(v).or_insert(0.0) += term.coefficient();
            }
        }
        merged.retain(|_, c| *c != 0.0);
        merged
    }

    #[must_use]
    pub fn variables(&self) -> BTreeSet<Var> {
        self.terms.iter().filter_map(Term::linear_variable).collect()
    }

    /// The first term whose degree exceeds one, if any.
    #[must_use]
    pub fn first_nonlinear(&self) -> Option<&Term> {
        self.terms
            .iter()
            .find(|t| t.variable.is_some() && t.exponent > 1)
    }

    #[must_use]
    pub fn is_linear(&self) -> bool {
        self.first_nonlinear().is_none()
    }

    /// Value of the polynomial under a variable assignment.
    pub fn evaluate(&self, value: impl Fn(Var) -> f64) -> f64 {
        self.terms.iter().map(|t| t.evaluate(&value)).sum()
    }

    /// Split into the part over `vars` and the remainder.
    #[must_use]
    pub fn partition(&self, vars: &BTreeSet<Var>) -> (Polynomial, Polynomial) {
        let (inside, outside): (Vec<Term>, Vec<Term>) = self
            .terms
            .iter()
            .partition(|t| t.linear_variable().is_some_and(|v| vars.contains(&v)));
        (Self::from_terms(inside), Self::from_terms(outside))
    }
}

impl From<Term> for Polynomial {
    fn from(term: Term) -> Self {
        Self { terms: vec![term] }
    }
}

impl From<Var> for Polynomial {
    fn from(var: Var) -> Self {
        Self::from(Term::from(var))
    }
}

impl FromIterator<Term> for Polynomial {
    fn from_iter<I: IntoIterator<Item = Term>>(iter: I) -> Self {
        Self::from_terms(iter)
    }
}

impl AddAssign<Term> for Polynomial {
    fn add_assign(&mut self, term: Term) {
        self.add_term(term);
    }
}

impl AddAssign<&Polynomial> for Polynomial {
    fn add_assign(&mut self, other: &Polynomial) {
        self.add(other);
    }
}

impl Neg for &Polynomial {
    type Output = Polynomial;

    fn neg(self) -> Polynomial {
        self.negate()
    }
}

impl fmt::Display for Polynomial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "0");
        }
        for (i, term) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            let c = term.coefficient();
            match (term.linear_variable(), term.variable()) {
                (Some(v), _) => write!(f, "{c}*{v}")?,
                (None, Some(v)) if term.exponent() > 1 => {
                    write!(f, "{c}*{v}^{}", term.exponent())?;
                }
                _ => write!(f, "{c}")?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn v(i: usize) -> Var {
        Var::from_index(i)
    }

    #[test]
    fn adding_negation_yields_zero_under_any_assignment() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let terms: Vec<Term> = (0..rng.gen_range(1..6))
                .map(|_| {
                    if rng.gen_bool(0.3) {
                        Term::constant(rng.gen_range(-10.0..10.0))
                    } else {
                        Term::linear(rng.gen_range(-10.0..10.0), v(rng.gen_range(0..4)))
                    }
                })
                .collect();
            let mut p = Polynomial::from_terms(terms);
            let neg = p.negate();
            p.add(&neg);
            let values: Vec<f64> = (0..4).map(|_| rng.gen_range(-100.0..100.0)).collect();
            let total = p.evaluate(|var| values[var.index()]);
            assert!(total.abs() < 1e-9, "expected zero, got {total}");
        }
    }

    #[test]
    fn negate_and_clone_do_not_touch_receiver() {
        let p = Polynomial::from_terms([Term::linear(2.0, v(0)), Term::constant(3.0)]);
        let before = p.clone();
        let _ = p.negate();
        let mut copy = p.clone();
        copy.add_term(Term::constant(1.0));
        assert_eq!(p, before);
        assert_eq!(copy.terms().len(), 3);
    }

    #[test]
    fn coefficients_merge_repeated_variables() {
        let p = Polynomial::from_terms([
            Term::linear(2.0, v(0)),
            Term::linear(-2.0, v(0)),
            Term::linear(1.5, v(1)),
            Term::new(4.0, Some(v(2)), 0),
            Term::constant(1.0),
        ]);
        assert_eq!(p.coefficient(v(1)), 1.5);
        assert_eq!(p.constant(), 5.0);
        let merged = p.linear_coefficients();
        assert!(!merged.contains_key(&v(0)));
        assert_eq!(merged.get(&v(1)), Some(&1.5));
    }

    #[test]
    fn degree_two_terms_are_flagged() {
        let p = Polynomial::from(Term::new(1.0, Some(v(0)), 2));
        assert!(!p.is_linear());
        assert_eq!(p.evaluate(|_| 3.0), 9.0);
    }

    #[test]
    fn partition_separates_inner_variables() {
        let p = Polynomial::from_terms([
            Term::linear(1.0, v(0)),
            Term::linear(-1.0, v(1)),
            Term::constant(4.0),
        ]);
        let inner: BTreeSet<Var> = [v(0)].into_iter().collect();
        let (inside, outside) = p.partition(&inner);
        assert_eq!(inside.variables(), inner);
        assert_eq!(outside.coefficient(v(1)), -1.0);
        assert_eq!(outside.constant(), 4.0);
    }
}
