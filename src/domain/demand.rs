//! Demand vectors and their representation inside an encoding.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::polynomial::{Polynomial, Term};
use super::topology::Pair;
use super::variable::Var;

/// Concrete demand per pair.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DemandMatrix(BTreeMap<Pair, f64>);

impl DemandMatrix {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every pair set to the same value.
    #[must_use]
    pub fn uniform(pairs: &[Pair], value: f64) -> Self {
        Self(pairs.iter().map(|p| (p.clone(), value)).collect())
    }

    /// Independent uniform samples in `[0, upper]` per pair.
    pub fn random<R: Rng + ?Sized>(pairs: &[Pair], upper: f64, rng: &mut R) -> Self {
        Self(
            pairs
                .iter()
                .map(|p| (p.clone(), rng.gen_range(0.0..=upper)))
                .collect(),
        )
    }

    pub fn insert(&mut self, pair: Pair, demand: f64) {
        self.0.insert(pair, demand);
    }

    #[must_use]
    pub fn get(&self, pair: &Pair) -> Option<f64> {
        self.0.get(pair).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Pair, f64)> + '_ {
        self.0.iter().map(|(p, d)| (p, *d))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Pair, &mut f64)> + '_ {
        self.0.iter_mut()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all demands.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.0.values().sum()
    }
}

impl FromIterator<(Pair, f64)> for DemandMatrix {
    fn from_iter<I: IntoIterator<Item = (Pair, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// How a pair's demand appears in an encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum DemandExpr {
    /// A continuous decision variable.
    Variable(Var),
    /// `Σ level_l * z_l` over binaries of which at most one is set; zero
    /// demand when none is.
    Quantized { levels: Vec<(f64, Var)> },
    /// A known constant.
    Fixed(f64),
}

impl DemandExpr {
    /// The demand as an affine expression.
    #[must_use]
    pub fn polynomial(&self) -> Polynomial {
        match self {
            Self::Variable(v) => Polynomial::from(*v),
            Self::Quantized { levels } => levels
                .iter()
                .map(|&(level, z)| Term::linear(level, z))
                .collect(),
            Self::Fixed(value) => Polynomial::from(Term::constant(*value)),
        }
    }

    /// Fixed value, if the demand is a constant.
    #[must_use]
    pub fn fixed(&self) -> Option<f64> {
        match self {
            Self::Fixed(value) => Some(*value),
            _ => None,
        }
    }
}
