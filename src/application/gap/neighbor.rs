use rand::Rng;
use rand_distr::{Distribution, Normal};

use crate::domain::demand::DemandMatrix;
use crate::error::{ConfigError, Result};

/// Gaussian perturbation of every demand, clipped to `[0, upper]`.
#[derive(Debug, Clone, Copy)]
pub struct GaussianNeighbor {
    noise: Normal<f64>,
    upper: f64,
}

impl GaussianNeighbor {
    /// # Errors
    ///
    /// Rejects a negative or non-finite standard deviation or upper bound.
    pub fn new(std_dev: f64, upper: f64) -> Result<Self> {
        if !(std_dev.is_finite() && std_dev >= 0.0) {
            return Err(ConfigError::invalid(
                "std_dev",
                format!("must be 0 or greater, got {std_dev}"),
            )
            .into());
        }
        if !(upper.is_finite() && upper >= 0.0) {
            return Err(ConfigError::invalid(
                "demand_upper_bound",
                format!("must be 0 or greater, got {upper}"),
            )
            .into());
        }
        let noise = Normal::new(0.0, std_dev)
            .map_err(|e| ConfigError::invalid("std_dev", format!("{std_dev}: {e}")))?;
        Ok(Self { noise, upper })
    }

    pub fn propose<R: Rng + ?Sized>(&self, current: &DemandMatrix, rng: &mut R) -> DemandMatrix {
        let mut next = current.clone();
        for (_, demand) in next.iter_mut() {
            *demand = (*demand + self.noise.sample(rng)).clamp(0.0, self.upper);
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::topology::Pair;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn neighbors_stay_within_bounds() {
        let pairs = vec![Pair::new("a", "b"), Pair::new("b", "c")];
        let start = DemandMatrix::uniform(&pairs, 9.5);
        let neighbor = GaussianNeighbor::new(3.0, 10.0).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..100 {
            let next = neighbor.propose(&start, &mut rng);
            assert!(next.iter().all(|(_, d)| (0.0..=10.0).contains(&d)));
        }
    }

    #[test]
    fn zero_deviation_keeps_the_point() {
        let pairs = vec![Pair::new("a", "b")];
        let start = DemandMatrix::uniform(&pairs, 4.0);
        let neighbor = GaussianNeighbor::new(0.0, 10.0).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(neighbor.propose(&start, &mut rng), start);
    }

    #[test]
    fn negative_deviation_is_rejected() {
        assert!(GaussianNeighbor::new(-1.0, 10.0).is_err());
        assert!(GaussianNeighbor::new(f64::NAN, 10.0).is_err());
    }

    #[test]
    fn unusable_upper_bound_is_rejected() {
        assert!(GaussianNeighbor::new(1.0, -1.0).is_err());
        assert!(GaussianNeighbor::new(1.0, f64::NAN).is_err());
        assert!(GaussianNeighbor::new(1.0, f64::INFINITY).is_err());
    }
}
