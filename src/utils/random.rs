//! Seeded random blocks for probes and start vectors.

use faer::Mat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::core::scalar::{Scalar, cast};

/// Entry distribution of a random probe.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum ProbeDistribution {
    /// ±1 with equal probability.
    #[default]
    Rademacher,
    Gaussian,
}

pub fn rng_from_seed(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// An `n × k` block with independent entries drawn from `dist`.
pub fn random_block<T: Scalar>(rng: &mut StdRng, n: usize, k: usize, dist: ProbeDistribution) -> Mat<T> {
    let mut m = Mat::<T>::zeros(n, k);
    for j in 0..k {
        for i in 0..n {
            m[(i, j)] = match dist {
                ProbeDistribution::Rademacher => {
                    if rng.gen_bool(0.5) {
                        T::one()
                    } else {
                        -T::one()
                    }
                }
                ProbeDistribution::Gaussian => cast(rng.sample::<f64, _>(StandardNormal)),
            };
        }
    }
    m
}

/// `count` independent seeds drawn from a master seed.
pub fn split_seeds(seed: u64, count: usize) -> Vec<u64> {
    let mut master = rng_from_seed(seed);
    (0..count).map(|_| master.r#gen::<u64>()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rademacher_entries_are_signs() {
        let mut rng = rng_from_seed(7);
        let m: Mat<f64> = random_block(&mut rng, 20, 3, ProbeDistribution::Rademacher);
        for j in 0..3 {
            for i in 0..20 {
                assert_eq!(m[(i, j)].abs(), 1.0);
            }
        }
    }

    #[test]
    fn seeds_are_reproducible() {
        assert_eq!(split_seeds(42, 4), split_seeds(42, 4));
        let a: Mat<f64> = random_block(&mut rng_from_seed(3), 5, 1, ProbeDistribution::Gaussian);
        let b: Mat<f64> = random_block(&mut rng_from_seed(3), 5, 1, ProbeDistribution::Gaussian);
        assert_eq!(a, b);
    }
}
