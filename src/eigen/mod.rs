//! Eigenvalue algorithms: dense symmetric solves, Lanczos, power iteration and stochastic
//! Lanczos quadrature.
//!
//! Eigenpairs are always reported in ascending eigenvalue order, whatever end of the
//! spectrum was requested.

pub mod dense;
pub mod lanczos;
pub mod power;
pub mod slq;

use std::ops::Range;

use faer::Mat;

use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::utils::convergence::SolveStats;

pub use lanczos::{Lanczos, LanczosDecomposition, lanczos_eig};
pub use power::power_iteration;
pub use slq::{SlqEstimate, SpectralDensity, slq, slq_spectral_density};

/// End of the spectrum a partial eigendecomposition is taken from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SpectrumEnd {
    Smallest,
    Largest,
}

/// Which eigenpairs `eig` returns; indices refer to the ascending spectrum.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EigSelection {
    All,
    Count { k: usize, end: SpectrumEnd },
    Range(Range<usize>),
}

impl EigSelection {
    pub fn smallest(k: usize) -> Self {
        EigSelection::Count { k, end: SpectrumEnd::Smallest }
    }

    pub fn largest(k: usize) -> Self {
        EigSelection::Count { k, end: SpectrumEnd::Largest }
    }

    pub(crate) fn validate(&self, n: usize) -> Result<(), OpError> {
        match self {
            EigSelection::All => Ok(()),
            EigSelection::Count { k, .. } if *k == 0 || *k > n => Err(OpError::InvalidInput(format!(
                "eigenpair count {k} outside 1..={n}"
            ))),
            EigSelection::Range(r) if r.start >= r.end || r.end > n => Err(OpError::InvalidInput(format!(
                "eigenpair range {r:?} is empty or exceeds {n}"
            ))),
            _ => Ok(()),
        }
    }

    /// Positions in the ascending spectrum of an `n × n` operator.
    pub fn indices(&self, n: usize) -> Range<usize> {
        match self {
            EigSelection::All => 0..n,
            EigSelection::Count { k, end: SpectrumEnd::Smallest } => 0..*k,
            EigSelection::Count { k, end: SpectrumEnd::Largest } => n - *k..n,
            EigSelection::Range(r) => r.clone(),
        }
    }

    /// For extremal methods: the end to converge, how many pairs it needs there, and which of
    /// those (in ascending order) are returned.
    pub(crate) fn extremal(&self, n: usize) -> (SpectrumEnd, usize, Range<usize>) {
        match self {
            EigSelection::All => (SpectrumEnd::Smallest, n, 0..n),
            EigSelection::Count { k, end } => (*end, *k, 0..*k),
            EigSelection::Range(r) if r.start <= n - r.end => (SpectrumEnd::Smallest, r.end, r.clone()),
            EigSelection::Range(r) => (SpectrumEnd::Largest, n - r.start, 0..r.end - r.start),
        }
    }

    pub fn len(&self, n: usize) -> usize {
        self.indices(n).len()
    }
}

/// Eigenvalues in ascending order with their eigenvectors as columns.
#[derive(Clone, Debug)]
pub struct EigResult<T: Scalar> {
    pub values: Vec<T>,
    pub vectors: Mat<T>,
    pub stats: SolveStats<T>,
}

impl<T: Scalar> EigResult<T> {
    pub fn converged(&self) -> bool {
        self.stats.converged()
    }
}

/// Eigenvalue of largest magnitude and a unit eigenvector (sign unspecified).
#[derive(Clone, Debug)]
pub struct DominantEig<T: Scalar> {
    pub value: T,
    pub vector: Vec<T>,
    pub stats: SolveStats<T>,
}

impl<T: Scalar> DominantEig<T> {
    pub fn converged(&self) -> bool {
        self.stats.converged()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_indices() {
        assert_eq!(EigSelection::All.indices(5), 0..5);
        assert_eq!(EigSelection::smallest(2).indices(5), 0..2);
        assert_eq!(EigSelection::largest(2).indices(5), 3..5);
        assert_eq!(EigSelection::Range(1..3).len(5), 2);
    }

    #[test]
    fn ranges_map_to_the_nearer_end() {
        assert_eq!(EigSelection::Range(1..3).extremal(10), (SpectrumEnd::Smallest, 3, 1..3));
        assert_eq!(EigSelection::Range(7..9).extremal(10), (SpectrumEnd::Largest, 3, 0..2));
    }

    #[test]
    fn invalid_selections() {
        assert!(EigSelection::smallest(0).validate(4).is_err());
        assert!(EigSelection::largest(5).validate(4).is_err());
        assert!(EigSelection::Range(2..2).validate(4).is_err());
        assert!(EigSelection::Range(1..5).validate(4).is_err());
        assert!(EigSelection::Range(0..4).validate(4).is_ok());
    }
}
