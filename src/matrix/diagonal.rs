use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::annotation::Capabilities;

/// `diag(d)`.
#[derive(Debug, Clone)]
pub struct Diagonal<T: Scalar> {
    diag: Vec<T>,
    placement: Placement,
}

impl<T: Scalar> Diagonal<T> {
    pub fn new(diag: Vec<T>) -> Self {
        Self { diag, placement: Placement::Host }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn values(&self) -> &[T] {
        &self.diag
    }

    fn scale_rows(&self, x: MatRef<'_, T>) -> Mat<T> {
        Mat::from_fn(x.nrows(), x.ncols(), |i, j| self.diag[i] * x[(i, j)])
    }
}

impl<T: Scalar> MatShape for Diagonal<T> {
    fn nrows(&self) -> usize {
        self.diag.len()
    }
    fn ncols(&self) -> usize {
        self.diag.len()
    }
}

impl<T: Scalar> LinearOperator<T> for Diagonal<T> {
    fn kind(&self) -> OpKind {
        OpKind::Diagonal
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(self.scale_rows(x))
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(self.scale_rows(x))
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        let n = self.diag.len();
        Ok(Mat::from_fn(n, n, |i, j| if i == j { self.diag[i] } else { T::zero() }))
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn intrinsic(&self) -> Capabilities {
        if self.diag.iter().all(|d| *d >= T::zero()) {
            Capabilities::POSITIVE_SEMIDEFINITE
        } else {
            Capabilities::SELF_ADJOINT
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intrinsic_definiteness() {
        assert!(Diagonal::new(vec![0.0, 1.0]).intrinsic().is_psd());
        let mixed = Diagonal::new(vec![-1.0, 1.0]).intrinsic();
        assert!(mixed.is_self_adjoint() && !mixed.is_psd());
    }

    #[test]
    fn scales_each_row() {
        let d = Diagonal::new(vec![2.0, 3.0]);
        let x = Mat::from_fn(2, 2, |i, j| (i + j) as f64);
        let y = d.matvec(x.as_ref()).unwrap();
        assert_eq!(y[(1, 1)], 6.0);
        assert_eq!(y[(0, 1)], 2.0);
    }
}
