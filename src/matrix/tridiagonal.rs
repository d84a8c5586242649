use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::annotation::Capabilities;

/// Tridiagonal matrix stored as its three bands.
///
/// `sub[i]` sits at `(i + 1, i)`, `sup[i]` at `(i, i + 1)`.
#[derive(Debug, Clone)]
pub struct Tridiagonal<T: Scalar> {
    sub: Vec<T>,
    main: Vec<T>,
    sup: Vec<T>,
    placement: Placement,
}

impl<T: Scalar> Tridiagonal<T> {
    pub fn new(sub: Vec<T>, main: Vec<T>, sup: Vec<T>) -> Result<Self, OpError> {
        let n = main.len();
        let off = n.saturating_sub(1);
        if sub.len() != off || sup.len() != off {
            return Err(OpError::InvalidInput(format!(
                "tridiagonal bands of length {}/{}/{}; expected {off}/{n}/{off}",
                sub.len(),
                n,
                sup.len()
            )));
        }
        Ok(Self { sub, main, sup, placement: Placement::Host })
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn sub(&self) -> &[T] {
        &self.sub
    }

    pub fn main(&self) -> &[T] {
        &self.main
    }

    pub fn sup(&self) -> &[T] {
        &self.sup
    }

    fn band_apply(&self, lower: &[T], upper: &[T], x: MatRef<'_, T>) -> Mat<T> {
        let n = self.main.len();
        Mat::from_fn(n, x.ncols(), |i, j| {
            let mut y = self.main[i] * x[(i, j)];
            if i > 0 {
                y += lower[i - 1] * x[(i - 1, j)];
            }
            if i + 1 < n {
                y += upper[i] * x[(i + 1, j)];
            }
            y
        })
    }
}

impl<T: Scalar> MatShape for Tridiagonal<T> {
    fn nrows(&self) -> usize {
        self.main.len()
    }
    fn ncols(&self) -> usize {
        self.main.len()
    }
}

impl<T: Scalar> LinearOperator<T> for Tridiagonal<T> {
    fn kind(&self) -> OpKind {
        OpKind::Tridiagonal
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(self.band_apply(&self.sub, &self.sup, x))
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(self.band_apply(&self.sup, &self.sub, x))
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        let n = self.main.len();
        Ok(Mat::from_fn(n, n, |i, j| {
            if i == j {
                self.main[i]
            } else if i == j + 1 {
                self.sub[j]
            } else if j == i + 1 {
                self.sup[i]
            } else {
                T::zero()
            }
        }))
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn intrinsic(&self) -> Capabilities {
        if self.sub == self.sup {
            Capabilities::SELF_ADJOINT
        } else {
            Capabilities::empty()
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
    fn band_lengths_validated() {
        assert!(Tridiagonal::new(vec![1.0], vec![1.0, 2.0, 3.0], vec![1.0, 1.0]).is_err());
        assert!(Tridiagonal::<f64>::new(vec![], vec![4.0], vec![]).is_ok());
    }

    #[test]
    fn action_matches_dense() {
        let t = Tridiagonal::new(vec![1.0, 2.0], vec![4.0, 5.0, 6.0], vec![-1.0, 3.0]).unwrap();
        let dense = t.to_dense().unwrap();
        let x = Mat::from_fn(3, 2, |i, j| (i + 2 * j) as f64 - 1.0);
        let y = t.matvec(x.as_ref()).unwrap();
        let yd = dense.as_ref() * x.as_ref();
        assert_eq!(y, yd);
        let yt = t.mattransvec(x.as_ref()).unwrap();
        let ytd = dense.transpose() * x.as_ref();
        assert_eq!(yt, ytd);
        assert!(t.intrinsic().is_empty());
    }
}
