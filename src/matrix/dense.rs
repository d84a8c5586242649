//! Dense operator on top of Faer.
//!
//! Wraps a `faer::Mat<T>` buffer; construction from a matrix, from row vectors, or from raw
//! column-major storage.

use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;

#[derive(Debug, Clone)]
pub struct DenseOperator<T: Scalar> {
    data: Mat<T>,
    placement: Placement,
}

impl<T: Scalar> DenseOperator<T> {
    pub fn new(data: Mat<T>) -> Self {
        Self { data, placement: Placement::Host }
    }

    /// Construct from row vectors; ragged rows are rejected.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self, OpError> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some((i, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != ncols) {
            return Err(OpError::InvalidInput(format!(
                "row {i} has {} entries, expected {ncols}",
                row.len()
            )));
        }
        Ok(Self::new(Mat::from_fn(rows.len(), ncols, |i, j| rows[i][j])))
    }

    /// Construct from raw column-major storage.
    pub fn from_raw(nrows: usize, ncols: usize, data: Vec<T>) -> Result<Self, OpError> {
        if data.len() != nrows * ncols {
            return Err(OpError::InvalidInput(format!(
                "{} values for a {nrows}x{ncols} matrix",
                data.len()
            )));
        }
        Ok(Self::new(Mat::from_fn(nrows, ncols, |i, j| data[j * nrows + i])))
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn matrix(&self) -> MatRef<'_, T> {
        self.data.as_ref()
    }
}

impl<T: Scalar> MatShape for DenseOperator<T> {
    fn nrows(&self) -> usize {
        self.data.nrows()
    }
    fn ncols(&self) -> usize {
        self.data.ncols()
    }
}

impl<T: Scalar> LinearOperator<T> for DenseOperator<T> {
    fn kind(&self) -> OpKind {
        OpKind::Dense
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(self.data.as_ref() * x)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(self.data.as_ref().transpose() * x)
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        Ok(self.data.clone())
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_is_column_major() {
        let d = DenseOperator::from_raw(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        assert_eq!(d.matrix()[(0, 1)], 3.0);
        assert_eq!(d.matrix()[(1, 2)], 6.0);
        assert!(DenseOperator::<f64>::from_raw(2, 2, vec![1.0]).is_err());
    }

    #[test]
    fn ragged_rows_rejected() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(DenseOperator::from_rows(&rows), Err(OpError::InvalidInput(_))));
        let ok = DenseOperator::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(ok.matrix()[(1, 0)], 3.0);
    }

    #[test]
    fn matvec_and_transpose() {
        let d = DenseOperator::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        let x = Mat::from_fn(2, 1, |i, _| (i + 1) as f64);
        let y = d.matvec(x.as_ref()).unwrap();
        assert_eq!((y[(0, 0)], y[(1, 0)]), (5.0, 11.0));
        let yt = d.mattransvec(x.as_ref()).unwrap();
        assert_eq!((yt[(0, 0)], yt[(1, 0)]), (7.0, 10.0));
    }
}
