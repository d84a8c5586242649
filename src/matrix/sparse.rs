// Compressed sparse row storage.

use std::any::Any;

use faer::{Mat, MatRef};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;

/// A read-only sparse matrix in CSR layout.
#[derive(Debug, Clone)]
pub struct CsrMatrix<T: Scalar> {
    nrows: usize,
    ncols: usize,
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<T>,
    placement: Placement,
}

impl<T: Scalar> CsrMatrix<T> {
    /// Build a CSR from raw row-ptr, col-idx, and values.
    pub fn from_csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, OpError> {
        if row_ptr.len() != nrows + 1 || row_ptr.first() != Some(&0) {
            return Err(OpError::InvalidInput(format!(
                "row_ptr must start at 0 and have {} entries",
                nrows + 1
            )));
        }
        if row_ptr.windows(2).any(|w| w[0] > w[1]) {
            return Err(OpError::InvalidInput("row_ptr is not non-decreasing".into()));
        }
        let nnz = row_ptr[nrows];
        if col_idx.len() != nnz || values.len() != nnz {
            return Err(OpError::InvalidInput(format!(
                "row_ptr announces {nnz} entries, got {} indices and {} values",
                col_idx.len(),
                values.len()
            )));
        }
        if let Some(&c) = col_idx.iter().find(|&&c| c >= ncols) {
            return Err(OpError::InvalidInput(format!("column index {c} out of range {ncols}")));
        }
        Ok(Self { nrows, ncols, row_ptr, col_idx, values, placement: Placement::Host })
    }

    /// Assemble from `(row, col, value)` triplets; duplicates are summed.
    pub fn from_triplets(
        nrows: usize,
        ncols: usize,
        triplets: &[(usize, usize, T)],
    ) -> Result<Self, OpError> {
        let mut sorted = triplets.to_vec();
        if let Some(&(i, j, _)) = sorted.iter().find(|(i, j, _)| *i >= nrows || *j >= ncols) {
            return Err(OpError::InvalidInput(format!(
                "triplet ({i}, {j}) outside {nrows}x{ncols}"
            )));
        }
        sorted.sort_by_key(|&(i, j, _)| (i, j));
        let mut row_ptr = vec![0; nrows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(sorted.len());
        let mut values: Vec<T> = Vec::with_capacity(sorted.len());
        let mut last: Option<(usize, usize)> = None;
        for (i, j, v) in sorted {
            if last == Some((i, j)) {
                if let Some(tail) = values.last_mut() {
                    *tail += v;
                }
                continue;
            }
            col_idx.push(j);
            values.push(v);
            row_ptr[i + 1] += 1;
            last = Some((i, j));
        }
        for i in 0..nrows {
            row_ptr[i + 1] += row_ptr[i];
        }
        Self::from_csr(nrows, ncols, row_ptr, col_idx, values)
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    fn row_dot(&self, row: usize, x: MatRef<'_, T>, col: usize) -> T {
        let mut sum = T::zero();
        for p in self.row_ptr[row]..self.row_ptr[row + 1] {
            sum += self.values[p] * x[(self.col_idx[p], col)];
        }
        sum
    }

    /// Diagonal entries; missing ones are zero.
    pub fn diagonal(&self) -> Vec<T> {
        let n = self.nrows.min(self.ncols);
        let mut d = vec![T::zero(); n];
        for (i, di) in d.iter_mut().enumerate() {
            for p in self.row_ptr[i]..self.row_ptr[i + 1] {
                if self.col_idx[p] == i {
                    *di += self.values[p];
                }
            }
        }
        d
    }
}

impl<T: Scalar> MatShape for CsrMatrix<T> {
    fn nrows(&self) -> usize {
        self.nrows
    }
    fn ncols(&self) -> usize {
        self.ncols
    }
}

impl<T: Scalar> LinearOperator<T> for CsrMatrix<T> {
    fn kind(&self) -> OpKind {
        OpKind::Sparse
    }

    #[cfg(feature = "rayon")]
    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let k = x.ncols();
        let rows: Vec<Vec<T>> = (0..self.nrows)
            .into_par_iter()
            .map(|i| (0..k).map(|j| self.row_dot(i, x, j)).collect())
            .collect();
        Ok(Mat::from_fn(self.nrows, k, |i, j| rows[i][j]))
    }

    #[cfg(not(feature = "rayon"))]
    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(Mat::from_fn(self.nrows, x.ncols(), |i, j| self.row_dot(i, x, j)))
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = Mat::<T>::zeros(self.ncols, x.ncols());
        for j in 0..x.ncols() {
            for i in 0..self.nrows {
                let xi = x[(i, j)];
                for p in self.row_ptr[i]..self.row_ptr[i + 1] {
                    y[(self.col_idx[p], j)] += self.values[p] * xi;
                }
            }
        }
        Ok(y)
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        let mut m = Mat::<T>::zeros(self.nrows, self.ncols);
        for i in 0..self.nrows {
            for p in self.row_ptr[i]..self.row_ptr[i + 1] {
                m[(i, self.col_idx[p])] += self.values[p];
            }
        }
        Ok(m)
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
