//! Structural leaf operators.

pub mod dense;
pub mod diagonal;
pub mod identity;
pub mod permutation;
pub mod sparse;
pub mod tridiagonal;

pub use dense::DenseOperator;
pub use diagonal::Diagonal;
pub use identity::{Identity, ScaledIdentity};
pub use permutation::Permutation;
pub use sparse::CsrMatrix;
pub use tridiagonal::Tridiagonal;

use faer::Mat;

use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::operator::Operator;

impl<T: Scalar> Operator<T> {
    pub fn dense(data: Mat<T>) -> Self {
        Operator::new(DenseOperator::new(data))
    }

    pub fn diagonal(diag: Vec<T>) -> Self {
        Operator::new(Diagonal::new(diag))
    }

    pub fn tridiagonal(sub: Vec<T>, main: Vec<T>, sup: Vec<T>) -> Result<Self, OpError> {
        Ok(Operator::new(Tridiagonal::new(sub, main, sup)?))
    }

    pub fn permutation(perm: Vec<usize>) -> Result<Self, OpError> {
        Ok(Operator::new(Permutation::new(perm)?))
    }

    pub fn identity(n: usize) -> Self {
        Operator::new(Identity::new(n))
    }

    pub fn scaled_identity(n: usize, scale: T) -> Self {
        Operator::new(ScaledIdentity::new(n, scale))
    }

    pub fn csr(
        nrows: usize,
        ncols: usize,
        row_ptr: Vec<usize>,
        col_idx: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, OpError> {
        Ok(Operator::new(CsrMatrix::from_csr(nrows, ncols, row_ptr, col_idx, values)?))
    }
}
