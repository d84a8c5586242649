//! Kronecker product `A ⊗ B` applied through the mixed-product identity.
//!
//! `(A ⊗ B) vec(X) = vec(B X Aᵀ)`, so an apply on an `n·q × k` block costs one batched apply
//! of `B` on a `q × n·k` block and one of `A` on an `n × p·k` block. The `(m·p) × (n·q)` matrix
//! is never formed except by `to_dense`.

use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::{Operator, common_placement};

#[derive(Debug)]
pub struct KroneckerOp<T: Scalar> {
    a: Operator<T>,
    b: Operator<T>,
    placement: Placement,
}

impl<T: Scalar> KroneckerOp<T> {
    /// The left factor `A`.
    pub fn left(&self) -> &Operator<T> {
        &self.a
    }

    /// The right factor `B`.
    pub fn right(&self) -> &Operator<T> {
        &self.b
    }
}

/// Applies `(A ⊗ B)` where `A` is `m × n` and `B` is `p × q`, given batched actions of both.
fn mixed_product<T, FA, FB>(
    x: MatRef<'_, T>,
    (m, n): (usize, usize),
    (p, q): (usize, usize),
    apply_a: FA,
    apply_b: FB,
) -> Result<Mat<T>, OpError>
where
    T: Scalar,
    FA: FnOnce(MatRef<'_, T>) -> Result<Mat<T>, OpError>,
    FB: FnOnce(MatRef<'_, T>) -> Result<Mat<T>, OpError>,
{
    let k = x.ncols();
    // column c of x reshaped to the q × n matrix X_c, all k of them side by side
    let stacked = Mat::from_fn(q, n * k, |i, col| x[((col % n) * q + i, col / n)]);
    let w = apply_b(stacked.as_ref())?;
    // (B X_c)ᵀ for each c, side by side: n × p·k
    let flipped = Mat::from_fn(n, p * k, |j, col| w[(col % p, (col / p) * n + j)]);
    let z = apply_a(flipped.as_ref())?;
    Ok(Mat::from_fn(m * p, k, |row, c| z[(row / p, c * p + row % p)]))
}

impl<T: Scalar> MatShape for KroneckerOp<T> {
    fn nrows(&self) -> usize {
        self.a.nrows() * self.b.nrows()
    }
    fn ncols(&self) -> usize {
        self.a.ncols() * self.b.ncols()
    }
}

impl<T: Scalar> LinearOperator<T> for KroneckerOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Kronecker
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        mixed_product(
            x,
            self.a.shape(),
            self.b.shape(),
            |z| self.a.apply(z),
            |w| self.b.apply(w),
        )
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let (m, n) = self.a.shape();
        let (p, q) = self.b.shape();
        mixed_product(
            x,
            (n, m),
            (q, p),
            |z| self.a.apply_transpose(z),
            |w| self.b.apply_transpose(w),
        )
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        let da = self.a.to_dense()?;
        let db = self.b.to_dense()?;
        let (p, q) = self.b.shape();
        Ok(Mat::from_fn(self.nrows(), self.ncols(), |r, c| {
            da[(r / p, c / q)] * db[(r % p, c % q)]
        }))
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `a ⊗ b`.
pub fn kron<T: Scalar>(a: &Operator<T>, b: &Operator<T>) -> Result<Operator<T>, OpError> {
    let placement = common_placement(&[a.clone(), b.clone()])?;
    let caps = a.capabilities().common(b.capabilities());
    let node = KroneckerOp { a: a.clone(), b: b.clone(), placement };
    Ok(Operator::new(node).annotate(caps))
}
