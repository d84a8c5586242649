//! The shared operator handle and the combinators built on it.
//!
//! An [`Operator`] is a cheap, clonable handle around an `Arc`-shared node plus the caller's
//! annotations. Composite nodes hold handles to their operands, so expressions form a DAG in
//! which the same leaf may appear many times.

pub mod annotation;
pub mod arith;
pub mod block_diag;
pub mod concat;
pub mod kronecker;
pub mod product;
pub mod scaled;
pub mod slice;
pub mod sum;
pub mod transpose;

use std::fmt;
use std::sync::Arc;

use faer::{Mat, MatRef};

use crate::core::scalar::{DType, Scalar};
use crate::core::traits::{LinearOperator, OpKind, Placement};
use crate::core::wrappers::{col_to_vec, vec_to_col};
use crate::error::OpError;

pub use annotation::Capabilities;
pub use block_diag::{BlockDiagOp, block_diag, block_diag_with_multiplicity};
pub use concat::{Axis, ConcatOp, concatenate};
pub use kronecker::{KroneckerOp, kron};
pub use product::ProductOp;
pub use scaled::ScaledOp;
pub use slice::{Index, SliceOp};
pub use sum::{SumOp, sum};
pub use transpose::TransposeOp;

/// Handle to an immutable linear operator.
#[derive(Clone)]
pub struct Operator<T: Scalar> {
    node: Arc<dyn LinearOperator<T>>,
    annotations: Capabilities,
}

impl<T: Scalar> Operator<T> {
    pub fn new<N: LinearOperator<T> + 'static>(node: N) -> Self {
        Self::from_arc(Arc::new(node))
    }

    pub fn from_arc(node: Arc<dyn LinearOperator<T>>) -> Self {
        Self { node, annotations: Capabilities::empty() }
    }

    pub fn node(&self) -> &dyn LinearOperator<T> {
        self.node.as_ref()
    }

    pub fn nrows(&self) -> usize {
        self.node.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.node.ncols()
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }

    pub fn is_square(&self) -> bool {
        self.nrows() == self.ncols()
    }

    pub fn dtype(&self) -> DType {
        T::DTYPE
    }

    pub fn kind(&self) -> OpKind {
        self.node.kind()
    }

    pub fn placement(&self) -> Placement {
        self.node.placement()
    }

    /// Properties asserted by the caller (or propagated by combinators).
    pub fn annotations(&self) -> Capabilities {
        self.annotations
    }

    /// Annotations together with the node's intrinsic properties; this is what dispatch sees.
    pub fn capabilities(&self) -> Capabilities {
        self.annotations | self.node.intrinsic()
    }

    pub fn is_self_adjoint(&self) -> bool {
        self.capabilities().is_self_adjoint()
    }

    pub fn is_psd(&self) -> bool {
        self.capabilities().is_psd()
    }

    /// A new handle to the same node carrying `caps` in addition to the existing annotations.
    pub fn annotate(&self, caps: Capabilities) -> Self {
        Self {
            node: Arc::clone(&self.node),
            annotations: self.annotations | caps,
        }
    }

    pub fn self_adjoint(&self) -> Self {
        self.annotate(Capabilities::SELF_ADJOINT)
    }

    pub fn psd(&self) -> Self {
        self.annotate(Capabilities::POSITIVE_SEMIDEFINITE)
    }

    /// Y = A · X.
    pub fn apply(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        if x.nrows() != self.ncols() {
            return Err(OpError::shape("apply", self.shape(), (x.nrows(), x.ncols())));
        }
        self.node.matvec(x)
    }

    /// Y = Aᵀ · X.
    pub fn apply_transpose(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        if x.nrows() != self.nrows() {
            return Err(OpError::shape("apply_transpose", self.shape(), (x.nrows(), x.ncols())));
        }
        self.node.mattransvec(x)
    }

    pub fn apply_vec(&self, x: &[T]) -> Result<Vec<T>, OpError> {
        let y = self.apply(vec_to_col(x).as_ref())?;
        Ok(col_to_vec(y.as_ref(), 0))
    }

    pub fn to_dense(&self) -> Result<Mat<T>, OpError> {
        self.node.to_dense()
    }

    pub fn downcast_ref<N: 'static>(&self) -> Option<&N> {
        self.node.as_any().downcast_ref::<N>()
    }

    /// True when both handles share the same node.
    pub fn ptr_eq(&self, other: &Operator<T>) -> bool {
        std::ptr::eq(
            Arc::as_ptr(&self.node) as *const (),
            Arc::as_ptr(&other.node) as *const (),
        )
    }

    pub fn t(&self) -> Self {
        transpose::transpose(self, false)
    }

    pub fn adjoint(&self) -> Self {
        transpose::transpose(self, true)
    }

    /// Composition `self · rhs`.
    pub fn matmul(&self, rhs: &Operator<T>) -> Result<Self, OpError> {
        product::compose(self, rhs)
    }

    pub fn scale(&self, c: T) -> Self {
        scaled::scale(self, c)
    }

    pub fn slice(&self, rows: Index, cols: Index) -> Result<Self, OpError> {
        slice::slice(self, rows, cols)
    }
}

impl<T: Scalar> fmt::Debug for Operator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("kind", &self.kind())
            .field("shape", &self.shape())
            .field("annotations", &self.annotations)
            .finish()
    }
}

/// Placement shared by all operands, or `PlacementMismatch`.
pub(crate) fn common_placement<T: Scalar>(ops: &[Operator<T>]) -> Result<Placement, OpError> {
    let mut iter = ops.iter();
    let first = iter.next().map(|op| op.placement()).unwrap_or_default();
    for op in iter {
        let p = op.placement();
        if p != first {
            return Err(OpError::PlacementMismatch { left: first, right: p });
        }
    }
    Ok(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseOperator;

    #[test]
    fn annotate_is_union() {
        let a = Operator::new(DenseOperator::new(Mat::<f64>::identity(3, 3)));
        let once = a.annotate(Capabilities::SELF_ADJOINT | Capabilities::POSITIVE_SEMIDEFINITE);
        let twice = a.self_adjoint().psd();
        assert_eq!(once.annotations(), twice.annotations());
        assert!(once.ptr_eq(&a));
        assert!(a.annotations().is_empty());
    }

    #[test]
    fn apply_rejects_wrong_rows() {
        let a = Operator::new(DenseOperator::new(Mat::<f64>::zeros(2, 3)));
        let x = Mat::<f64>::zeros(2, 1);
        assert!(matches!(a.apply(x.as_ref()), Err(OpError::Shape { .. })));
        assert!(a.apply_transpose(x.as_ref()).is_ok());
    }
}
