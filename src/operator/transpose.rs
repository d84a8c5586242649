use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::Operator;

/// `Aᵀ` or `A*`. For real element types the two act identically and differ only in kind.
#[derive(Debug)]
pub struct TransposeOp<T: Scalar> {
    inner: Operator<T>,
    conjugate: bool,
}

impl<T: Scalar> TransposeOp<T> {
    pub fn inner(&self) -> &Operator<T> {
        &self.inner
    }

    pub fn is_adjoint(&self) -> bool {
        self.conjugate
    }
}

impl<T: Scalar> MatShape for TransposeOp<T> {
    fn nrows(&self) -> usize {
        self.inner.ncols()
    }
    fn ncols(&self) -> usize {
        self.inner.nrows()
    }
}

impl<T: Scalar> LinearOperator<T> for TransposeOp<T> {
    fn kind(&self) -> OpKind {
        if self.conjugate { OpKind::Adjoint } else { OpKind::Transpose }
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.inner.apply_transpose(x)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.inner.apply(x)
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        Ok(self.inner.to_dense()?.transpose().to_owned())
    }

    fn placement(&self) -> Placement {
        self.inner.placement()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Wraps `op` in a transpose, unwrapping `(Aᵀ)ᵀ` back to `A`.
pub fn transpose<T: Scalar>(op: &Operator<T>, conjugate: bool) -> Operator<T> {
    let caps = op.capabilities();
    if let Some(t) = op.downcast_ref::<TransposeOp<T>>() {
        return t.inner.annotate(caps);
    }
    Operator::new(TransposeOp { inner: op.clone(), conjugate }).annotate(caps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseOperator;

    #[test]
    fn double_transpose_is_original() {
        let a = Operator::new(DenseOperator::new(Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64)));
        let at = a.t();
        assert_eq!(at.shape(), (3, 2));
        assert_eq!(at.kind(), OpKind::Transpose);
        assert!(at.t().ptr_eq(&a));
        assert_eq!(a.adjoint().kind(), OpKind::Adjoint);
    }

    #[test]
    fn transpose_keeps_annotations() {
        let a = Operator::new(DenseOperator::new(Mat::<f64>::identity(3, 3))).psd();
        assert!(a.t().is_psd());
        assert!(a.adjoint().is_psd());
    }

    #[test]
    fn transpose_action() {
        let a = Operator::new(DenseOperator::new(Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64)));
        let y = a.t().apply_vec(&[1.0, 1.0]).unwrap();
        assert_eq!(y, vec![3.0, 5.0, 7.0]);
    }
}
