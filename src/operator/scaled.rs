use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::matrix::{Identity, ScaledIdentity};
use crate::operator::Operator;

/// `c · A`.
#[derive(Debug)]
pub struct ScaledOp<T: Scalar> {
    scale: T,
    inner: Operator<T>,
}

impl<T: Scalar> ScaledOp<T> {
    pub fn scale(&self) -> T {
        self.scale
    }

    pub fn inner(&self) -> &Operator<T> {
        &self.inner
    }
}

fn scaled<T: Scalar>(c: T, y: Mat<T>) -> Mat<T> {
    Mat::from_fn(y.nrows(), y.ncols(), |i, j| c * y[(i, j)])
}

impl<T: Scalar> MatShape for ScaledOp<T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
}

impl<T: Scalar> LinearOperator<T> for ScaledOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Scaled
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(scaled(self.scale, self.inner.apply(x)?))
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(scaled(self.scale, self.inner.apply_transpose(x)?))
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        Ok(scaled(self.scale, self.inner.to_dense()?))
    }

    fn placement(&self) -> Placement {
        self.inner.placement()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `c · op`, folding repeated scalings and scaled identities.
pub fn scale<T: Scalar>(op: &Operator<T>, c: T) -> Operator<T> {
    let caps = op.capabilities().of_scaled(c >= T::zero());
    let placement = op.placement();
    if op.downcast_ref::<Identity>().is_some() {
        return Operator::new(ScaledIdentity::new(op.nrows(), c).with_placement(placement)).annotate(caps);
    }
    if let Some(s) = op.downcast_ref::<ScaledIdentity<T>>() {
        let node = ScaledIdentity::new(op.nrows(), c * s.scale()).with_placement(placement);
        return Operator::new(node).annotate(caps);
    }
    let node = match op.downcast_ref::<ScaledOp<T>>() {
        Some(s) => ScaledOp { scale: c * s.scale, inner: s.inner.clone() },
        None => ScaledOp { scale: c, inner: op.clone() },
    };
    Operator::new(node).annotate(caps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::DenseOperator;
    use crate::operator::Capabilities;

    #[test]
    fn repeated_scaling_folds() {
        let a = Operator::new(DenseOperator::new(Mat::<f64>::identity(2, 2))).psd();
        let b = scale(&scale(&a, 2.0), 3.0);
        let node = b.downcast_ref::<ScaledOp<f64>>().unwrap();
        assert_eq!(node.scale(), 6.0);
        assert!(node.inner().ptr_eq(&a));
        assert!(b.is_psd());
    }

    #[test]
    fn negative_scale_keeps_only_self_adjoint() {
        let a = Operator::new(DenseOperator::new(Mat::<f64>::identity(2, 2))).psd();
        let b = scale(&a, -1.0);
        assert_eq!(b.annotations(), Capabilities::SELF_ADJOINT);
    }

    #[test]
    fn scaled_identity_stays_a_leaf() {
        let i = Operator::<f64>::new(Identity::new(4));
        let s = scale(&i, 2.5);
        assert_eq!(s.kind(), OpKind::ScaledIdentity);
        assert_eq!(s.apply_vec(&[1.0, 2.0, 3.0, 4.0]).unwrap(), vec![2.5, 5.0, 7.5, 10.0]);
    }
}
