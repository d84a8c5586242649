use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::annotation::Capabilities;

/// The `n × n` identity.
#[derive(Debug, Clone)]
pub struct Identity {
    n: usize,
    placement: Placement,
}

impl Identity {
    pub fn new(n: usize) -> Self {
        Self { n, placement: Placement::Host }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }
}

impl MatShape for Identity {
    fn nrows(&self) -> usize {
        self.n
    }
    fn ncols(&self) -> usize {
        self.n
    }
}

impl<T: Scalar> LinearOperator<T> for Identity {
    fn kind(&self) -> OpKind {
        OpKind::Identity
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(x.to_owned())
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(x.to_owned())
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        Ok(Mat::identity(self.n, self.n))
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn intrinsic(&self) -> Capabilities {
        Capabilities::POSITIVE_SEMIDEFINITE
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `c · I`.
#[derive(Debug, Clone)]
pub struct ScaledIdentity<T: Scalar> {
    n: usize,
    scale: T,
    placement: Placement,
}

impl<T: Scalar> ScaledIdentity<T> {
    pub fn new(n: usize, scale: T) -> Self {
        Self { n, scale, placement: Placement::Host }
    }

    pub fn with_placement(mut self, placement: Placement) -> Self {
        self.placement = placement;
        self
    }

    pub fn scale(&self) -> T {
        self.scale
    }
}

impl<T: Scalar> MatShape for ScaledIdentity<T> {
    fn nrows(&self) -> usize {
        self.n
    }
    fn ncols(&self) -> usize {
        self.n
    }
}

impl<T: Scalar> LinearOperator<T> for ScaledIdentity<T> {
    fn kind(&self) -> OpKind {
        OpKind::ScaledIdentity
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Ok(Mat::from_fn(x.nrows(), x.ncols(), |i, j| self.scale * x[(i, j)]))
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.matvec(x)
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        Ok(Mat::from_fn(self.n, self.n, |i, j| if i == j { self.scale } else { T::zero() }))
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn intrinsic(&self) -> Capabilities {
        if self.scale >= T::zero() {
            Capabilities::POSITIVE_SEMIDEFINITE
        } else {
            Capabilities::SELF_ADJOINT
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
