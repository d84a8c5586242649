//! Core linear-operator traits for matfree.

use std::any::Any;
use std::fmt;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::operator::annotation::Capabilities;

/// Shape query shared by every operator node.
pub trait MatShape {
    /// Number of rows.
    fn nrows(&self) -> usize;
    /// Number of columns.
    fn ncols(&self) -> usize;
    fn shape(&self) -> (usize, usize) {
        (self.nrows(), self.ncols())
    }
}

/// Structural tag of an operator node, the first key of dispatch.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
    Dense,
    Diagonal,
    Tridiagonal,
    Permutation,
    Sparse,
    Identity,
    ScaledIdentity,
    Sum,
    Scaled,
    Product,
    Transpose,
    Adjoint,
    Kronecker,
    BlockDiagonal,
    Slice,
    Concatenate,
    Inverse,
    MatrixFunction,
    Custom(&'static str),
}

/// Where an operator's data lives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Placement {
    #[default]
    Host,
    Device(u32),
}

/// A linear map defined by its action on blocks of column vectors.
///
/// Nodes assume the caller already checked `x.nrows()`; the [`Operator`](crate::Operator)
/// handle does that before delegating.
pub trait LinearOperator<T: Scalar>: MatShape + Send + Sync + fmt::Debug {
    fn kind(&self) -> OpKind;

    /// Y = A · X for an `ncols × k` block X.
    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError>;

    /// Y = Aᵀ · X for an `nrows × k` block X.
    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError>;

    /// Materializes the operator by applying it to the identity.
    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        let eye = Mat::<T>::identity(self.ncols(), self.ncols());
        self.matvec(eye.as_ref())
    }

    fn placement(&self) -> Placement {
        Placement::Host
    }

    /// Properties that hold by construction, independent of caller annotations.
    fn intrinsic(&self) -> Capabilities {
        Capabilities::empty()
    }

    fn as_any(&self) -> &dyn Any;
}
