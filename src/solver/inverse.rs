//! Lazily solved inverse: `A⁻¹ X` dispatches `solve(A, X)` on every apply.

use std::any::Any;
use std::fmt;

use faer::{Mat, MatRef};

use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::Operator;
use crate::solver::direct::{CholeskyFactorOp, LuFactorOp};

/// `A⁻¹` without a closed form. Applying it runs the solver the context resolves for `A`;
/// a solve that stops without converging surfaces as `DidNotConverge`.
#[derive(Clone)]
pub struct InverseOp<T: Scalar> {
    inner: Operator<T>,
    ctx: LinalgContext<T>,
    opts: Options<T>,
}

impl<T: Scalar> InverseOp<T> {
    pub fn new(inner: &Operator<T>, ctx: LinalgContext<T>, opts: Options<T>) -> Self {
        Self { inner: inner.clone(), ctx, opts }
    }

    /// The operator this is the inverse of.
    pub fn source(&self) -> &Operator<T> {
        &self.inner
    }

    pub fn options(&self) -> &Options<T> {
        &self.opts
    }
}

impl<T: Scalar> fmt::Debug for InverseOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InverseOp")
            .field("inner", &self.inner)
            .field("method", &self.opts.method)
            .finish()
    }
}

impl<T: Scalar> MatShape for InverseOp<T> {
    fn nrows(&self) -> usize {
        self.inner.ncols()
    }
    fn ncols(&self) -> usize {
        self.inner.nrows()
    }
}

impl<T: Scalar> LinearOperator<T> for InverseOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Inverse
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.ctx.solve(&self.inner, x, &self.opts)?.into_result()
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        // A⁻ᵀ = (Aᵀ)⁻¹
        self.ctx.solve(&self.inner.t(), x, &self.opts)?.into_result()
    }

    fn placement(&self) -> Placement {
        self.inner.placement()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `A` when `op` is some inverse of `A`, built lazily or from a factorization.
pub fn inverse_source<T: Scalar>(op: &Operator<T>) -> Option<Operator<T>> {
    if let Some(inv) = op.downcast_ref::<InverseOp<T>>() {
        return Some(inv.source().clone());
    }
    if let Some(lu) = op.downcast_ref::<LuFactorOp<T>>() {
        return Some(lu.source().clone());
    }
    op.downcast_ref::<CholeskyFactorOp<T>>().map(|ch| ch.source().clone())
}
