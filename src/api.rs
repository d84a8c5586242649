//! Free-function entry points running on a default [`LinalgContext`].
//!
//! Each call builds the default rule set; hold a `LinalgContext` to reuse it or to register
//! custom rules.

use faer::MatRef;

use crate::config::options::Options;
use crate::context::LinalgContext;
use crate::core::scalar::Scalar;
use crate::eigen::{self, DominantEig, EigResult, EigSelection, Lanczos, LanczosDecomposition, SlqEstimate, SpectralDensity};
use crate::error::OpError;
use crate::operator::Operator;
use crate::preconditioner::Preconditioner;
use crate::solver::{CgSolver, LinearSolver, Solution};

/// Solves `A X = B` with the dispatched method.
pub fn solve<T: Scalar>(a: &Operator<T>, b: MatRef<'_, T>, opts: &Options<T>) -> Result<Solution<T>, OpError> {
    LinalgContext::default().solve(a, b, opts)
}

/// `A⁻¹` as an operator.
pub fn inverse<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    LinalgContext::default().inverse(a, opts)
}

pub fn eig<T: Scalar>(a: &Operator<T>, selection: &EigSelection, opts: &Options<T>) -> Result<EigResult<T>, OpError> {
    LinalgContext::default().eig(a, selection, opts)
}

pub fn eigmax<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<DominantEig<T>, OpError> {
    LinalgContext::default().eigmax(a, opts)
}

/// `log |det A|`.
pub fn logdet<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    LinalgContext::default().logdet(a, opts)
}

pub fn diag<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
    LinalgContext::default().diag(a, opts)
}

pub fn rowsum<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
    LinalgContext::default().rowsum(a, opts)
}

pub fn trace<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    LinalgContext::default().trace(a, opts)
}

pub fn exp<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    LinalgContext::default().exp(a, opts)
}

pub fn sqrt<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    LinalgContext::default().sqrt(a, opts)
}

pub fn pow<T: Scalar>(a: &Operator<T>, p: T, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    LinalgContext::default().pow(a, p, opts)
}

/// Stochastic Lanczos quadrature estimate of `tr f(A)` for self-adjoint `A`.
pub fn slq_trace<T: Scalar>(
    a: &Operator<T>,
    f: impl Fn(T) -> T + Sync,
    opts: &Options<T>,
) -> Result<SlqEstimate<T>, OpError> {
    eigen::slq(a, f, opts)
}

pub fn slq_spectral_density<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<SpectralDensity<T>, OpError> {
    eigen::slq_spectral_density(a, opts)
}

/// Block conjugate gradients on `A X = B`, bypassing dispatch. `A` must be SPD.
pub fn cg<T: Scalar>(a: &Operator<T>, b: MatRef<'_, T>, opts: &Options<T>) -> Result<Solution<T>, OpError> {
    if !a.is_square() || b.nrows() != a.nrows() {
        return Err(OpError::shape("cg", a.shape(), (b.nrows(), b.ncols())));
    }
    let pc = opts.preconditioner.as_ref().map(|p| p as &dyn Preconditioner<T>);
    CgSolver::from_options(opts).solve(a, pc, b)
}

/// A Lanczos decomposition of self-adjoint `A` started at `start`, at most
/// `opts.krylov_depth` steps.
pub fn lanczos<T: Scalar>(
    a: &Operator<T>,
    start: MatRef<'_, T>,
    opts: &Options<T>,
) -> Result<LanczosDecomposition<T>, OpError> {
    Lanczos::from_options(opts).run(a, start)
}
