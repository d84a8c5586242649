use std::sync::Arc;

use faer::{Mat, MatRef};
use log::debug;

use super::{exact, node, with_dense};
use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::context::registry::{Algorithm, RuleTable, Signature, SolveFn};
use crate::core::scalar::Scalar;
use crate::core::traits::OpKind;
use crate::error::OpError;
use crate::matrix::{Diagonal, ScaledIdentity, Tridiagonal};
use crate::operator::{Capabilities, Operator};
use crate::preconditioner::Preconditioner;
use crate::solver::direct::{cholesky_solve, lu_solve};
use crate::solver::tridiagonal::thomas_solve;
use crate::solver::{CgSolver, GmresSolver, LinearSolver, MinresSolver, Solution};

pub(super) fn install<T: Scalar>(t: &mut RuleTable<SolveFn<T>>) {
    t.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(diagonal::<T>));
    t.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(identity::<T>));
    t.register(Signature::kind(OpKind::ScaledIdentity), Algorithm::Identity, Arc::new(scaled_identity::<T>));
    t.register(Signature::kind(OpKind::Permutation), Algorithm::Permutation, Arc::new(permutation::<T>));
    t.register(Signature::kind(OpKind::Tridiagonal), Algorithm::Tridiagonal, Arc::new(tridiagonal::<T>));
    t.register(Signature::kind(OpKind::Dense), Algorithm::Lu, Arc::new(dense_lu::<T>));
    t.register(
        Signature::kind(OpKind::Dense).requires(Capabilities::POSITIVE_SEMIDEFINITE),
        Algorithm::Cholesky,
        Arc::new(dense_cholesky::<T>),
    );
    t.register(Signature::capability(Capabilities::POSITIVE_SEMIDEFINITE), Algorithm::Cg, Arc::new(cg::<T>));
    t.register(Signature::capability(Capabilities::SELF_ADJOINT), Algorithm::Minres, Arc::new(minres::<T>));
    t.register(Signature::generic(), Algorithm::Gmres, Arc::new(gmres::<T>));
}

fn preconditioner<T: Scalar>(opts: &Options<T>) -> Option<&dyn Preconditioner<T>> {
    opts.preconditioner.as_ref().map(|p| p as &dyn Preconditioner<T>)
}

fn scale_rows<T: Scalar>(d: &[T], b: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
    if let Some(i) = d.iter().position(|&v| v == T::zero()) {
        return Err(OpError::ZeroPivot(i));
    }
    Ok(Mat::from_fn(b.nrows(), b.ncols(), |i, j| b[(i, j)] / d[i]))
}

fn diagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, b: MatRef<'_, T>, _: &Options<T>) -> Result<Solution<T>, OpError> {
    let d = node::<T, Diagonal<T>>(a)?;
    Ok(exact(scale_rows(d.values(), b)?))
}

fn identity<T: Scalar>(_: &LinalgContext<T>, _: &Operator<T>, b: MatRef<'_, T>, _: &Options<T>) -> Result<Solution<T>, OpError> {
    Ok(exact(b.to_owned()))
}

fn scaled_identity<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    b: MatRef<'_, T>,
    _: &Options<T>,
) -> Result<Solution<T>, OpError> {
    let s = node::<T, ScaledIdentity<T>>(a)?.scale();
    Ok(exact(scale_rows(&vec![s; a.nrows()], b)?))
}

/// `P⁻¹ = Pᵀ`.
fn permutation<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, b: MatRef<'_, T>, _: &Options<T>) -> Result<Solution<T>, OpError> {
    Ok(exact(a.apply_transpose(b)?))
}

fn tridiagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, b: MatRef<'_, T>, _: &Options<T>) -> Result<Solution<T>, OpError> {
    let t = node::<T, Tridiagonal<T>>(a)?;
    match thomas_solve(t, b) {
        Ok(x) => Ok(exact(x)),
        Err(OpError::ZeroPivot(i)) => {
            debug!("thomas solve hit a zero pivot at row {i}, using pivoted LU");
            Ok(exact(lu_solve(a.to_dense()?.as_ref(), b)?))
        }
        Err(e) => Err(e),
    }
}

fn dense_lu<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, b: MatRef<'_, T>, _: &Options<T>) -> Result<Solution<T>, OpError> {
    with_dense(a, |m| lu_solve(m, b)).map(exact)
}

fn dense_cholesky<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    b: MatRef<'_, T>,
    _: &Options<T>,
) -> Result<Solution<T>, OpError> {
    with_dense(a, |m| cholesky_solve(m, b)).map(exact)
}

fn cg<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, b: MatRef<'_, T>, opts: &Options<T>) -> Result<Solution<T>, OpError> {
    CgSolver::from_options(opts).solve(a, preconditioner(opts), b)
}

fn minres<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, b: MatRef<'_, T>, opts: &Options<T>) -> Result<Solution<T>, OpError> {
    MinresSolver::from_options(opts).solve(a, preconditioner(opts), b)
}

fn gmres<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, b: MatRef<'_, T>, opts: &Options<T>) -> Result<Solution<T>, OpError> {
    GmresSolver::from_options(opts).solve(a, preconditioner(opts), b)
}
