use std::sync::Arc;

use log::debug;

use super::{node, with_dense};
use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::context::registry::{Algorithm, RuleTable, Signature, UnaryFn};
use crate::core::scalar::{Scalar, from_usize};
use crate::core::traits::OpKind;
use crate::eigen::slq;
use crate::error::OpError;
use crate::matrix::{Diagonal, ScaledIdentity, Tridiagonal};
use crate::operator::{BlockDiagOp, Capabilities, KroneckerOp, Operator, ProductOp, ScaledOp, TransposeOp};
use crate::solver::direct::lu_slogdet;
use crate::solver::tridiagonal::tridiagonal_slogdet;

pub(super) fn install<T: Scalar>(t: &mut RuleTable<UnaryFn<T, T>>) {
    t.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(diagonal::<T>));
    t.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(zero::<T>));
    t.register(Signature::kind(OpKind::ScaledIdentity), Algorithm::Identity, Arc::new(scaled_identity::<T>));
    t.register(Signature::kind(OpKind::Permutation), Algorithm::Permutation, Arc::new(zero::<T>));
    t.register(Signature::kind(OpKind::Tridiagonal), Algorithm::Tridiagonal, Arc::new(tridiagonal::<T>));
    t.register(Signature::kind(OpKind::Dense), Algorithm::Lu, Arc::new(dense_lu::<T>));
    t.register(Signature::kind(OpKind::Kronecker), Algorithm::Structural, Arc::new(kronecker::<T>));
    t.register(Signature::kind(OpKind::BlockDiagonal), Algorithm::Structural, Arc::new(block_diagonal::<T>));
    t.register(Signature::kind(OpKind::Transpose), Algorithm::Structural, Arc::new(transposed::<T>));
    t.register(Signature::kind(OpKind::Adjoint), Algorithm::Structural, Arc::new(transposed::<T>));
    t.register(Signature::kind(OpKind::Scaled), Algorithm::Structural, Arc::new(scaled::<T>));
    t.register(Signature::kind(OpKind::Product), Algorithm::Structural, Arc::new(product::<T>));
    t.register(Signature::capability(Capabilities::POSITIVE_SEMIDEFINITE), Algorithm::Slq, Arc::new(slq_rule::<T>));
    t.register(Signature::generic(), Algorithm::Materialize, Arc::new(materialize::<T>));
}

fn log_abs<T: Scalar>(x: T) -> T {
    x.abs().ln()
}

fn diagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<T, OpError> {
    Ok(node::<T, Diagonal<T>>(a)?.values().iter().fold(T::zero(), |acc, &d| acc + log_abs(d)))
}

/// Identity and permutations have `|det| = 1`.
fn zero<T: Scalar>(_: &LinalgContext<T>, _: &Operator<T>, _: &Options<T>) -> Result<T, OpError> {
    Ok(T::zero())
}

fn scaled_identity<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<T, OpError> {
    let s = node::<T, ScaledIdentity<T>>(a)?.scale();
    Ok(from_usize::<T>(a.nrows()) * log_abs(s))
}

fn tridiagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<T, OpError> {
    match tridiagonal_slogdet(node::<T, Tridiagonal<T>>(a)?) {
        Some((_, logabs)) => Ok(logabs),
        None => {
            debug!("logdet: continuant recurrence broke down, using pivoted LU");
            Ok(lu_slogdet(a.to_dense()?.as_ref())?.1)
        }
    }
}

fn dense_lu<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<T, OpError> {
    with_dense(a, lu_slogdet).map(|(_, logabs)| logabs)
}

/// `log|det(A ⊗ B)| = p log|det A| + m log|det B|` for `A` of order `m`, `B` of order `p`.
fn kronecker<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    let k = node::<T, KroneckerOp<T>>(a)?;
    let (left, right) = (k.left(), k.right());
    if !(left.is_square() && right.is_square()) {
        return materialize(ctx, a, opts);
    }
    let nested = opts.nested();
    Ok(from_usize::<T>(right.nrows()) * ctx.logdet(left, &nested)?
        + from_usize::<T>(left.nrows()) * ctx.logdet(right, &nested)?)
}

fn block_diagonal<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    let bd = node::<T, BlockDiagOp<T>>(a)?;
    if !bd.blocks().iter().all(|(b, _)| b.is_square()) {
        return materialize(ctx, a, opts);
    }
    let nested = opts.nested();
    bd.blocks().iter().try_fold(T::zero(), |acc, (b, copies)| {
        Ok(acc + from_usize::<T>(*copies) * ctx.logdet(b, &nested)?)
    })
}

fn transposed<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    ctx.logdet(node::<T, TransposeOp<T>>(a)?.inner(), &opts.nested())
}

fn scaled<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    let s = node::<T, ScaledOp<T>>(a)?;
    Ok(from_usize::<T>(a.nrows()) * log_abs(s.scale()) + ctx.logdet(s.inner(), &opts.nested())?)
}

fn product<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    let p = node::<T, ProductOp<T>>(a)?;
    if !p.factors().iter().all(Operator::is_square) {
        return materialize(ctx, a, opts);
    }
    let nested = opts.nested();
    p.factors().iter().try_fold(T::zero(), |acc, f| Ok(acc + ctx.logdet(f, &nested)?))
}

/// Stochastic Lanczos quadrature of `tr log A`; zero Ritz values are clamped.
fn slq_rule<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    let est = slq(a, |x: T| x.max(T::min_positive_value()).ln(), opts)?;
    Ok(est.estimate)
}

fn materialize<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<T, OpError> {
    Ok(lu_slogdet(a.to_dense()?.as_ref())?.1)
}
