use std::sync::Arc;

use log::debug;

use super::node;
use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::context::registry::{Algorithm, Method, RuleTable, Signature, UnaryFn};
use crate::core::scalar::Scalar;
use crate::core::traits::OpKind;
use crate::error::OpError;
use crate::matrix::{Diagonal, Permutation, ScaledIdentity};
use crate::operator::block_diag::{BlockDiagOp, block_diag_with_multiplicity};
use crate::operator::kronecker::{KroneckerOp, kron};
use crate::operator::scaled::ScaledOp;
use crate::operator::transpose::TransposeOp;
use crate::operator::{Capabilities, Operator};
use crate::solver::inverse::inverse_source;
use crate::solver::{CholeskyFactorOp, InverseOp, LuFactorOp};

pub(super) fn install<T: Scalar>(t: &mut RuleTable<UnaryFn<T, Operator<T>>>) {
    t.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(diagonal::<T>));
    t.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(identity::<T>));
    t.register(Signature::kind(OpKind::ScaledIdentity), Algorithm::Identity, Arc::new(scaled_identity::<T>));
    t.register(Signature::kind(OpKind::Permutation), Algorithm::Permutation, Arc::new(permutation::<T>));
    t.register(Signature::kind(OpKind::Dense), Algorithm::Lu, Arc::new(dense_lu::<T>));
    t.register(
        Signature::kind(OpKind::Dense).requires(Capabilities::POSITIVE_SEMIDEFINITE),
        Algorithm::Cholesky,
        Arc::new(dense_cholesky::<T>),
    );
    t.register(Signature::kind(OpKind::Kronecker), Algorithm::Structural, Arc::new(kronecker::<T>));
    t.register(Signature::kind(OpKind::BlockDiagonal), Algorithm::Structural, Arc::new(block_diagonal::<T>));
    t.register(Signature::kind(OpKind::Transpose), Algorithm::Structural, Arc::new(transposed::<T>));
    t.register(Signature::kind(OpKind::Adjoint), Algorithm::Structural, Arc::new(transposed::<T>));
    t.register(Signature::kind(OpKind::Scaled), Algorithm::Structural, Arc::new(scaled::<T>));
    t.register(Signature::kind(OpKind::Inverse), Algorithm::Structural, Arc::new(inverse_of_inverse::<T>));
    t.register(Signature::generic(), Algorithm::Lazy, Arc::new(lazy::<T>));
}

fn diagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Operator<T>, OpError> {
    let d = node::<T, Diagonal<T>>(a)?;
    if let Some(i) = d.values().iter().position(|&v| v == T::zero()) {
        return Err(OpError::FactorError(format!("diagonal entry {i} is zero")));
    }
    let inv = d.values().iter().map(|&v| T::one() / v).collect();
    Ok(Operator::new(Diagonal::new(inv).with_placement(a.placement())))
}

fn identity<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Operator<T>, OpError> {
    Ok(a.clone())
}

fn scaled_identity<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Operator<T>, OpError> {
    let s = node::<T, ScaledIdentity<T>>(a)?;
    if s.scale() == T::zero() {
        return Err(OpError::FactorError("scaled identity with zero scale".into()));
    }
    Ok(Operator::new(
        ScaledIdentity::new(a.nrows(), T::one() / s.scale()).with_placement(a.placement()),
    ))
}

fn permutation<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Operator<T>, OpError> {
    Ok(Operator::new(node::<T, Permutation>(a)?.inverse()))
}

fn dense_lu<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Operator<T>, OpError> {
    Ok(Operator::new(LuFactorOp::new(a)?))
}

fn dense_cholesky<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Operator<T>, OpError> {
    match CholeskyFactorOp::new(a) {
        Ok(f) => Ok(Operator::new(f)),
        Err(e) => {
            debug!("inverse: {e}, falling back to LU");
            Ok(Operator::new(LuFactorOp::new(a)?))
        }
    }
}

/// `(A ⊗ B)⁻¹ = A⁻¹ ⊗ B⁻¹`.
fn kronecker<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    let k = node::<T, KroneckerOp<T>>(a)?;
    if !(k.left().is_square() && k.right().is_square()) {
        return lazy(ctx, a, opts);
    }
    let nested = opts.nested();
    kron(&ctx.inverse(k.left(), &nested)?, &ctx.inverse(k.right(), &nested)?)
}

fn block_diagonal<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    let bd = node::<T, BlockDiagOp<T>>(a)?;
    if !bd.blocks().iter().all(|(b, _)| b.is_square()) {
        return lazy(ctx, a, opts);
    }
    let nested = opts.nested();
    let blocks = bd
        .blocks()
        .iter()
        .map(|(b, copies)| Ok((ctx.inverse(b, &nested)?, *copies)))
        .collect::<Result<Vec<_>, OpError>>()?;
    block_diag_with_multiplicity(blocks)
}

/// `(Aᵀ)⁻¹ = (A⁻¹)ᵀ`.
fn transposed<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    let t = node::<T, TransposeOp<T>>(a)?;
    let inv = ctx.inverse(t.inner(), &opts.nested())?;
    Ok(if t.is_adjoint() { inv.adjoint() } else { inv.t() })
}

fn scaled<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    let s = node::<T, ScaledOp<T>>(a)?;
    if s.scale() == T::zero() {
        return Err(OpError::FactorError("inverse of a zero-scaled operator".into()));
    }
    Ok(ctx.inverse(s.inner(), &opts.nested())?.scale(T::one() / s.scale()))
}

fn inverse_of_inverse<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    match inverse_source(a) {
        Some(src) => Ok(src),
        None => lazy(ctx, a, opts),
    }
}

/// Defers to `solve` at application time. A forced or preferred lazy inverse dispatches
/// its solves normally; any other forced method is handed to those solves.
fn lazy<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Operator<T>, OpError> {
    let inner_opts = match opts.method {
        Method::Force(Algorithm::Lazy) | Method::Prefer(Algorithm::Lazy) => opts.nested(),
        _ => opts.clone(),
    };
    Ok(Operator::new(InverseOp::new(a, ctx.clone(), inner_opts)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use faer::Mat;

    fn inverse(a: &Operator<f64>) -> Operator<f64> {
        LinalgContext::default().inverse(a, &Options::default()).unwrap()
    }

    fn check_inverse(a: &Operator<f64>, inv: &Operator<f64>, eps: f64) {
        let n = a.nrows();
        let prod = inv.apply(a.to_dense().unwrap().as_ref()).unwrap();
        let eye = Mat::<f64>::identity(n, n);
        for j in 0..n {
            for i in 0..n {
                assert_abs_diff_eq!(prod[(i, j)], eye[(i, j)], epsilon = eps);
            }
        }
    }

    #[test]
    fn structured_inverses_stay_structured() {
        let d = Operator::diagonal(vec![1.0, 2.0, 4.0]);
        assert_eq!(inverse(&d).kind(), OpKind::Diagonal);
        assert_eq!(inverse(&d).apply_vec(&[1.0, 1.0, 1.0]).unwrap(), vec![1.0, 0.5, 0.25]);

        let p = Operator::<f64>::permutation(vec![2, 0, 1]).unwrap();
        assert_eq!(inverse(&p).kind(), OpKind::Permutation);
        check_inverse(&p, &inverse(&p), 0.0);

        let s = Operator::scaled_identity(3, 4.0);
        assert_eq!(inverse(&s).apply_vec(&[4.0, 8.0, 0.0]).unwrap(), vec![1.0, 2.0, 0.0]);

        let i = Operator::<f64>::identity(3);
        assert!(inverse(&i).ptr_eq(&i));
    }

    #[test]
    fn combinator_inverses_recurse() {
        let a = Operator::dense(Mat::from_fn(2, 2, |i, j| [[2.0, 1.0], [0.5, 3.0]][i][j]));
        let b = Operator::diagonal(vec![1.0, -2.0, 5.0]);
        let k = kron(&a, &b).unwrap();
        let inv = inverse(&k);
        assert_eq!(inv.kind(), OpKind::Kronecker);
        check_inverse(&k, &inv, 1e-13);

        let bd = block_diag_with_multiplicity(vec![(a.clone(), 2), (b.clone(), 1)]).unwrap();
        let inv = inverse(&bd);
        assert_eq!(inv.kind(), OpKind::BlockDiagonal);
        check_inverse(&bd, &inv, 1e-13);

        let t = a.t();
        check_inverse(&t, &inverse(&t), 1e-13);
        let s = a.scale(-3.0);
        check_inverse(&s, &inverse(&s), 1e-13);
    }

    #[test]
    fn inverse_of_inverse_is_source() {
        let a = Operator::dense(Mat::from_fn(3, 3, |i, j| if i == j { 3.0 } else { 1.0 }));
        let inv = inverse(&a);
        assert!(inverse(&inv).ptr_eq(&a));
    }

    #[test]
    fn singular_structured_inverse_fails() {
        let ctx = LinalgContext::default();
        let d = Operator::diagonal(vec![1.0, 0.0]);
        assert!(matches!(ctx.inverse(&d, &Options::default()), Err(OpError::FactorError(_))));
        let z = Operator::scaled_identity(2, 0.0);
        assert!(matches!(ctx.inverse(&z, &Options::default()), Err(OpError::FactorError(_))));
    }

    #[test]
    fn sums_are_inverted_lazily() {
        let a = (&Operator::diagonal(vec![2.0, 3.0, 4.0]) + &Operator::identity(3)).unwrap();
        let inv = inverse(&a);
        assert_eq!(inv.kind(), OpKind::Inverse);
        assert!(inv.downcast_ref::<InverseOp<f64>>().is_some());
        let x = inv.apply_vec(&[3.0, 4.0, 5.0]).unwrap();
        for xi in x {
            assert_abs_diff_eq!(xi, 1.0, epsilon = 1e-8);
        }
    }
}
