use std::sync::Arc;

use faer::Mat;

use super::node;
use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::context::registry::{Algorithm, Registry, RuleTable, Signature, UnaryFn};
use crate::core::scalar::Scalar;
use crate::core::traits::OpKind;
use crate::error::OpError;
use crate::matrix::{CsrMatrix, DenseOperator, Diagonal, Permutation, ScaledIdentity, Tridiagonal};
use crate::operator::{BlockDiagOp, KroneckerOp, Operator, ScaledOp, SumOp, TransposeOp};

/// Unit vectors applied per batch when probing a diagonal.
const PROBE_BATCH: usize = 64;

pub(super) fn install<T: Scalar>(reg: &mut Registry<T>) {
    install_diag(&mut reg.diag);

    let t = &mut reg.rowsum;
    t.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(diag_diagonal::<T>));
    t.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(diag_identity::<T>));
    t.register(Signature::kind(OpKind::ScaledIdentity), Algorithm::Identity, Arc::new(diag_scaled_identity::<T>));
    t.register(Signature::generic(), Algorithm::Probing, Arc::new(rowsum_apply_ones::<T>));

    reg.trace.register(Signature::generic(), Algorithm::Structural, Arc::new(trace_from_diag::<T>));
}

fn install_diag<T: Scalar>(t: &mut RuleTable<UnaryFn<T, Vec<T>>>) {
    t.register(Signature::kind(OpKind::Dense), Algorithm::Structural, Arc::new(diag_dense::<T>));
    t.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(diag_diagonal::<T>));
    t.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(diag_identity::<T>));
    t.register(Signature::kind(OpKind::ScaledIdentity), Algorithm::Identity, Arc::new(diag_scaled_identity::<T>));
    t.register(Signature::kind(OpKind::Permutation), Algorithm::Permutation, Arc::new(diag_permutation::<T>));
    t.register(Signature::kind(OpKind::Tridiagonal), Algorithm::Tridiagonal, Arc::new(diag_tridiagonal::<T>));
    t.register(Signature::kind(OpKind::Sparse), Algorithm::Structural, Arc::new(diag_sparse::<T>));
    t.register(Signature::kind(OpKind::Sum), Algorithm::Structural, Arc::new(diag_sum::<T>));
    t.register(Signature::kind(OpKind::Scaled), Algorithm::Structural, Arc::new(diag_scaled::<T>));
    t.register(Signature::kind(OpKind::Kronecker), Algorithm::Structural, Arc::new(diag_kronecker::<T>));
    t.register(Signature::kind(OpKind::BlockDiagonal), Algorithm::Structural, Arc::new(diag_block::<T>));
    t.register(Signature::kind(OpKind::Transpose), Algorithm::Structural, Arc::new(diag_transposed::<T>));
    t.register(Signature::kind(OpKind::Adjoint), Algorithm::Structural, Arc::new(diag_transposed::<T>));
    t.register(Signature::generic(), Algorithm::Probing, Arc::new(diag_probing::<T>));
}

fn diag_dense<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    let m = node::<T, DenseOperator<T>>(a)?.matrix();
    Ok((0..m.nrows()).map(|i| m[(i, i)]).collect())
}

fn diag_diagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    Ok(node::<T, Diagonal<T>>(a)?.values().to_vec())
}

fn diag_identity<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    Ok(vec![T::one(); a.nrows()])
}

fn diag_scaled_identity<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    Ok(vec![node::<T, ScaledIdentity<T>>(a)?.scale(); a.nrows()])
}

/// Fixed points of the permutation.
fn diag_permutation<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    let p = node::<T, Permutation>(a)?;
    Ok(p.indices()
        .iter()
        .enumerate()
        .map(|(i, &pi)| if pi == i { T::one() } else { T::zero() })
        .collect())
}

fn diag_tridiagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    Ok(node::<T, Tridiagonal<T>>(a)?.main().to_vec())
}

fn diag_sparse<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    Ok(node::<T, CsrMatrix<T>>(a)?.diagonal())
}

fn diag_sum<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
    let nested = opts.nested();
    let mut out = vec![T::zero(); a.nrows()];
    for term in node::<T, SumOp<T>>(a)?.terms() {
        for (o, d) in out.iter_mut().zip(ctx.diag(term, &nested)?) {
            *o += d;
        }
    }
    Ok(out)
}

fn diag_scaled<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
    let s = node::<T, ScaledOp<T>>(a)?;
    if !s.inner().is_square() {
        return diag_probing(ctx, a, opts);
    }
    let c = s.scale();
    Ok(ctx.diag(s.inner(), &opts.nested())?.into_iter().map(|d| c * d).collect())
}

/// `diag(A ⊗ B)[i p + k] = A_ii B_kk` for square `B` of order `p`.
fn diag_kronecker<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
    let k = node::<T, KroneckerOp<T>>(a)?;
    if !(k.left().is_square() && k.right().is_square()) {
        return diag_probing(ctx, a, opts);
    }
    let nested = opts.nested();
    let da = ctx.diag(k.left(), &nested)?;
    let db = ctx.diag(k.right(), &nested)?;
    Ok(da.iter().flat_map(|&x| db.iter().map(move |&y| x * y)).collect())
}

fn diag_block<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
    let bd = node::<T, BlockDiagOp<T>>(a)?;
    if !bd.blocks().iter().all(|(b, _)| b.is_square()) {
        return diag_probing(ctx, a, opts);
    }
    let nested = opts.nested();
    let mut out = Vec::with_capacity(a.nrows());
    for (b, copies) in bd.blocks() {
        let d = ctx.diag(b, &nested)?;
        for _ in 0..*copies {
            out.extend_from_slice(&d);
        }
    }
    Ok(out)
}

fn diag_transposed<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<Vec<T>, OpError> {
    ctx.diag(node::<T, TransposeOp<T>>(a)?.inner(), &opts.nested())
}

/// `e_iᵀ A e_i` from applications to batches of unit vectors.
fn diag_probing<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    let n = a.nrows();
    let mut out = Vec::with_capacity(n);
    for start in (0..n).step_by(PROBE_BATCH) {
        let width = PROBE_BATCH.min(n - start);
        let e = Mat::from_fn(n, width, |i, j| if i == start + j { T::one() } else { T::zero() });
        let y = a.apply(e.as_ref())?;
        out.extend((0..width).map(|j| y[(start + j, j)]));
    }
    Ok(out)
}

fn rowsum_apply_ones<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<Vec<T>, OpError> {
    a.apply_vec(&vec![T::one(); a.ncols()])
}

fn trace_from_diag<T: Scalar>(ctx: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<T, OpError> {
    Ok(ctx.diag(a, &opts.nested())?.into_iter().fold(T::zero(), |acc, d| acc + d))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::registry::Method;
    use crate::operator::{block_diag_with_multiplicity, kron};

    fn diag(a: &Operator<f64>) -> Vec<f64> {
        LinalgContext::default().diag(a, &Options::default()).unwrap()
    }

    fn probed(a: &Operator<f64>) -> Vec<f64> {
        LinalgContext::default()
            .diag(a, &Options::default().with_method(Method::Force(Algorithm::Probing)))
            .unwrap()
    }

    #[test]
    fn leaf_diagonals() {
        assert_eq!(diag(&Operator::diagonal(vec![1.0, 2.0])), vec![1.0, 2.0]);
        assert_eq!(diag(&Operator::scaled_identity(3, 2.0)), vec![2.0; 3]);
        assert_eq!(diag(&Operator::permutation(vec![0, 2, 1]).unwrap()), vec![1.0, 0.0, 0.0]);
        let t = Operator::tridiagonal(vec![1.0, 1.0], vec![-2.0, -3.0, -4.0], vec![5.0, 5.0]).unwrap();
        assert_eq!(diag(&t), vec![-2.0, -3.0, -4.0]);
        let s = Operator::csr(2, 2, vec![0, 2, 3], vec![0, 1, 1], vec![7.0, 1.0, 9.0]).unwrap();
        assert_eq!(diag(&s), vec![7.0, 9.0]);
    }

    #[test]
    fn combinator_diagonals_match_probing() {
        let a = Operator::dense(Mat::from_fn(2, 2, |i, j| (1 + i * 2 + j) as f64));
        let b = Operator::diagonal(vec![-1.0, 0.5, 2.0]);
        let cases = vec![
            kron(&a, &b).unwrap(),
            block_diag_with_multiplicity(vec![(a.clone(), 2), (b.clone(), 1)]).unwrap(),
            (&a + &Operator::identity(2)).unwrap(),
            a.scale(3.0),
            a.t(),
        ];
        for op in &cases {
            assert_eq!(diag(op), probed(op), "{op:?}");
        }
    }

    #[test]
    fn probing_crosses_batches() {
        let n = 2 * PROBE_BATCH + 3;
        let a = Operator::dense(Mat::from_fn(n, n, |i, j| if i == j { i as f64 } else { 1.0 }));
        let expected: Vec<f64> = (0..n).map(|i| i as f64).collect();
        assert_eq!(probed(&a), expected);
    }

    #[test]
    fn rowsum_and_trace() {
        let ctx = LinalgContext::default();
        let a = Operator::dense(Mat::from_fn(2, 3, |i, j| (i * 3 + j) as f64));
        assert_eq!(ctx.rowsum(&a, &Options::default()).unwrap(), vec![3.0, 12.0]);
        let s = Operator::scaled_identity(4, 2.5);
        assert_eq!(ctx.rowsum(&s, &Options::default()).unwrap(), vec![2.5; 4]);
        assert_eq!(ctx.trace(&s, &Options::default()).unwrap(), 10.0);
        assert_eq!(ctx.trace(&Operator::identity(3), &Options::default()).unwrap(), 3.0);
    }
}
