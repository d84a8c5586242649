use std::sync::Arc;

use faer::Mat;

use super::{node, settled, with_dense};
use crate::config::options::Options;
use crate::context::linalg_context::LinalgContext;
use crate::context::registry::{Algorithm, EigFn, RuleTable, Signature, UnaryFn};
use crate::core::scalar::Scalar;
use crate::core::traits::OpKind;
use crate::eigen::dense::{dense_eig, symmetric_eigen};
use crate::eigen::{DominantEig, EigResult, EigSelection, lanczos_eig, power_iteration};
use crate::error::OpError;
use crate::matrix::{Diagonal, ScaledIdentity};
use crate::operator::{Capabilities, Operator};

pub(super) fn install<T: Scalar>(eig: &mut RuleTable<EigFn<T>>, eigmax: &mut RuleTable<UnaryFn<T, DominantEig<T>>>) {
    eig.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(eig_diagonal::<T>));
    eig.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(eig_identity::<T>));
    eig.register(Signature::kind(OpKind::ScaledIdentity), Algorithm::Identity, Arc::new(eig_scaled_identity::<T>));
    eig.register(
        Signature::kind(OpKind::Dense).requires(Capabilities::SELF_ADJOINT),
        Algorithm::DenseEigen,
        Arc::new(eig_dense::<T>),
    );
    eig.register(Signature::capability(Capabilities::SELF_ADJOINT), Algorithm::Lanczos, Arc::new(eig_lanczos::<T>));
    eig.register(Signature::generic(), Algorithm::Materialize, Arc::new(eig_materialize::<T>));

    eigmax.register(Signature::kind(OpKind::Diagonal), Algorithm::Diagonal, Arc::new(eigmax_diagonal::<T>));
    eigmax.register(Signature::kind(OpKind::Identity), Algorithm::Identity, Arc::new(eigmax_identity::<T>));
    eigmax.register(
        Signature::kind(OpKind::ScaledIdentity),
        Algorithm::Identity,
        Arc::new(eigmax_scaled_identity::<T>),
    );
    eigmax.register(
        Signature::kind(OpKind::Dense).requires(Capabilities::SELF_ADJOINT),
        Algorithm::DenseEigen,
        Arc::new(eigmax_dense::<T>),
    );
    eigmax.register(
        Signature::capability(Capabilities::SELF_ADJOINT),
        Algorithm::Lanczos,
        Arc::new(eigmax_lanczos_both_ends::<T>),
    );
    eigmax.register(
        Signature::capability(Capabilities::POSITIVE_SEMIDEFINITE),
        Algorithm::Lanczos,
        Arc::new(eigmax_lanczos::<T>),
    );
    eigmax.register(Signature::generic(), Algorithm::Power, Arc::new(eigmax_power::<T>));
}

fn unit<T: Scalar>(n: usize, i: usize) -> Vec<T> {
    let mut e = vec![T::zero(); n];
    e[i] = T::one();
    e
}

/// Eigenpairs of `diag(values)`: sorted values, unit vectors in matching order.
fn sorted_diagonal<T: Scalar>(values: &[T], selection: &EigSelection) -> EigResult<T> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&i, &j| values[i].partial_cmp(&values[j]).unwrap_or(std::cmp::Ordering::Equal));
    let picked = &order[selection.indices(n)];
    EigResult {
        values: picked.iter().map(|&i| values[i]).collect(),
        vectors: Mat::from_fn(n, picked.len(), |i, j| if picked[j] == i { T::one() } else { T::zero() }),
        stats: settled(),
    }
}

fn eig_diagonal<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    selection: &EigSelection,
    _: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    Ok(sorted_diagonal(node::<T, Diagonal<T>>(a)?.values(), selection))
}

fn eig_identity<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    selection: &EigSelection,
    _: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    Ok(sorted_diagonal(&vec![T::one(); a.nrows()], selection))
}

fn eig_scaled_identity<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    selection: &EigSelection,
    _: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    let s = node::<T, ScaledIdentity<T>>(a)?.scale();
    Ok(sorted_diagonal(&vec![s; a.nrows()], selection))
}

fn eig_dense<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    selection: &EigSelection,
    _: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    with_dense(a, |m| dense_eig(m, selection))
}

fn eig_lanczos<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    selection: &EigSelection,
    opts: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    lanczos_eig(a, selection, opts)
}

fn eig_materialize<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    selection: &EigSelection,
    _: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    dense_eig(a.to_dense()?.as_ref(), selection)
}

fn eigmax_diagonal<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<DominantEig<T>, OpError> {
    let d = node::<T, Diagonal<T>>(a)?.values();
    let i = (0..d.len())
        .reduce(|best, i| if d[i].abs() > d[best].abs() { i } else { best })
        .ok_or_else(|| OpError::InvalidInput("eigmax of an empty operator".into()))?;
    Ok(DominantEig { value: d[i], vector: unit(d.len(), i), stats: settled() })
}

fn constant_dominant<T: Scalar>(n: usize, value: T) -> Result<DominantEig<T>, OpError> {
    if n == 0 {
        return Err(OpError::InvalidInput("eigmax of an empty operator".into()));
    }
    Ok(DominantEig { value, vector: unit(n, 0), stats: settled() })
}

fn eigmax_identity<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<DominantEig<T>, OpError> {
    constant_dominant(a.nrows(), T::one())
}

fn eigmax_scaled_identity<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    _: &Options<T>,
) -> Result<DominantEig<T>, OpError> {
    constant_dominant(a.nrows(), node::<T, ScaledIdentity<T>>(a)?.scale())
}

fn eigmax_dense<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, _: &Options<T>) -> Result<DominantEig<T>, OpError> {
    let (values, u) = with_dense(a, symmetric_eigen)?;
    let i = (0..values.len())
        .reduce(|best, i| if values[i].abs() > values[best].abs() { i } else { best })
        .ok_or_else(|| OpError::InvalidInput("eigmax of an empty operator".into()))?;
    Ok(DominantEig {
        value: values[i],
        vector: (0..u.nrows()).map(|r| u[(r, i)]).collect(),
        stats: settled(),
    })
}

fn dominant_from<T: Scalar>(res: EigResult<T>) -> DominantEig<T> {
    DominantEig {
        value: res.values[0],
        vector: (0..res.vectors.nrows()).map(|r| res.vectors[(r, 0)]).collect(),
        stats: res.stats,
    }
}

/// The spectrum of a PSD operator is non-negative, so the top end dominates.
fn eigmax_lanczos<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<DominantEig<T>, OpError> {
    lanczos_eig(a, &EigSelection::largest(1), opts).map(dominant_from)
}

fn eigmax_lanczos_both_ends<T: Scalar>(
    _: &LinalgContext<T>,
    a: &Operator<T>,
    opts: &Options<T>,
) -> Result<DominantEig<T>, OpError> {
    let top = lanczos_eig(a, &EigSelection::largest(1), opts)?;
    let bottom = lanczos_eig(a, &EigSelection::smallest(1), opts)?;
    Ok(if bottom.values[0].abs() > top.values[0].abs() { dominant_from(bottom) } else { dominant_from(top) })
}

fn eigmax_power<T: Scalar>(_: &LinalgContext<T>, a: &Operator<T>, opts: &Options<T>) -> Result<DominantEig<T>, OpError> {
    power_iteration(a, opts)
}
