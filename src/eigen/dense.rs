//! Dense symmetric eigensolver on top of faer.

use faer::{Mat, MatRef, Side};

use crate::core::scalar::{Scalar, cast};
use crate::core::wrappers::max_abs;
use crate::eigen::{EigResult, EigSelection};
use crate::error::OpError;
use crate::utils::convergence::{IterState, SolveStats};

/// True when `a` is square and `|a_ij - a_ji| ≤ tol · max|a|`.
pub fn is_symmetric<T: Scalar>(a: MatRef<'_, T>, tol: T) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    let scale = max_abs(a).max(T::one());
    (0..a.nrows()).all(|i| (0..i).all(|j| (a[(i, j)] - a[(j, i)]).abs() <= tol * scale))
}

/// All eigenpairs of a symmetric matrix, eigenvalues ascending.
pub fn symmetric_eigen<T: Scalar>(a: MatRef<'_, T>) -> Result<(Vec<T>, Mat<T>), OpError> {
    let evd = a
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| OpError::FactorError(format!("symmetric eigensolver: {e:?}")))?;
    let s = evd.S();
    let values = (0..a.nrows()).map(|i| s[i]).collect();
    Ok((values, evd.U().to_owned()))
}

/// The selected eigenpairs of the symmetric matrix `a`.
///
/// Non-symmetric input is rejected: its spectrum is complex in general.
pub fn dense_eig<T: Scalar>(a: MatRef<'_, T>, selection: &EigSelection) -> Result<EigResult<T>, OpError> {
    let n = a.nrows();
    selection.validate(n)?;
    if !is_symmetric(a, cast(1e-10)) {
        return Err(OpError::Unsupported("eigendecomposition of a non-symmetric matrix".into()));
    }
    let (values, vectors) = symmetric_eigen(a)?;
    let idx = selection.indices(n);
    let mut stats = SolveStats::new(T::zero());
    stats.state = IterState::Converged;
    Ok(EigResult {
        values: values[idx.clone()].to_vec(),
        vectors: vectors.as_ref().subcols(idx.start, idx.len()).to_owned(),
        stats,
    })
}
