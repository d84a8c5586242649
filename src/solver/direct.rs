//! Direct dense solvers using Faer: LU and Cholesky factorizations.
//!
//! Besides one-shot solves, the factorizations are wrapped as operators
//! ([`LuFactorOp`], [`CholeskyFactorOp`]) so that `inverse(A)` of a dense matrix factors once
//! and then applies `A⁻¹` with triangular solves.
//!
//! # References
//! - Golub & Van Loan, Matrix Computations

use std::any::Any;
use std::fmt;

use faer::linalg::solvers::{Llt, PartialPivLu, SolveCore};
use faer::{Conj, Mat, MatRef, Side};
use log::debug;

use crate::core::scalar::{Scalar, from_usize};
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::matrix::permutation::permutation_sign;
use crate::operator::Operator;

/// LU with partial (row) pivoting; rejects numerically singular matrices.
pub fn lu_factor<T: Scalar>(a: MatRef<'_, T>) -> Result<PartialPivLu<T>, OpError> {
    if a.nrows() != a.ncols() {
        return Err(OpError::shape("lu", (a.nrows(), a.ncols()), (a.ncols(), a.nrows())));
    }
    let lu = a.partial_piv_lu();
    let u = lu.U();
    let n = u.nrows();
    let pivot_max = (0..n).fold(T::zero(), |m, i| m.max(u[(i, i)].abs()));
    let threshold = pivot_max * T::epsilon() * from_usize::<T>(n.max(1));
    if let Some(i) = (0..n).find(|&i| !(u[(i, i)].abs() > threshold)) {
        return Err(OpError::FactorError(format!("matrix is singular (pivot {i})")));
    }
    Ok(lu)
}

/// Solve A X = B with partially pivoted LU.
pub fn lu_solve<T: Scalar>(a: MatRef<'_, T>, b: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
    let lu = lu_factor(a)?;
    let mut x = b.to_owned();
    lu.solve_in_place_with_conj(Conj::No, x.as_mut());
    Ok(x)
}

/// Solve A X = B with Cholesky, falling back to LU when `A` is not numerically positive
/// definite.
pub fn cholesky_solve<T: Scalar>(a: MatRef<'_, T>, b: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
    match a.llt(Side::Lower) {
        Ok(llt) => {
            let mut x = b.to_owned();
            llt.solve_in_place_with_conj(Conj::No, x.as_mut());
            Ok(x)
        }
        Err(e) => {
            debug!("cholesky failed ({e:?}), falling back to LU");
            lu_solve(a, b)
        }
    }
}

/// `(sign, log|det A|)` from a partially pivoted LU; sign is zero for singular matrices.
pub fn lu_slogdet<T: Scalar>(a: MatRef<'_, T>) -> Result<(T, T), OpError> {
    if a.nrows() != a.ncols() {
        return Err(OpError::shape("logdet", (a.nrows(), a.ncols()), (a.ncols(), a.nrows())));
    }
    let lu = a.partial_piv_lu();
    let u = lu.U();
    let mut sign = permutation_sign(lu.P().arrays().0);
    let mut logabs = T::zero();
    for i in 0..u.nrows() {
        let d = u[(i, i)];
        if d == T::zero() {
            return Ok((T::zero(), T::neg_infinity()));
        }
        if d < T::zero() {
            sign = -sign;
        }
        logabs += d.abs().ln();
    }
    Ok((if sign > 0 { T::one() } else { -T::one() }, logabs))
}

/// `A⁻¹` backed by a partially pivoted LU factorization.
pub struct LuFactorOp<T: Scalar> {
    lu: PartialPivLu<T>,
    source: Operator<T>,
}

impl<T: Scalar> LuFactorOp<T> {
    pub fn new(source: &Operator<T>) -> Result<Self, OpError> {
        let dense = source.to_dense()?;
        Ok(Self { lu: lu_factor(dense.as_ref())?, source: source.clone() })
    }

    /// The operator this is the inverse of.
    pub fn source(&self) -> &Operator<T> {
        &self.source
    }
}

impl<T: Scalar> fmt::Debug for LuFactorOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LuFactorOp").field("source", &self.source).finish()
    }
}

impl<T: Scalar> MatShape for LuFactorOp<T> {
    fn nrows(&self) -> usize {
        self.source.ncols()
    }
    fn ncols(&self) -> usize {
        self.source.nrows()
    }
}

impl<T: Scalar> LinearOperator<T> for LuFactorOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Inverse
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = x.to_owned();
        self.lu.solve_in_place_with_conj(Conj::No, y.as_mut());
        Ok(y)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = x.to_owned();
        self.lu.solve_transpose_in_place_with_conj(Conj::No, y.as_mut());
        Ok(y)
    }

    fn placement(&self) -> Placement {
        self.source.placement()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `A⁻¹` backed by a Cholesky factorization of a symmetric positive definite `A`.
pub struct CholeskyFactorOp<T: Scalar> {
    llt: Llt<T>,
    source: Operator<T>,
}

impl<T: Scalar> CholeskyFactorOp<T> {
    pub fn new(source: &Operator<T>) -> Result<Self, OpError> {
        let dense = source.to_dense()?;
        let llt = dense
            .as_ref()
            .llt(Side::Lower)
            .map_err(|e| OpError::FactorError(format!("cholesky: {e:?}")))?;
        Ok(Self { llt, source: source.clone() })
    }

    pub fn source(&self) -> &Operator<T> {
        &self.source
    }

    /// `log det A = 2 Σ log L_ii`.
    pub fn logdet(&self) -> T {
        let l = self.llt.L();
        (0..l.nrows()).fold(T::zero(), |acc, i| acc + l[(i, i)].ln()) * (T::one() + T::one())
    }
}

impl<T: Scalar> fmt::Debug for CholeskyFactorOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CholeskyFactorOp").field("source", &self.source).finish()
    }
}

impl<T: Scalar> MatShape for CholeskyFactorOp<T> {
    fn nrows(&self) -> usize {
        self.source.nrows()
    }
    fn ncols(&self) -> usize {
        self.source.ncols()
    }
}

impl<T: Scalar> LinearOperator<T> for CholeskyFactorOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Inverse
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = x.to_owned();
        self.llt.solve_in_place_with_conj(Conj::No, y.as_mut());
        Ok(y)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.matvec(x)
    }

    fn placement(&self) -> Placement {
        self.source.placement()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
