//! Lazy `f(A)` through a Krylov projection.
//!
//! For each right-hand side `b`, `f(A) b ≈ ‖b‖ V_m f(H_m) e₁`, where `H_m` is the Lanczos
//! tridiagonal (self-adjoint `A`) or the Arnoldi Hessenberg matrix (general `A`). The depth
//! grows in steps of `krylov_depth` until the a posteriori estimate
//! `‖b‖ h_{m+1,m} |e_mᵀ f(H_m) e₁|` falls below `tol · ‖f(A) b‖`, the space becomes invariant,
//! or `max_iters` steps were taken (`DidNotConverge`).

use std::any::Any;
use std::fmt;

use faer::{Mat, MatRef};
use log::trace;

use crate::config::options::{Options, Reorthogonalization};
use crate::core::scalar::{Scalar, cast, to_f64};
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::core::wrappers::{col_axpy, col_dot, col_norm, copy_col};
use crate::eigen::lanczos::{Lanczos, LanczosDecomposition};
use crate::error::OpError;
use crate::function::MatrixFunction;
use crate::function::dense::{general_function, symmetric_function};
use crate::operator::Operator;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Projection {
    /// Three-term recurrence; requires a self-adjoint operand.
    Lanczos,
    Arnoldi,
}

#[derive(Clone)]
pub struct KrylovFunctionOp<T: Scalar> {
    inner: Operator<T>,
    f: MatrixFunction<T>,
    projection: Projection,
    depth: usize,
    max_depth: usize,
    tol: T,
    reorth: Reorthogonalization,
}

impl<T: Scalar> KrylovFunctionOp<T> {
    pub fn new(inner: &Operator<T>, f: MatrixFunction<T>, projection: Projection, opts: &Options<T>) -> Self {
        Self {
            inner: inner.clone(),
            f,
            projection,
            depth: opts.krylov_depth.max(1),
            max_depth: opts.max_iters.max(opts.krylov_depth),
            tol: opts.tol,
            reorth: opts.reorthogonalization,
        }
    }

    pub fn function(&self) -> MatrixFunction<T> {
        self.f
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn inner(&self) -> &Operator<T> {
        &self.inner
    }

    /// `(‖b‖ f(T_m) e₁, relative error estimate)`.
    fn lanczos_coefficients(&self, dec: &LanczosDecomposition<T>) -> Result<(Vec<T>, T), OpError> {
        let fm = symmetric_function(dec.tridiagonal().as_ref(), &self.f)?;
        Ok(coefficients(fm.as_ref(), dec.b_norm, dec.residual_beta))
    }

    fn lanczos_column(&self, b: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let n = b.nrows();
        let cap = self.max_depth.min(n);
        let lanczos = Lanczos::new(cap).with_reorthogonalization(self.reorth);
        let dec = lanczos.run_until(&self.inner, b, |dec| {
            if dec.steps_taken % self.depth != 0 {
                return Ok(false);
            }
            let (_, rel) = self.lanczos_coefficients(dec)?;
            trace!("krylov {} (lanczos) depth {}: estimate {rel}", self.f.name(), dec.steps_taken);
            Ok(rel <= self.tol)
        })?;
        let (coeff, rel) = self.lanczos_coefficients(&dec)?;
        if !(dec.breakdown || dec.steps_taken >= n || rel <= self.tol) {
            return Err(OpError::DidNotConverge { iterations: dec.steps_taken, residual: to_f64(rel) });
        }
        Ok(combine(dec.basis.as_ref(), &coeff))
    }

    fn arnoldi_column(&self, op: &Operator<T>, b: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let n = b.nrows();
        let cap = self.max_depth.min(n);
        let b_norm = col_norm(b, 0);
        let inv = T::one() / b_norm;
        let mut basis = vec![Mat::from_fn(n, 1, |i, _| b[(i, 0)] * inv)];
        let mut h = Mat::<T>::zeros(cap + 1, cap);
        let mut h_scale = T::zero();
        for j in 0..cap {
            let mut w = op.apply(basis[j].as_ref())?;
            for _ in 0..2 {
                for (i, v) in basis.iter().enumerate() {
                    let c = col_dot(v.as_ref(), w.as_ref(), 0);
                    h[(i, j)] += c;
                    col_axpy(-c, v.as_ref(), w.as_mut(), 0);
                }
            }
            let hn = col_norm(w.as_ref(), 0);
            h[(j + 1, j)] = hn;
            h_scale = (0..=j + 1).fold(h_scale, |acc, i| acc.max(h[(i, j)].abs()));
            let m = j + 1;
            let invariant = !(hn > T::epsilon() * cast(100.0) * h_scale);
            if invariant || m == cap || m % self.depth == 0 {
                let fm = general_function(h.as_ref().get(0..m, 0..m), &self.f)?;
                let residual_h = if invariant { T::zero() } else { hn };
                let (coeff, rel) = coefficients(fm.as_ref(), b_norm, residual_h);
                trace!("krylov {} (arnoldi) depth {m}: estimate {rel}", self.f.name());
                if invariant || m >= n || rel <= self.tol {
                    let v = Mat::from_fn(n, m, |i, c| basis[c][(i, 0)]);
                    return Ok(combine(v.as_ref(), &coeff));
                }
                if m == cap {
                    return Err(OpError::DidNotConverge { iterations: m, residual: to_f64(rel) });
                }
            }
            let inv = T::one() / hn;
            basis.push(Mat::from_fn(n, 1, |i, _| w[(i, 0)] * inv));
        }
        Err(OpError::DidNotConverge { iterations: cap, residual: f64::INFINITY })
    }

    fn apply_columns(&self, op: &Operator<T>, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = Mat::<T>::zeros(x.nrows(), x.ncols());
        for j in 0..x.ncols() {
            let b = x.subcols(j, 1);
            if col_norm(b, 0) == T::zero() {
                continue;
            }
            let yj = match self.projection {
                Projection::Lanczos => self.lanczos_column(b)?,
                Projection::Arnoldi => self.arnoldi_column(op, b)?,
            };
            copy_col(yj.as_ref(), 0, y.as_mut(), j);
        }
        Ok(y)
    }
}

/// First column of `f(H_m)` scaled by `‖b‖`, and the relative estimate
/// `‖b‖ h_{m+1,m} |f(H_m)_{m,1}| / ‖b‖ ‖f(H_m) e₁‖`.
fn coefficients<T: Scalar>(fm: MatRef<'_, T>, b_norm: T, residual_h: T) -> (Vec<T>, T) {
    let m = fm.nrows();
    let coeff: Vec<T> = (0..m).map(|i| b_norm * fm[(i, 0)]).collect();
    let norm = coeff.iter().fold(T::zero(), |acc, &c| acc + c * c).sqrt();
    let est = b_norm * residual_h * fm[(m - 1, 0)].abs();
    (coeff, est / norm.max(T::min_positive_value()))
}

fn combine<T: Scalar>(v: MatRef<'_, T>, coeff: &[T]) -> Mat<T> {
    let c = Mat::from_fn(coeff.len(), 1, |i, _| coeff[i]);
    v * c.as_ref()
}

impl<T: Scalar> fmt::Debug for KrylovFunctionOp<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KrylovFunctionOp")
            .field("inner", &self.inner)
            .field("f", &self.f)
            .field("projection", &self.projection)
            .field("depth", &self.depth)
            .finish()
    }
}

impl<T: Scalar> MatShape for KrylovFunctionOp<T> {
    fn nrows(&self) -> usize {
        self.inner.nrows()
    }
    fn ncols(&self) -> usize {
        self.inner.ncols()
    }
}

impl<T: Scalar> LinearOperator<T> for KrylovFunctionOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::MatrixFunction
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.apply_columns(&self.inner, x)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        match self.projection {
            Projection::Lanczos => self.apply_columns(&self.inner, x),
            // f(A)ᵀ = f(Aᵀ)
            Projection::Arnoldi => self.apply_columns(&self.inner.t(), x),
        }
    }

    fn placement(&self) -> Placement {
        self.inner.placement()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
