//! Dense matrix functions for small or projected matrices.
//!
//! - symmetric input: `U f(Λ) Uᵀ` from the faer symmetric eigensolver;
//! - `exp`: scaling and squaring around a truncated Taylor series;
//! - `sqrt`: Denman–Beavers iteration;
//! - integer powers: binary powering, negative exponents through an LU inverse.
//!
//! # References
//! - Higham, Functions of Matrices, SIAM 2008, ch. 6 and 10

use faer::{Mat, MatRef};
use log::trace;

use crate::core::scalar::{Scalar, cast, from_usize, to_f64};
use crate::eigen::dense::symmetric_eigen;
use crate::error::OpError;
use crate::function::MatrixFunction;
use crate::solver::direct::lu_solve;

const TAYLOR_TERMS: usize = 18;
const DENMAN_BEAVERS_MAX_ITERS: usize = 100;

fn one_norm<T: Scalar>(a: MatRef<'_, T>) -> T {
    (0..a.ncols())
        .map(|j| (0..a.nrows()).fold(T::zero(), |acc, i| acc + a[(i, j)].abs()))
        .fold(T::zero(), |m, c| m.max(c))
}

fn frobenius_diff<T: Scalar>(a: MatRef<'_, T>, b: MatRef<'_, T>) -> T {
    let mut s = T::zero();
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            let d = a[(i, j)] - b[(i, j)];
            s += d * d;
        }
    }
    s.sqrt()
}

/// `f(A) = U f(Λ) Uᵀ` for symmetric `a`.
pub fn symmetric_function<T: Scalar>(a: MatRef<'_, T>, f: &MatrixFunction<T>) -> Result<Mat<T>, OpError> {
    let (values, u) = symmetric_eigen(a)?;
    let fu = Mat::from_fn(u.nrows(), u.ncols(), |i, j| u[(i, j)] * f.eval(values[j]));
    Ok(fu.as_ref() * u.as_ref().transpose())
}

/// Matrix exponential.
pub fn expm<T: Scalar>(a: MatRef<'_, T>) -> Mat<T> {
    let n = a.nrows();
    let norm = one_norm(a);
    let half: T = cast(0.5);
    // scale so that ‖A / 2^s‖₁ ≤ 1/2
    let mut s = 0i32;
    while norm / cast::<T>(2f64.powi(s)) > half {
        s += 1;
    }
    let scale = T::one() / cast::<T>(2f64.powi(s));
    let a_scaled = Mat::from_fn(n, n, |i, j| a[(i, j)] * scale);

    let mut result = Mat::<T>::identity(n, n);
    let mut term = Mat::<T>::identity(n, n);
    for k in 1..=TAYLOR_TERMS {
        let next = term.as_ref() * a_scaled.as_ref();
        let inv_k = T::one() / from_usize::<T>(k);
        term = Mat::from_fn(n, n, |i, j| next[(i, j)] * inv_k);
        result = Mat::from_fn(n, n, |i, j| result[(i, j)] + term[(i, j)]);
    }
    for _ in 0..s {
        result = result.as_ref() * result.as_ref();
    }
    result
}

/// Principal square root by the Denman–Beavers iteration
/// `Y ← (Y + Z⁻¹)/2`, `Z ← (Z + Y⁻¹)/2`, `Y → A^{1/2}`.
pub fn sqrtm<T: Scalar>(a: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
    let n = a.nrows();
    let eye = Mat::<T>::identity(n, n);
    let half: T = cast(0.5);
    let tol = T::epsilon() * from_usize::<T>(n.max(1)) * cast(100.0);
    let mut y = a.to_owned();
    let mut z = eye.clone();
    let mut change = T::infinity();
    let mut prev = T::infinity();
    for it in 1..=DENMAN_BEAVERS_MAX_ITERS {
        let y_inv = lu_solve(y.as_ref(), eye.as_ref())?;
        let z_inv = lu_solve(z.as_ref(), eye.as_ref())?;
        let y_next = Mat::from_fn(n, n, |i, j| half * (y[(i, j)] + z_inv[(i, j)]));
        z = Mat::from_fn(n, n, |i, j| half * (z[(i, j)] + y_inv[(i, j)]));
        let scale = one_norm(y_next.as_ref()).max(T::min_positive_value());
        change = frobenius_diff(y_next.as_ref(), y.as_ref()) / scale;
        y = y_next;
        trace!("denman-beavers iter {it}: relative change {change}");
        // rounding stagnation once the iteration has settled
        if change <= tol || (change <= T::epsilon().sqrt() && change >= prev) {
            return Ok(y);
        }
        prev = change;
    }
    Err(OpError::DidNotConverge { iterations: DENMAN_BEAVERS_MAX_ITERS, residual: to_f64(change) })
}

/// `A^k` by binary powering; negative `k` inverts first.
pub fn powm_int<T: Scalar>(a: MatRef<'_, T>, k: i32) -> Result<Mat<T>, OpError> {
    let n = a.nrows();
    let eye = Mat::<T>::identity(n, n);
    let mut base = if k < 0 { lu_solve(a, eye.as_ref())? } else { a.to_owned() };
    let mut e = k.unsigned_abs();
    let mut acc = eye;
    while e > 0 {
        if e & 1 == 1 {
            acc = acc.as_ref() * base.as_ref();
        }
        e >>= 1;
        if e > 0 {
            base = base.as_ref() * base.as_ref();
        }
    }
    Ok(acc)
}

/// `f(A)` for a general square matrix. Non-integer powers need a symmetric operand.
pub fn general_function<T: Scalar>(a: MatRef<'_, T>, f: &MatrixFunction<T>) -> Result<Mat<T>, OpError> {
    match f {
        MatrixFunction::Exp => Ok(expm(a)),
        MatrixFunction::Sqrt => sqrtm(a),
        MatrixFunction::Pow(p) => match f.integer_exponent() {
            Some(k) => powm_int(a, k),
            None => Err(OpError::Unsupported(format!("non-integer power {p} of a non-symmetric matrix"))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_close(a: &Mat<f64>, b: &Mat<f64>, eps: f64) {
        for j in 0..a.ncols() {
            for i in 0..a.nrows() {
                assert_abs_diff_eq!(a[(i, j)], b[(i, j)], epsilon = eps);
            }
        }
    }

    fn spd() -> Mat<f64> {
        let rows = [[4.0, 1.0, 0.5], [1.0, 3.0, 0.2], [0.5, 0.2, 2.0]];
        Mat::from_fn(3, 3, |i, j| rows[i][j])
    }

    #[test]
    fn expm_matches_eigendecomposition() {
        let a = spd();
        let via_eig = symmetric_function(a.as_ref(), &MatrixFunction::Exp).unwrap();
        let e = expm(a.as_ref());
        assert_close(&e, &via_eig, 1e-9 * e[(0, 0)]);
    }

    #[test]
    fn expm_of_nilpotent() {
        // exp([[0,1],[0,0]]) = [[1,1],[0,1]]
        let a = Mat::from_fn(2, 2, |i, j| if i == 0 && j == 1 { 1.0 } else { 0.0 });
        let e = expm(a.as_ref());
        let expected = Mat::from_fn(2, 2, |i, j| if i == 1 && j == 0 { 0.0 } else { 1.0 });
        assert_close(&e, &expected, 1e-14);
    }

    #[test]
    fn sqrtm_squares_back() {
        let a = spd();
        let r = sqrtm(a.as_ref()).unwrap();
        let rr = r.as_ref() * r.as_ref();
        assert_close(&rr, &a, 1e-10);
        let via_eig = symmetric_function(a.as_ref(), &MatrixFunction::Sqrt).unwrap();
        assert_close(&r, &via_eig, 1e-10);
    }

    #[test]
    fn integer_powers() {
        let a = spd();
        let a3 = powm_int(a.as_ref(), 3).unwrap();
        let expected = (a.as_ref() * a.as_ref()).as_ref() * a.as_ref();
        assert_close(&a3, &expected, 1e-10);
        let inv = powm_int(a.as_ref(), -1).unwrap();
        assert_close(&(inv.as_ref() * a.as_ref()), &Mat::identity(3, 3), 1e-12);
        assert_close(&powm_int(a.as_ref(), 0).unwrap(), &Mat::identity(3, 3), 0.0);
    }

    #[test]
    fn fractional_power_of_general_matrix_is_unsupported() {
        let a = Mat::from_fn(2, 2, |i, j| (i + 2 * j + 1) as f64);
        assert!(matches!(
            general_function(a.as_ref(), &MatrixFunction::Pow(0.5)),
            Err(OpError::Unsupported(_))
        ));
    }
}
