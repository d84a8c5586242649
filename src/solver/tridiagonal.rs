//! Tridiagonal kernels: Thomas solve and the log-determinant recurrence.

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::matrix::Tridiagonal;

/// Thomas algorithm (Gaussian elimination without pivoting) for every column of `b`.
pub fn thomas_solve<T: Scalar>(t: &Tridiagonal<T>, b: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
    let (sub, main, sup) = (t.sub(), t.main(), t.sup());
    let n = main.len();
    if b.nrows() != n {
        return Err(OpError::shape("thomas", (n, n), (b.nrows(), b.ncols())));
    }
    // forward sweep on the coefficients is shared by all columns
    let mut c_prime = vec![T::zero(); n];
    let mut denom = vec![T::zero(); n];
    for i in 0..n {
        let d = if i == 0 { main[0] } else { main[i] - sub[i - 1] * c_prime[i - 1] };
        if d == T::zero() || !d.is_finite() {
            return Err(OpError::ZeroPivot(i));
        }
        denom[i] = d;
        if i + 1 < n {
            c_prime[i] = sup[i] / d;
        }
    }
    let mut x = Mat::<T>::zeros(n, b.ncols());
    for j in 0..b.ncols() {
        let mut d_prime = vec![T::zero(); n];
        for i in 0..n {
            let rhs = if i == 0 { b[(0, j)] } else { b[(i, j)] - sub[i - 1] * d_prime[i - 1] };
            d_prime[i] = rhs / denom[i];
        }
        for i in (0..n).rev() {
            x[(i, j)] = if i + 1 < n { d_prime[i] - c_prime[i] * x[(i + 1, j)] } else { d_prime[i] };
        }
    }
    Ok(x)
}

/// `(sign, log|det T|)` from the continuant recurrence written as ratios
/// `r_i = a_i - b_{i-1} c_{i-1} / r_{i-1}`; `None` when a ratio vanishes.
pub fn tridiagonal_slogdet<T: Scalar>(t: &Tridiagonal<T>) -> Option<(T, T)> {
    let (sub, main, sup) = (t.sub(), t.main(), t.sup());
    let mut sign = T::one();
    let mut logabs = T::zero();
    let mut prev = T::one();
    for i in 0..main.len() {
        let r = if i == 0 { main[0] } else { main[i] - sub[i - 1] * sup[i - 1] / prev };
        if r == T::zero() || !r.is_finite() {
            return None;
        }
        if r < T::zero() {
            sign = -sign;
        }
        logabs += r.abs().ln();
        prev = r;
    }
    Some((sign, logabs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::LinearOperator;
    use crate::solver::direct::lu_slogdet;
    use approx::assert_abs_diff_eq;

    fn sample() -> Tridiagonal<f64> {
        Tridiagonal::new(vec![1.0, -1.0, 2.0], vec![4.0, 5.0, -3.0, 6.0], vec![2.0, 1.0, 1.0]).unwrap()
    }

    #[test]
    fn thomas_matches_apply() {
        let t = sample();
        let x = Mat::from_fn(4, 2, |i, j| (i as f64) - 2.0 * j as f64);
        let b = t.matvec(x.as_ref()).unwrap();
        let sol = thomas_solve(&t, b.as_ref()).unwrap();
        for j in 0..2 {
            for i in 0..4 {
                assert_abs_diff_eq!(sol[(i, j)], x[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn zero_pivot_reported() {
        let t = Tridiagonal::new(vec![1.0], vec![0.0, 1.0], vec![1.0]).unwrap();
        let b = Mat::from_fn(2, 1, |_, _| 1.0);
        assert_eq!(thomas_solve(&t, b.as_ref()).unwrap_err(), OpError::ZeroPivot(0));
    }

    #[test]
    fn continuant_matches_lu() {
        let t = sample();
        let (s, l) = tridiagonal_slogdet(&t).unwrap();
        let (s_ref, l_ref) = lu_slogdet(t.to_dense().unwrap().as_ref()).unwrap();
        assert_eq!(s, s_ref);
        assert_abs_diff_eq!(l, l_ref, epsilon = 1e-12);
    }
}
