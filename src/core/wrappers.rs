//! Vector kernels over the columns of faer blocks.
//!
//! Iterative methods treat the `k` columns of an `n × k` block as independent right-hand
//! sides. The helpers here compute per-column dot products, norms and updates, with the
//! reductions parallelized over rows when the `rayon` feature is enabled.

use faer::{Mat, MatMut, MatRef};

use crate::core::scalar::Scalar;

/// Dot product of column `j` of `a` with column `j` of `b`.
pub fn col_dot<T: Scalar>(a: MatRef<'_, T>, b: MatRef<'_, T>, j: usize) -> T {
    let n = a.nrows();
    #[cfg(feature = "rayon")]
    {
        use rayon::prelude::*;
        (0..n)
            .into_par_iter()
            .map(|i| a[(i, j)] * b[(i, j)])
            .reduce(|| T::zero(), |acc, v| acc + v)
    }
    #[cfg(not(feature = "rayon"))]
    {
        (0..n).fold(T::zero(), |acc, i| acc + a[(i, j)] * b[(i, j)])
    }
}

/// Euclidean norm of column `j` of `a`.
pub fn col_norm<T: Scalar>(a: MatRef<'_, T>, j: usize) -> T {
    col_dot(a, a, j).sqrt()
}

/// y[:, j] += alpha · x[:, j]
pub fn col_axpy<T: Scalar>(alpha: T, x: MatRef<'_, T>, mut y: MatMut<'_, T>, j: usize) {
    for i in 0..x.nrows() {
        y[(i, j)] = y[(i, j)] + alpha * x[(i, j)];
    }
}

/// Copies column `src_col` of `src` into column `dst_col` of `dst`.
pub fn copy_col<T: Scalar>(src: MatRef<'_, T>, src_col: usize, mut dst: MatMut<'_, T>, dst_col: usize) {
    for i in 0..src.nrows() {
        dst[(i, dst_col)] = src[(i, src_col)];
    }
}

/// Column `j` of `a` as an owned vector.
pub fn col_to_vec<T: Scalar>(a: MatRef<'_, T>, j: usize) -> Vec<T> {
    (0..a.nrows()).map(|i| a[(i, j)]).collect()
}

/// A slice as an `n × 1` block.
pub fn vec_to_col<T: Scalar>(x: &[T]) -> Mat<T> {
    Mat::from_fn(x.len(), 1, |i, _| x[i])
}

/// dst += src, rows starting at `row_offset` of `dst`.
pub fn accumulate<T: Scalar>(mut dst: MatMut<'_, T>, src: MatRef<'_, T>, row_offset: usize) {
    for j in 0..src.ncols() {
        for i in 0..src.nrows() {
            dst[(row_offset + i, j)] = dst[(row_offset + i, j)] + src[(i, j)];
        }
    }
}

/// Maximum absolute entry, zero for empty blocks.
pub fn max_abs<T: Scalar>(a: MatRef<'_, T>) -> T {
    let mut m = T::zero();
    for j in 0..a.ncols() {
        for i in 0..a.nrows() {
            m = m.max(a[(i, j)].abs());
        }
    }
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn column_kernels() {
        let a = Mat::from_fn(3, 2, |i, j| (i + 3 * j) as f64);
        assert_abs_diff_eq!(col_dot(a.as_ref(), a.as_ref(), 1), 9.0 + 16.0 + 25.0, epsilon = 1e-12);
        let mut y = Mat::<f64>::zeros(3, 2);
        col_axpy(2.0, a.as_ref(), y.as_mut(), 1);
        assert_eq!(col_to_vec(y.as_ref(), 1), vec![6.0, 8.0, 10.0]);
        assert_eq!(col_to_vec(y.as_ref(), 0), vec![0.0, 0.0, 0.0]);
        assert_eq!(max_abs(a.as_ref()), 5.0);
    }
}
