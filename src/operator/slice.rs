use std::any::Any;
use std::ops::Range;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::matrix::DenseOperator;
use crate::operator::Operator;
use crate::operator::annotation::Capabilities;

/// Row or column selection for [`Operator::slice`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Index {
    All,
    Range { start: usize, stop: usize, step: usize },
    List(Vec<usize>),
}

impl Index {
    pub fn range(r: Range<usize>) -> Self {
        Index::Range { start: r.start, stop: r.end, step: 1 }
    }

    pub fn strided(start: usize, stop: usize, step: usize) -> Self {
        Index::Range { start, stop, step }
    }

    /// Concrete indices into a dimension of length `len`.
    pub fn resolve(&self, len: usize) -> Result<Vec<usize>, OpError> {
        match self {
            Index::All => Ok((0..len).collect()),
            Index::Range { start, stop, step } => {
                if *step == 0 {
                    return Err(OpError::InvalidInput("slice step must be positive".into()));
                }
                if *stop > len || start > stop {
                    return Err(OpError::InvalidInput(format!(
                        "slice range {start}..{stop} out of bounds for length {len}"
                    )));
                }
                Ok((*start..*stop).step_by(*step).collect())
            }
            Index::List(list) => match list.iter().find(|&&i| i >= len) {
                Some(bad) => Err(OpError::InvalidInput(format!(
                    "slice index {bad} out of bounds for length {len}"
                ))),
                None => Ok(list.clone()),
            },
        }
    }
}

impl From<Range<usize>> for Index {
    fn from(r: Range<usize>) -> Self {
        Index::range(r)
    }
}

impl From<Vec<usize>> for Index {
    fn from(list: Vec<usize>) -> Self {
        Index::List(list)
    }
}

/// `A[rows, cols]` evaluated by scatter, apply, gather.
#[derive(Debug)]
pub struct SliceOp<T: Scalar> {
    inner: Operator<T>,
    rows: Vec<usize>,
    cols: Vec<usize>,
}

impl<T: Scalar> SliceOp<T> {
    pub fn inner(&self) -> &Operator<T> {
        &self.inner
    }

    pub fn rows(&self) -> &[usize] {
        &self.rows
    }

    pub fn cols(&self) -> &[usize] {
        &self.cols
    }
}

/// Embeds `x` into a `len × k` zero block at `positions`; repeated positions add up.
fn scatter<T: Scalar>(x: MatRef<'_, T>, positions: &[usize], len: usize) -> Mat<T> {
    let mut out = Mat::zeros(len, x.ncols());
    for c in 0..x.ncols() {
        for (src, &dst) in positions.iter().enumerate() {
            out[(dst, c)] = out[(dst, c)] + x[(src, c)];
        }
    }
    out
}

fn gather<T: Scalar>(y: MatRef<'_, T>, positions: &[usize]) -> Mat<T> {
    Mat::from_fn(positions.len(), y.ncols(), |i, c| y[(positions[i], c)])
}

impl<T: Scalar> MatShape for SliceOp<T> {
    fn nrows(&self) -> usize {
        self.rows.len()
    }
    fn ncols(&self) -> usize {
        self.cols.len()
    }
}

impl<T: Scalar> LinearOperator<T> for SliceOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Slice
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let z = scatter(x, &self.cols, self.inner.ncols());
        let y = self.inner.apply(z.as_ref())?;
        Ok(gather(y.as_ref(), &self.rows))
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let z = scatter(x, &self.rows, self.inner.nrows());
        let y = self.inner.apply_transpose(z.as_ref())?;
        Ok(gather(y.as_ref(), &self.cols))
    }

    fn placement(&self) -> Placement {
        self.inner.placement()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `op[rows, cols]`. Dense operators are copied, slices of slices compose their selections.
pub fn slice<T: Scalar>(op: &Operator<T>, rows: Index, cols: Index) -> Result<Operator<T>, OpError> {
    let rows = rows.resolve(op.nrows())?;
    let cols = cols.resolve(op.ncols())?;
    // principal submatrices keep symmetry and semi-definiteness
    let caps = if rows == cols { op.capabilities() } else { Capabilities::empty() };
    if let Some(d) = op.downcast_ref::<DenseOperator<T>>() {
        let m = d.matrix();
        let sub = Mat::from_fn(rows.len(), cols.len(), |i, j| m[(rows[i], cols[j])]);
        return Ok(Operator::new(DenseOperator::new(sub).with_placement(d.placement())).annotate(caps));
    }
    let node = match op.downcast_ref::<SliceOp<T>>() {
        Some(s) => SliceOp {
            inner: s.inner.clone(),
            rows: rows.iter().map(|&i| s.rows[i]).collect(),
            cols: cols.iter().map(|&j| s.cols[j]).collect(),
        },
        None => SliceOp { inner: op.clone(), rows, cols },
    };
    Ok(Operator::new(node).annotate(caps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Tridiagonal;
    use approx::assert_abs_diff_eq;

    fn tri() -> Operator<f64> {
        Operator::new(
            Tridiagonal::new(vec![1.0, 2.0, 3.0, 4.0], vec![5.0, 6.0, 7.0, 8.0, 9.0], vec![-1.0, -2.0, -3.0, -4.0])
                .unwrap(),
        )
    }

    #[test]
    fn strided_and_listed_selection() {
        let a = tri();
        let s = a.slice(Index::strided(0, 5, 2), Index::List(vec![4, 1, 1])).unwrap();
        assert_eq!(s.shape(), (3, 3));
        let full = a.to_dense().unwrap();
        let dense = s.to_dense().unwrap();
        let rows = [0, 2, 4];
        let cols = [4, 1, 1];
        for (i, &r) in rows.iter().enumerate() {
            for (j, &c) in cols.iter().enumerate() {
                assert_abs_diff_eq!(dense[(i, j)], full[(r, c)], epsilon = 1e-14);
            }
        }
        let xt = Mat::from_fn(3, 1, |i, _| (i + 1) as f64);
        let yt = s.apply_transpose(xt.as_ref()).unwrap();
        let expected = dense.transpose() * xt.as_ref();
        for j in 0..3 {
            assert_abs_diff_eq!(yt[(j, 0)], expected[(j, 0)], epsilon = 1e-12);
        }
    }

    #[test]
    fn slice_of_slice_composes() {
        let a = tri();
        let s = a.slice(Index::range(1..5), Index::All).unwrap();
        let ss = s.slice(Index::List(vec![0, 2]), Index::range(1..3)).unwrap();
        let node = ss.downcast_ref::<SliceOp<f64>>().unwrap();
        assert!(node.inner().ptr_eq(&a));
        assert_eq!(node.rows(), &[1, 3]);
        assert_eq!(node.cols(), &[1, 2]);
    }

    #[test]
    fn dense_slice_materializes() {
        let a = Operator::new(DenseOperator::new(Mat::from_fn(4, 4, |i, j| (4 * i + j) as f64))).self_adjoint();
        let s = a.slice(Index::range(1..3), Index::range(1..3)).unwrap();
        assert_eq!(s.kind(), OpKind::Dense);
        assert!(s.is_self_adjoint());
        assert_eq!(s.to_dense().unwrap()[(1, 0)], 9.0);
    }

    #[test]
    fn out_of_bounds() {
        let a = tri();
        assert!(a.slice(Index::range(0..6), Index::All).is_err());
        assert!(a.slice(Index::All, Index::strided(0, 3, 0)).is_err());
    }
}
