use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::annotation::Capabilities;
use crate::operator::{Operator, common_placement};

/// `diag(A₁, …, A₁, A₂, …)`: each block repeated by its multiplicity, zeros elsewhere.
#[derive(Debug)]
pub struct BlockDiagOp<T: Scalar> {
    blocks: Vec<(Operator<T>, usize)>,
    shape: (usize, usize),
    placement: Placement,
}

impl<T: Scalar> BlockDiagOp<T> {
    /// Blocks with their multiplicities, in diagonal order.
    pub fn blocks(&self) -> &[(Operator<T>, usize)] {
        &self.blocks
    }

    /// Shared by both directions; `transpose` swaps the roles of block rows and columns.
    fn apply_blocks(&self, x: MatRef<'_, T>, transpose: bool) -> Result<Mat<T>, OpError> {
        let k = x.ncols();
        let out_rows = if transpose { self.shape.1 } else { self.shape.0 };
        let mut out = Mat::zeros(out_rows, k);
        let (mut in_off, mut out_off) = (0, 0);
        for (block, copies) in &self.blocks {
            let (bm, bn) = if transpose {
                (block.ncols(), block.nrows())
            } else {
                block.shape()
            };
            let copies = *copies;
            // every copy of the block is applied in one batched call
            let input = Mat::from_fn(bn, copies * k, |i, col| x[(in_off + (col / k) * bn + i, col % k)]);
            let y = if transpose {
                block.apply_transpose(input.as_ref())?
            } else {
                block.apply(input.as_ref())?
            };
            for col in 0..copies * k {
                let (copy, c) = (col / k, col % k);
                for i in 0..bm {
                    out[(out_off + copy * bm + i, c)] = y[(i, col)];
                }
            }
            in_off += copies * bn;
            out_off += copies * bm;
        }
        Ok(out)
    }
}

impl<T: Scalar> MatShape for BlockDiagOp<T> {
    fn nrows(&self) -> usize {
        self.shape.0
    }
    fn ncols(&self) -> usize {
        self.shape.1
    }
}

impl<T: Scalar> LinearOperator<T> for BlockDiagOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::BlockDiagonal
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.apply_blocks(x, false)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        self.apply_blocks(x, true)
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        let mut out = Mat::zeros(self.shape.0, self.shape.1);
        let (mut r0, mut c0) = (0, 0);
        for (block, copies) in &self.blocks {
            let d = block.to_dense()?;
            for _ in 0..*copies {
                for j in 0..d.ncols() {
                    for i in 0..d.nrows() {
                        out[(r0 + i, c0 + j)] = d[(i, j)];
                    }
                }
                r0 += d.nrows();
                c0 += d.ncols();
            }
        }
        Ok(out)
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Block-diagonal operator with each block appearing once.
pub fn block_diag<T: Scalar>(ops: &[Operator<T>]) -> Result<Operator<T>, OpError> {
    block_diag_with_multiplicity(ops.iter().map(|op| (op.clone(), 1)).collect())
}

/// Block-diagonal operator where block `i` is repeated `blocks[i].1` times.
pub fn block_diag_with_multiplicity<T: Scalar>(
    blocks: Vec<(Operator<T>, usize)>,
) -> Result<Operator<T>, OpError> {
    if blocks.is_empty() {
        return Err(OpError::InvalidInput("block_diag of zero operators".into()));
    }
    if blocks.iter().any(|(_, copies)| *copies == 0) {
        return Err(OpError::InvalidInput("block multiplicity must be positive".into()));
    }
    let ops: Vec<Operator<T>> = blocks.iter().map(|(op, _)| op.clone()).collect();
    let placement = common_placement(&ops)?;
    let caps = Capabilities::of_sum(ops.iter().map(Operator::capabilities));
    let shape = blocks.iter().fold((0, 0), |(m, n), (op, copies)| {
        (m + copies * op.nrows(), n + copies * op.ncols())
    });
    Ok(Operator::new(BlockDiagOp { blocks, shape, placement }).annotate(caps))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::{DenseOperator, Diagonal};
    use approx::assert_abs_diff_eq;

    #[test]
    fn repeated_blocks_match_dense() {
        let a = Operator::new(DenseOperator::new(Mat::from_fn(2, 3, |i, j| (i + j) as f64 - 1.0)));
        let d = Operator::new(Diagonal::new(vec![5.0]));
        let bd = block_diag_with_multiplicity(vec![(a, 2), (d, 3)]).unwrap();
        assert_eq!(bd.shape(), (7, 9));
        let dense = bd.to_dense().unwrap();
        let x = Mat::from_fn(9, 2, |i, j| (i as f64) - (j as f64) * 0.5);
        let y = bd.apply(x.as_ref()).unwrap();
        let expected = dense.as_ref() * x.as_ref();
        for i in 0..7 {
            for j in 0..2 {
                assert_abs_diff_eq!(y[(i, j)], expected[(i, j)], epsilon = 1e-12);
            }
        }
        let xt = Mat::from_fn(7, 1, |i, _| i as f64);
        let yt = bd.apply_transpose(xt.as_ref()).unwrap();
        let expected_t = dense.transpose() * xt.as_ref();
        for i in 0..9 {
            assert_abs_diff_eq!(yt[(i, 0)], expected_t[(i, 0)], epsilon = 1e-12);
        }
    }

    #[test]
    fn zero_multiplicity_rejected() {
        let d = Operator::new(Diagonal::new(vec![1.0]));
        assert!(matches!(
            block_diag_with_multiplicity(vec![(d, 0)]),
            Err(OpError::InvalidInput(_))
        ));
    }
}
