use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::core::wrappers::accumulate;
use crate::error::OpError;
use crate::operator::{Operator, common_placement};

/// Stacking direction for [`concatenate`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Operands on top of each other; they share `ncols`.
    Rows,
    /// Operands side by side; they share `nrows`.
    Cols,
}

#[derive(Debug)]
pub struct ConcatOp<T: Scalar> {
    axis: Axis,
    ops: Vec<Operator<T>>,
    shape: (usize, usize),
    placement: Placement,
}

impl<T: Scalar> ConcatOp<T> {
    pub fn axis(&self) -> Axis {
        self.axis
    }

    pub fn operands(&self) -> &[Operator<T>] {
        &self.ops
    }

    /// Each operand maps the whole input; outputs are stacked.
    fn stack(&self, x: MatRef<'_, T>, rows: usize, transpose: bool) -> Result<Mat<T>, OpError> {
        let mut out = Mat::zeros(rows, x.ncols());
        let mut off = 0;
        for op in &self.ops {
            let y = if transpose { op.apply_transpose(x)? } else { op.apply(x)? };
            accumulate(out.as_mut(), y.as_ref(), off);
            off += y.nrows();
        }
        Ok(out)
    }

    /// Each operand sees its own slab of the input; outputs are summed.
    fn split(&self, x: MatRef<'_, T>, rows: usize, transpose: bool) -> Result<Mat<T>, OpError> {
        let mut out = Mat::zeros(rows, x.ncols());
        let mut off = 0;
        for op in &self.ops {
            let len = if transpose { op.nrows() } else { op.ncols() };
            let slab = x.subrows(off, len);
            let y = if transpose { op.apply_transpose(slab)? } else { op.apply(slab)? };
            accumulate(out.as_mut(), y.as_ref(), 0);
            off += len;
        }
        Ok(out)
    }
}

impl<T: Scalar> MatShape for ConcatOp<T> {
    fn nrows(&self) -> usize {
        self.shape.0
    }
    fn ncols(&self) -> usize {
        self.shape.1
    }
}

impl<T: Scalar> LinearOperator<T> for ConcatOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Concatenate
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        match self.axis {
            Axis::Rows => self.stack(x, self.shape.0, false),
            Axis::Cols => self.split(x, self.shape.0, false),
        }
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        match self.axis {
            Axis::Rows => self.split(x, self.shape.1, true),
            Axis::Cols => self.stack(x, self.shape.1, true),
        }
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Joins operators along `axis`; the other dimension must agree.
pub fn concatenate<T: Scalar>(axis: Axis, ops: &[Operator<T>]) -> Result<Operator<T>, OpError> {
    let first = ops
        .first()
        .ok_or_else(|| OpError::InvalidInput("concatenate of zero operators".into()))?;
    let mut shape = first.shape();
    for op in &ops[1..] {
        match axis {
            Axis::Rows if op.ncols() == shape.1 => shape.0 += op.nrows(),
            Axis::Cols if op.nrows() == shape.0 => shape.1 += op.ncols(),
            _ => return Err(OpError::shape("concatenate", first.shape(), op.shape())),
        }
    }
    let placement = common_placement(ops)?;
    Ok(Operator::new(ConcatOp { axis, ops: ops.to_vec(), shape, placement }))
}
