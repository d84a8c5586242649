use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::core::wrappers::accumulate;
use crate::error::OpError;
use crate::operator::annotation::Capabilities;
use crate::operator::{Operator, common_placement};

/// `A₁ + A₂ + …` over operands of one shape. Nested sums are flattened.
#[derive(Debug)]
pub struct SumOp<T: Scalar> {
    terms: Vec<Operator<T>>,
    shape: (usize, usize),
    placement: Placement,
}

impl<T: Scalar> SumOp<T> {
    pub fn terms(&self) -> &[Operator<T>] {
        &self.terms
    }
}

impl<T: Scalar> MatShape for SumOp<T> {
    fn nrows(&self) -> usize {
        self.shape.0
    }
    fn ncols(&self) -> usize {
        self.shape.1
    }
}

impl<T: Scalar> LinearOperator<T> for SumOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Sum
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = Mat::zeros(self.shape.0, x.ncols());
        for term in &self.terms {
            accumulate(y.as_mut(), term.apply(x)?.as_ref(), 0);
        }
        Ok(y)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = Mat::zeros(self.shape.1, x.ncols());
        for term in &self.terms {
            accumulate(y.as_mut(), term.apply_transpose(x)?.as_ref(), 0);
        }
        Ok(y)
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        let mut y = Mat::zeros(self.shape.0, self.shape.1);
        for term in &self.terms {
            accumulate(y.as_mut(), term.to_dense()?.as_ref(), 0);
        }
        Ok(y)
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Sum of one or more operators with identical shapes.
pub fn sum<T: Scalar>(ops: &[Operator<T>]) -> Result<Operator<T>, OpError> {
    let first = ops
        .first()
        .ok_or_else(|| OpError::InvalidInput("sum of zero operators".into()))?;
    for op in &ops[1..] {
        if op.shape() != first.shape() {
            return Err(OpError::shape("add", first.shape(), op.shape()));
        }
    }
    let placement = common_placement(ops)?;
    let caps = Capabilities::of_sum(ops.iter().map(Operator::capabilities));
    if ops.len() == 1 {
        return Ok(first.clone());
    }
    let mut terms = Vec::with_capacity(ops.len());
    for op in ops {
        match op.downcast_ref::<SumOp<T>>() {
            Some(inner) => terms.extend(inner.terms.iter().cloned()),
            None => terms.push(op.clone()),
        }
    }
    let node = SumOp { terms, shape: first.shape(), placement };
    Ok(Operator::new(node).annotate(caps))
}
