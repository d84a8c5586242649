use std::any::Any;

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::core::traits::{LinearOperator, MatShape, OpKind, Placement};
use crate::error::OpError;
use crate::operator::annotation::Capabilities;
use crate::operator::transpose::TransposeOp;
use crate::operator::{Operator, common_placement};

/// `A₁ · A₂ · … · Aₖ`, applied right to left.
#[derive(Debug)]
pub struct ProductOp<T: Scalar> {
    factors: Vec<Operator<T>>,
    placement: Placement,
}

impl<T: Scalar> ProductOp<T> {
    /// Factors in left-to-right order.
    pub fn factors(&self) -> &[Operator<T>] {
        &self.factors
    }
}

impl<T: Scalar> MatShape for ProductOp<T> {
    fn nrows(&self) -> usize {
        self.factors.first().map_or(0, Operator::nrows)
    }
    fn ncols(&self) -> usize {
        self.factors.last().map_or(0, Operator::ncols)
    }
}

impl<T: Scalar> LinearOperator<T> for ProductOp<T> {
    fn kind(&self) -> OpKind {
        OpKind::Product
    }

    fn matvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = x.to_owned();
        for factor in self.factors.iter().rev() {
            y = factor.apply(y.as_ref())?;
        }
        Ok(y)
    }

    fn mattransvec(&self, x: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        let mut y = x.to_owned();
        for factor in &self.factors {
            y = factor.apply_transpose(y.as_ref())?;
        }
        Ok(y)
    }

    fn to_dense(&self) -> Result<Mat<T>, OpError> {
        // Multiply dense forms right to left so each step is a product with the next factor.
        let mut iter = self.factors.iter().rev();
        let mut acc = match iter.next() {
            Some(last) => last.to_dense()?,
            None => return Ok(Mat::zeros(0, 0)),
        };
        for factor in iter {
            acc = factor.apply(acc.as_ref())?;
        }
        Ok(acc)
    }

    fn placement(&self) -> Placement {
        self.placement
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// `Xᵀ X` or `X Xᵀ` with the very same `X` on both sides.
fn is_gram<T: Scalar>(lhs: &Operator<T>, rhs: &Operator<T>) -> bool {
    let transposed_of = |op: &Operator<T>| op.downcast_ref::<TransposeOp<T>>().map(|t| t.inner().clone());
    match (transposed_of(lhs), transposed_of(rhs)) {
        (Some(inner), _) if inner.ptr_eq(rhs) => true,
        (_, Some(inner)) if inner.ptr_eq(lhs) => true,
        _ => false,
    }
}

/// Composition `lhs · rhs`.
pub fn compose<T: Scalar>(lhs: &Operator<T>, rhs: &Operator<T>) -> Result<Operator<T>, OpError> {
    if lhs.ncols() != rhs.nrows() {
        return Err(OpError::shape("matmul", lhs.shape(), rhs.shape()));
    }
    let placement = common_placement(&[lhs.clone(), rhs.clone()])?;
    let caps = if is_gram(lhs, rhs) {
        Capabilities::POSITIVE_SEMIDEFINITE
    } else {
        Capabilities::empty()
    };
    let mut factors = Vec::new();
    for op in [lhs, rhs] {
        match op.downcast_ref::<ProductOp<T>>() {
            Some(p) => factors.extend(p.factors.iter().cloned()),
            None => factors.push(op.clone()),
        }
    }
    Ok(Operator::new(ProductOp { factors, placement }).annotate(caps))
}

/// Composition of a whole chain, left to right.
pub fn product<T: Scalar>(ops: &[Operator<T>]) -> Result<Operator<T>, OpError> {
    let mut iter = ops.iter();
    let mut acc = iter
        .next()
        .cloned()
        .ok_or_else(|| OpError::InvalidInput("product of zero operators".into()))?;
    for op in iter {
        acc = compose(&acc, op)?;
    }
    Ok(acc)
}
