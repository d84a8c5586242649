// Jacobi preconditioner implementation

use faer::{Mat, MatRef};

use crate::config::options::Options;
use crate::context::LinalgContext;
use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::matrix::Diagonal;
use crate::operator::Operator;
use crate::preconditioner::Preconditioner;

/// Jacobi preconditioner: M⁻¹ = D⁻¹
#[derive(Clone, Debug, Default)]
pub struct Jacobi<T> {
    pub(crate) inv_diag: Vec<T>,
}

impl<T: Scalar> Jacobi<T> {
    /// new with empty state; user must call `setup`.
    pub fn new() -> Self {
        Self { inv_diag: Vec::new() }
    }

    /// Builds the preconditioner from `a`'s dispatched diagonal.
    pub fn from_operator(a: &Operator<T>) -> Result<Self, OpError> {
        let mut pc = Self::new();
        pc.setup(a)?;
        Ok(pc)
    }

    /// `D⁻¹` as an operator, usable as `Options::preconditioner`.
    pub fn to_operator(&self) -> Operator<T> {
        Operator::new(Diagonal::new(self.inv_diag.clone()))
    }
}

impl<T: Scalar> Preconditioner<T> for Jacobi<T> {
    fn setup(&mut self, a: &Operator<T>) -> Result<(), OpError> {
        let diag = LinalgContext::default().diag(a, &Options::default())?;
        // zero diagonal entries are left unscaled
        self.inv_diag = diag
            .into_iter()
            .map(|d| if d != T::zero() { T::one() / d } else { T::one() })
            .collect();
        Ok(())
    }

    fn apply(&self, r: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        if r.nrows() != self.inv_diag.len() {
            return Err(OpError::shape(
                "jacobi",
                (self.inv_diag.len(), self.inv_diag.len()),
                (r.nrows(), r.ncols()),
            ));
        }
        Ok(Mat::from_fn(r.nrows(), r.ncols(), |i, j| self.inv_diag[i] * r[(i, j)]))
    }
}
