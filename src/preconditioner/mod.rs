//! Preconditioners for the Krylov solvers.
//!
//! Any operator approximating `A⁻¹` can precondition a solve; [`Jacobi`] builds one from the
//! dispatched diagonal of `A`.

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::operator::Operator;

/// A preconditioner M⁻¹ ≈ A⁻¹.
pub trait Preconditioner<T: Scalar> {
    /// Z = M⁻¹ R for an `n × k` block.
    fn apply(&self, r: MatRef<'_, T>) -> Result<Mat<T>, OpError>;
    /// Optionally: setup/factorize from A
    fn setup(&mut self, _a: &Operator<T>) -> Result<(), OpError> {
        Ok(())
    }
}

impl<T: Scalar> Preconditioner<T> for Operator<T> {
    fn apply(&self, r: MatRef<'_, T>) -> Result<Mat<T>, OpError> {
        Operator::apply(self, r)
    }
}

pub mod jacobi;
pub use jacobi::Jacobi;
