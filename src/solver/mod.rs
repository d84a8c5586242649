//! Krylov & direct solver interfaces.

use faer::{Mat, MatRef};

use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::operator::Operator;
use crate::preconditioner::Preconditioner;
use crate::utils::convergence::SolveStats;

/// Solution block of `A X = B` with the statistics of the run that produced it.
///
/// A non-converged run still carries its best estimate; use [`Solution::into_result`] to
/// treat that case as an error.
#[derive(Clone, Debug)]
pub struct Solution<T: Scalar> {
    pub x: Mat<T>,
    pub stats: SolveStats<T>,
}

impl<T: Scalar> Solution<T> {
    pub fn converged(&self) -> bool {
        self.stats.converged()
    }

    pub fn into_result(self) -> Result<Mat<T>, OpError> {
        if self.stats.converged() {
            Ok(self.x)
        } else {
            Err(self.stats.not_converged())
        }
    }
}

/// Common interface for any direct or iterative solver.
pub trait LinearSolver<T: Scalar> {
    /// Solve A·X = B for every column of `b`.
    fn solve(
        &mut self,
        a: &Operator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: MatRef<'_, T>,
    ) -> Result<Solution<T>, OpError>;
}

pub mod cg;
pub use cg::CgSolver;

pub mod minres;
pub use minres::MinresSolver;

pub mod gmres;
pub use gmres::{GmresSolver, Preconditioning};

pub mod direct;
pub use direct::{CholeskyFactorOp, LuFactorOp};

pub mod tridiagonal;

pub mod inverse;
pub use inverse::InverseOp;
