//! Convergence tracking & tolerance checks for iterative routines.

use crate::core::scalar::{Scalar, to_f64};
use crate::error::OpError;

/// Stopping criteria.
#[derive(Copy, Clone, Debug)]
pub struct Convergence<T> {
    pub tol: T,
    pub max_iters: usize,
}

/// Lifecycle of an iterative routine.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IterState {
    Initialized,
    Iterating,
    Converged,
    BudgetExhausted,
    /// A recurrence hit a zero-norm vector or non-positive curvature.
    Breakdown,
}

impl IterState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, IterState::Initialized | IterState::Iterating)
    }
}

#[derive(Clone, Debug)]
pub struct SolveStats<T> {
    pub iterations: usize,
    /// Relative residual (or relative Rayleigh-quotient change) at termination.
    pub final_residual: T,
    pub state: IterState,
    /// One entry per iteration when history recording is on.
    pub residual_history: Vec<T>,
}

impl<T: Scalar> SolveStats<T> {
    pub fn new(initial_residual: T) -> Self {
        Self {
            iterations: 0,
            final_residual: initial_residual,
            state: IterState::Initialized,
            residual_history: Vec::new(),
        }
    }

    pub fn converged(&self) -> bool {
        self.state == IterState::Converged
    }

    pub fn not_converged(&self) -> OpError {
        OpError::DidNotConverge {
            iterations: self.iterations,
            residual: to_f64(self.final_residual),
        }
    }
}

impl<T: Scalar> Convergence<T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { tol, max_iters }
    }

    /// Returns (should_stop, state) given the current relative residual and iteration `i`.
    pub fn check(&self, rel: T, i: usize) -> (bool, IterState) {
        if rel <= self.tol {
            (true, IterState::Converged)
        } else if i >= self.max_iters {
            (true, IterState::BudgetExhausted)
        } else {
            (false, IterState::Iterating)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_orders_tolerance_before_budget() {
        let conv = Convergence::new(1e-6, 10);
        assert_eq!(conv.check(1e-7, 10), (true, IterState::Converged));
        assert_eq!(conv.check(1e-3, 10), (true, IterState::BudgetExhausted));
        assert_eq!(conv.check(1e-3, 3), (false, IterState::Iterating));
    }

    #[test]
    fn stats_report_non_convergence() {
        let mut stats = SolveStats::new(1.0f64);
        stats.iterations = 4;
        stats.final_residual = 0.25;
        stats.state = IterState::BudgetExhausted;
        assert!(!stats.converged());
        assert!(stats.state.is_terminal());
        assert_eq!(
            stats.not_converged(),
            OpError::DidNotConverge { iterations: 4, residual: 0.25 }
        );
    }
}
