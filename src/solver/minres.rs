//! MINRES solver (Paige & Saunders; Saad §7.4)
//!
//! Minimizes the residual over the Krylov subspace of a symmetric, possibly indefinite
//! operator using the Lanczos short recurrence and Givens rotations. An optional symmetric
//! positive definite preconditioner is supported. Columns of the right-hand side are solved
//! one after the other.

use faer::{Mat, MatRef};
use log::{debug, trace, warn};

use crate::config::options::Options;
use crate::core::scalar::Scalar;
use crate::core::wrappers::{col_dot, copy_col};
use crate::error::OpError;
use crate::operator::Operator;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, Solution};
use crate::utils::convergence::{Convergence, IterState, SolveStats};

/// MINRES solver struct, holding convergence parameters.
pub struct MinresSolver<T> {
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence<T>,
    pub record_history: bool,
}

impl<T: Scalar> MinresSolver<T> {
    /// Create a new MINRES solver with given tolerance and maximum iterations.
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence { tol, max_iters }, record_history: false }
    }

    pub fn from_options(opts: &Options<T>) -> Self {
        Self { record_history: opts.record_history, ..Self::new(opts.tol, opts.max_iters) }
    }

    fn solve_column(
        &self,
        a: &Operator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: MatRef<'_, T>,
    ) -> Result<(Mat<T>, SolveStats<T>), OpError> {
        let n = b.nrows();
        let psolve = |r: &Mat<T>| match pc {
            Some(pc) => pc.apply(r.as_ref()),
            None => Ok(r.clone()),
        };
        let mut x = Mat::<T>::zeros(n, 1);
        let mut r1 = b.to_owned();
        let mut y = psolve(&r1)?;
        let beta1_sq = col_dot(r1.as_ref(), y.as_ref(), 0);
        if beta1_sq < T::zero() {
            return Err(OpError::InvalidInput("minres preconditioner is not positive definite".into()));
        }
        let beta1 = beta1_sq.sqrt();
        let mut stats = SolveStats::new(T::one());
        if beta1 == T::zero() {
            stats.final_residual = T::zero();
            stats.state = IterState::Converged;
            return Ok((x, stats));
        }
        stats.state = IterState::Iterating;

        let eps = T::epsilon();
        let mut r2 = r1.clone();
        let mut w = Mat::<T>::zeros(n, 1);
        let mut w2 = Mat::<T>::zeros(n, 1);
        let (mut oldb, mut beta) = (T::zero(), beta1);
        let (mut dbar, mut epsln) = (T::zero(), T::zero());
        let mut phibar = beta1;
        let (mut cs, mut sn) = (-T::one(), T::zero());

        let mut it = 0;
        while it < self.conv.max_iters {
            it += 1;
            let v = Mat::from_fn(n, 1, |i, _| y[(i, 0)] / beta);
            y = a.apply(v.as_ref())?;
            if it >= 2 {
                let c = beta / oldb;
                for i in 0..n {
                    y[(i, 0)] -= c * r1[(i, 0)];
                }
            }
            let alfa = col_dot(v.as_ref(), y.as_ref(), 0);
            let c = alfa / beta;
            for i in 0..n {
                y[(i, 0)] -= c * r2[(i, 0)];
            }
            r1 = r2;
            r2 = y.clone();
            y = psolve(&r2)?;
            oldb = beta;
            let beta_sq = col_dot(r2.as_ref(), y.as_ref(), 0);
            if beta_sq < T::zero() {
                return Err(OpError::InvalidInput("minres preconditioner is not positive definite".into()));
            }
            beta = beta_sq.sqrt();

            // apply the previous rotation, then build the new one
            let oldeps = epsln;
            let delta = cs * dbar + sn * alfa;
            let gbar = sn * dbar - cs * alfa;
            epsln = sn * beta;
            dbar = -cs * beta;
            let gamma = gbar.hypot(beta).max(eps);
            cs = gbar / gamma;
            sn = beta / gamma;
            let phi = cs * phibar;
            phibar = sn * phibar;

            let w1 = std::mem::replace(&mut w2, w.clone());
            for i in 0..n {
                w[(i, 0)] = (v[(i, 0)] - oldeps * w1[(i, 0)] - delta * w2[(i, 0)]) / gamma;
                x[(i, 0)] += phi * w[(i, 0)];
            }

            let rel = phibar.abs() / beta1;
            trace!("minres iter {it}: estimated relative residual {rel}");
            if self.record_history {
                stats.residual_history.push(rel);
            }
            stats.iterations = it;
            stats.final_residual = rel;
            let (stop, state) = self.conv.check(rel, it);
            if state == IterState::Converged {
                stats.state = state;
                break;
            }
            if beta <= eps * beta1 {
                // invariant subspace reached; the estimate above is final
                stats.state = IterState::Breakdown;
                break;
            }
            if stop {
                stats.state = state;
                break;
            }
        }
        if stats.state == IterState::Iterating {
            stats.state = IterState::BudgetExhausted;
        }
        Ok((x, stats))
    }
}

impl<T: Scalar> LinearSolver<T> for MinresSolver<T> {
    fn solve(
        &mut self,
        a: &Operator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: MatRef<'_, T>,
    ) -> Result<Solution<T>, OpError> {
        if !a.is_square() || b.nrows() != a.nrows() {
            return Err(OpError::shape("minres", a.shape(), (b.nrows(), b.ncols())));
        }
        let mut x = Mat::<T>::zeros(b.nrows(), b.ncols());
        let mut total = SolveStats::new(T::zero());
        total.state = IterState::Converged;
        for j in 0..b.ncols() {
            let (xj, s) = self.solve_column(a, pc, b.subcols(j, 1))?;
            copy_col(xj.as_ref(), 0, x.as_mut(), j);
            total.iterations = total.iterations.max(s.iterations);
            total.final_residual = total.final_residual.max(s.final_residual);
            if s.state != IterState::Converged && total.state == IterState::Converged {
                total.state = s.state;
            }
            if total.residual_history.len() < s.residual_history.len() {
                total.residual_history = s.residual_history;
            }
        }
        if total.converged() {
            debug!("minres converged in {} iterations", total.iterations);
        } else {
            warn!("minres stopped without converging ({:?}, residual {})", total.state, total.final_residual);
        }
        Ok(Solution { x, stats: total })
    }
}
