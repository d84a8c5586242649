//! Block Conjugate Gradient per Saad §6.1 / §9.2.
//!
//! Each column of the right-hand-side block runs its own CG recurrence, but all columns share
//! one operator application per iteration. A column stops updating when it converges or
//! breaks down (`pᵀAp ≤ 0`); the solver returns, per column, the iterate with the smallest
//! relative residual seen.

use faer::{Mat, MatRef};
use log::{debug, trace, warn};

use crate::config::options::Options;
use crate::core::scalar::Scalar;
use crate::core::wrappers::{col_axpy, col_dot, col_norm, copy_col};
use crate::error::OpError;
use crate::operator::Operator;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, Solution};
use crate::utils::convergence::{Convergence, IterState, SolveStats};

/// Per-iteration observer: `(iteration, worst relative residual among active columns)`.
pub type Monitor<'a, T> = dyn FnMut(usize, T) + 'a;

pub struct CgSolver<'a, T> {
    pub conv: Convergence<T>,
    pub record_history: bool,
    monitor: Option<Box<Monitor<'a, T>>>,
}

impl<'a, T: Scalar> CgSolver<'a, T> {
    pub fn new(tol: T, max_iters: usize) -> Self {
        Self { conv: Convergence { tol, max_iters }, record_history: false, monitor: None }
    }

    pub fn from_options(opts: &Options<T>) -> Self {
        Self::new(opts.tol, opts.max_iters).with_history(opts.record_history)
    }

    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    pub fn with_monitor(mut self, monitor: impl FnMut(usize, T) + 'a) -> Self {
        self.monitor = Some(Box::new(monitor));
        self
    }
}

fn precondition<T: Scalar>(pc: Option<&dyn Preconditioner<T>>, r: &Mat<T>) -> Result<Mat<T>, OpError> {
    match pc {
        Some(pc) => pc.apply(r.as_ref()),
        None => Ok(r.clone()),
    }
}

impl<T: Scalar> LinearSolver<T> for CgSolver<'_, T> {
    fn solve(
        &mut self,
        a: &Operator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: MatRef<'_, T>,
    ) -> Result<Solution<T>, OpError> {
        if !a.is_square() || b.nrows() != a.nrows() {
            return Err(OpError::shape("cg", a.shape(), (b.nrows(), b.ncols())));
        }
        let (n, k) = (b.nrows(), b.ncols());
        let mut x = Mat::<T>::zeros(n, k);
        let mut best_x = Mat::<T>::zeros(n, k);
        let mut r = b.to_owned();
        let mut z = precondition(pc, &r)?;
        let mut p = z.clone();

        // a zero right-hand side is measured in absolute terms
        let b_norm: Vec<T> = (0..k)
            .map(|j| {
                let nb = col_norm(b, j);
                if nb > T::zero() { nb } else { T::one() }
            })
            .collect();
        let mut rz: Vec<T> = (0..k).map(|j| col_dot(r.as_ref(), z.as_ref(), j)).collect();
        let mut best: Vec<T> = (0..k).map(|j| col_norm(r.as_ref(), j) / b_norm[j]).collect();
        let mut col_state: Vec<IterState> = best
            .iter()
            .map(|&rel| self.conv.check(rel, 0).1)
            .collect();

        let worst = |best: &[T]| best.iter().fold(T::zero(), |m, &v| m.max(v));
        let mut stats = SolveStats::new(worst(&best));
        stats.state = IterState::Iterating;

        let mut it = 0;
        while col_state.contains(&IterState::Iterating) {
            it += 1;
            let ap = a.apply(p.as_ref())?;
            for j in 0..k {
                if col_state[j] != IterState::Iterating {
                    continue;
                }
                let pap = col_dot(p.as_ref(), ap.as_ref(), j);
                if !(pap > T::zero()) || !pap.is_finite() {
                    debug!("cg: column {j} broke down at iteration {it} (pAp = {pap})");
                    col_state[j] = IterState::Breakdown;
                    continue;
                }
                let alpha = rz[j] / pap;
                col_axpy(alpha, p.as_ref(), x.as_mut(), j);
                col_axpy(-alpha, ap.as_ref(), r.as_mut(), j);
                let rel = col_norm(r.as_ref(), j) / b_norm[j];
                if rel < best[j] {
                    best[j] = rel;
                    copy_col(x.as_ref(), j, best_x.as_mut(), j);
                }
                col_state[j] = self.conv.check(rel, it).1;
            }

            let w = worst(&best);
            trace!("cg iter {it}: max relative residual {w}");
            if self.record_history {
                stats.residual_history.push(w);
            }
            if let Some(monitor) = self.monitor.as_mut() {
                monitor(it, w);
            }
            if !col_state.contains(&IterState::Iterating) {
                break;
            }

            z = precondition(pc, &r)?;
            for j in 0..k {
                if col_state[j] != IterState::Iterating {
                    continue;
                }
                let rz_new = col_dot(r.as_ref(), z.as_ref(), j);
                let beta = rz_new / rz[j];
                for i in 0..n {
                    p[(i, j)] = z[(i, j)] + beta * p[(i, j)];
                }
                rz[j] = rz_new;
            }
        }

        stats.iterations = it;
        stats.final_residual = worst(&best);
        stats.state = if col_state.iter().all(|s| *s == IterState::Converged) {
            IterState::Converged
        } else if col_state.contains(&IterState::BudgetExhausted) {
            IterState::BudgetExhausted
        } else {
            IterState::Breakdown
        };
        if stats.converged() {
            debug!("cg converged in {it} iterations (residual {})", stats.final_residual);
        } else {
            warn!(
                "cg stopped without converging after {it} iterations ({:?}, residual {})",
                stats.state, stats.final_residual
            );
        }
        Ok(Solution { x: best_x, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn spd3() -> Operator<f64> {
        // A = [[4,1,0],[1,3,1],[0,1,2]]
        Operator::dense(Mat::from_fn(3, 3, |i, j| {
            [[4.0, 1.0, 0.0], [1.0, 3.0, 1.0], [0.0, 1.0, 2.0]][i][j]
        }))
    }

    #[test]
    fn cg_solves_simple_spd() {
        // SPD system: [[4,1],[1,3]] x = [1,2]
        let a = Operator::dense(Mat::from_fn(2, 2, |i, j| [[4.0, 1.0], [1.0, 3.0]][i][j]));
        let b = Mat::from_fn(2, 1, |i, _| (i + 1) as f64);
        let sol = CgSolver::new(1e-10, 20).solve(&a, None, b.as_ref()).unwrap();
        assert!(sol.converged(), "CG did not converge");
        assert_abs_diff_eq!(sol.x[(0, 0)], 1.0 / 11.0, epsilon = 1e-8);
        assert_abs_diff_eq!(sol.x[(1, 0)], 7.0 / 11.0, epsilon = 1e-8);
    }

    #[test]
    fn cg_block_solves_each_column() {
        // x_true = [1,2,3] and [-1,0,1]; b = A x_true
        let a = spd3();
        let x_true = Mat::from_fn(3, 2, |i, j| if j == 0 { (i + 1) as f64 } else { i as f64 - 1.0 });
        let b = a.apply(x_true.as_ref()).unwrap();
        let sol = CgSolver::new(1e-12, 100).solve(&a, None, b.as_ref()).unwrap();
        assert!(sol.converged());
        for j in 0..2 {
            for i in 0..3 {
                assert_abs_diff_eq!(sol.x[(i, j)], x_true[(i, j)], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn budget_exhaustion_keeps_history_monotone() {
        let n = 30;
        let a = Operator::diagonal((1..=n).map(|i| i as f64).collect());
        let b = Mat::from_fn(n, 1, |_, _| 1.0);
        let sol = CgSolver::new(1e-14, 5).with_history(true).solve(&a, None, b.as_ref()).unwrap();
        assert_eq!(sol.stats.state, IterState::BudgetExhausted);
        assert_eq!(sol.stats.residual_history.len(), 5);
        for w in sol.stats.residual_history.windows(2) {
            assert!(w[1] <= w[0]);
        }
        assert!(matches!(sol.into_result(), Err(OpError::DidNotConverge { iterations: 5, .. })));
    }

    #[test]
    fn zero_rhs_is_immediately_converged() {
        let b = Mat::<f64>::zeros(3, 1);
        let sol = CgSolver::new(1e-10, 10).solve(&spd3(), None, b.as_ref()).unwrap();
        assert!(sol.converged());
        assert_eq!(sol.stats.iterations, 0);
    }

    #[test]
    fn zero_budget_reports_exhaustion_unless_already_solved() {
        let a = spd3();
        let b = Mat::from_fn(3, 2, |i, j| if j == 0 { 0.0 } else { (i + 1) as f64 });
        let sol = CgSolver::new(1e-10, 0).solve(&a, None, b.as_ref()).unwrap();
        assert_eq!(sol.stats.state, IterState::BudgetExhausted);
        assert_eq!(sol.stats.iterations, 0);

        let zero = Mat::<f64>::zeros(3, 1);
        let sol = CgSolver::new(1e-10, 0).solve(&a, None, zero.as_ref()).unwrap();
        assert!(sol.converged());
    }

    #[test]
    fn monitor_sees_every_iteration() {
        let mut seen = Vec::new();
        let b = Mat::from_fn(3, 1, |_, _| 1.0);
        let a = spd3();
        let sol = CgSolver::new(1e-12, 50)
            .with_monitor(|it, _| seen.push(it))
            .solve(&a, None, b.as_ref())
            .unwrap();
        assert_eq!(seen.len(), sol.stats.iterations);
    }

    #[test]
    fn indefinite_operator_breaks_down() {
        let a = Operator::diagonal(vec![1.0f64, -1.0]);
        let b = Mat::from_fn(2, 1, |_, _| 1.0);
        let sol = CgSolver::new(1e-12, 10).solve(&a, None, b.as_ref()).unwrap();
        assert_eq!(sol.stats.state, IterState::Breakdown);
        assert!(sol.x[(0, 0)].is_finite());
    }
}
