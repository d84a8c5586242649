//! Generalized Minimal Residual (GMRES) solver with fixed restart (Saad §6.4)
//!
//! Restarted GMRES for general square operators. Minimizes the residual over a Krylov
//! subspace and supports both left and right preconditioning. The implementation includes
//! happy breakdown detection, double orthogonalization, and back-substitution with zero-pivot
//! protection for the least-squares problem. Columns of the right-hand side are solved one
//! after the other.
//!
//! # References
//! - Saad, Y. (2003). Iterative Methods for Sparse Linear Systems, 2nd Edition. SIAM. §6.4

use faer::{Mat, MatRef};
use log::{debug, trace, warn};

use crate::config::options::Options;
use crate::core::scalar::{Scalar, cast};
use crate::core::wrappers::{col_dot, col_norm, copy_col};
use crate::error::OpError;
use crate::operator::Operator;
use crate::preconditioner::Preconditioner;
use crate::solver::{LinearSolver, Solution};
use crate::utils::convergence::{Convergence, IterState, SolveStats};

/// Preconditioning mode for GMRES (none, left, or right)
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Preconditioning {
    None,
    Left,
    Right,
}

/// GMRES solver struct with restart and preconditioning options.
pub struct GmresSolver<T> {
    /// Number of Arnoldi vectors before restart
    pub restart: usize,
    /// Convergence criteria (tolerance and max iterations)
    pub conv: Convergence<T>,
    /// Preconditioning mode
    pub preconditioning: Preconditioning,
    pub record_history: bool,
}

impl<T: Scalar> GmresSolver<T> {
    /// Create a new GMRES solver with restart, tolerance, and max iterations.
    pub fn new(restart: usize, tol: T, max_iters: usize) -> Self {
        Self {
            restart: restart.max(1),
            conv: Convergence { tol, max_iters },
            preconditioning: Preconditioning::Right,
            record_history: false,
        }
    }

    pub fn from_options(opts: &Options<T>) -> Self {
        let mut s = Self::new(opts.restart, opts.tol, opts.max_iters);
        s.record_history = opts.record_history;
        s
    }

    /// Set the preconditioning mode (left, right, or none).
    pub fn with_preconditioning(mut self, mode: Preconditioning) -> Self {
        self.preconditioning = mode;
        self
    }

    /// Apply Givens rotations to column `j` of the Hessenberg matrix and update g.
    fn apply_givens_and_update_g(h: &mut [Vec<T>], g: &mut [T], cs: &mut [T], sn: &mut [T], j: usize, epsilon: T) {
        for i in 0..j {
            let temp = cs[i] * h[i][j] + sn[i] * h[i + 1][j];
            h[i + 1][j] = -sn[i] * h[i][j] + cs[i] * h[i + 1][j];
            h[i][j] = temp;
        }
        let h_kk = h[j][j];
        let h_k1k = h[j + 1][j];
        let r = h_kk.hypot(h_k1k);
        if r.abs() < epsilon {
            cs[j] = T::one();
            sn[j] = T::zero();
        } else {
            cs[j] = h_kk / r;
            sn[j] = h_k1k / r;
        }
        h[j][j] = cs[j] * h_kk + sn[j] * h_k1k;
        h[j + 1][j] = T::zero();
        let temp = cs[j] * g[j] + sn[j] * g[j + 1];
        g[j + 1] = -sn[j] * g[j] + cs[j] * g[j + 1];
        g[j] = temp;
    }

    /// Solve upper-triangular system Hy = g for y, with zero-pivot protection.
    fn back_substitution(h: &[Vec<T>], g: &[T], m: usize, epsilon: T) -> Vec<T> {
        let mut y = vec![T::zero(); m];
        for i in (0..m).rev() {
            y[i] = g[i];
            for j in (i + 1)..m {
                let yj = y[j];
                y[i] -= h[i][j] * yj;
            }
            y[i] = if h[i][i].abs() > epsilon { y[i] / h[i][i] } else { T::zero() };
        }
        y
    }

    fn solve_column(
        &self,
        a: &Operator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: MatRef<'_, T>,
    ) -> Result<(Mat<T>, SolveStats<T>), OpError> {
        let n = b.nrows();
        let mode = if pc.is_some() { self.preconditioning } else { Preconditioning::None };
        let epsilon: T = cast(1e-14);
        let m_max = self.restart.min(n.max(1));

        // left preconditioning measures the preconditioned residual
        let b_ref = match mode {
            Preconditioning::Left => col_norm(precondition(mode, pc, b)?.as_ref(), 0),
            _ => col_norm(b, 0),
        };
        let b_ref = if b_ref > T::zero() { b_ref } else { T::one() };

        let mut x = Mat::<T>::zeros(n, 1);
        let mut stats = SolveStats::new(T::one());
        stats.state = IterState::Iterating;
        let mut iteration = 0;

        loop {
            let ax = a.apply(x.as_ref())?;
            let mut r0 = Mat::from_fn(n, 1, |i, _| b[(i, 0)] - ax[(i, 0)]);
            if mode == Preconditioning::Left {
                r0 = precondition(mode, pc, r0.as_ref())?;
            }
            let beta = col_norm(r0.as_ref(), 0);
            let rel = beta / b_ref;
            stats.final_residual = rel;
            if let (true, state) = self.conv.check(rel, iteration) {
                stats.state = state;
                break;
            }

            // Krylov basis, one column per Arnoldi vector
            let mut v_basis = Mat::<T>::zeros(n, m_max + 1);
            for i in 0..n {
                v_basis[(i, 0)] = r0[(i, 0)] / beta;
            }
            let mut h = vec![vec![T::zero(); m_max]; m_max + 1];
            let mut g = vec![T::zero(); m_max + 1];
            g[0] = beta;
            let mut cs = vec![T::zero(); m_max];
            let mut sn = vec![T::zero(); m_max];
            let mut m = 0;
            let mut happy_breakdown = false;

            for j in 0..m_max {
                iteration += 1;
                let vj = v_basis.as_ref().subcols(j, 1);
                let mut w = match mode {
                    Preconditioning::Left => precondition(mode, pc, a.apply(vj)?.as_ref())?,
                    Preconditioning::Right => a.apply(precondition(mode, pc, vj)?.as_ref())?,
                    Preconditioning::None => a.apply(vj)?,
                };
                // Modified Gram-Schmidt, then a second pass for stability
                for pass in 0..2 {
                    for i in 0..=j {
                        let vi = v_basis.as_ref().subcols(i, 1);
                        let hij = col_dot(w.as_ref(), vi, 0);
                        h[i][j] = if pass == 0 { hij } else { h[i][j] + hij };
                        for k in 0..n {
                            w[(k, 0)] -= hij * vi[(k, 0)];
                        }
                    }
                }
                h[j + 1][j] = col_norm(w.as_ref(), 0);
                happy_breakdown = h[j + 1][j].abs() < epsilon * beta.max(T::one());
                if !happy_breakdown {
                    for k in 0..n {
                        v_basis[(k, j + 1)] = w[(k, 0)] / h[j + 1][j];
                    }
                }
                Self::apply_givens_and_update_g(&mut h, &mut g, &mut cs, &mut sn, j, epsilon);
                m = j + 1;
                let est = g[j + 1].abs() / b_ref;
                trace!("gmres iter {iteration}: estimated relative residual {est}");
                if self.record_history {
                    stats.residual_history.push(est);
                }
                if self.conv.check(est, iteration).0 || happy_breakdown {
                    break;
                }
            }

            let y = Self::back_substitution(&h, &g, m, epsilon);
            let vy = Mat::from_fn(n, 1, |i, _| (0..m).fold(T::zero(), |acc, k| acc + v_basis[(i, k)] * y[k]));
            let dx = match mode {
                Preconditioning::Right => precondition(mode, pc, vy.as_ref())?,
                _ => vy,
            };
            for i in 0..n {
                x[(i, 0)] += dx[(i, 0)];
            }
            if happy_breakdown {
                debug!("gmres: happy breakdown at iteration {iteration}");
            }
        }
        stats.iterations = iteration;
        Ok((x, stats))
    }
}

fn precondition<T: Scalar>(
    mode: Preconditioning,
    pc: Option<&dyn Preconditioner<T>>,
    v: MatRef<'_, T>,
) -> Result<Mat<T>, OpError> {
    match (mode, pc) {
        (Preconditioning::None, _) | (_, None) => Ok(v.to_owned()),
        (_, Some(pc)) => pc.apply(v),
    }
}

impl<T: Scalar> LinearSolver<T> for GmresSolver<T> {
    fn solve(
        &mut self,
        a: &Operator<T>,
        pc: Option<&dyn Preconditioner<T>>,
        b: MatRef<'_, T>,
    ) -> Result<Solution<T>, OpError> {
        if !a.is_square() || b.nrows() != a.nrows() {
            return Err(OpError::shape("gmres", a.shape(), (b.nrows(), b.ncols())));
        }
        let mut x = Mat::<T>::zeros(b.nrows(), b.ncols());
        let mut total = SolveStats::new(T::zero());
        total.state = IterState::Converged;
        for j in 0..b.ncols() {
            let (xj, s) = self.solve_column(a, pc, b.subcols(j, 1))?;
            copy_col(xj.as_ref(), 0, x.as_mut(), j);
            total.iterations = total.iterations.max(s.iterations);
            total.final_residual = total.final_residual.max(s.final_residual);
            if s.state != IterState::Converged {
                total.state = s.state;
            }
            if total.residual_history.len() < s.residual_history.len() {
                total.residual_history = s.residual_history;
            }
        }
        if total.converged() {
            debug!("gmres converged in {} iterations", total.iterations);
        } else {
            warn!("gmres stopped without converging ({:?}, residual {})", total.state, total.final_residual);
        }
        Ok(Solution { x, stats: total })
    }
}
