//! Symmetric Lanczos tridiagonalization with a stored basis.
//!
//! [`Lanczos::run`] builds `A V_m = V_m T_m + β_m v_{m+1} e_mᵀ` for a self-adjoint `A`, keeping
//! every basis vector so that Ritz vectors and Krylov function applications can be formed
//! from `V_m`. Loss of orthogonality is controlled by [`Reorthogonalization`]. The recurrence
//! stops early on breakdown (`β ≤ tol · ‖T‖`), which means the Krylov space became invariant.
//! With [`Lanczos::with_restarts`] it instead continues from a fresh random vector orthogonal
//! to the basis, so `T_m` becomes block diagonal and repeated eigenvalues can be resolved.
//!
//! [`lanczos_eig`] drives the recurrence until the selected Ritz pairs satisfy
//! `|β_m s_{m,i}| ≤ tol · max(|θ_i|, ε)`.

use faer::{Mat, MatRef};
use log::{debug, trace, warn};

use crate::config::options::{Options, Reorthogonalization};
use crate::core::scalar::{Scalar, cast};
use crate::core::wrappers::{col_axpy, col_dot, col_norm};
use crate::eigen::dense::symmetric_eigen;
use crate::eigen::{EigResult, EigSelection, SpectrumEnd};
use crate::error::OpError;
use crate::operator::Operator;
use crate::utils::convergence::{IterState, SolveStats};
use crate::utils::random::{ProbeDistribution, random_block, rng_from_seed};

/// Output of a Lanczos run.
#[derive(Clone, Debug)]
pub struct LanczosDecomposition<T: Scalar> {
    /// Orthonormal basis `V_m`, one column per step.
    pub basis: Mat<T>,
    /// Diagonal of `T_m`.
    pub alphas: Vec<T>,
    /// Off-diagonal of `T_m` (`m - 1` entries).
    pub betas: Vec<T>,
    /// `β_m`, the norm of the next (unnormalized) Lanczos vector.
    pub residual_beta: T,
    pub steps_taken: usize,
    /// Norm of the start vector.
    pub b_norm: T,
    pub breakdown: bool,
}

impl<T: Scalar> LanczosDecomposition<T> {
    /// `T_m` as a dense symmetric matrix.
    pub fn tridiagonal(&self) -> Mat<T> {
        let m = self.steps_taken;
        Mat::from_fn(m, m, |i, j| {
            if i == j {
                self.alphas[i]
            } else if i == j + 1 {
                self.betas[j]
            } else if j == i + 1 {
                self.betas[i]
            } else {
                T::zero()
            }
        })
    }

    /// Ritz values (ascending) and the eigenvectors of `T_m`.
    pub fn ritz(&self) -> Result<(Vec<T>, Mat<T>), OpError> {
        symmetric_eigen(self.tridiagonal().as_ref())
    }
}

/// Configuration of the Lanczos recurrence.
#[derive(Copy, Clone, Debug)]
pub struct Lanczos<T> {
    pub max_steps: usize,
    pub reorthogonalization: Reorthogonalization,
    /// Relative breakdown threshold on `β`.
    pub breakdown_tol: T,
    /// Seed for fresh start vectors after a breakdown; `None` stops at the first breakdown.
    pub restart_seed: Option<u64>,
}

impl<T: Scalar> Lanczos<T> {
    pub fn new(max_steps: usize) -> Self {
        Self {
            max_steps: max_steps.max(1),
            reorthogonalization: Reorthogonalization::Full,
            breakdown_tol: T::epsilon() * cast(100.0),
            restart_seed: None,
        }
    }

    /// `krylov_depth` steps with the configured re-orthogonalization.
    pub fn from_options(opts: &Options<T>) -> Self {
        Self::new(opts.krylov_depth).with_reorthogonalization(opts.reorthogonalization)
    }

    pub fn with_reorthogonalization(mut self, reorth: Reorthogonalization) -> Self {
        self.reorthogonalization = reorth;
        self
    }

    pub fn with_breakdown_tol(mut self, tol: T) -> Self {
        self.breakdown_tol = tol;
        self
    }

    pub fn with_restarts(mut self, seed: u64) -> Self {
        self.restart_seed = Some(seed);
        self
    }

    /// Runs up to `max_steps` steps from `start` (`n × 1`).
    pub fn run(&self, a: &Operator<T>, start: MatRef<'_, T>) -> Result<LanczosDecomposition<T>, OpError> {
        self.run_until(a, start, |_| Ok(false))
    }

    /// Runs until `stop` returns true for the decomposition built so far, an unrecoverable
    /// breakdown, or `max_steps`. `stop` is not consulted on a step that broke down.
    pub fn run_until(
        &self,
        a: &Operator<T>,
        start: MatRef<'_, T>,
        mut stop: impl FnMut(&LanczosDecomposition<T>) -> Result<bool, OpError>,
    ) -> Result<LanczosDecomposition<T>, OpError> {
        let mut rec = Recurrence::new(a, start, *self)?;
        let limit = self.max_steps.min(a.nrows());
        let mut rng = self.restart_seed.map(rng_from_seed);
        while rec.steps() < limit {
            if rec.step()? {
                if stop(&rec.snapshot())? {
                    break;
                }
                continue;
            }
            let resumed = match rng.as_mut() {
                Some(rng) if rec.steps() < limit => {
                    rec.restart(random_block(rng, a.nrows(), 1, ProbeDistribution::Gaussian))
                }
                _ => false,
            };
            if !resumed {
                break;
            }
        }
        Ok(rec.snapshot())
    }
}

struct Recurrence<'a, T: Scalar> {
    a: &'a Operator<T>,
    cfg: Lanczos<T>,
    basis: Vec<Mat<T>>,
    alphas: Vec<T>,
    betas: Vec<T>,
    /// Unnormalized next vector and its norm.
    next: Mat<T>,
    beta: T,
    t_norm: T,
    b_norm: T,
    breakdown: bool,
    /// `next` is a fresh vector, not coupled to the last basis vector.
    restarted: bool,
}

impl<'a, T: Scalar> Recurrence<'a, T> {
    fn new(a: &'a Operator<T>, start: MatRef<'_, T>, cfg: Lanczos<T>) -> Result<Self, OpError> {
        if !a.is_square() || start.nrows() != a.nrows() || start.ncols() != 1 {
            return Err(OpError::shape("lanczos", a.shape(), (start.nrows(), start.ncols())));
        }
        let b_norm = col_norm(start, 0);
        if b_norm == T::zero() || !b_norm.is_finite() {
            return Err(OpError::InvalidInput("lanczos start vector must be non-zero and finite".into()));
        }
        Ok(Self {
            a,
            cfg,
            basis: Vec::new(),
            alphas: Vec::new(),
            betas: Vec::new(),
            next: start.to_owned(),
            beta: b_norm,
            t_norm: T::zero(),
            b_norm,
            breakdown: false,
            restarted: false,
        })
    }

    fn steps(&self) -> usize {
        self.alphas.len()
    }

    /// One step; false once the recurrence cannot continue.
    fn step(&mut self) -> Result<bool, OpError> {
        if self.breakdown {
            return Ok(false);
        }
        let inv = T::one() / self.beta;
        let v = Mat::from_fn(self.next.nrows(), 1, |i, _| self.next[(i, 0)] * inv);
        let coupling = if self.restarted { T::zero() } else { self.beta };
        self.restarted = false;
        if !self.basis.is_empty() {
            self.betas.push(coupling);
        }
        let mut w = self.a.apply(v.as_ref())?;
        if let Some(prev) = self.basis.last() {
            col_axpy(-coupling, prev.as_ref(), w.as_mut(), 0);
        }
        let alpha = col_dot(v.as_ref(), w.as_ref(), 0);
        col_axpy(-alpha, v.as_ref(), w.as_mut(), 0);
        self.basis.push(v);
        self.alphas.push(alpha);

        match self.cfg.reorthogonalization {
            Reorthogonalization::None => {}
            Reorthogonalization::Full => self.orthogonalize(&mut w),
            Reorthogonalization::Selective { tol } => {
                let norm = col_norm(w.as_ref(), 0);
                let loss = if norm > T::zero() {
                    col_dot(self.basis[0].as_ref(), w.as_ref(), 0).abs() / norm
                } else {
                    T::zero()
                };
                if loss > cast(tol) {
                    trace!("lanczos step {}: orthogonality loss {loss}, re-orthogonalizing", self.steps());
                    self.orthogonalize(&mut w);
                }
            }
        }

        let beta = col_norm(w.as_ref(), 0);
        self.t_norm = self.t_norm.max(alpha.abs() + beta + self.betas.last().copied().unwrap_or(T::zero()));
        self.next = w;
        self.beta = beta;
        if !(beta > self.cfg.breakdown_tol * self.t_norm.max(T::min_positive_value())) {
            debug!("lanczos breakdown after {} steps (beta = {beta})", self.steps());
            self.breakdown = true;
            return Ok(false);
        }
        Ok(true)
    }

    /// Continues after a breakdown from `fresh` orthogonalized against the basis; false when
    /// nothing of it is left.
    fn restart(&mut self, mut fresh: Mat<T>) -> bool {
        let before = col_norm(fresh.as_ref(), 0);
        self.orthogonalize(&mut fresh);
        let norm = col_norm(fresh.as_ref(), 0);
        if !(norm > T::epsilon().sqrt() * before) {
            return false;
        }
        debug!("lanczos restart after {} steps", self.steps());
        self.next = fresh;
        self.beta = norm;
        self.breakdown = false;
        self.restarted = true;
        true
    }

    /// Two classical Gram–Schmidt passes against the whole basis.
    fn orthogonalize(&self, w: &mut Mat<T>) {
        for _ in 0..2 {
            for v in &self.basis {
                let c = col_dot(v.as_ref(), w.as_ref(), 0);
                col_axpy(-c, v.as_ref(), w.as_mut(), 0);
            }
        }
    }

    fn snapshot(&self) -> LanczosDecomposition<T> {
        let n = self.next.nrows();
        let m = self.basis.len();
        LanczosDecomposition {
            basis: Mat::from_fn(n, m, |i, j| self.basis[j][(i, 0)]),
            alphas: self.alphas.clone(),
            betas: self.betas.clone(),
            residual_beta: if self.breakdown { T::zero() } else { self.beta },
            steps_taken: m,
            b_norm: self.b_norm,
            breakdown: self.breakdown,
        }
    }
}

/// Positions of the `count` Ritz values wanted at `end` among `m` ascending values.
fn wanted(end: SpectrumEnd, count: usize, m: usize) -> std::ops::Range<usize> {
    match end {
        SpectrumEnd::Smallest => 0..count.min(m),
        SpectrumEnd::Largest => m.saturating_sub(count)..m,
    }
}

/// Largest relative Ritz residual `|β_m s_{m,i}| / max(|θ_i|, ε)` over `range`.
fn ritz_residual<T: Scalar>(beta: T, values: &[T], s: MatRef<'_, T>, range: std::ops::Range<usize>) -> T {
    let last = s.nrows() - 1;
    range.fold(T::zero(), |acc, i| {
        let est = (beta * s[(last, i)]).abs() / values[i].abs().max(T::epsilon());
        acc.max(est)
    })
}

/// Selected eigenpairs of a self-adjoint operator by Lanczos from a seeded random start.
pub fn lanczos_eig<T: Scalar>(
    a: &Operator<T>,
    selection: &EigSelection,
    opts: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    let start = random_block::<T>(&mut rng_from_seed(opts.seed), a.nrows(), 1, opts.probe);
    lanczos_eig_from(a, start.as_ref(), selection, opts)
}

/// As [`lanczos_eig`] with a caller-provided start vector.
pub fn lanczos_eig_from<T: Scalar>(
    a: &Operator<T>,
    start: MatRef<'_, T>,
    selection: &EigSelection,
    opts: &Options<T>,
) -> Result<EigResult<T>, OpError> {
    let n = a.nrows();
    selection.validate(n)?;
    let (end, count, sub) = selection.extremal(n);
    let cfg = Lanczos::new(opts.max_iters.max(count))
        .with_reorthogonalization(opts.reorthogonalization)
        .with_restarts(opts.seed.wrapping_add(1));

    let mut residual = T::infinity();
    let mut converged = false;
    let dec = cfg.run_until(a, start, |dec| {
        let m = dec.steps_taken;
        if m < count {
            return Ok(false);
        }
        let (values, s) = dec.ritz()?;
        residual = ritz_residual(dec.residual_beta, &values, s.as_ref(), wanted(end, count, m));
        trace!("lanczos eig step {m}: ritz residual {residual}");
        converged = residual <= opts.tol;
        Ok(converged)
    })?;

    let m = dec.steps_taken;
    let (values, s) = dec.ritz()?;
    let range = wanted(end, count, m);
    // a breakdown leaves exact Ritz pairs; the callback does not see the final step then
    residual = ritz_residual(dec.residual_beta, &values, s.as_ref(), range.clone());
    if m < count {
        warn!("lanczos: Krylov space collapsed after {m} steps, {count} eigenpairs requested");
        converged = false;
    } else {
        converged = converged || residual <= opts.tol;
    }

    let picked: Vec<usize> = range.clone().skip(sub.start).take(sub.len()).collect();
    let s_sel = Mat::from_fn(m, picked.len(), |i, j| s[(i, picked[j])]);
    let vectors = dec.basis.as_ref() * s_sel.as_ref();

    let mut stats = SolveStats::new(residual);
    stats.iterations = m;
    stats.state = if converged {
        IterState::Converged
    } else if dec.breakdown {
        IterState::Breakdown
    } else {
        IterState::BudgetExhausted
    };
    if converged {
        debug!("lanczos eig converged in {m} steps (residual {residual})");
    } else {
        warn!("lanczos eig stopped after {m} steps without converging (residual {residual})");
    }
    Ok(EigResult { values: picked.iter().map(|&i| values[i]).collect(), vectors, stats })
}
