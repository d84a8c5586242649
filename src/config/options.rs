//! Tuning knobs shared by every algorithm entry point.
//!
//! `Options` carries the tolerance and iteration budget of the iterative routines, the
//! method override consulted by dispatch, and the algorithm-specific parameters (GMRES
//! restart, Lanczos re-orthogonalization and depth, SLQ probes). Every field has a
//! `with_*` builder.

use crate::context::registry::{Algorithm, Method};
use crate::core::scalar::{Scalar, cast};
use crate::operator::Operator;
use crate::utils::convergence::Convergence;
use crate::utils::random::ProbeDistribution;

/// Re-orthogonalization policy of the Lanczos recurrence.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub enum Reorthogonalization {
    None,
    /// Two Gram–Schmidt passes against the whole basis at every step.
    #[default]
    Full,
    /// Re-orthogonalize when `|v₀ · v_j|` exceeds `tol`.
    Selective { tol: f64 },
}

#[derive(Clone, Debug)]
pub struct Options<T: Scalar> {
    pub tol: T,
    pub max_iters: usize,
    pub method: Method,
    pub restart: usize,
    pub reorthogonalization: Reorthogonalization,
    /// Lanczos steps per SLQ probe and Krylov dimension of lazy matrix functions.
    pub krylov_depth: usize,
    pub num_probes: usize,
    pub probe: ProbeDistribution,
    pub seed: u64,
    pub preconditioner: Option<Operator<T>>,
    pub record_history: bool,
}

impl<T: Scalar> Default for Options<T> {
    fn default() -> Self {
        Self {
            tol: T::epsilon().sqrt(),
            max_iters: 1000,
            method: Method::Auto,
            restart: 30,
            reorthogonalization: Reorthogonalization::Full,
            krylov_depth: 64,
            num_probes: 32,
            probe: ProbeDistribution::Rademacher,
            seed: 0,
            preconditioner: None,
            record_history: false,
        }
    }
}

impl<T: Scalar> Options<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tol(mut self, tol: T) -> Self {
        self.tol = tol;
        self
    }

    pub fn with_tol_f64(self, tol: f64) -> Self {
        self.with_tol(cast(tol))
    }

    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Hint: use `alg` when it is eligible, otherwise dispatch normally.
    pub fn prefer(self, alg: Algorithm) -> Self {
        self.with_method(Method::Prefer(alg))
    }

    /// Override: use the rule tagged `alg`, bypassing capability guards.
    pub fn force(self, alg: Algorithm) -> Self {
        self.with_method(Method::Force(alg))
    }

    pub fn with_restart(mut self, restart: usize) -> Self {
        self.restart = restart.max(1);
        self
    }

    pub fn with_reorthogonalization(mut self, reorth: Reorthogonalization) -> Self {
        self.reorthogonalization = reorth;
        self
    }

    pub fn with_krylov_depth(mut self, depth: usize) -> Self {
        self.krylov_depth = depth.max(1);
        self
    }

    pub fn with_num_probes(mut self, n: usize) -> Self {
        self.num_probes = n.max(1);
        self
    }

    pub fn with_probe(mut self, probe: ProbeDistribution) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_preconditioner(mut self, pc: Operator<T>) -> Self {
        self.preconditioner = Some(pc);
        self
    }

    pub fn with_history(mut self, record: bool) -> Self {
        self.record_history = record;
        self
    }

    pub fn convergence(&self) -> Convergence<T> {
        Convergence::new(self.tol, self.max_iters)
    }

    /// Same options with the method reset to `Auto`, for nested dispatch.
    pub(crate) fn nested(&self) -> Self {
        Self { method: Method::Auto, ..self.clone() }
    }
}
