//! matfree: matrix-free linear operators with structure-aware dispatch over Faer
//!
//! Operators are immutable, `Arc`-shared expression nodes (dense, diagonal, tridiagonal,
//! sparse and identity leaves combined by sums, products, Kronecker products, block
//! diagonals, slices and transposes). High-level routines (solve, inverse, eigenpairs,
//! log-determinants, diagonals, matrix functions) are resolved per call against rule tables
//! keyed by operator kind and the caller's self-adjoint / PSD annotations, falling back to
//! Krylov methods (CG, MINRES, GMRES, Lanczos, SLQ) that only need `apply`.

pub mod api;
pub mod config;
pub mod context;
pub mod core;
pub mod eigen;
pub mod error;
pub mod function;
pub mod matrix;
pub mod operator;
pub mod preconditioner;
pub mod solver;
pub mod utils;

// Re-exports for convenience
pub use api::{
    cg, diag, eig, eigmax, exp, inverse, lanczos, logdet, pow, rowsum, slq_spectral_density, slq_trace, solve, sqrt,
    trace,
};
pub use config::{Options, Reorthogonalization};
pub use context::{Algorithm, LinalgContext, Method, Operation, Registry, Signature};
pub use core::{LinearOperator, MatShape, OpKind, Placement, Scalar};
pub use eigen::{DominantEig, EigResult, EigSelection, SlqEstimate, SpectralDensity, SpectrumEnd};
pub use error::OpError;
pub use function::MatrixFunction;
pub use matrix::{CsrMatrix, DenseOperator, Diagonal, Identity, Permutation, ScaledIdentity, Tridiagonal};
pub use operator::{Axis, Capabilities, Index, Operator, block_diag, block_diag_with_multiplicity, concatenate, kron};
pub use preconditioner::{Jacobi, Preconditioner};
pub use solver::{CgSolver, GmresSolver, LinearSolver, MinresSolver, Solution};
pub use utils::{IterState, ProbeDistribution, SolveStats};
