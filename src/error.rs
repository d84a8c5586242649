use thiserror::Error;

use crate::context::registry::{Algorithm, Operation};
use crate::core::traits::{OpKind, Placement};

// Unified error type for matfree

#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpError {
    #[error("shape mismatch in {op}: {left:?} vs {right:?}")]
    Shape {
        op: &'static str,
        left: (usize, usize),
        right: (usize, usize),
    },
    #[error("operands placed on different devices ({left:?} vs {right:?})")]
    PlacementMismatch { left: Placement, right: Placement },
    #[error("ambiguous dispatch of {op} on {kind:?}: candidates {candidates:?}")]
    AmbiguousDispatch {
        op: Operation,
        kind: OpKind,
        candidates: Vec<Algorithm>,
    },
    #[error("no rule registered for {op} on {kind:?}")]
    NoRule { op: Operation, kind: OpKind },
    #[error("did not converge after {iterations} iterations (relative residual {residual:e})")]
    DidNotConverge { iterations: usize, residual: f64 },
    #[error("unsupported operation: {0}")]
    Unsupported(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("factorization error: {0}")]
    FactorError(String),
    #[error("zero pivot at row {0}")]
    ZeroPivot(usize),
}

impl OpError {
    pub(crate) fn shape(op: &'static str, left: (usize, usize), right: (usize, usize)) -> Self {
        OpError::Shape { op, left, right }
    }

    /// True for errors that still come with a usable estimate.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, OpError::DidNotConverge { .. })
    }
}
