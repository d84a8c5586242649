//! Core traits, scalar types and column kernels.

pub mod scalar;
pub mod traits;
pub mod wrappers;

pub use scalar::{DType, Scalar};
pub use traits::{LinearOperator, MatShape, OpKind, Placement};
