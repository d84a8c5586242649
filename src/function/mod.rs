//! Matrix functions `f(A)` for `f ∈ {exp, sqrt, x^p}`.
//!
//! Small matrices are handled densely ([`dense`]); large operators get a lazy Krylov
//! projection ([`krylov`]).

pub mod dense;
pub mod krylov;

use crate::core::scalar::Scalar;
use crate::operator::Capabilities;

pub use krylov::{KrylovFunctionOp, Projection};

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum MatrixFunction<T> {
    Exp,
    Sqrt,
    Pow(T),
}

impl<T: Scalar> MatrixFunction<T> {
    pub fn name(&self) -> &'static str {
        match self {
            MatrixFunction::Exp => "exp",
            MatrixFunction::Sqrt => "sqrt",
            MatrixFunction::Pow(_) => "pow",
        }
    }

    /// The scalar function.
    pub fn eval(&self, x: T) -> T {
        match *self {
            MatrixFunction::Exp => x.exp(),
            MatrixFunction::Sqrt => x.sqrt(),
            MatrixFunction::Pow(p) => match self.integer_exponent() {
                Some(k) => x.powi(k),
                None => x.powf(p),
            },
        }
    }

    /// The exponent when it is an integer representable as `i32`.
    pub fn integer_exponent(&self) -> Option<i32> {
        match *self {
            MatrixFunction::Pow(p) if p.fract() == T::zero() => p.to_i32(),
            _ => None,
        }
    }

    /// Capabilities of `f(A)` given those of `A`.
    pub(crate) fn capabilities_of(&self, caps: Capabilities) -> Capabilities {
        if !caps.is_self_adjoint() {
            return Capabilities::empty();
        }
        let psd = match self {
            MatrixFunction::Exp => true,
            MatrixFunction::Sqrt => caps.is_psd(),
            MatrixFunction::Pow(_) => caps.is_psd() || self.integer_exponent().is_some_and(|k| k % 2 == 0),
        };
        if psd { Capabilities::POSITIVE_SEMIDEFINITE } else { Capabilities::SELF_ADJOINT }
    }
}
