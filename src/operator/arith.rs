//! Operator overloads on `&Operator`.
//!
//! Combinations that can fail on shape or placement return `Result`; scalings cannot fail.

use std::ops::{Add, Div, Mul, Neg, Sub};

use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::operator::{Operator, product, scaled, sum};

impl<T: Scalar> Add<&Operator<T>> for &Operator<T> {
    type Output = Result<Operator<T>, OpError>;

    fn add(self, rhs: &Operator<T>) -> Self::Output {
        sum::sum(&[self.clone(), rhs.clone()])
    }
}

impl<T: Scalar> Sub<&Operator<T>> for &Operator<T> {
    type Output = Result<Operator<T>, OpError>;

    fn sub(self, rhs: &Operator<T>) -> Self::Output {
        sum::sum(&[self.clone(), -rhs])
    }
}

/// Composition, the `@` of the operator algebra.
impl<T: Scalar> Mul<&Operator<T>> for &Operator<T> {
    type Output = Result<Operator<T>, OpError>;

    fn mul(self, rhs: &Operator<T>) -> Self::Output {
        product::compose(self, rhs)
    }
}

impl<T: Scalar> Mul<T> for &Operator<T> {
    type Output = Operator<T>;

    fn mul(self, c: T) -> Operator<T> {
        scaled::scale(self, c)
    }
}

impl<T: Scalar> Div<T> for &Operator<T> {
    type Output = Operator<T>;

    fn div(self, c: T) -> Operator<T> {
        scaled::scale(self, T::one() / c)
    }
}

impl<T: Scalar> Neg for &Operator<T> {
    type Output = Operator<T>;

    fn neg(self) -> Operator<T> {
        scaled::scale(self, -T::one())
    }
}

macro_rules! scalar_lhs_mul {
    ($($t:ty),*) => {$(
        impl Mul<&Operator<$t>> for $t {
            type Output = Operator<$t>;

            fn mul(self, op: &Operator<$t>) -> Operator<$t> {
                scaled::scale(op, self)
            }
        }
    )*};
}

scalar_lhs_mul!(f32, f64);
