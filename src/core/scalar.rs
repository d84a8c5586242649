//! Element types supported by the operator algebra.

use std::fmt::{Debug, Display};

use faer::traits::RealField;
use num_traits::{Float, FromPrimitive, NumAssign};

/// Runtime tag of an operator's element type.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
}

/// Real floating-point element type usable in operators and algorithms.
pub trait Scalar:
    RealField + Float + NumAssign + FromPrimitive + Debug + Display + Send + Sync + 'static
{
    const DTYPE: DType;
}

impl Scalar for f32 {
    const DTYPE: DType = DType::F32;
}

impl Scalar for f64 {
    const DTYPE: DType = DType::F64;
}

/// Converts an `f64` constant into `T`.
#[inline]
pub fn cast<T: Scalar>(x: f64) -> T {
    T::from_f64(x).unwrap_or_else(T::nan)
}

/// Converts a count into `T`.
#[inline]
pub fn from_usize<T: Scalar>(n: usize) -> T {
    T::from_usize(n).unwrap_or_else(T::nan)
}

/// Widens `x` to `f64` for error reporting.
#[inline]
pub fn to_f64<T: Scalar>(x: T) -> f64 {
    x.to_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dtype_tags() {
        assert_eq!(<f32 as Scalar>::DTYPE, DType::F32);
        assert_eq!(<f64 as Scalar>::DTYPE, DType::F64);
    }

    #[test]
    fn casts_round_trip() {
        let x: f32 = cast(0.5);
        assert_eq!(x, 0.5f32);
        assert_eq!(to_f64(from_usize::<f64>(7)), 7.0);
    }
}
