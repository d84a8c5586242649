//! The built-in rule set installed by [`Registry::with_defaults`].
//!
//! Rules are plain functions so that they coerce to the higher-ranked rule closures of the
//! tables. Rules that dispatch on sub-operators call back into the context with the method
//! reset to `Auto`.

mod diag;
mod functions;
mod inverse;
mod logdet;
mod solve;
mod spectral;

use std::any::type_name;

use faer::{Mat, MatRef};

use crate::context::registry::Registry;
use crate::core::scalar::Scalar;
use crate::error::OpError;
use crate::matrix::DenseOperator;
use crate::operator::Operator;
use crate::solver::Solution;
use crate::utils::convergence::{IterState, SolveStats};

pub(crate) fn install_defaults<T: Scalar>(reg: &mut Registry<T>) {
    solve::install(&mut reg.solve);
    inverse::install(&mut reg.inverse);
    spectral::install(&mut reg.eig, &mut reg.eigmax);
    logdet::install(&mut reg.logdet);
    diag::install(reg);
    functions::install(reg);
}

/// The concrete node behind `a`; a custom node reusing a built-in kind is unsupported.
fn node<'a, T: Scalar, N: 'static>(a: &'a Operator<T>) -> Result<&'a N, OpError> {
    a.downcast_ref::<N>().ok_or_else(|| {
        OpError::Unsupported(format!("{:?} operator is not backed by {}", a.kind(), type_name::<N>()))
    })
}

/// Runs `f` on the dense buffer of `a`, materializing non-dense operators.
fn with_dense<T: Scalar, R>(a: &Operator<T>, f: impl FnOnce(MatRef<'_, T>) -> Result<R, OpError>) -> Result<R, OpError> {
    match a.downcast_ref::<DenseOperator<T>>() {
        Some(d) => f(d.matrix()),
        None => f(a.to_dense()?.as_ref()),
    }
}

/// Stats of a closed-form or direct computation.
fn settled<T: Scalar>() -> SolveStats<T> {
    let mut stats = SolveStats::new(T::zero());
    stats.state = IterState::Converged;
    stats
}

/// A solution produced by a direct method.
fn exact<T: Scalar>(x: Mat<T>) -> Solution<T> {
    Solution { x, stats: settled() }
}
