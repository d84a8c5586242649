//! Power iteration for the dominant eigenpair.

use faer::Mat;
use log::{debug, trace, warn};

use crate::config::options::Options;
use crate::core::scalar::Scalar;
use crate::core::wrappers::{col_dot, col_norm, col_to_vec};
use crate::eigen::DominantEig;
use crate::error::OpError;
use crate::operator::Operator;
use crate::utils::convergence::{IterState, SolveStats};
use crate::utils::random::{ProbeDistribution, random_block, rng_from_seed};

/// Repeated normalized applies from a seeded Gaussian start. Converged when the relative
/// change of the Rayleigh quotient is at most `opts.tol`; a zero iterate is a breakdown.
pub fn power_iteration<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<DominantEig<T>, OpError> {
    if !a.is_square() {
        return Err(OpError::shape("eigmax", a.shape(), (a.ncols(), a.nrows())));
    }
    let n = a.nrows();
    let mut v = random_block::<T>(&mut rng_from_seed(opts.seed), n, 1, ProbeDistribution::Gaussian);
    let norm = col_norm(v.as_ref(), 0);
    v = Mat::from_fn(n, 1, |i, _| v[(i, 0)] / norm);

    let mut stats = SolveStats::new(T::infinity());
    stats.state = IterState::Iterating;
    let mut lambda = T::zero();
    for it in 1..=opts.max_iters {
        let w = a.apply(v.as_ref())?;
        let rq = col_dot(v.as_ref(), w.as_ref(), 0);
        let w_norm = col_norm(w.as_ref(), 0);
        stats.iterations = it;
        if w_norm == T::zero() || !w_norm.is_finite() {
            debug!("power iteration: zero iterate at step {it}");
            lambda = rq;
            stats.state = IterState::Breakdown;
            break;
        }
        let change = (rq - lambda).abs() / rq.abs().max(T::min_positive_value());
        lambda = rq;
        v = Mat::from_fn(n, 1, |i, _| w[(i, 0)] / w_norm);
        trace!("power iteration {it}: rayleigh quotient {rq}, relative change {change}");
        if opts.record_history {
            stats.residual_history.push(change);
        }
        stats.final_residual = change;
        if it > 1 && change <= opts.tol {
            stats.state = IterState::Converged;
            break;
        }
    }
    if stats.state == IterState::Iterating {
        stats.state = IterState::BudgetExhausted;
        warn!("power iteration stopped after {} iterations (change {})", stats.iterations, stats.final_residual);
    }
    Ok(DominantEig { value: lambda, vector: col_to_vec(v.as_ref(), 0), stats })
}
