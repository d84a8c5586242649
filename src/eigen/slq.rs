//! Stochastic Lanczos quadrature (SLQ) for `tr f(A)` of a self-adjoint operator.
//!
//! Each probe `z` runs `krylov_depth` Lanczos steps from `z`; the Gauss quadrature
//! `‖z‖² Σ τ_i² f(θ_i)` (Ritz values `θ_i`, first components `τ_i` of the Ritz vectors of
//! `T_m`) estimates `zᵀ f(A) z`. The average over probes estimates the trace.
//!
//! Every probe has its own seed drawn up front from `Options::seed`, so the result does not
//! depend on whether probes run in parallel.

#[cfg(feature = "rayon")]
use rayon::prelude::*;

use log::debug;

use crate::config::options::Options;
use crate::core::scalar::{Scalar, from_usize};
use crate::core::wrappers::col_norm;
use crate::eigen::lanczos::Lanczos;
use crate::error::OpError;
use crate::operator::Operator;
use crate::utils::random::{random_block, rng_from_seed, split_seeds};

/// Trace estimate with its standard error and per-probe samples.
#[derive(Clone, Debug)]
pub struct SlqEstimate<T> {
    pub estimate: T,
    pub std_error: T,
    pub samples: Vec<T>,
}

/// Quadrature nodes of all probes with weights summing to one, sorted by node.
#[derive(Clone, Debug)]
pub struct SpectralDensity<T> {
    pub nodes: Vec<T>,
    pub weights: Vec<T>,
}

/// Gauss quadrature of one probe: Ritz values, squared first components, and `‖z‖²`.
struct Quadrature<T> {
    nodes: Vec<T>,
    weights: Vec<T>,
    z_norm_sq: T,
}

fn probe_quadrature<T: Scalar>(a: &Operator<T>, seed: u64, opts: &Options<T>) -> Result<Quadrature<T>, OpError> {
    let n = a.nrows();
    let z = random_block::<T>(&mut rng_from_seed(seed), n, 1, opts.probe);
    let z_norm = col_norm(z.as_ref(), 0);
    if z_norm == T::zero() {
        return Ok(Quadrature { nodes: Vec::new(), weights: Vec::new(), z_norm_sq: T::zero() });
    }
    let dec = Lanczos::from_options(opts).run(a, z.as_ref())?;
    let (nodes, s) = dec.ritz()?;
    let weights = (0..nodes.len()).map(|i| s[(0, i)] * s[(0, i)]).collect();
    Ok(Quadrature { nodes, weights, z_norm_sq: z_norm * z_norm })
}

fn quadratures<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<Vec<Quadrature<T>>, OpError> {
    if !a.is_square() {
        return Err(OpError::shape("slq", a.shape(), (a.ncols(), a.nrows())));
    }
    let seeds = split_seeds(opts.seed, opts.num_probes.max(1));
    #[cfg(feature = "rayon")]
    let out = seeds.par_iter().map(|&s| probe_quadrature(a, s, opts)).collect();
    #[cfg(not(feature = "rayon"))]
    let out = seeds.iter().map(|&s| probe_quadrature(a, s, opts)).collect();
    out
}

/// Estimates `tr f(A)` with `opts.num_probes` probes of `opts.krylov_depth` Lanczos steps.
pub fn slq<T: Scalar>(
    a: &Operator<T>,
    f: impl Fn(T) -> T + Sync,
    opts: &Options<T>,
) -> Result<SlqEstimate<T>, OpError> {
    let samples: Vec<T> = quadratures(a, opts)?
        .iter()
        .map(|q| {
            q.nodes
                .iter()
                .zip(&q.weights)
                .fold(T::zero(), |acc, (&theta, &w)| acc + w * f(theta))
                * q.z_norm_sq
        })
        .collect();
    let count = from_usize::<T>(samples.len());
    let estimate = samples.iter().fold(T::zero(), |acc, &s| acc + s) / count;
    let std_error = if samples.len() > 1 {
        let var = samples.iter().fold(T::zero(), |acc, &s| acc + (s - estimate) * (s - estimate))
            / (count - T::one());
        (var / count).sqrt()
    } else {
        T::zero()
    };
    debug!("slq: {} probes, estimate {estimate} ± {std_error}", samples.len());
    Ok(SlqEstimate { estimate, std_error, samples })
}

/// Spectral density estimate: the merged quadrature rules of all probes.
pub fn slq_spectral_density<T: Scalar>(a: &Operator<T>, opts: &Options<T>) -> Result<SpectralDensity<T>, OpError> {
    let quads = quadratures(a, opts)?;
    let mut pairs: Vec<(T, T)> = quads
        .iter()
        .flat_map(|q| q.nodes.iter().copied().zip(q.weights.iter().copied()))
        .collect();
    let total = pairs.iter().fold(T::zero(), |acc, p| acc + p.1);
    if total > T::zero() {
        for p in &mut pairs {
            p.1 /= total;
        }
    }
    pairs.sort_by(|x, y| x.0.partial_cmp(&y.0).unwrap_or(std::cmp::Ordering::Equal));
    let (nodes, weights) = pairs.into_iter().unzip();
    Ok(SpectralDensity { nodes, weights })
}
