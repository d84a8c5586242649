pub mod convergence;
pub mod random;

pub use convergence::{Convergence, IterState, SolveStats};
pub use random::ProbeDistribution;
