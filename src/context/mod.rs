//! Dispatch: rule tables, the default rule set and the context that runs them.

pub mod linalg_context;
pub mod registry;
pub(crate) mod rules;

pub use linalg_context::LinalgContext;
pub use registry::{Algorithm, Method, Operation, Registry, Rule, RuleTable, Signature};
