pub mod options;

pub use options::{Options, Reorthogonalization};
