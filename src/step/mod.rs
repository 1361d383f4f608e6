//! Step capabilities: the boundary to the opaque computations a graph runs.
pub mod lambda;
pub mod operator;

pub use lambda::Lambda;
pub use operator::{Capabilities, Operator, StepError};
pub(crate) use operator::Placeholder;
