//! Executes resolved plans against concrete values.
pub mod engine;
pub mod ledger;

pub use engine::{Engine, RunOptions};
pub use ledger::{ExecutionCache, ExecutionError, Value};
