//! Defines the step-level dependency graph and how it is built.
pub mod builder;
pub mod dag;
pub mod snapshot;

// Re-export key types for convenient access
pub use builder::GraphBuilder;
pub use dag::{GraphError, StepGraph};
pub use snapshot::{EdgeEntry, GraphSnapshot, StepEntry};
