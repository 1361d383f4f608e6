//! Pipelines: declared inputs and outputs over a registry of steps.
pub mod config;
pub mod error;
pub mod pipeline;

pub use config::{PipelineConfig, UnusedInputPolicy};
pub use error::{BuildError, BuildWarning};
pub use pipeline::{Pipeline, Prediction};
