//! Defines the error and warning types for pipeline construction.
use crate::analysis::ResolveError;
use crate::store::DataHandle;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("a pipeline needs at least one input")]
    EmptyInputs,
    #[error("a pipeline needs at least one output")]
    EmptyOutputs,
    #[error("handle '{name}' does not belong to the pipeline's registry")]
    ForeignHandle { name: String },
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("inputs not required to compute the outputs: {}", inputs.join(", "))]
    UnusedInputs { inputs: Vec<String> },
}

/// Non-fatal findings from construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildWarning {
    UnusedInput(DataHandle),
}

impl fmt::Display for BuildWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildWarning::UnusedInput(h) => write!(
                f,
                "input {} was provided but it is not required to compute the specified outputs",
                h.name()
            ),
        }
    }
}
