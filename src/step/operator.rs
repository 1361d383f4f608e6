//! The capability contract a step's computation must satisfy.
use crate::compute::ledger::Value;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StepError {
    #[error("operation '{0}' is not supported by this step")]
    Unsupported(&'static str),
    #[error("expected {expected} input value(s), got {actual}")]
    Arity { expected: usize, actual: usize },
    #[error("{0}")]
    Failed(String),
}

impl StepError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Which of fit / predict / transform an operator exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    pub fit: bool,
    pub predict: bool,
    pub transform: bool,
}

impl Capabilities {
    pub const NONE: Self = Self { fit: false, predict: false, transform: false };
    pub const TRANSFORM: Self = Self { fit: false, predict: false, transform: true };
    pub const PREDICT: Self = Self { fit: false, predict: true, transform: false };
    pub const FIT_PREDICT: Self = Self { fit: true, predict: true, transform: false };
    pub const FIT_TRANSFORM: Self = Self { fit: true, predict: false, transform: true };

    /// True if the step can produce output values.
    pub fn can_produce(&self) -> bool {
        self.predict || self.transform
    }
}

/// An opaque unit of computation.
///
/// Input slices are ordered like the step's declared inputs; returned vectors
/// must have one value per declared output.
///
/// `fit` receives one target slot per declared output, in output order. A
/// slot is `None` when no target was supplied for that output, and every slot
/// is `None` for steps not declared as supervised.
pub trait Operator: Send {
    fn capabilities(&self) -> Capabilities;

    fn fit(&mut self, inputs: &[Value], targets: &[Option<Value>]) -> Result<(), StepError> {
        let _ = (inputs, targets);
        Ok(())
    }

    fn predict(&self, inputs: &[Value]) -> Result<Vec<Value>, StepError> {
        let _ = inputs;
        Err(StepError::Unsupported("predict"))
    }

    fn transform(&self, inputs: &[Value]) -> Result<Vec<Value>, StepError> {
        let _ = inputs;
        Err(StepError::Unsupported("transform"))
    }
}

/// Operator of input placeholders. It never runs: declared inputs stop the
/// backward walk before their producer is reached.
#[derive(Debug, Default)]
pub(crate) struct Placeholder;

impl Operator for Placeholder {
    fn capabilities(&self) -> Capabilities {
        Capabilities::NONE
    }
}
