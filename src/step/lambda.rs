//! Stateless steps built from closures.
use super::operator::{Capabilities, Operator, StepError};
use crate::compute::ledger::Value;

type LambdaFn = Box<dyn Fn(&[Value]) -> Result<Vec<Value>, StepError> + Send>;

/// Wraps a closure as a transform-only step.
pub struct Lambda {
    func: LambdaFn,
    arity: Option<usize>,
}

impl Lambda {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Vec<Value>, StepError> + Send + 'static,
    {
        Self { func: Box::new(func), arity: None }
    }

    /// Rejects calls that do not receive exactly `n` inputs.
    pub fn with_arity(mut self, n: usize) -> Self {
        self.arity = Some(n);
        self
    }
}

impl Operator for Lambda {
    fn capabilities(&self) -> Capabilities {
        Capabilities::TRANSFORM
    }

    fn transform(&self, inputs: &[Value]) -> Result<Vec<Value>, StepError> {
        if let Some(expected) = self.arity {
            if inputs.len() != expected {
                return Err(StepError::Arity { expected, actual: inputs.len() });
            }
        }
        (self.func)(inputs)
    }
}
