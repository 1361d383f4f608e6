use crate::step::StepError;
use crate::store::{DataHandle, DataId};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("the number of input values ({actual}) does not match the number of inputs ({expected})")]
    InputCountMismatch { expected: usize, actual: usize },
    #[error("the number of target values ({actual}) does not match the number of outputs ({expected})")]
    TargetCountMismatch { expected: usize, actual: usize },
    #[error("no value supplied for input '{name}'")]
    MissingInputValue { name: String },
    #[error("'{name}' is not an input of this pipeline")]
    UnknownInputKey { name: String },
    #[error("target key '{name}' does not belong to this pipeline's registry")]
    UnknownTargetKey { name: String },
    #[error("step '{step}' implements neither predict nor transform")]
    MissingCapability { step: String },
    #[error("step '{step}' returned {actual} value(s) for {expected} output(s)")]
    OutputCountMismatch { step: String, expected: usize, actual: usize },
    #[error("value for '{name}' was not computed before it was needed")]
    MissingValue { name: String },
    #[error("step '{step}' failed during {phase}: {source}")]
    Step { step: String, phase: &'static str, source: StepError },
}

/// A concrete value flowing between steps.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    /// Shared reference to a vector.
    Series(Arc<Vec<f64>>),
    Text(Arc<str>),
}

impl Value {
    pub fn series(values: Vec<f64>) -> Self {
        Value::Series(Arc::new(values))
    }

    pub fn text(s: &str) -> Self {
        Value::Text(Arc::from(s))
    }

    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Series(v) => v.len(),
            Value::Text(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Numeric view of the value. Text has none.
    pub fn to_vec(&self) -> Vec<f64> {
        match self {
            Value::Scalar(s) => vec![*s],
            Value::Series(s) => s.to_vec(),
            Value::Text(_) => Vec::new(),
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Scalar(v) }
}

impl From<Vec<f64>> for Value {
    fn from(v: Vec<f64>) -> Self { Value::series(v) }
}

/// Per-call storage of values, indexed densely by data handle id.
#[derive(Debug, Clone, Default)]
pub struct ExecutionCache {
    values: Vec<Option<Value>>,
}

impl ExecutionCache {
    pub fn new() -> Self { Self::default() }

    pub fn with_capacity(size: usize) -> Self {
        let mut cache = Self::default();
        cache.ensure_capacity(size);
        cache
    }

    pub fn ensure_capacity(&mut self, size: usize) {
        if self.values.len() < size {
            self.values.resize(size, None);
        }
    }

    #[inline(always)]
    pub fn get(&self, handle: &DataHandle) -> Option<&Value> {
        self.get_by_id(handle.id())
    }

    #[inline(always)]
    pub fn get_by_id(&self, id: DataId) -> Option<&Value> {
        self.values.get(id.index())?.as_ref()
    }

    pub fn contains(&self, handle: &DataHandle) -> bool {
        self.get(handle).is_some()
    }

    /// Stores `value`, returning the value it replaced, if any.
    pub fn insert(&mut self, handle: &DataHandle, value: Value) -> Option<Value> {
        let idx = handle.id().index();
        if idx >= self.values.len() {
            self.values.resize(idx + 1, None);
        }
        self.values[idx].replace(value)
    }

    pub fn len(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{RegistryId, StepId};

    fn handle(id: u32) -> DataHandle {
        DataHandle::new(RegistryId(0), DataId(id), StepId(0), Arc::from(format!("d{}", id).as_str()))
    }

    #[test]
    fn test_insert_grows_and_overwrites() {
        let mut cache = ExecutionCache::new();
        let h = handle(7);
        assert!(cache.get(&h).is_none());

        assert_eq!(cache.insert(&h, Value::Scalar(1.0)), None);
        assert_eq!(cache.insert(&h, Value::Scalar(2.0)), Some(Value::Scalar(1.0)));
        assert_eq!(cache.get(&h), Some(&Value::Scalar(2.0)));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_lookup_is_by_identity() {
        let mut cache = ExecutionCache::with_capacity(4);
        let a = handle(1);
        let same_name_other_slot = DataHandle::new(RegistryId(0), DataId(2), StepId(0), Arc::from("d1"));
        cache.insert(&a, Value::series(vec![1.0, 2.0]));
        assert!(cache.contains(&a));
        assert!(!cache.contains(&same_name_other_slot));
    }

    #[test]
    fn test_value_views() {
        assert_eq!(Value::from(3.0).to_vec(), vec![3.0]);
        assert_eq!(Value::from(vec![1.0, 2.0]).len(), 2);
        assert_eq!(Value::text("label").as_scalar(), None);
        assert!(Value::series(vec![]).is_empty());
    }
}
