//! A synchronous, single-threaded executor for resolved step plans.
use crate::compute::ledger::{ExecutionCache, ExecutionError, Value};
use crate::step::Operator;
use crate::store::{DataHandle, StepId, StepRecord, StepRegistry};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Log cache overwrites at `warn` instead of `debug`.
    pub warn_on_overwrite: bool,
}

pub struct Engine;

impl Engine {
    /// Creates a cache holding one value per declared input.
    ///
    /// Fails before anything runs if the counts differ.
    pub fn seed(inputs: &[DataHandle], values: Vec<Value>, capacity: usize) -> Result<ExecutionCache, ExecutionError> {
        if values.len() != inputs.len() {
            return Err(ExecutionError::InputCountMismatch { expected: inputs.len(), actual: values.len() });
        }
        let mut cache = ExecutionCache::with_capacity(capacity);
        for (handle, value) in inputs.iter().zip(values) {
            cache.insert(handle, value);
        }
        Ok(cache)
    }

    /// Fits then runs every planned step in order.
    ///
    /// `targets` holds supervision values keyed by data handle. Each fitted
    /// step gets one slot per output; only supervised steps see filled slots.
    pub fn fit(
        registry: &mut StepRegistry,
        plan: &[StepId],
        cache: &mut ExecutionCache,
        targets: &ExecutionCache,
        opts: RunOptions,
    ) -> Result<(), ExecutionError> {
        for &step_id in plan {
            let (record, op) = registry.record_and_operator_mut(step_id);
            let xs = gather_inputs(record, cache)?;

            if record.capabilities.fit {
                let ys: Vec<Option<Value>> = if record.supervised {
                    record.outputs.iter().map(|o| targets.get(o).cloned()).collect()
                } else {
                    vec![None; record.outputs.len()]
                };
                let supplied = ys.iter().filter(|y| y.is_some()).count();
                debug!(step = %record.name, inputs = xs.len(), targets = supplied, "fitting step");
                op.fit(&xs, &ys).map_err(|source| ExecutionError::Step {
                    step: record.name.clone(),
                    phase: "fit",
                    source,
                })?;
            }

            let ys = produce(record, &*op, &xs)?;
            store_outputs(record, ys, cache, opts);
        }
        Ok(())
    }

    /// Runs the inference capability of every planned step in order.
    pub fn predict(
        registry: &StepRegistry,
        plan: &[StepId],
        cache: &mut ExecutionCache,
        opts: RunOptions,
    ) -> Result<(), ExecutionError> {
        for &step_id in plan {
            let record = registry.record(step_id);
            let xs = gather_inputs(record, cache)?;
            let ys = produce(record, registry.operator(step_id), &xs)?;
            store_outputs(record, ys, cache, opts);
        }
        Ok(())
    }

    /// Reads the values of `handles` out of a finished cache, in order.
    pub fn collect(handles: &[DataHandle], cache: &ExecutionCache) -> Result<Vec<Value>, ExecutionError> {
        handles.iter().map(|h| lookup(h, cache)).collect()
    }
}

fn lookup(handle: &DataHandle, cache: &ExecutionCache) -> Result<Value, ExecutionError> {
    cache
        .get(handle)
        .cloned()
        .ok_or_else(|| ExecutionError::MissingValue { name: handle.name().to_string() })
}

fn gather_inputs(record: &StepRecord, cache: &ExecutionCache) -> Result<Vec<Value>, ExecutionError> {
    record.inputs.iter().map(|h| lookup(h, cache)).collect()
}

/// Calls predict if the step has it, transform otherwise.
fn produce(record: &StepRecord, op: &dyn Operator, xs: &[Value]) -> Result<Vec<Value>, ExecutionError> {
    let caps = record.capabilities;
    let (phase, result) = if caps.predict {
        ("predict", op.predict(xs))
    } else if caps.transform {
        ("transform", op.transform(xs))
    } else {
        return Err(ExecutionError::MissingCapability { step: record.name.clone() });
    };
    debug!(step = %record.name, phase, "executed step");

    let ys = result.map_err(|source| ExecutionError::Step { step: record.name.clone(), phase, source })?;
    if ys.len() != record.outputs.len() {
        return Err(ExecutionError::OutputCountMismatch {
            step: record.name.clone(),
            expected: record.outputs.len(),
            actual: ys.len(),
        });
    }
    Ok(ys)
}

fn store_outputs(record: &StepRecord, ys: Vec<Value>, cache: &mut ExecutionCache, opts: RunOptions) {
    for (handle, value) in record.outputs.iter().zip(ys) {
        if cache.insert(handle, value).is_some() {
            if opts.warn_on_overwrite {
                warn!(data = %handle, step = %record.name, "computed value overwrote a value already in the cache");
            } else {
                debug!(data = %handle, step = %record.name, "computed value overwrote a value already in the cache");
            }
        }
    }
}
