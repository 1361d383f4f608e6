//! The top-level aggregate: declared inputs and outputs plus the resolved plan.
use super::config::{PipelineConfig, UnusedInputPolicy};
use super::error::{BuildError, BuildWarning};
use crate::analysis::Resolver;
use crate::compute::{Engine, ExecutionCache, ExecutionError, RunOptions, Value};
use crate::graph::{GraphBuilder, GraphSnapshot, StepGraph};
use crate::step::{Capabilities, Operator, StepError};
use crate::store::{DataHandle, StepId, StepRegistry};
use std::collections::HashMap;
use std::fmt;
use tracing::{info, warn};

/// Result of [`Pipeline::predict`]: a bare value for single-output pipelines.
#[derive(Debug, Clone, PartialEq)]
pub enum Prediction {
    Single(Value),
    Many(Vec<Value>),
}

impl Prediction {
    fn from_values(mut values: Vec<Value>) -> Self {
        if values.len() == 1 {
            if let Some(v) = values.pop() {
                return Prediction::Single(v);
            }
        }
        Prediction::Many(values)
    }

    pub fn into_vec(self) -> Vec<Value> {
        match self {
            Prediction::Single(v) => vec![v],
            Prediction::Many(vs) => vs,
        }
    }

    pub fn single(self) -> Option<Value> {
        match self {
            Prediction::Single(v) => Some(v),
            Prediction::Many(_) => None,
        }
    }
}

/// A graph of steps reduced to what the declared outputs need.
///
/// The graph and the plan are computed once in [`Pipeline::new`] and never
/// change afterwards. The pipeline owns its registry; use
/// [`Pipeline::into_registry`] to get the (possibly fitted) steps back.
pub struct Pipeline {
    name: String,
    inputs: Vec<DataHandle>,
    outputs: Vec<DataHandle>,
    registry: StepRegistry,
    graph: StepGraph,
    plan: Vec<StepId>,
    warnings: Vec<BuildWarning>,
    run_options: RunOptions,
}

impl Pipeline {
    pub fn new(
        registry: StepRegistry,
        inputs: &[DataHandle],
        outputs: &[DataHandle],
        config: PipelineConfig,
    ) -> Result<Self, BuildError> {
        if inputs.is_empty() {
            return Err(BuildError::EmptyInputs);
        }
        if outputs.is_empty() {
            return Err(BuildError::EmptyOutputs);
        }
        if let Some(h) = inputs.iter().chain(outputs).find(|h| !registry.contains(h)) {
            return Err(BuildError::ForeignHandle { name: h.name().to_string() });
        }

        let graph = GraphBuilder::new(&registry).build(outputs);
        let resolution = Resolver::new(&registry, &graph).resolve(inputs, outputs)?;

        if config.unused_inputs == UnusedInputPolicy::Deny && !resolution.unused_inputs.is_empty() {
            return Err(BuildError::UnusedInputs {
                inputs: resolution.unused_inputs.iter().map(|h| h.name().to_string()).collect(),
            });
        }

        let name = config.name().to_string();
        let warnings: Vec<BuildWarning> = resolution.unused_inputs.into_iter().map(BuildWarning::UnusedInput).collect();
        for w in &warnings {
            warn!(pipeline = %name, "{}", w);
        }
        info!(pipeline = %name, steps = resolution.steps.len(), graph_steps = graph.node_count(), "pipeline built");

        Ok(Self {
            name,
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
            registry,
            graph,
            plan: resolution.steps,
            warnings,
            run_options: RunOptions { warn_on_overwrite: config.warn_on_overwrite },
        })
    }

    // --- Accessors ---
    pub fn name(&self) -> &str { &self.name }
    pub fn inputs(&self) -> &[DataHandle] { &self.inputs }
    pub fn outputs(&self) -> &[DataHandle] { &self.outputs }
    pub fn graph(&self) -> &StepGraph { &self.graph }
    pub fn registry(&self) -> &StepRegistry { &self.registry }
    pub fn warnings(&self) -> &[BuildWarning] { &self.warnings }

    /// Required steps in execution order.
    pub fn plan(&self) -> &[StepId] { &self.plan }

    pub fn into_registry(self) -> StepRegistry { self.registry }

    pub fn snapshot(&self) -> GraphSnapshot {
        GraphSnapshot::capture(&self.name, &self.registry, &self.graph, &self.plan)
    }

    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        self.snapshot().to_json()
    }

    // --- Execution ---

    /// Fits every required step in order.
    ///
    /// `targets`, when given, holds one slot per declared output; `None` marks
    /// an output without a target. They reach only the steps declared as
    /// supervised.
    pub fn fit(&mut self, inputs: Vec<Value>, targets: Option<Vec<Option<Value>>>) -> Result<(), ExecutionError> {
        self.fit_with_extra_targets(inputs, targets, HashMap::new())
    }

    /// Like [`fit`](Pipeline::fit), with additional targets keyed by any
    /// handle of the registry, e.g. an intermediate step's output.
    pub fn fit_with_extra_targets(
        &mut self,
        inputs: Vec<Value>,
        targets: Option<Vec<Option<Value>>>,
        extra_targets: HashMap<DataHandle, Value>,
    ) -> Result<(), ExecutionError> {
        let capacity = self.registry.data_count();
        let mut cache = Engine::seed(&self.inputs, inputs, capacity)?;

        let mut target_map = ExecutionCache::with_capacity(capacity);
        if let Some(targets) = targets {
            if targets.len() != self.outputs.len() {
                return Err(ExecutionError::TargetCountMismatch { expected: self.outputs.len(), actual: targets.len() });
            }
            for (handle, value) in self.outputs.iter().zip(targets) {
                if let Some(value) = value {
                    target_map.insert(handle, value);
                }
            }
        }
        for (handle, value) in extra_targets {
            if !self.registry.contains(&handle) {
                return Err(ExecutionError::UnknownTargetKey { name: handle.name().to_string() });
            }
            target_map.insert(&handle, value);
        }

        Engine::fit(&mut self.registry, &self.plan, &mut cache, &target_map, self.run_options)
    }

    /// Runs inference. Returns a bare value if there is exactly one output.
    pub fn predict(&self, inputs: Vec<Value>) -> Result<Prediction, ExecutionError> {
        self.predict_all(inputs).map(Prediction::from_values)
    }

    /// Runs inference and returns one value per declared output, in order.
    pub fn predict_all(&self, inputs: Vec<Value>) -> Result<Vec<Value>, ExecutionError> {
        let mut cache = Engine::seed(&self.inputs, inputs, self.registry.data_count())?;
        Engine::predict(&self.registry, &self.plan, &mut cache, self.run_options)?;
        Engine::collect(&self.outputs, &cache)
    }

    /// Runs inference with inputs keyed by handle.
    pub fn predict_keyed(&self, mut inputs: HashMap<DataHandle, Value>) -> Result<Prediction, ExecutionError> {
        let mut ordered = Vec::with_capacity(self.inputs.len());
        for handle in &self.inputs {
            // A handle declared twice reuses the value already taken.
            let value = match inputs.remove(handle) {
                Some(v) => v,
                None => self
                    .inputs
                    .iter()
                    .position(|h| h == handle)
                    .and_then(|i| ordered.get(i).cloned())
                    .ok_or_else(|| ExecutionError::MissingInputValue { name: handle.name().to_string() })?,
            };
            ordered.push(value);
        }
        if let Some(extra) = inputs.keys().min() {
            return Err(ExecutionError::UnknownInputKey { name: extra.name().to_string() });
        }
        self.predict(ordered)
    }

    /// Runs inference with inputs keyed by handle name.
    pub fn predict_named(&self, inputs: HashMap<String, Value>) -> Result<Prediction, ExecutionError> {
        let mut keyed = HashMap::with_capacity(inputs.len());
        for (name, value) in inputs {
            let handle = self
                .inputs
                .iter()
                .find(|h| h.name() == name)
                .ok_or(ExecutionError::UnknownInputKey { name })?;
            keyed.insert(handle.clone(), value);
        }
        self.predict_keyed(keyed)
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("plan", &self.plan)
            .finish_non_exhaustive()
    }
}

/// A built pipeline can itself be a step of an enclosing registry.
impl Operator for Pipeline {
    fn capabilities(&self) -> Capabilities {
        Capabilities::FIT_PREDICT
    }

    fn fit(&mut self, inputs: &[Value], targets: &[Option<Value>]) -> Result<(), StepError> {
        let targets = if targets.iter().all(Option::is_none) { None } else { Some(targets.to_vec()) };
        Pipeline::fit(self, inputs.to_vec(), targets).map_err(|e| StepError::failed(e.to_string()))
    }

    fn predict(&self, inputs: &[Value]) -> Result<Vec<Value>, StepError> {
        self.predict_all(inputs.to_vec()).map_err(|e| StepError::failed(e.to_string()))
    }
}
