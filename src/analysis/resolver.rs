//! Reduces a full step graph to the ordered set of steps a request needs.
use crate::graph::{GraphError, StepGraph};
use crate::store::{DataHandle, StepId, StepRegistry};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("cycle detected involving steps: {}", steps.join(", "))]
    Cycle { steps: Vec<String> },
    #[error("the following inputs are required but were not specified: {}", missing.join(", "))]
    MissingInputs { missing: Vec<String> },
}

/// Outcome of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Required steps, producers before consumers.
    pub steps: Vec<StepId>,
    /// Declared inputs no requested output depends on, in declaration order.
    pub unused_inputs: Vec<DataHandle>,
}

pub struct Resolver<'a> {
    registry: &'a StepRegistry,
    graph: &'a StepGraph,
}

impl<'a> Resolver<'a> {
    pub fn new(registry: &'a StepRegistry, graph: &'a StepGraph) -> Self {
        Self { registry, graph }
    }

    pub fn resolve(&self, inputs: &[DataHandle], outputs: &[DataHandle]) -> Result<Resolution, ResolveError> {
        // 1. Global order. Fails early if the graph is cyclic.
        let all_steps_sorted = self.sorted_steps()?;

        // 2. Backtrack from the outputs, stopping at declared inputs.
        let (required, found) = self.required_steps(inputs, outputs);

        // 3. Unused inputs
        let mut unused_inputs: Vec<DataHandle> = Vec::new();
        for input in inputs {
            if !found.contains(input) && !unused_inputs.contains(input) {
                unused_inputs.push(input.clone());
            }
        }

        // 4. Missing inputs: a required step fed by no other step must itself
        // stand for external data, which nobody declared.
        let requested: HashSet<&DataHandle> = outputs.iter().collect();
        let missing: Vec<String> = all_steps_sorted
            .iter()
            .filter(|s| required.contains(*s) && self.graph.in_degree(**s) == 0)
            .flat_map(|&s| self.registry.record(s).outputs.iter())
            .filter(|h| !requested.contains(h))
            .map(|h| h.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(ResolveError::MissingInputs { missing });
        }

        // 5. Restrict the global order to the required set.
        let steps = all_steps_sorted.into_iter().filter(|s| required.contains(s)).collect();
        Ok(Resolution { steps, unused_inputs })
    }

    /// Topological order of every step in the graph, ties broken by the name
    /// of each step's first output handle.
    fn sorted_steps(&self) -> Result<Vec<StepId>, ResolveError> {
        let registry = self.registry;
        self.graph
            .topological_sort(|step| registry.record(step).outputs.first().cloned())
            .map_err(|GraphError::CycleDetected { steps }| ResolveError::Cycle {
                steps: steps.into_iter().map(|s| registry.record(s).name.clone()).collect(),
            })
    }

    /// Ancestor closure of `outputs`. Returns the required steps and the
    /// declared inputs that were reached.
    fn required_steps(&self, inputs: &[DataHandle], outputs: &[DataHandle]) -> (HashSet<StepId>, BTreeSet<DataHandle>) {
        let declared: HashSet<DataHandle> = inputs.iter().cloned().collect();
        let mut required = HashSet::new();
        let mut found = BTreeSet::new();

        for output in outputs {
            let mut stack = vec![output.clone()];
            while let Some(data) = stack.pop() {
                if declared.contains(&data) {
                    found.insert(data);
                    continue;
                }
                let producer = data.producer();
                if !required.insert(producer) {
                    continue;
                }
                stack.extend(self.registry.record(producer).inputs.iter().rev().cloned());
            }
        }

        (required, found)
    }
}
