use super::types::*;
use crate::step::{Capabilities, Operator, Placeholder};
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("step '{step}' must declare at least one output")]
    NoOutputs { step: String },
    #[error("unknown step id {0:?}")]
    UnknownStep(StepId),
    #[error("inputs of step '{step}' are already bound")]
    InputsAlreadyBound { step: String },
    #[error("handle '{name}' does not belong to this registry")]
    ForeignHandle { name: String },
    #[error("step '{step}' was declared with inputs; bind them with bind_inputs instead")]
    InputsInDeclaration { step: String },
    #[error("shape index {index} is out of range for step '{step}' with {outputs} output(s)")]
    ShapeIndexOutOfRange { step: String, index: usize, outputs: usize },
}

#[derive(Debug, Clone)]
enum OutputSlots {
    Count(usize),
    Named(Vec<String>),
}

/// Everything needed to register one step.
pub struct StepSpec {
    name: String,
    operator: Box<dyn Operator>,
    inputs: Vec<DataHandle>,
    outputs: OutputSlots,
    shapes: Vec<(usize, Shape)>,
    supervised: bool,
}

impl StepSpec {
    pub fn new(name: impl Into<String>, operator: impl Operator + 'static) -> Self {
        Self::boxed(name, Box::new(operator))
    }

    pub fn boxed(name: impl Into<String>, operator: Box<dyn Operator>) -> Self {
        Self {
            name: name.into(),
            operator,
            inputs: Vec::new(),
            outputs: OutputSlots::Count(1),
            shapes: Vec::new(),
            supervised: false,
        }
    }

    pub fn inputs(mut self, inputs: &[DataHandle]) -> Self {
        self.inputs = inputs.to_vec();
        self
    }

    pub fn outputs(mut self, count: usize) -> Self {
        self.outputs = OutputSlots::Count(count);
        self
    }

    pub fn named_outputs(mut self, names: &[&str]) -> Self {
        self.outputs = OutputSlots::Named(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn output_shape(mut self, index: usize, shape: Shape) -> Self {
        self.shapes.push((index, shape));
        self
    }

    /// Marks every output of the step as accepting a target value during fit.
    pub fn supervised(mut self, supervised: bool) -> Self {
        self.supervised = supervised;
        self
    }
}

impl fmt::Debug for StepSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepSpec")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("supervised", &self.supervised)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct StepRecord {
    pub name: String,
    pub kind: StepKind,
    pub inputs: SmallVec<[DataHandle; 4]>,
    pub outputs: SmallVec<[DataHandle; 2]>,
    pub capabilities: Capabilities,
    pub supervised: bool,
    inputs_bound: bool,
}

impl StepRecord {
    pub fn inputs_bound(&self) -> bool { self.inputs_bound }
}

#[derive(Debug, Clone)]
struct DataRecord {
    handle: DataHandle,
    meta: DataMetadata,
}

/// Arena owning steps, their operators and the data handles they produce.
pub struct StepRegistry {
    id: RegistryId,
    steps: Vec<StepRecord>,
    operators: Vec<Box<dyn Operator>>,
    data: Vec<DataRecord>,

    // Uniqueness checks
    used_step_names: HashSet<String>,
    used_data_names: HashSet<String>,
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self {
            id: RegistryId::fresh(),
            steps: Vec::new(),
            operators: Vec::new(),
            data: Vec::new(),
            used_step_names: HashSet::new(),
            used_data_names: HashSet::new(),
        }
    }
}

impl StepRegistry {
    pub fn new() -> Self { Self::default() }
    pub fn id(&self) -> RegistryId { self.id }
    pub fn step_count(&self) -> usize { self.steps.len() }
    pub fn data_count(&self) -> usize { self.data.len() }

    /// Registers an input placeholder and returns the handle it stands for.
    pub fn add_input(&mut self, name: &str) -> DataHandle {
        let id = StepId::new(self.steps.len());
        let step_name = unique_name(&mut self.used_step_names, name);
        let handle = self.push_data(id, &step_name, None);

        self.steps.push(StepRecord {
            name: step_name,
            kind: StepKind::Input,
            inputs: SmallVec::new(),
            outputs: SmallVec::from_elem(handle.clone(), 1),
            capabilities: Capabilities::NONE,
            supervised: false,
            inputs_bound: true,
        });
        self.operators.push(Box::new(Placeholder));
        handle
    }

    /// Registers a step and binds its inputs in one go.
    pub fn add_step(&mut self, mut spec: StepSpec) -> Result<Vec<DataHandle>, RegistryError> {
        let inputs = std::mem::take(&mut spec.inputs);
        self.check_handles(&inputs)?;
        let id = self.register(spec)?;
        let record = &mut self.steps[id.index()];
        record.inputs = inputs.into_iter().collect();
        record.inputs_bound = true;
        Ok(record.outputs.to_vec())
    }

    /// Registers a step whose inputs are bound later with [`bind_inputs`].
    ///
    /// Deferred binding is what allows a step to consume a handle produced
    /// further downstream, so cycles are only expressible through this path.
    ///
    /// [`bind_inputs`]: StepRegistry::bind_inputs
    pub fn declare_step(&mut self, spec: StepSpec) -> Result<StepId, RegistryError> {
        if !spec.inputs.is_empty() {
            return Err(RegistryError::InputsInDeclaration { step: spec.name });
        }
        self.register(spec)
    }

    pub fn bind_inputs(&mut self, step: StepId, inputs: &[DataHandle]) -> Result<(), RegistryError> {
        self.check_handles(inputs)?;
        let record = self.steps.get_mut(step.index()).ok_or(RegistryError::UnknownStep(step))?;
        if record.inputs_bound {
            return Err(RegistryError::InputsAlreadyBound { step: record.name.clone() });
        }
        record.inputs = inputs.iter().cloned().collect();
        record.inputs_bound = true;
        Ok(())
    }

    fn register(&mut self, spec: StepSpec) -> Result<StepId, RegistryError> {
        let output_count = match &spec.outputs {
            OutputSlots::Count(n) => *n,
            OutputSlots::Named(names) => names.len(),
        };
        if output_count == 0 {
            return Err(RegistryError::NoOutputs { step: spec.name });
        }
        if let Some((index, _)) = spec.shapes.iter().find(|(i, _)| *i >= output_count) {
            return Err(RegistryError::ShapeIndexOutOfRange {
                step: spec.name.clone(),
                index: *index,
                outputs: output_count,
            });
        }

        let id = StepId::new(self.steps.len());
        let step_name = unique_name(&mut self.used_step_names, &spec.name);

        let mut outputs = SmallVec::with_capacity(output_count);
        for i in 0..output_count {
            let data_name = match &spec.outputs {
                OutputSlots::Count(_) => format!("{}/{}", step_name, i),
                OutputSlots::Named(names) => format!("{}/{}", step_name, names[i]),
            };
            let shape = spec.shapes.iter().rev().find(|(idx, _)| *idx == i).map(|(_, s)| s.clone());
            outputs.push(self.push_data(id, &data_name, shape));
        }

        self.steps.push(StepRecord {
            name: step_name,
            kind: StepKind::Compute,
            inputs: SmallVec::new(),
            outputs,
            capabilities: spec.operator.capabilities(),
            supervised: spec.supervised,
            inputs_bound: false,
        });
        self.operators.push(spec.operator);
        Ok(id)
    }

    fn push_data(&mut self, producer: StepId, name: &str, shape: Option<Shape>) -> DataHandle {
        let id = DataId::new(self.data.len());
        let name = unique_name(&mut self.used_data_names, name);
        let handle = DataHandle::new(self.id, id, producer, Arc::from(name.as_str()));
        self.data.push(DataRecord { handle: handle.clone(), meta: DataMetadata { name, shape } });
        handle
    }

    fn check_handles(&self, handles: &[DataHandle]) -> Result<(), RegistryError> {
        match handles.iter().find(|h| !self.contains(h)) {
            Some(h) => Err(RegistryError::ForeignHandle { name: h.name().to_string() }),
            None => Ok(()),
        }
    }

    /// True if `handle` was minted by this registry.
    pub fn contains(&self, handle: &DataHandle) -> bool {
        handle.owner() == self.id && handle.id().index() < self.data.len()
    }

    // --- Accessors ---

    pub fn step(&self, id: StepId) -> Option<&StepRecord> { self.steps.get(id.index()) }

    pub fn steps(&self) -> impl Iterator<Item = (StepId, &StepRecord)> {
        self.steps.iter().enumerate().map(|(i, s)| (StepId::new(i), s))
    }

    pub fn outputs_of(&self, id: StepId) -> Option<&[DataHandle]> {
        self.steps.get(id.index()).map(|s| s.outputs.as_slice())
    }

    pub fn data_meta(&self, handle: &DataHandle) -> Option<&DataMetadata> {
        self.data.get(handle.id().index()).map(|r| &r.meta)
    }

    pub fn handle(&self, id: DataId) -> Option<&DataHandle> {
        self.data.get(id.index()).map(|r| &r.handle)
    }

    pub fn find_data(&self, name: &str) -> Option<&DataHandle> {
        self.data.iter().find(|r| r.meta.name == name).map(|r| &r.handle)
    }

    pub(crate) fn operator(&self, id: StepId) -> &dyn Operator {
        self.operators[id.index()].as_ref()
    }

    #[inline(always)]
    pub(crate) fn record(&self, id: StepId) -> &StepRecord {
        &self.steps[id.index()]
    }

    /// Borrows a step's record and its operator at the same time, the latter mutably.
    pub(crate) fn record_and_operator_mut(&mut self, id: StepId) -> (&StepRecord, &mut dyn Operator) {
        (&self.steps[id.index()], self.operators[id.index()].as_mut())
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("steps", &self.steps)
            .field("data_count", &self.data.len())
            .finish_non_exhaustive()
    }
}

/// Returns `name`, or `name_1`, `name_2`, ... if already taken, and reserves it.
fn unique_name(used: &mut HashSet<String>, name: &str) -> String {
    let mut candidate = name.to_string();
    let mut counter = 1;
    while used.contains(&candidate) {
        candidate = format!("{}_{}", name, counter);
        counter += 1;
    }
    used.insert(candidate.clone());
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Lambda;

    fn identity() -> Lambda {
        Lambda::new(|xs| Ok(xs.to_vec()))
    }

    #[test]
    fn test_step_names_are_made_unique() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let a = reg.add_step(StepSpec::new("scale", identity()).inputs(&[x.clone()])).unwrap();
        let b = reg.add_step(StepSpec::new("scale", identity()).inputs(&[x])).unwrap();

        assert_eq!(reg.step(a[0].producer()).unwrap().name, "scale");
        assert_eq!(reg.step(b[0].producer()).unwrap().name, "scale_1");
        assert_eq!(a[0].name(), "scale/0");
        assert_eq!(b[0].name(), "scale_1/0");
    }

    #[test]
    fn test_outputs_point_back_to_their_step() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let outs = reg
            .add_step(StepSpec::new("split", identity()).inputs(&[x.clone()]).named_outputs(&["lo", "hi"]))
            .unwrap();

        assert_eq!(outs.len(), 2);
        assert_eq!(outs[0].name(), "split/lo");
        assert_eq!(outs[1].name(), "split/hi");
        let step = outs[0].producer();
        assert_eq!(reg.outputs_of(step).unwrap(), outs.as_slice());
        assert_eq!(reg.step(step).unwrap().inputs.as_slice(), &[x.clone()]);
        assert_eq!(reg.step(x.producer()).unwrap().kind, StepKind::Input);
    }

    #[test]
    fn test_output_shapes_are_recorded() {
        let mut reg = StepRegistry::new();
        let outs = reg
            .add_step(StepSpec::new("gen", identity()).outputs(2).output_shape(1, Shape(vec![3, 4])))
            .unwrap();
        assert_eq!(reg.data_meta(&outs[0]).unwrap().shape, None);
        assert_eq!(reg.data_meta(&outs[1]).unwrap().shape, Some(Shape(vec![3, 4])));

        let err = reg
            .add_step(StepSpec::new("bad", identity()).output_shape(5, Shape(vec![1])))
            .unwrap_err();
        assert!(matches!(err, RegistryError::ShapeIndexOutOfRange { index: 5, outputs: 1, .. }));
    }

    #[test]
    fn test_zero_outputs_rejected() {
        let mut reg = StepRegistry::new();
        let err = reg.add_step(StepSpec::new("sink", identity()).outputs(0)).unwrap_err();
        assert_eq!(err, RegistryError::NoOutputs { step: "sink".into() });
    }

    #[test]
    fn test_inputs_bind_once() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let step = reg.declare_step(StepSpec::new("late", identity())).unwrap();
        assert!(!reg.step(step).unwrap().inputs_bound());

        reg.bind_inputs(step, &[x.clone()]).unwrap();
        let err = reg.bind_inputs(step, &[x]).unwrap_err();
        assert_eq!(err, RegistryError::InputsAlreadyBound { step: "late".into() });
    }

    #[test]
    fn test_declare_rejects_inline_inputs() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let err = reg.declare_step(StepSpec::new("s", identity()).inputs(&[x])).unwrap_err();
        assert!(matches!(err, RegistryError::InputsInDeclaration { .. }));
    }

    #[test]
    fn test_foreign_handles_rejected() {
        let mut other = StepRegistry::new();
        other.add_input("pad");
        let foreign = other.add_input("y");

        let mut reg = StepRegistry::new();
        reg.add_input("x");
        assert!(!reg.contains(&foreign));
        let err = reg.add_step(StepSpec::new("s", identity()).inputs(&[foreign])).unwrap_err();
        assert_eq!(err, RegistryError::ForeignHandle { name: "y".into() });
    }

    #[test]
    fn test_lookalike_handle_from_other_registry_rejected() {
        let mut other = StepRegistry::new();
        let lookalike = other.add_input("x");

        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        assert_eq!((x.id(), x.producer(), x.name()), (lookalike.id(), lookalike.producer(), lookalike.name()));
        assert_ne!(x, lookalike);
        assert!(!reg.contains(&lookalike));
        let err = reg.add_step(StepSpec::new("s", identity()).inputs(&[lookalike])).unwrap_err();
        assert_eq!(err, RegistryError::ForeignHandle { name: "x".into() });
    }

    #[test]
    fn test_find_data_by_name() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        assert_eq!(reg.find_data("x"), Some(&x));
        assert_eq!(reg.find_data("nope"), None);
        assert_eq!(reg.handle(x.id()), Some(&x));
    }
}
