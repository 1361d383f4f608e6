//! Serializable view of a step graph for external tooling.
use super::dag::StepGraph;
use crate::store::{StepId, StepKind, StepRegistry};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepEntry {
    pub id: StepId,
    pub name: String,
    pub kind: StepKind,
    /// Position in the execution plan, if the step is required.
    pub position: Option<usize>,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeEntry {
    pub from: String,
    pub to: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub name: String,
    pub steps: Vec<StepEntry>,
    pub edges: Vec<EdgeEntry>,
}

impl GraphSnapshot {
    pub fn capture(name: &str, registry: &StepRegistry, graph: &StepGraph, plan: &[StepId]) -> Self {
        let steps = graph
            .nodes()
            .map(|id| {
                let record = registry.record(id);
                StepEntry {
                    id,
                    name: record.name.clone(),
                    kind: record.kind,
                    position: plan.iter().position(|&s| s == id),
                    inputs: record.inputs.iter().map(|h| h.name().to_string()).collect(),
                    outputs: record.outputs.iter().map(|h| h.name().to_string()).collect(),
                }
            })
            .collect();

        let edges = graph
            .edges()
            .map(|(from, to, data)| EdgeEntry {
                from: registry.record(from).name.clone(),
                to: registry.record(to).name.clone(),
                data: registry.handle(data).map_or_else(String::new, |h| h.name().to_string()),
            })
            .collect();

        Self { name: name.to_string(), steps, edges }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphBuilder;
    use crate::step::Lambda;
    use crate::store::StepSpec;

    #[test]
    fn test_snapshot_marks_plan_positions() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let a = reg.add_step(StepSpec::new("A", Lambda::new(|xs| Ok(xs.to_vec()))).inputs(&[x])).unwrap();
        let graph = GraphBuilder::new(&reg).build(&a);

        let snap = GraphSnapshot::capture("demo", &reg, &graph, &[a[0].producer()]);
        assert_eq!(snap.steps.len(), 2);
        let step_a = snap.steps.iter().find(|s| s.name == "A").unwrap();
        assert_eq!(step_a.position, Some(0));
        assert_eq!(step_a.inputs, vec!["x"]);
        let step_x = snap.steps.iter().find(|s| s.name == "x").unwrap();
        assert_eq!(step_x.position, None);
        assert_eq!(step_x.kind, StepKind::Input);
        assert_eq!(snap.edges, vec![EdgeEntry { from: "x".into(), to: "A".into(), data: "x".into() }]);

        let json = snap.to_json().unwrap();
        assert!(json.contains("\"name\": \"demo\""));
        assert_eq!(GraphSnapshot::from_json(&json).unwrap(), snap);
    }
}
