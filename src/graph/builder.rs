//! Populates a [`StepGraph`] by walking backward from requested outputs.
use super::dag::StepGraph;
use crate::store::{DataHandle, StepId, StepRegistry};

pub struct GraphBuilder<'a> {
    registry: &'a StepRegistry,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(registry: &'a StepRegistry) -> Self {
        Self { registry }
    }

    /// Builds the graph of every step reachable backward from `outputs`.
    ///
    /// Handles must come from the builder's registry. Nothing is validated
    /// here: cycles and unsatisfied inputs surface during resolution.
    pub fn build(&self, outputs: &[DataHandle]) -> StepGraph {
        let mut graph = StepGraph::new();

        // 1. Nodes: depth-first from each output's producer. Visited steps are
        // skipped, which keeps shared ancestors single and stops at cycles.
        let mut stack: Vec<StepId> = outputs.iter().rev().map(DataHandle::producer).collect();
        while let Some(step) = stack.pop() {
            if !graph.add_node(step) {
                continue;
            }
            let record = self.registry.record(step);
            stack.extend(record.inputs.iter().rev().map(DataHandle::producer));
        }

        // 2. Edges: one per (input handle, consuming step) pair.
        let consumers: Vec<StepId> = graph.nodes().collect();
        for consumer in consumers {
            for input in &self.registry.record(consumer).inputs {
                graph.add_edge(input.producer(), consumer, input.id());
            }
        }

        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::Lambda;
    use crate::store::StepSpec;

    fn pass() -> Lambda {
        Lambda::new(|xs| Ok(xs.to_vec()))
    }

    #[test]
    fn test_diamond_steps_added_once() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let a = reg.add_step(StepSpec::new("A", pass()).inputs(&[x.clone()]).outputs(2)).unwrap();
        let b = reg.add_step(StepSpec::new("B", pass()).inputs(&[a[0].clone()])).unwrap();
        let c = reg.add_step(StepSpec::new("C", pass()).inputs(&[a[1].clone()])).unwrap();
        let d = reg
            .add_step(StepSpec::new("D", Lambda::new(|xs| Ok(vec![xs[0].clone()]))).inputs(&[b[0].clone(), c[0].clone()]))
            .unwrap();

        let graph = GraphBuilder::new(&reg).build(&d);
        // x, A, B, C, D
        assert_eq!(graph.node_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.in_degree(d[0].producer()), 2);
        assert_eq!(graph.in_degree(x.producer()), 0);
    }

    #[test]
    fn test_unrelated_steps_are_left_out() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let y = reg.add_input("y");
        let a = reg.add_step(StepSpec::new("A", pass()).inputs(&[x.clone()])).unwrap();
        let _other = reg.add_step(StepSpec::new("B", pass()).inputs(&[y.clone()])).unwrap();

        let graph = GraphBuilder::new(&reg).build(&a);
        assert!(graph.contains(x.producer()));
        assert!(graph.contains(a[0].producer()));
        assert!(!graph.contains(y.producer()));
    }

    #[test]
    fn test_two_handles_between_same_steps_give_parallel_edges() {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let a = reg.add_step(StepSpec::new("A", pass()).inputs(&[x]).outputs(2)).unwrap();
        let b = reg.add_step(StepSpec::new("B", pass()).inputs(&a).outputs(2)).unwrap();

        let graph = GraphBuilder::new(&reg).build(&b);
        assert_eq!(graph.in_degree(b[0].producer()), 2);
    }

    #[test]
    fn test_cyclic_wiring_terminates() {
        let mut reg = StepRegistry::new();
        let p = reg.declare_step(StepSpec::new("P", pass())).unwrap();
        let p_out = reg.outputs_of(p).unwrap().to_vec();
        let q = reg.add_step(StepSpec::new("Q", pass()).inputs(&p_out)).unwrap();
        reg.bind_inputs(p, &q).unwrap();

        let graph = GraphBuilder::new(&reg).build(&q);
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 2);
    }
}
