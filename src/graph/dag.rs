//! dag.rs
//! Step-level dependency graph backed by `petgraph`.
//! Nodes are steps, edges are the data handles flowing producer -> consumer.

use crate::store::{DataId, StepId};
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("cycle detected involving steps {steps:?}")]
    CycleDetected { steps: Vec<StepId> },
}

#[derive(Debug, Clone, Default)]
pub struct StepGraph {
    graph: DiGraph<StepId, DataId>,
    index: HashMap<StepId, NodeIndex>,
}

impl StepGraph {
    pub fn new() -> Self { Self::default() }

    /// Adds `step` if absent. Returns true if it was new.
    pub fn add_node(&mut self, step: StepId) -> bool {
        if self.index.contains_key(&step) {
            return false;
        }
        let idx = self.graph.add_node(step);
        self.index.insert(step, idx);
        true
    }

    /// Adds an edge carrying `data` from `producer` to `consumer`.
    ///
    /// Parallel edges are kept: a producer feeding a consumer through two
    /// handles yields two edges.
    pub fn add_edge(&mut self, producer: StepId, consumer: StepId, data: DataId) {
        self.add_node(producer);
        self.add_node(consumer);
        let (from, to) = (self.index[&producer], self.index[&consumer]);
        self.graph.add_edge(from, to, data);
    }

    pub fn contains(&self, step: StepId) -> bool { self.index.contains_key(&step) }
    pub fn node_count(&self) -> usize { self.graph.node_count() }
    pub fn edge_count(&self) -> usize { self.graph.edge_count() }

    /// Steps in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = StepId> + '_ {
        self.graph.node_indices().map(move |idx| self.graph[idx])
    }

    /// Edges as (producer, consumer, data), in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (StepId, StepId, DataId)> + '_ {
        self.graph
            .edge_references()
            .map(|e| (self.graph[e.source()], self.graph[e.target()], *e.weight()))
    }

    /// Number of incoming edges. Zero for steps not in the graph.
    pub fn in_degree(&self, step: StepId) -> usize {
        self.index
            .get(&step)
            .map_or(0, |&idx| self.graph.edges_directed(idx, Direction::Incoming).count())
    }

    pub fn predecessors(&self, step: StepId) -> Vec<StepId> {
        match self.index.get(&step) {
            Some(&idx) => self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .map(|e| self.graph[e.source()])
                .collect(),
            None => Vec::new(),
        }
    }

    /// Returns a topological sort using Kahn's Algorithm.
    ///
    /// Among steps that are ready at the same time, the one with the smallest
    /// `key` goes first, so the order is reproducible for a given key.
    pub fn topological_sort<K, F>(&self, key: F) -> Result<Vec<StepId>, GraphError>
    where
        K: Ord,
        F: Fn(StepId) -> K,
    {
        let count = self.graph.node_count();
        let mut in_degree = vec![0usize; count];
        let mut ready = BinaryHeap::with_capacity(count);
        let mut order = Vec::with_capacity(count);

        // 1. Initialize In-Degrees
        for idx in self.graph.node_indices() {
            let degree = self.graph.edges_directed(idx, Direction::Incoming).count();
            in_degree[idx.index()] = degree;
            if degree == 0 {
                let step = self.graph[idx];
                ready.push(Reverse((key(step), step, idx)));
            }
        }

        // 2. Process ready set
        while let Some(Reverse((_, step, idx))) = ready.pop() {
            order.push(step);
            for edge in self.graph.edges_directed(idx, Direction::Outgoing) {
                let child = edge.target();
                in_degree[child.index()] -= 1;
                if in_degree[child.index()] == 0 {
                    let child_step = self.graph[child];
                    ready.push(Reverse((key(child_step), child_step, child)));
                }
            }
        }

        if order.len() != count {
            return Err(GraphError::CycleDetected { steps: self.cycle_members() });
        }
        Ok(order)
    }

    /// Steps lying on a cycle: members of non-trivial strongly connected
    /// components, plus steps that feed themselves.
    fn cycle_members(&self) -> Vec<StepId> {
        let mut steps: Vec<StepId> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1 || self.graph.contains_edge(scc[0], scc[0]))
            .flatten()
            .map(|idx| self.graph[idx])
            .collect();
        steps.sort();
        steps
    }

    pub(crate) fn inner(&self) -> &DiGraph<StepId, DataId> { &self.graph }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(i: u32) -> StepId { StepId(i) }
    fn d(i: u32) -> DataId { DataId(i) }

    #[test]
    fn test_sort_diamond_dependency() {
        // Shape: A -> B, A -> C, B+C -> D
        let mut g = StepGraph::new();
        g.add_edge(s(0), s(1), d(0));
        g.add_edge(s(0), s(2), d(1));
        g.add_edge(s(1), s(3), d(2));
        g.add_edge(s(2), s(3), d(3));

        let res = g.topological_sort(|step| step).expect("Sort failed");
        let pos = |id: StepId| res.iter().position(|&x| x == id).unwrap();
        assert!(pos(s(0)) < pos(s(1)));
        assert!(pos(s(0)) < pos(s(2)));
        assert!(pos(s(1)) < pos(s(3)));
        assert!(pos(s(2)) < pos(s(3)));
    }

    #[test]
    fn test_ties_follow_key() {
        let mut g = StepGraph::new();
        for i in 0..4 {
            g.add_node(s(i));
        }
        let names = ["d", "b", "c", "a"];
        let res = g.topological_sort(|step| names[step.index()]).unwrap();
        assert_eq!(res, vec![s(3), s(1), s(2), s(0)]);
    }

    #[test]
    fn test_parallel_edges_count_towards_in_degree() {
        let mut g = StepGraph::new();
        g.add_edge(s(0), s(1), d(0));
        g.add_edge(s(0), s(1), d(1));
        assert_eq!(g.edge_count(), 2);
        assert_eq!(g.in_degree(s(1)), 2);
        assert_eq!(g.in_degree(s(0)), 0);
        assert_eq!(g.predecessors(s(1)), vec![s(0), s(0)]);
        assert_eq!(g.topological_sort(|step| step).unwrap(), vec![s(0), s(1)]);
    }

    #[test]
    fn test_cycle_detection_names_members() {
        // 0 -> 1 -> 2 -> 1, and 2 -> 3 downstream of the cycle
        let mut g = StepGraph::new();
        g.add_edge(s(0), s(1), d(0));
        g.add_edge(s(1), s(2), d(1));
        g.add_edge(s(2), s(1), d(2));
        g.add_edge(s(2), s(3), d(3));

        let err = g.topological_sort(|step| step).unwrap_err();
        assert_eq!(err, GraphError::CycleDetected { steps: vec![s(1), s(2)] });
    }

    #[test]
    fn test_self_loop_is_a_cycle() {
        let mut g = StepGraph::new();
        g.add_edge(s(5), s(5), d(0));
        let err = g.topological_sort(|step| step).unwrap_err();
        assert_eq!(err, GraphError::CycleDetected { steps: vec![s(5)] });
    }

    #[test]
    fn test_add_node_is_idempotent() {
        let mut g = StepGraph::new();
        assert!(g.add_node(s(2)));
        assert!(!g.add_node(s(2)));
        assert_eq!(g.node_count(), 1);
        assert!(g.contains(s(2)));
        assert_eq!(g.nodes().collect::<Vec<_>>(), vec![s(2)]);
    }
}
