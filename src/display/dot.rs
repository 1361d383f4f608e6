//! Graphviz export of a pipeline's step graph.
use crate::model::Pipeline;
use crate::store::{DataId, StepId, StepKind};
use petgraph::dot::{Config, Dot};
use petgraph::graph::{DiGraph, EdgeReference, NodeIndex};
use std::io;
use std::path::Path;

/// Renders the full step graph. Planned steps are filled and numbered by
/// execution position; declared inputs are drawn as boxes.
pub fn render_dot(pipeline: &Pipeline) -> String {
    let registry = pipeline.registry();
    let plan = pipeline.plan();

    let node_attrs = |_: &DiGraph<StepId, DataId>, (_, step): (NodeIndex, &StepId)| {
        let record = registry.record(*step);
        let declared = record.outputs.iter().any(|o| pipeline.inputs().contains(o));
        match (record.kind, plan.iter().position(|s| s == step)) {
            (_, Some(pos)) => format!("label = \"{}. {}\" style = filled fillcolor = lightblue ", pos + 1, record.name),
            (StepKind::Input, None) if declared => format!("label = \"{}\" shape = box ", record.name),
            _ => format!("label = \"{}\" style = dashed ", record.name),
        }
    };
    let edge_attrs = |_: &DiGraph<StepId, DataId>, edge: EdgeReference<'_, DataId>| {
        let name = registry.handle(*edge.weight()).map_or("?", |h| h.name());
        format!("label = \"{}\" ", name)
    };

    let dot = Dot::with_attr_getters(
        pipeline.graph().inner(),
        &[Config::NodeNoLabel, Config::EdgeNoLabel],
        &edge_attrs,
        &node_attrs,
    );
    format!("{:?}", dot)
}

pub fn write_dot(pipeline: &Pipeline, path: impl AsRef<Path>) -> io::Result<()> {
    std::fs::write(path, render_dot(pipeline))
}
