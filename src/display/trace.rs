use crate::model::Pipeline;
use crate::store::{DataHandle, StepKind};
use std::collections::HashMap;
use std::fmt::Write;

/// Lists a pipeline's execution plan, one step per line.
pub fn format_plan(pipeline: &Pipeline) -> String {
    let registry = pipeline.registry();
    let mut out = String::new();
    let _ = writeln!(out, "EXECUTION PLAN for pipeline '{}':", pipeline.name());
    let _ = writeln!(out, "--------------------------------------------------");
    let _ = writeln!(out, "inputs:  {}", join_names(pipeline.inputs()));
    let _ = writeln!(out, "outputs: {}", join_names(pipeline.outputs()));

    for (i, &step) in pipeline.plan().iter().enumerate() {
        let record = registry.record(step);
        let caps = record.capabilities;
        let mode = match (caps.fit, caps.predict, caps.transform) {
            (_, true, _) => "predict",
            (_, false, true) => "transform",
            _ => "none",
        };
        let _ = writeln!(
            out,
            "{: >3}. {} ({}{}{}) <- [{}] -> [{}]",
            i + 1,
            record.name,
            if caps.fit { "fit+" } else { "" },
            mode,
            if record.supervised { ", supervised" } else { "" },
            join_names(&record.inputs),
            join_names(&record.outputs),
        );
    }

    for w in pipeline.warnings() {
        let _ = writeln!(out, "warning: {}", w);
    }
    out
}

/// Renders the dependency tree of one output, walking back to declared inputs.
pub fn format_trace(pipeline: &Pipeline, target: &DataHandle) -> String {
    let mut tracer = Tracer { pipeline, visited_at_level: HashMap::new(), output: String::new() };

    if pipeline.registry().contains(target) {
        let _ = writeln!(tracer.output, "DEPENDENCY TRACE for '{}':", target.name());
        let _ = writeln!(tracer.output, "--------------------------------------------------");
        tracer.trace_data(target, 1, "");
    } else {
        let _ = writeln!(tracer.output, "Error: '{}' is not part of this pipeline", target.name());
    }
    tracer.output
}

fn join_names(handles: &[DataHandle]) -> String {
    handles.iter().map(|h| h.name()).collect::<Vec<_>>().join(", ")
}

struct Tracer<'a> {
    pipeline: &'a Pipeline,
    visited_at_level: HashMap<DataHandle, usize>,
    output: String,
}

impl<'a> Tracer<'a> {
    fn trace_data(&mut self, data: &DataHandle, level: usize, prefix: &str) {
        if let Some(&first_seen) = self.visited_at_level.get(data) {
            let _ = writeln!(self.output, "{}{} -> (Ref to L{})", prefix, data.name(), first_seen);
            return;
        }
        self.visited_at_level.insert(data.clone(), level);

        if self.pipeline.inputs().contains(data) {
            let _ = writeln!(self.output, "{}[L{}] {} [INPUT]", prefix, level, data.name());
            return;
        }

        let record = self.pipeline.registry().record(data.producer());
        match record.kind {
            StepKind::Input => {
                let _ = writeln!(self.output, "{}[L{}] {} [UNDECLARED INPUT]", prefix, level, data.name());
            }
            StepKind::Compute => {
                let _ = writeln!(self.output, "{}[L{}] {} = {}(...)", prefix, level, data.name(), record.name);
                let stem = build_child_stem(prefix);
                let count = record.inputs.len();
                for (i, input) in record.inputs.iter().enumerate() {
                    let connector = if i + 1 == count { "`--" } else { "|--" };
                    self.trace_data(input, level + 1, &format!("{}{}", stem, connector));
                }
            }
        }
    }
}

fn build_child_stem(current_prefix: &str) -> String {
    current_prefix.replace("`--", "   ").replace("|--", "|  ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PipelineConfig;
    use crate::step::Lambda;
    use crate::store::{StepRegistry, StepSpec};

    fn pass() -> Lambda {
        Lambda::new(|xs| Ok(vec![xs[0].clone()]))
    }

    fn diamond() -> Pipeline {
        let mut reg = StepRegistry::new();
        let x = reg.add_input("x");
        let y = reg.add_input("y");
        let a = reg.add_step(StepSpec::new("A", Lambda::new(|xs| Ok(vec![xs[0].clone(), xs[0].clone()]))).inputs(&[x.clone()]).outputs(2)).unwrap();
        let b = reg.add_step(StepSpec::new("B", pass()).inputs(&[a[0].clone()])).unwrap();
        let c = reg.add_step(StepSpec::new("C", pass()).inputs(&[a[1].clone(), b[0].clone()])).unwrap();
        Pipeline::new(reg, &[x, y], &c, PipelineConfig::named("demo")).unwrap()
    }

    #[test]
    fn test_plan_listing() {
        let text = format_plan(&diamond());
        assert!(text.starts_with("EXECUTION PLAN for pipeline 'demo':"));
        assert!(text.contains("  1. A (transform) <- [x] -> [A/0, A/1]"));
        assert!(text.contains("  3. C (transform) <- [A/1, B/0] -> [C/0]"));
        assert!(text.contains("warning: input y was provided"));
    }

    #[test]
    fn test_trace_marks_shared_ancestors() {
        let p = diamond();
        let out = p.outputs()[0].clone();
        let text = format_trace(&p, &out);
        let expected = "\
DEPENDENCY TRACE for 'C/0':
--------------------------------------------------
[L1] C/0 = C(...)
|--[L2] A/1 = A(...)
|  `--[L3] x [INPUT]
`--[L2] B/0 = B(...)
   `--[L3] A/0 = A(...)
      `--x -> (Ref to L3)
";
        assert_eq!(text, expected);
    }
}
