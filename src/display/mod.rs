//! Human-readable and Graphviz renderings of pipelines.
pub mod dot;
pub mod trace;

pub use dot::{render_dot, write_dot};
pub use trace::{format_plan, format_trace};
