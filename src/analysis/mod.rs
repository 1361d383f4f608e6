//! Static analysis over a built step graph.
pub mod resolver;

pub use resolver::{Resolution, ResolveError, Resolver};
