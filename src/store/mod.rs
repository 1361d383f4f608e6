//! Storage for steps and the data handles that connect them.
pub mod registry;
pub mod types;

pub use registry::{RegistryError, StepRecord, StepRegistry, StepSpec};
pub use types::{DataHandle, DataId, DataMetadata, RegistryId, Shape, StepId, StepKind};
