use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU32, Ordering as AtomicOrdering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct StepId(pub u32);

impl StepId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct DataId(pub u32);

impl DataId {
    #[inline(always)]
    pub fn index(&self) -> usize { self.0 as usize }
    pub fn new(idx: usize) -> Self { Self(idx as u32) }
}

/// Stamp identifying the registry that minted a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RegistryId(pub u32);

static NEXT_REGISTRY_ID: AtomicU32 = AtomicU32::new(0);

impl RegistryId {
    /// A stamp no other registry in this process carries.
    pub fn fresh() -> Self {
        Self(NEXT_REGISTRY_ID.fetch_add(1, AtomicOrdering::Relaxed))
    }
}

/// Token for one named output slot of one step.
///
/// Equality and hashing go through the owning registry and the slot id only,
/// so two handles are equal exactly when they denote the same slot. Ordering is keyed by name (id breaks
/// ties) and exists so that sets of handles iterate in a reproducible order.
#[derive(Clone)]
pub struct DataHandle {
    owner: RegistryId,
    id: DataId,
    producer: StepId,
    name: Arc<str>,
}

impl DataHandle {
    pub(crate) fn new(owner: RegistryId, id: DataId, producer: StepId, name: Arc<str>) -> Self {
        Self { owner, id, producer, name }
    }

    pub fn owner(&self) -> RegistryId { self.owner }

    #[inline(always)]
    pub fn id(&self) -> DataId { self.id }

    /// The step that produces this value. A plain index into the owning registry.
    #[inline(always)]
    pub fn producer(&self) -> StepId { self.producer }

    pub fn name(&self) -> &str { &self.name }
}

impl PartialEq for DataHandle {
    fn eq(&self, other: &Self) -> bool { self.owner == other.owner && self.id == other.id }
}

impl Eq for DataHandle {}

impl Hash for DataHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.owner.hash(state);
        self.id.hash(state);
    }
}

impl Ord for DataHandle {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name.cmp(&other.name).then(self.id.cmp(&other.id)).then(self.owner.cmp(&other.owner))
    }
}

impl PartialOrd for DataHandle {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl fmt::Debug for DataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataHandle({:?} #{} <- step {})", self.name, self.id.0, self.producer.0)
    }
}

impl fmt::Display for DataHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.name) }
}

/// Advisory shape of a value. Never enforced by the graph layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape(pub Vec<usize>);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataMetadata {
    pub name: String,
    pub shape: Option<Shape>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StepKind {
    /// Placeholder standing for externally supplied data.
    Input,
    /// A step backed by an operator.
    Compute,
}
