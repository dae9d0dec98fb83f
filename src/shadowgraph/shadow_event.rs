use crate::event::{Event, Hash};

use std::sync::Arc;

/// Handle of a vertex in the shadowgraph arena.
///
/// A handle outlives its vertex; once the vertex expires the handle simply stops resolving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShadowId {
    index: u32,
    epoch: u32,
}

impl ShadowId {
    pub(super) fn new(index: u32, epoch: u32) -> Self {
        ShadowId { index, epoch }
    }

    pub(super) fn index(&self) -> u32 {
        self.index
    }

    pub(super) fn epoch(&self) -> u32 {
        self.epoch
    }
}

/// A vertex of the shadowgraph: an event and the handles of its parents' vertices.
#[derive(Debug)]
pub struct ShadowEvent {
    event: Arc<Event>,
    self_parent: Option<ShadowId>,
    other_parent: Option<ShadowId>,
}

impl ShadowEvent {
    pub fn new(event: Arc<Event>, self_parent: Option<ShadowId>, other_parent: Option<ShadowId>) -> Self {
        ShadowEvent { event, self_parent, other_parent }
    }

    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }

    pub fn self_parent(&self) -> Option<ShadowId> {
        self.self_parent
    }

    pub fn other_parent(&self) -> Option<ShadowId> {
        self.other_parent
    }

    pub fn parents(&self) -> impl Iterator<Item = ShadowId> {
        self.self_parent.into_iter().chain(self.other_parent)
    }

    /// Drops both parent links. Only used when the vertex expires.
    pub fn disconnect(&mut self) {
        self.self_parent = None;
        self.other_parent = None;
    }
}

/// A resolved vertex handed out of the shadowgraph: the handle plus a reference to its event.
///
/// Equality and hashing go through the handle.
#[derive(Debug, Clone)]
pub struct Shadow {
    id: ShadowId,
    event: Arc<Event>,
}

impl Shadow {
    pub(super) fn new(id: ShadowId, event: Arc<Event>) -> Self {
        Shadow { id, event }
    }

    pub fn id(&self) -> ShadowId {
        self.id
    }

    pub fn event(&self) -> &Arc<Event> {
        &self.event
    }

    pub fn hash(&self) -> Hash {
        self.event.hash()
    }
}

impl PartialEq for Shadow {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Shadow {}

impl std::hash::Hash for Shadow {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}
