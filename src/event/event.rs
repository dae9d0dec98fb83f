use super::base_event::{BaseEvent, EventDescriptor};
use super::hash::Hash;
use super::AncientMode;
use crate::NodeId;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// A hashed event as held in memory by this node.
#[derive(Debug)]
pub struct Event {
    base: BaseEvent,
    hash: Hash,
    time_received: Instant,
    /// Set for events restored from a signed state, whose payload may have been stripped.
    from_signed_state: AtomicBool,
}

impl Event {
    pub fn new(base: BaseEvent) -> Self {
        Event::received_at(base, Instant::now())
    }

    pub fn received_at(base: BaseEvent, time_received: Instant) -> Self {
        let hash = base.compute_hash();
        Event { base, hash, time_received, from_signed_state: AtomicBool::new(false) }
    }

    pub fn hash(&self) -> Hash {
        self.hash
    }

    pub fn base(&self) -> &BaseEvent {
        &self.base
    }

    pub fn creator(&self) -> NodeId {
        self.base.creator
    }

    pub fn generation(&self) -> u64 {
        self.base.generation
    }

    pub fn birth_round(&self) -> u64 {
        self.base.birth_round
    }

    pub fn self_parent(&self) -> Option<&EventDescriptor> {
        self.base.self_parent.as_ref()
    }

    pub fn other_parent(&self) -> Option<&EventDescriptor> {
        self.base.other_parent.as_ref()
    }

    pub fn time_received(&self) -> Instant {
        self.time_received
    }

    pub fn ancient_indicator(&self, mode: AncientMode) -> u64 {
        match mode {
            AncientMode::Generation => self.base.generation,
            AncientMode::BirthRound => self.base.birth_round,
        }
    }

    pub fn descriptor(&self) -> EventDescriptor {
        EventDescriptor {
            hash: self.hash,
            creator: self.base.creator,
            generation: self.base.generation,
            birth_round: self.base.birth_round,
        }
    }

    pub fn is_from_signed_state(&self) -> bool {
        self.from_signed_state.load(Ordering::Acquire)
    }

    pub fn mark_from_signed_state(&self) {
        self.from_signed_state.store(true, Ordering::Release)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Event {}

impl std::hash::Hash for Event {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state)
    }
}

impl std::fmt::Display for Event {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "({} g{} r{} {})",
            self.base.creator,
            self.base.generation,
            self.base.birth_round,
            self.hash.short()
        )
    }
}
