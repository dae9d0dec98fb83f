//! Deterministic event generation for tests, benchmarks and the demo node.

use super::{BaseEvent, Event};
use crate::NodeId;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NONCE: AtomicU64 = AtomicU64::new(0);

/// Builds an event on top of the given parents.
///
/// A unique nonce transaction is attached so that two events with the same parents never share a hash.
pub fn build_event(
    creator: NodeId,
    self_parent: Option<&Event>,
    other_parent: Option<&Event>,
    birth_round: u64,
) -> Arc<Event> {
    let nonce = NONCE.fetch_add(1, Ordering::Relaxed);
    let base = BaseEvent::new(
        creator,
        self_parent.map(|e| e.descriptor()),
        other_parent.map(|e| e.descriptor()),
        birth_round,
        vec![nonce.to_le_bytes().to_vec()],
    );
    Arc::new(Event::new(base))
}

/// Emits a random but reproducible gossip DAG.
///
/// Every event has its creator's previous event as self-parent and the latest event of a
/// randomly chosen other creator as other-parent. Birth rounds advance once per
/// `creators.len()` events.
pub struct EventEmitter {
    rng: StdRng,
    creators: Vec<NodeId>,
    latest: HashMap<NodeId, Arc<Event>>,
    emitted: u64,
}

impl EventEmitter {
    pub fn new(seed: u64, num_creators: u64) -> Self {
        EventEmitter {
            rng: StdRng::seed_from_u64(seed),
            creators: (0..num_creators).map(NodeId).collect(),
            latest: HashMap::default(),
            emitted: 0,
        }
    }

    pub fn creators(&self) -> &[NodeId] {
        &self.creators
    }

    pub fn latest(&self, creator: &NodeId) -> Option<Arc<Event>> {
        self.latest.get(creator).cloned()
    }

    pub fn emit(&mut self) -> Arc<Event> {
        let creator = self.creators[self.rng.gen_range(0, self.creators.len())];
        self.emit_from(creator)
    }

    pub fn emit_from(&mut self, creator: NodeId) -> Arc<Event> {
        let self_parent = self.latest.get(&creator).cloned();
        let candidates: Vec<NodeId> = self
            .creators
            .iter()
            .filter(|c| **c != creator && self.latest.contains_key(*c))
            .cloned()
            .collect();
        let other_parent = if candidates.is_empty() {
            None
        } else {
            let other = candidates[self.rng.gen_range(0, candidates.len())];
            self.latest.get(&other).cloned()
        };
        let birth_round = 1 + self.emitted / self.creators.len().max(1) as u64;
        let event =
            build_event(creator, self_parent.as_deref(), other_parent.as_deref(), birth_round);
        self.emitted += 1;
        let _ = self.latest.insert(creator, event.clone());
        event
    }

    pub fn emit_events(&mut self, n: usize) -> Vec<Arc<Event>> {
        (0..n).map(|_| self.emit()).collect()
    }
}
