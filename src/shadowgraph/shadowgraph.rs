use super::arena::Arena;
use super::reservation::{Reservation, ReservedEventWindow};
use super::shadow_event::{Shadow, ShadowEvent, ShadowId};
use super::{Error, InsertableStatus, Result};

use crate::event::{AncientMode, Event, EventDescriptor, Hash};
use crate::event_window::EventWindow;

use colored::Colorize;
use parking_lot::RwLock;
use tracing::{debug, error, warn};

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::Arc;

/// The in-memory DAG of all non-expired events known to this node.
///
/// Structural changes take the write lock. Lookups and ancestor searches share the read lock,
/// so a traversal never observes a vertex being expired underneath it.
pub struct Shadowgraph {
    ancient_mode: AncientMode,
    inner: RwLock<Inner>,
}

struct Inner {
    arena: Arena,
    hash_to_shadow: HashMap<Hash, ShadowId>,
    indicator_to_shadows: BTreeMap<u64, HashSet<ShadowId>>,
    /// Vertices without a self-child.
    tips: HashSet<ShadowId>,
    /// Every indicator below this one has been expired.
    oldest_unexpired_indicator: u64,
    /// Ordered by ascending indicator.
    reservations: VecDeque<Arc<Reservation>>,
    event_window: EventWindow,
}

impl Inner {
    fn new(ancient_mode: AncientMode) -> Self {
        Inner {
            arena: Arena::default(),
            hash_to_shadow: HashMap::default(),
            indicator_to_shadows: BTreeMap::default(),
            tips: HashSet::default(),
            oldest_unexpired_indicator: ancient_mode.first_indicator(),
            reservations: VecDeque::new(),
            event_window: EventWindow::genesis(ancient_mode),
        }
    }

    fn shadow(&self, id: ShadowId) -> Option<Shadow> {
        self.arena.get(id).map(|v| Shadow::new(id, v.event().clone()))
    }

    fn lookup(&self, hash: &Hash) -> Option<Shadow> {
        self.hash_to_shadow.get(hash).and_then(|id| self.shadow(*id))
    }

    fn is_expired_indicator(&self, indicator: u64) -> bool {
        indicator < self.oldest_unexpired_indicator
    }

    /// Resolves a parent reference, warning when a parent that should still be present is missing.
    fn link_parent(
        &self,
        child: &Event,
        parent: Option<&EventDescriptor>,
        mode: AncientMode,
    ) -> Option<ShadowId> {
        let parent = parent?;
        match self.hash_to_shadow.get(&parent.hash) {
            Some(id) => Some(*id),
            None => {
                if !self.is_expired_indicator(parent.ancient_indicator(mode)) {
                    warn!(
                        "[{}] parent {} of {} is missing but not expired",
                        "shadowgraph".yellow(),
                        parent.hash.short(),
                        child
                    );
                }
                None
            }
        }
    }

    fn expire_below(&mut self, floor: u64) {
        if floor <= self.oldest_unexpired_indicator {
            return;
        }
        let kept = self.indicator_to_shadows.split_off(&floor);
        let expired = std::mem::replace(&mut self.indicator_to_shadows, kept);

        let mut count = 0;
        for (_, ids) in expired.into_iter() {
            for id in ids.into_iter() {
                if let Some(mut vertex) = self.arena.remove(id) {
                    let _ = self.hash_to_shadow.remove(&vertex.event().hash());
                    let _ = self.tips.remove(&id);
                    vertex.disconnect();
                    count += 1;
                }
            }
        }
        self.oldest_unexpired_indicator = floor;
        debug!("[{}] expired {} events below {}", "shadowgraph".yellow(), count, floor);
    }
}

impl Shadowgraph {
    pub fn new(ancient_mode: AncientMode) -> Self {
        Shadowgraph { ancient_mode, inner: RwLock::new(Inner::new(ancient_mode)) }
    }

    pub fn ancient_mode(&self) -> AncientMode {
        self.ancient_mode
    }

    /// Reserves the current event window. Nothing at or above its expired threshold is expired
    /// until the returned guard is dropped.
    pub fn reserve(&self) -> ReservedEventWindow {
        let mut inner = self.inner.write();
        let window = inner.event_window;
        let threshold = window.expired_threshold();
        let reusable =
            inner.reservations.back().filter(|last| last.indicator() == threshold).cloned();
        let reservation = match reusable {
            Some(last) => last,
            None => {
                let reservation = Arc::new(Reservation::new(threshold));
                inner.reservations.push_back(reservation.clone());
                reservation
            }
        };
        ReservedEventWindow::new(window, reservation)
    }

    pub fn insertable_status(&self, event: Option<&Event>) -> InsertableStatus {
        let inner = self.inner.read();
        self.status_of(&inner, event)
    }

    fn status_of(&self, inner: &Inner, event: Option<&Event>) -> InsertableStatus {
        match event {
            None => InsertableStatus::NullEvent,
            Some(event) if inner.hash_to_shadow.contains_key(&event.hash()) => {
                InsertableStatus::DuplicateShadowEvent
            }
            Some(event) if inner.is_expired_indicator(event.ancient_indicator(self.ancient_mode)) => {
                InsertableStatus::ExpiredEvent
            }
            Some(_) => InsertableStatus::Insertable,
        }
    }

    /// Adds an event to the graph, linking it to whichever parents are present.
    ///
    /// The event becomes a tip and its self-parent stops being one.
    pub fn insert(&self, event: Arc<Event>) -> Result<()> {
        let mut inner = self.inner.write();
        let status = self.status_of(&inner, Some(event.as_ref()));
        if status != InsertableStatus::Insertable {
            return Err(Error::Insertion {
                status,
                description: format!(
                    "cannot insert {} ({:?}), oldest unexpired indicator is {}",
                    event,
                    status,
                    inner.oldest_unexpired_indicator
                ),
            });
        }

        let self_parent = inner.link_parent(&event, event.self_parent(), self.ancient_mode);
        let other_parent = inner.link_parent(&event, event.other_parent(), self.ancient_mode);
        let indicator = event.ancient_indicator(self.ancient_mode);
        let hash = event.hash();

        let id = inner.arena.insert(ShadowEvent::new(event, self_parent, other_parent));
        let _ = inner.hash_to_shadow.insert(hash, id);
        let _ = inner.indicator_to_shadows.entry(indicator).or_default().insert(id);
        let _ = inner.tips.insert(id);
        if let Some(self_parent) = self_parent {
            let _ = inner.tips.remove(&self_parent);
        }
        Ok(())
    }

    /// Moves the window forward and expires every event no reservation still protects.
    ///
    /// A window whose expired threshold is below the current one is ignored.
    pub fn update_event_window(&self, window: EventWindow) {
        let mut inner = self.inner.write();
        let current = inner.event_window.expired_threshold();
        let expired_threshold = window.expired_threshold();
        if expired_threshold < current {
            error!(
                "[{}] ignoring event window {} which would move the expired threshold back from {}",
                "shadowgraph".yellow(),
                window,
                current
            );
            return;
        }
        inner.event_window = window;

        let mut minimum_to_keep = expired_threshold;
        loop {
            let (count, indicator) = match inner.reservations.front() {
                Some(oldest) => (oldest.count(), oldest.indicator()),
                None => break,
            };
            if count > 0 {
                minimum_to_keep = minimum_to_keep.min(indicator);
                break;
            }
            if indicator < expired_threshold {
                let _ = inner.reservations.pop_front();
            } else {
                break;
            }
        }
        inner.expire_below(minimum_to_keep);
    }

    /// Collects the ancestors of `start` that satisfy `predicate`, walking both parent links
    /// depth first. The start vertices themselves are never part of the result.
    pub fn find_ancestors<'a, I, P>(&self, start: I, predicate: P) -> HashSet<Shadow>
    where
        I: IntoIterator<Item = &'a Shadow>,
        P: Fn(&Shadow) -> bool,
    {
        let start: HashSet<ShadowId> = start.into_iter().map(|s| s.id()).collect();
        let inner = self.inner.read();
        let mut ancestors: HashSet<Shadow> = HashSet::default();
        let mut stack: Vec<ShadowId> = vec![];
        for id in start.iter() {
            stack.push(*id);
            while let Some(id) = stack.pop() {
                let vertex = match inner.arena.get(id) {
                    Some(vertex) => vertex,
                    None => continue,
                };
                for parent in vertex.parents() {
                    if start.contains(&parent) {
                        continue;
                    }
                    if let Some(parent) = inner.shadow(parent) {
                        if !ancestors.contains(&parent) && predicate(&parent) {
                            stack.push(parent.id());
                            let _ = ancestors.insert(parent);
                        }
                    }
                }
            }
        }
        ancestors
    }

    /// A snapshot of the current tips.
    pub fn tips(&self) -> Vec<Shadow> {
        let inner = self.inner.read();
        inner.tips.iter().filter_map(|id| inner.shadow(*id)).collect()
    }

    pub fn shadow(&self, hash: &Hash) -> Option<Shadow> {
        self.inner.read().lookup(hash)
    }

    /// Looks up each hash, keeping the order of the input.
    pub fn shadows(&self, hashes: &[Hash]) -> Vec<Option<Shadow>> {
        let inner = self.inner.read();
        hashes.iter().map(|hash| inner.lookup(hash)).collect()
    }

    pub fn event(&self, hash: &Hash) -> Option<Arc<Event>> {
        self.shadow(hash).map(|s| s.event().clone())
    }

    pub fn is_hash_in_graph(&self, hash: &Hash) -> bool {
        self.inner.read().hash_to_shadow.contains_key(hash)
    }

    pub fn event_window(&self) -> EventWindow {
        self.inner.read().event_window
    }

    pub fn oldest_unexpired_indicator(&self) -> u64 {
        self.inner.read().oldest_unexpired_indicator
    }

    /// Number of reservations still tracked, including released ones not yet retired.
    pub fn reservation_count(&self) -> usize {
        self.inner.read().reservations.len()
    }

    pub fn len(&self) -> usize {
        self.inner.read().arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes every event and reservation, returning to the genesis window.
    pub fn clear(&self) {
        let mut inner = self.inner.write();
        for vertex in inner.arena.vertices_mut() {
            vertex.disconnect();
        }
        *inner = Inner::new(self.ancient_mode);
    }

    /// Starts from `window` and loads the given events, typically those of a signed state.
    pub fn init_from_events(&self, events: Vec<Arc<Event>>, window: EventWindow) -> Result<()> {
        if events.is_empty() {
            return Err(Error::EmptyEventList);
        }
        {
            let mut inner = self.inner.write();
            inner.event_window = window;
            inner.oldest_unexpired_indicator = window.expired_threshold();
        }
        for event in events.into_iter() {
            if let Err(err) = self.insert(event) {
                error!("[{}] failed to load event: {}", "shadowgraph".yellow(), err);
            }
        }
        Ok(())
    }
}
