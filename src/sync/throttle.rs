use crate::NodeId;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct Counters {
    syncs: AtomicUsize,
    inbound: AtomicUsize,
}

/// Limits syncs to one per peer at a time and bounds the number of inbound syncs.
pub struct SimultaneousSyncThrottle {
    max_inbound_syncs: usize,
    peer_locks: Mutex<HashMap<NodeId, Arc<AsyncMutex<()>>>>,
    counters: Arc<Counters>,
}

/// Held for the duration of one sync with one peer.
pub struct SyncPermit {
    peer: NodeId,
    outbound: bool,
    counters: Arc<Counters>,
    _guard: OwnedMutexGuard<()>,
}

impl SyncPermit {
    pub fn peer(&self) -> NodeId {
        self.peer
    }

    pub fn is_outbound(&self) -> bool {
        self.outbound
    }
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        let _ = self.counters.syncs.fetch_sub(1, Ordering::AcqRel);
        if !self.outbound {
            let _ = self.counters.inbound.fetch_sub(1, Ordering::AcqRel);
        }
    }
}

impl SimultaneousSyncThrottle {
    pub fn new(max_inbound_syncs: usize) -> Self {
        SimultaneousSyncThrottle {
            max_inbound_syncs,
            peer_locks: Mutex::new(HashMap::default()),
            counters: Arc::new(Counters::default()),
        }
    }

    fn peer_lock(&self, peer: NodeId) -> Arc<AsyncMutex<()>> {
        self.peer_locks.lock().entry(peer).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
    }

    /// Tries to start a sync with `peer` without waiting.
    ///
    /// Returns `None` when a sync with this peer is already running, or when the sync is inbound
    /// and the number of inbound syncs is above the configured maximum.
    pub fn try_sync(&self, peer: NodeId, outbound: bool) -> Option<SyncPermit> {
        if !outbound && self.counters.inbound.load(Ordering::Acquire) > self.max_inbound_syncs {
            return None;
        }
        let guard = self.peer_lock(peer).try_lock_owned().ok()?;
        let _ = self.counters.syncs.fetch_add(1, Ordering::AcqRel);
        if !outbound {
            let _ = self.counters.inbound.fetch_add(1, Ordering::AcqRel);
        }
        Some(SyncPermit { peer, outbound, counters: self.counters.clone(), _guard: guard })
    }

    /// Waits until every sync running when this is called has finished.
    ///
    /// Syncs may start again as soon as their peer's lock has been visited.
    pub async fn wait_for_all_syncs_to_finish(&self) {
        let locks: Vec<Arc<AsyncMutex<()>>> = self.peer_locks.lock().values().cloned().collect();
        for lock in locks.iter() {
            let _ = lock.lock().await;
        }
    }

    pub fn num_syncs(&self) -> usize {
        self.counters.syncs.load(Ordering::Acquire)
    }

    pub fn num_inbound_syncs(&self) -> usize {
        self.counters.inbound.load(Ordering::Acquire)
    }
}
