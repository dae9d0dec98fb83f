use crate::event_window::EventWindow;
use crate::NodeId;

use colored::Colorize;
use parking_lot::Mutex;
use tracing::info;

use std::collections::HashSet;

/// Which side of a sync, if any, can no longer catch up through gossip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallenBehindStatus {
    None,
    SelfFallenBehind,
    OtherFallenBehind,
}

impl FallenBehindStatus {
    /// Compares the windows exchanged at the start of a sync.
    ///
    /// A side has fallen behind when everything it still needs has already expired on the
    /// other side.
    pub fn of(mine: &EventWindow, theirs: &EventWindow) -> Self {
        if theirs.ancient_threshold() < mine.expired_threshold() {
            FallenBehindStatus::OtherFallenBehind
        } else if mine.ancient_threshold() < theirs.expired_threshold() {
            FallenBehindStatus::SelfFallenBehind
        } else {
            FallenBehindStatus::None
        }
    }
}

/// Collects reports of this node having fallen behind its peers.
pub trait FallenBehindManager: Send + Sync {
    fn report_fallen_behind(&self, peer: NodeId);

    fn has_fallen_behind(&self) -> bool;

    /// Withdraws `peer`'s report, once a sync with it found the windows overlapping again.
    fn clear_report(&self, peer: NodeId);
}

/// Considers the node behind once a fraction of its peers reported so.
pub struct DefaultFallenBehindManager {
    num_peers: usize,
    threshold: f64,
    reports: Mutex<HashSet<NodeId>>,
}

impl DefaultFallenBehindManager {
    pub fn new(num_peers: usize, threshold: f64) -> Self {
        DefaultFallenBehindManager { num_peers, threshold, reports: Mutex::new(HashSet::default()) }
    }

    pub fn num_reports(&self) -> usize {
        self.reports.lock().len()
    }
}

impl FallenBehindManager for DefaultFallenBehindManager {
    fn report_fallen_behind(&self, peer: NodeId) {
        let mut reports = self.reports.lock();
        if reports.insert(peer) {
            info!("[{}] {} reports that we have fallen behind", "sync".cyan(), peer);
        }
    }

    fn has_fallen_behind(&self) -> bool {
        let reports = self.reports.lock().len();
        reports > 0 && reports as f64 >= self.threshold * self.num_peers as f64
    }

    fn clear_report(&self, peer: NodeId) {
        if self.reports.lock().remove(&peer) {
            info!("[{}] {} no longer reports that we have fallen behind", "sync".cyan(), peer);
        }
    }
}
