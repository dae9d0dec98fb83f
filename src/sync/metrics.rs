use super::SyncOutcome;

use colored::Colorize;
use tracing::debug;

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters kept across all syncs of a node.
#[derive(Debug, Default)]
pub struct SyncMetrics {
    completed: AtomicU64,
    rejected: AtomicU64,
    fallen_behind: AtomicU64,
    aborted: AtomicU64,
    failed: AtomicU64,
    events_sent: AtomicU64,
    events_received: AtomicU64,
}

impl SyncMetrics {
    pub fn record_outcome(&self, outcome: &SyncOutcome) {
        let counter = match outcome {
            SyncOutcome::Completed { sent, received } => {
                let _ = self.events_sent.fetch_add(*sent as u64, Ordering::Relaxed);
                let _ = self.events_received.fetch_add(*received as u64, Ordering::Relaxed);
                &self.completed
            }
            SyncOutcome::Rejected => &self.rejected,
            SyncOutcome::SelfFallenBehind | SyncOutcome::PeerFallenBehind => &self.fallen_behind,
            SyncOutcome::TransferAborted { sent, events_read } => {
                let _ = self.events_sent.fetch_add(*sent as u64, Ordering::Relaxed);
                if *events_read > 0 {
                    let _ = self.events_received.fetch_add(*events_read as u64, Ordering::Relaxed);
                }
                &self.aborted
            }
        };
        let _ = counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        let _ = self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::Relaxed)
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn fallen_behind(&self) -> u64 {
        self.fallen_behind.load(Ordering::Relaxed)
    }

    pub fn aborted(&self) -> u64 {
        self.aborted.load(Ordering::Relaxed)
    }

    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Relaxed)
    }

    pub fn events_sent(&self) -> u64 {
        self.events_sent.load(Ordering::Relaxed)
    }

    pub fn events_received(&self) -> u64 {
        self.events_received.load(Ordering::Relaxed)
    }
}

/// Checkpoints within a single sync.
///
/// Point 0 is the start, then one point per phase boundary:
/// reserved, tips exchanged, booleans exchanged, send list built, events exchanged.
pub struct SyncTiming {
    points: Vec<Instant>,
}

impl SyncTiming {
    pub fn start() -> Self {
        SyncTiming { points: vec![Instant::now()] }
    }

    pub fn start_time(&self) -> Instant {
        self.points[0]
    }

    pub fn mark(&mut self) {
        self.points.push(Instant::now())
    }

    /// Time between consecutive points.
    pub fn phases(&self) -> Vec<Duration> {
        self.points.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn total(&self) -> Duration {
        match self.points.last() {
            Some(last) => *last - self.points[0],
            None => Duration::default(),
        }
    }

    pub fn log(&self, description: &str) {
        debug!(
            "[{}] {} took {:?}, phases {:?}",
            "sync".cyan(),
            description,
            self.total(),
            self.phases()
        );
    }
}
