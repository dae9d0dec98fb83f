//! The range of the DAG that is still relevant to consensus.

use crate::event::{AncientMode, Event};

use std::fmt;

/// Supplied by consensus, describing which events are ancient and which may be forgotten.
///
/// Events with an ancient indicator below `ancient_threshold` no longer take part in
/// consensus. Events below `expired_threshold` may be removed from memory. The expired
/// threshold never exceeds the ancient threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    latest_consensus_round: u64,
    ancient_threshold: u64,
    expired_threshold: u64,
    ancient_mode: AncientMode,
}

impl EventWindow {
    pub fn new(
        latest_consensus_round: u64,
        ancient_threshold: u64,
        expired_threshold: u64,
        ancient_mode: AncientMode,
    ) -> Self {
        EventWindow {
            latest_consensus_round,
            ancient_threshold,
            expired_threshold: expired_threshold.min(ancient_threshold),
            ancient_mode,
        }
    }

    /// The window before any round has reached consensus.
    pub fn genesis(ancient_mode: AncientMode) -> Self {
        let first = ancient_mode.first_indicator();
        EventWindow::new(0, first, first, ancient_mode)
    }

    pub fn latest_consensus_round(&self) -> u64 {
        self.latest_consensus_round
    }

    pub fn ancient_threshold(&self) -> u64 {
        self.ancient_threshold
    }

    pub fn expired_threshold(&self) -> u64 {
        self.expired_threshold
    }

    pub fn ancient_mode(&self) -> AncientMode {
        self.ancient_mode
    }

    pub fn is_ancient(&self, event: &Event) -> bool {
        self.is_ancient_indicator(event.ancient_indicator(self.ancient_mode))
    }

    pub fn is_ancient_indicator(&self, indicator: u64) -> bool {
        indicator < self.ancient_threshold
    }
}

impl fmt::Display for EventWindow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "[round {}, ancient < {}, expired < {}, {:?}]",
            self.latest_consensus_round, self.ancient_threshold, self.expired_threshold, self.ancient_mode
        )
    }
}
