//! The gossip sync protocol and the machinery around it.
//!
//! A sync runs in three parallel read/write phases over one [Connection]:
//!
//! 1. both sides send a request or acknowledgement byte, their event window and their tips;
//! 2. both sides tell the other which of its tips they already have;
//! 3. both sides send the events the other is missing, oldest first.
//!
//! [Connection]: crate::p2p::Connection

mod config;
pub mod constants;
mod fallen_behind;
mod filter;
mod metrics;
mod parallel;
mod sync_utils;
mod synchronizer;
mod throttle;


pub use config::SyncConfig;
pub use fallen_behind::{DefaultFallenBehindManager, FallenBehindManager, FallenBehindStatus};
pub use filter::{filter_likely_duplicates, self_ancestry};
pub use metrics::{SyncMetrics, SyncTiming};
pub use parallel::read_write_parallel;
pub use synchronizer::ShadowgraphSynchronizer;
pub use throttle::{SimultaneousSyncThrottle, SyncPermit};

use crate::channel;
use crate::intake;

use std::time::Duration;

/// How a sync that did not fail ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed { sent: usize, received: usize },
    /// The listener was busy and declined.
    Rejected,
    /// Our window does not overlap the peer's, we need to reconnect from a signed state.
    SelfFallenBehind,
    /// The peer's window does not overlap ours.
    PeerFallenBehind,
    /// One side stopped sending because it hit an event it must not transmit.
    /// `events_read` is negative when it was the peer that stopped.
    TransferAborted { sent: usize, events_read: i64 },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Completed { .. })
    }
}

#[derive(Debug)]
pub enum Error {
    Channel(channel::Error),
    /// The peer broke the protocol.
    Protocol(String),
    /// The event exchange ran past the maximum sync time.
    Timeout { limit: Duration },
    Intake(intake::Error),
    Join(String),
}

impl std::error::Error for Error {}

impl std::convert::From<channel::Error> for Error {
    fn from(error: channel::Error) -> Self {
        Error::Channel(error)
    }
}

impl std::convert::From<intake::Error> for Error {
    fn from(error: intake::Error) -> Self {
        Error::Intake(error)
    }
}

impl std::convert::From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Error::Join(format!("{}", error))
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
