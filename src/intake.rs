//! Where received events go once a sync has read them.

use crate::event::BaseEvent;
use crate::NodeId;

use futures::Future;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
pub enum Error {
    /// Nothing is consuming received events any more.
    Closed,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// An event read from a peer, not yet validated or hashed.
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub sender: NodeId,
    pub event: BaseEvent,
}

pub trait EventIntake: Send + Sync {
    /// Hands one event over. May wait when the intake pipeline is saturated.
    fn handle_event(&self, event: ReceivedEvent) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Forwards received events over a bounded channel.
pub struct ChannelIntake {
    sender: mpsc::Sender<ReceivedEvent>,
}

impl ChannelIntake {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ReceivedEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (ChannelIntake { sender }, receiver)
    }
}

impl EventIntake for ChannelIntake {
    fn handle_event(&self, event: ReceivedEvent) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move { self.sender.send(event).await.map_err(|_| Error::Closed) })
    }
}

/// Number of events each peer has handed to intake that have not been processed yet.
#[derive(Default)]
pub struct IntakeEventCounter {
    counts: Mutex<HashMap<NodeId, Arc<AtomicUsize>>>,
}

impl IntakeEventCounter {
    fn counter(&self, peer: NodeId) -> Arc<AtomicUsize> {
        self.counts.lock().entry(peer).or_insert_with(|| Arc::new(AtomicUsize::new(0))).clone()
    }

    pub fn event_entered(&self, peer: NodeId) {
        let _ = self.counter(peer).fetch_add(1, Ordering::AcqRel);
    }

    pub fn event_exited(&self, peer: NodeId) {
        let counter = self.counter(peer);
        let _ = counter.fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
    }

    pub fn unprocessed_events(&self, peer: NodeId) -> usize {
        self.counts.lock().get(&peer).map_or(0, |c| c.load(Ordering::Acquire))
    }

    pub fn has_unprocessed_events(&self, peer: NodeId) -> bool {
        self.unprocessed_events(peer) > 0
    }
}
