use super::gossiper::{Gossiper, Stop};
use super::server::Server;
use super::settings::Settings;
use crate::event::emitter::build_event;
use crate::event::{AncientMode, Event};
use crate::event_window::EventWindow;
use crate::intake::{ChannelIntake, IntakeEventCounter, ReceivedEvent};
use crate::shadowgraph::{Error as ShadowgraphError, InsertableStatus, Shadowgraph};
use crate::sync::{DefaultFallenBehindManager, ShadowgraphSynchronizer, SimultaneousSyncThrottle, SyncMetrics};
use crate::util;
use crate::{NodeId, Result};

use actix::{Actor, Addr};
use colored::Colorize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Capacity of the queue between syncs and the shadowgraph.
const INTAKE_CAPACITY: usize = 1024;

/// A running node, returned by [run].
pub struct Node {
    pub id: NodeId,
    pub address: SocketAddr,
    pub shadowgraph: Arc<Shadowgraph>,
    pub throttle: Arc<SimultaneousSyncThrottle>,
    pub metrics: Arc<SyncMetrics>,
    pub gossiper: Addr<Gossiper>,
}

impl Node {
    /// Stops starting new syncs and waits for the ones in progress.
    pub async fn shutdown(&self) {
        // Once `Stop` is handled no outbound sync can take a new permit.
        if let Err(err) = self.gossiper.send(Stop).await {
            debug!("[{}] gossiper already stopped: {}", "node".bright_blue(), err);
        }
        self.throttle.wait_for_all_syncs_to_finish().await;
        info!(
            "[{}] {} stopped with {} events, {} syncs completed",
            "node".bright_blue(),
            self.id,
            self.shadowgraph.len(),
            self.metrics.completed()
        );
    }
}

/// Starts the listener, the gossiper, the intake consumer and the event creator.
///
/// Must be called from within an actix system.
pub async fn run(settings: Settings) -> Result<Node> {
    let self_id = settings.node_id;
    let listener_ip: SocketAddr = settings.listener_ip.parse().map_err(|_| crate::Error::PeerParseError)?;
    let peers = settings
        .peers
        .iter()
        .map(|p| util::parse_id_and_ip(p))
        .collect::<Result<Vec<(NodeId, SocketAddr)>>>()?;

    info!("[{}] {} is starting", "node".bright_blue(), self_id);

    let shadowgraph = Arc::new(Shadowgraph::new(settings.ancient_mode));
    let (intake, received) = ChannelIntake::new(INTAKE_CAPACITY);
    let intake_counter = Arc::new(IntakeEventCounter::default());
    let fallen_behind =
        Arc::new(DefaultFallenBehindManager::new(peers.len(), settings.fallen_behind_threshold));
    let throttle = Arc::new(SimultaneousSyncThrottle::new(settings.sync.max_inbound_syncs));
    let synchronizer = ShadowgraphSynchronizer::new(
        self_id,
        shadowgraph.clone(),
        Arc::new(intake),
        intake_counter.clone(),
        fallen_behind.clone(),
        settings.sync.clone(),
    );

    let server = Server::bind(self_id, listener_ip, synchronizer.clone(), throttle.clone()).await?;
    let address = server.local_addr()?;
    let _ = actix::spawn(async move {
        if let Err(err) = server.listen().await {
            warn!("[{}] listener stopped: {}", "node".bright_blue(), err);
        }
    });

    let _ = actix::spawn(consume_intake(shadowgraph.clone(), intake_counter.clone(), received));
    let _ = actix::spawn(create_events(self_id, shadowgraph.clone(), settings.event_creation_interval()));
    let _ = actix::spawn(drive_event_window(
        shadowgraph.clone(),
        settings.window_update_interval(),
        settings.non_ancient_span,
        settings.expired_span,
    ));

    let gossiper = Gossiper::new(
        self_id,
        peers,
        synchronizer.clone(),
        throttle.clone(),
        intake_counter,
        fallen_behind,
        settings.sync_interval(),
    )
    .start();

    Ok(Node {
        id: self_id,
        address,
        shadowgraph,
        throttle,
        metrics: synchronizer.metrics().clone(),
        gossiper,
    })
}

/// Inserts received events into the shadowgraph.
///
/// The hash is recomputed locally, what the peer claims is never trusted.
pub async fn consume_intake(
    shadowgraph: Arc<Shadowgraph>,
    intake_counter: Arc<IntakeEventCounter>,
    mut received: mpsc::Receiver<ReceivedEvent>,
) {
    while let Some(ReceivedEvent { sender, event }) = received.recv().await {
        let event = Arc::new(Event::new(event));
        match shadowgraph.insert(event.clone()) {
            Ok(()) => debug!("[{}] inserted {} from {}", "node".bright_blue(), event, sender),
            Err(ShadowgraphError::Insertion { status: InsertableStatus::DuplicateShadowEvent, .. }) => {
                debug!("[{}] duplicate {} from {}", "node".bright_blue(), event, sender)
            }
            Err(err) => warn!("[{}] dropped event from {}: {}", "node".bright_blue(), sender, err),
        }
        intake_counter.event_exited(sender);
    }
}

/// Creates an event on top of our latest one and a random other tip, at a fixed rate.
pub async fn create_events(self_id: NodeId, shadowgraph: Arc<Shadowgraph>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        let _ = ticker.tick().await;
        let event = next_event(self_id, &shadowgraph);
        if let Err(err) = shadowgraph.insert(event) {
            warn!("[{}] could not insert own event: {}", "node".bright_blue(), err);
        }
    }
}

/// Periodically moves the event window up behind the newest events, expiring what falls out.
pub async fn drive_event_window(
    shadowgraph: Arc<Shadowgraph>,
    interval: Duration,
    non_ancient_span: u64,
    expired_span: u64,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        let _ = ticker.tick().await;
        if advance_event_window(&shadowgraph, non_ancient_span, expired_span) {
            debug!("[{}] event window is now {}", "node".bright_blue(), shadowgraph.event_window());
        }
    }
}

/// Derives the window from the highest indicator among the tips and applies it if it moves
/// either threshold forward. Returns whether the window changed.
pub fn advance_event_window(shadowgraph: &Shadowgraph, non_ancient_span: u64, expired_span: u64) -> bool {
    let mode = shadowgraph.ancient_mode();
    let latest = match shadowgraph.tips().iter().map(|tip| tip.event().ancient_indicator(mode)).max() {
        Some(latest) => latest,
        None => return false,
    };
    let first = mode.first_indicator();
    let ancient = latest.saturating_sub(non_ancient_span).max(first);
    let expired = latest.saturating_sub(expired_span).max(first).min(ancient);
    let window = EventWindow::new(latest, ancient, expired, mode);

    let current = shadowgraph.event_window();
    let (ancient_now, expired_now) = (current.ancient_threshold(), current.expired_threshold());
    if ancient < ancient_now || expired < expired_now || (ancient, expired) == (ancient_now, expired_now) {
        return false;
    }
    shadowgraph.update_event_window(window);
    true
}

fn next_event(self_id: NodeId, shadowgraph: &Shadowgraph) -> Arc<Event> {
    use rand::seq::SliceRandom;

    let tips = shadowgraph.tips();
    let self_parent = tips.iter().find(|tip| tip.event().creator() == self_id).map(|tip| tip.event().clone());
    let others: Vec<Arc<Event>> =
        tips.iter().filter(|tip| tip.event().creator() != self_id).map(|tip| tip.event().clone()).collect();
    let other_parent = others.choose(&mut rand::thread_rng()).cloned();

    let birth_round = self_parent
        .iter()
        .chain(other_parent.iter())
        .map(|parent| parent.birth_round())
        .max()
        .unwrap_or_else(|| AncientMode::BirthRound.first_indicator());
    build_event(self_id, self_parent.as_deref(), other_parent.as_deref(), birth_round)
}
