use crate::intake::IntakeEventCounter;
use crate::p2p::connector;
use crate::sync::{FallenBehindManager, ShadowgraphSynchronizer, SimultaneousSyncThrottle};
use crate::NodeId;

use actix::{Actor, ActorContext, AsyncContext, Context, Handler};
use actix_derive::Message;
use colored::Colorize;
use rand::seq::SliceRandom;
use tracing::{debug, trace, warn};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

/// Periodically starts an outbound sync with one of the known peers.
pub struct Gossiper {
    self_id: NodeId,
    peers: Vec<(NodeId, SocketAddr)>,
    synchronizer: ShadowgraphSynchronizer,
    throttle: Arc<SimultaneousSyncThrottle>,
    intake_counter: Arc<IntakeEventCounter>,
    fallen_behind: Arc<dyn FallenBehindManager>,
    interval: Duration,
}

impl Gossiper {
    pub fn new(
        self_id: NodeId,
        peers: Vec<(NodeId, SocketAddr)>,
        synchronizer: ShadowgraphSynchronizer,
        throttle: Arc<SimultaneousSyncThrottle>,
        intake_counter: Arc<IntakeEventCounter>,
        fallen_behind: Arc<dyn FallenBehindManager>,
        interval: Duration,
    ) -> Self {
        Gossiper { self_id, peers, synchronizer, throttle, intake_counter, fallen_behind, interval }
    }

    /// Peers whose previously received events have all been processed.
    fn candidates(&self) -> Vec<(NodeId, SocketAddr)> {
        self.peers
            .iter()
            .filter(|(id, _)| !self.intake_counter.has_unprocessed_events(*id))
            .cloned()
            .collect()
    }
}

impl Actor for Gossiper {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Context<Self>) {
        debug!("[{}] {} gossiping with {} peers", "gossip".blue(), self.self_id, self.peers.len());
        let _ = ctx.run_interval(self.interval, |_actor, ctx| ctx.notify(Gossip));
    }

    fn stopped(&mut self, _ctx: &mut Context<Self>) {
        debug!("[{}] stopped", "gossip".blue());
    }
}

/// Starts one outbound sync, if a peer is available.
#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Gossip;

impl Handler<Gossip> for Gossiper {
    type Result = ();

    fn handle(&mut self, _msg: Gossip, _ctx: &mut Context<Self>) -> Self::Result {
        if self.fallen_behind.has_fallen_behind() {
            warn!("[{}] {} has fallen behind its peers", "gossip".blue(), self.self_id);
            return;
        }
        let candidates = self.candidates();
        let (peer_id, address) = match candidates.choose(&mut rand::thread_rng()) {
            Some(peer) => *peer,
            None => return,
        };
        let permit = match self.throttle.try_sync(peer_id, true) {
            Some(permit) => permit,
            None => {
                trace!("[{}] already syncing with {}", "gossip".blue(), peer_id);
                return;
            }
        };

        // Not tied to the actor, so stopping the gossiper lets a running sync finish.
        let self_id = self.self_id;
        let synchronizer = self.synchronizer.clone();
        let _ = actix::spawn(async move {
            let read_timeout = synchronizer.config().read_timeout();
            match connector::connect(self_id, peer_id, address, read_timeout).await {
                Ok(connection) => {
                    let _ = synchronizer.synchronize(Arc::new(connection)).await;
                }
                Err(err) => {
                    debug!("[{}] could not reach {} at {}: {}", "gossip".blue(), peer_id, address, err)
                }
            }
            drop(permit);
        });
    }
}

#[derive(Debug, Clone, Message)]
#[rtype(result = "()")]
pub struct Stop;

impl Handler<Stop> for Gossiper {
    type Result = ();

    fn handle(&mut self, _msg: Stop, ctx: &mut Context<Self>) -> Self::Result {
        ctx.stop()
    }
}
