use super::constants::*;
use super::fallen_behind::{FallenBehindManager, FallenBehindStatus};
use super::filter::{filter_likely_duplicates, self_ancestry};
use super::metrics::{SyncMetrics, SyncTiming};
use super::parallel::read_write_parallel;
use super::sync_utils::*;
use super::{Error, Result, SyncConfig, SyncOutcome};

use crate::event::Event;
use crate::event_window::EventWindow;
use crate::intake::{EventIntake, IntakeEventCounter};
use crate::p2p::Connection;
use crate::shadowgraph::{Shadow, Shadowgraph};
use crate::NodeId;

use colored::Colorize;
use tokio::sync::watch;
use tracing::{debug, error, info};

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Runs syncs between this node's shadowgraph and its peers.
#[derive(Clone)]
pub struct ShadowgraphSynchronizer {
    self_id: NodeId,
    shadowgraph: Arc<Shadowgraph>,
    intake: Arc<dyn EventIntake>,
    intake_counter: Arc<IntakeEventCounter>,
    fallen_behind: Arc<dyn FallenBehindManager>,
    metrics: Arc<SyncMetrics>,
    config: SyncConfig,
}

/// What the reserved part of a sync produced.
enum Negotiated {
    SendList(Vec<Arc<Event>>),
    Finished(SyncOutcome),
}

impl ShadowgraphSynchronizer {
    pub fn new(
        self_id: NodeId,
        shadowgraph: Arc<Shadowgraph>,
        intake: Arc<dyn EventIntake>,
        intake_counter: Arc<IntakeEventCounter>,
        fallen_behind: Arc<dyn FallenBehindManager>,
        config: SyncConfig,
    ) -> Self {
        ShadowgraphSynchronizer {
            self_id,
            shadowgraph,
            intake,
            intake_counter,
            fallen_behind,
            metrics: Arc::new(SyncMetrics::default()),
            config,
        }
    }

    pub fn metrics(&self) -> &Arc<SyncMetrics> {
        &self.metrics
    }

    pub fn shadowgraph(&self) -> &Arc<Shadowgraph> {
        &self.shadowgraph
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Runs one sync over `connection`. Both sides call this, the caller on an outbound
    /// connection and the listener on an inbound one.
    ///
    /// On error the connection has been disconnected and must not be reused.
    pub async fn synchronize(&self, connection: Arc<Connection>) -> Result<SyncOutcome> {
        let mut timing = SyncTiming::start();
        let result = self.run(&connection, &mut timing).await;
        match &result {
            Ok(outcome) => {
                self.metrics.record_outcome(outcome);
                timing.log(&connection.description());
                debug!("[{}] {} finished: {:?}", "sync".cyan(), connection.description(), outcome);
            }
            Err(err) => {
                connection.disconnect();
                self.metrics.record_failure();
                error!("[{}] {} failed: {}", "sync".cyan(), connection.description(), err);
            }
        }
        result
    }

    /// Turns down a sync request from a peer while the listener is busy.
    pub async fn reject_sync(&self, connection: Arc<Connection>) -> Result<()> {
        let write = {
            let connection = connection.clone();
            async move {
                connection.write_byte(SYNC_NACK).await?;
                connection.flush().await?;
                Ok::<(), Error>(())
            }
        };
        // The caller's opening is read in full so the stream is left clean.
        let read = async { read_their_tips_and_window(&connection).await.map(|_| ()) };
        let result = read_write_parallel(&connection, read, write).await.map(|_| ());
        if result.is_err() {
            connection.disconnect();
        }
        self.metrics.record_outcome(&SyncOutcome::Rejected);
        result
    }

    async fn run(&self, connection: &Arc<Connection>, timing: &mut SyncTiming) -> Result<SyncOutcome> {
        let send_list = match self.negotiate(connection, timing).await? {
            Negotiated::SendList(send_list) => send_list,
            Negotiated::Finished(outcome) => return Ok(outcome),
        };
        timing.mark();

        let deadline = tokio::time::Instant::from_std(timing.start_time() + self.config.max_sync_time());
        let (reading_done_tx, reading_done_rx) = watch::channel(false);
        let write = send_events(
            connection.clone(),
            send_list,
            self.config.keepalive_interval(),
            reading_done_rx,
        );
        let read = read_events(
            connection,
            self.intake.as_ref(),
            self.intake_counter.as_ref(),
            deadline,
            self.config.max_sync_time(),
            reading_done_tx,
        );
        let (events_read, (sent, write_aborted)) = read_write_parallel(connection, read, write).await?;
        timing.mark();

        if events_read < 0 || write_aborted {
            info!(
                "[{}] {} event transfer aborted, sent {}, read {}",
                "sync".cyan(),
                connection.description(),
                sent,
                events_read
            );
            return Ok(SyncOutcome::TransferAborted { sent, events_read });
        }
        Ok(SyncOutcome::Completed { sent, received: events_read as usize })
    }

    /// The phases that run while the event window is reserved: exchange tips, check for fallen
    /// behind, exchange booleans and build the send list.
    async fn negotiate(&self, connection: &Arc<Connection>, timing: &mut SyncTiming) -> Result<Negotiated> {
        let reserved = self.shadowgraph.reserve();
        let my_window = *reserved.window();
        let my_tips = self.shadowgraph.tips();
        timing.mark();

        // Phase 1: event windows and tips
        let write = write_my_tips_and_window(
            connection.clone(),
            my_window,
            my_tips.iter().map(|tip| tip.hash()).collect(),
        );
        let read = read_their_tips_and_window(connection);
        let (opening, ()) = read_write_parallel(connection, read, write).await?;
        let (their_window, their_tip_hashes) = match opening {
            Some(opening) => opening,
            None => {
                debug!("[{}] {} was rejected", "sync".cyan(), connection.description());
                return Ok(Negotiated::Finished(SyncOutcome::Rejected));
            }
        };
        timing.mark();

        match FallenBehindStatus::of(&my_window, &their_window) {
            FallenBehindStatus::None => self.fallen_behind.clear_report(connection.peer_id()),
            FallenBehindStatus::SelfFallenBehind => {
                info!(
                    "[{}] {} we have fallen behind, ours {}, theirs {}",
                    "sync".cyan(),
                    connection.description(),
                    my_window,
                    their_window
                );
                self.fallen_behind.report_fallen_behind(connection.peer_id());
                return Ok(Negotiated::Finished(SyncOutcome::SelfFallenBehind));
            }
            FallenBehindStatus::OtherFallenBehind => {
                info!(
                    "[{}] {} peer has fallen behind, ours {}, theirs {}",
                    "sync".cyan(),
                    connection.description(),
                    my_window,
                    their_window
                );
                return Ok(Negotiated::Finished(SyncOutcome::PeerFallenBehind));
            }
        }

        // Phase 2: which tips each side already has
        let their_tips = self.shadowgraph.shadows(&their_tip_hashes);
        let i_have_their_tips: Vec<bool> = their_tips.iter().map(Option::is_some).collect();
        let write = write_booleans(connection.clone(), i_have_their_tips);
        let read = read_their_knowledge_of_my_tips(connection, my_tips.len());
        let (they_have_my_tips, ()) = read_write_parallel(connection, read, write).await?;
        timing.mark();

        let mut known: HashSet<Shadow> = their_tips.into_iter().flatten().collect();
        for (tip, they_have) in my_tips.into_iter().zip(they_have_my_tips) {
            if they_have {
                let _ = known.insert(tip);
            }
        }

        let send_list = self.build_send_list(known, &my_window, &their_window);
        drop(reserved);
        Ok(Negotiated::SendList(send_list))
    }

    /// Everything reachable from our current tips that the peer neither knows nor can reach
    /// from what it knows, excluding events either side considers ancient.
    fn build_send_list(
        &self,
        mut known: HashSet<Shadow>,
        my_window: &EventWindow,
        their_window: &EventWindow,
    ) -> Vec<Arc<Event>> {
        let known_ancestors = self
            .shadowgraph
            .find_ancestors(known.iter(), |s| unknown_non_ancient(&known, s, my_window, their_window));
        known.extend(known_ancestors);

        // Tips may have changed since the start of the sync.
        let unknown_tips: Vec<Shadow> = self
            .shadowgraph
            .tips()
            .into_iter()
            .filter(|tip| unknown_non_ancient(&known, tip, my_window, their_window))
            .collect();
        let mut send_set = self
            .shadowgraph
            .find_ancestors(unknown_tips.iter(), |s| unknown_non_ancient(&known, s, my_window, their_window));
        send_set.extend(unknown_tips);

        let mode = self.shadowgraph.ancient_mode();
        let mut send_list: Vec<Arc<Event>> = send_set.into_iter().map(|s| s.event().clone()).collect();
        sort_for_sending(&mut send_list, mode);

        if self.config.filter_likely_duplicates {
            let ancestry = self_ancestry(&self.shadowgraph, self.self_id, my_window);
            send_list = filter_likely_duplicates(
                self.self_id,
                mode,
                self.config.non_ancestor_filter_threshold(),
                Instant::now(),
                send_list,
                &ancestry,
            );
        }
        if self.config.max_events_per_sync > 0 && send_list.len() > self.config.max_events_per_sync {
            send_list.truncate(self.config.max_events_per_sync);
        }
        send_list
    }
}

impl std::fmt::Debug for ShadowgraphSynchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "ShadowgraphSynchronizer({})", self.self_id)
    }
}

