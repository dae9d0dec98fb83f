use crate::p2p::connector;
use crate::sync::{ShadowgraphSynchronizer, SimultaneousSyncThrottle};
use crate::{NodeId, Result};

use colored::Colorize;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use std::net::SocketAddr;
use std::sync::Arc;

/// Accepts inbound syncs.
pub struct Server {
    self_id: NodeId,
    listener: TcpListener,
    synchronizer: ShadowgraphSynchronizer,
    throttle: Arc<SimultaneousSyncThrottle>,
}

impl Server {
    pub async fn bind(
        self_id: NodeId,
        ip: SocketAddr,
        synchronizer: ShadowgraphSynchronizer,
        throttle: Arc<SimultaneousSyncThrottle>,
    ) -> Result<Server> {
        let listener = TcpListener::bind(ip).await?;
        Ok(Server { self_id, listener, synchronizer, throttle })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    pub async fn listen(self) -> Result<()> {
        info!("[{}] {} listening on {}", "server".magenta(), self.self_id, self.local_addr()?);
        let read_timeout = self.synchronizer.config().read_timeout();
        loop {
            let connection = match connector::accept(&self.listener, self.self_id, read_timeout).await {
                Ok(connection) => Arc::new(connection),
                Err(err) => {
                    error!("[{}] failed to accept connection: {}", "server".magenta(), err);
                    continue;
                }
            };
            let synchronizer = self.synchronizer.clone();
            let throttle = self.throttle.clone();
            tokio::spawn(async move {
                match throttle.try_sync(connection.peer_id(), false) {
                    Some(permit) => {
                        let _ = synchronizer.synchronize(connection).await;
                        drop(permit);
                    }
                    None => {
                        debug!("[{}] rejecting sync from {}", "server".magenta(), connection.peer_id());
                        if let Err(err) = synchronizer.reject_sync(connection).await {
                            debug!("[{}] rejection failed: {}", "server".magenta(), err);
                        }
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::AncientMode;
    use crate::intake::{ChannelIntake, IntakeEventCounter};
    use crate::shadowgraph::Shadowgraph;
    use crate::sync::{DefaultFallenBehindManager, SyncConfig, SyncOutcome};
    use tokio::time::Duration;

    fn synchronizer(id: NodeId) -> ShadowgraphSynchronizer {
        let (intake, _) = ChannelIntake::new(16);
        ShadowgraphSynchronizer::new(
            id,
            Arc::new(Shadowgraph::new(AncientMode::Generation)),
            Arc::new(intake),
            Arc::new(IntakeEventCounter::default()),
            Arc::new(DefaultFallenBehindManager::new(1, 0.5)),
            SyncConfig { keepalive_interval_ms: 20, ..SyncConfig::default() },
        )
    }

    #[actix_rt::test]
    async fn test_busy_peer_is_rejected() {
        let throttle = Arc::new(SimultaneousSyncThrottle::new(2));
        let ip = "127.0.0.1:0".parse().unwrap();
        let server =
            Server::bind(NodeId(1), ip, synchronizer(NodeId(1)), throttle.clone()).await.unwrap();
        let address = server.local_addr().unwrap();
        let _ = tokio::spawn(server.listen());
        let caller = synchronizer(NodeId(0));
        let timeout = Duration::from_secs(2);

        let connection = connector::connect(NodeId(0), NodeId(1), address, timeout).await.unwrap();
        let outcome = caller.synchronize(Arc::new(connection)).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Completed { sent: 0, received: 0 });

        // The listener is already syncing with node0 in the other direction.
        throttle.wait_for_all_syncs_to_finish().await;
        let held = throttle.try_sync(NodeId(0), true).unwrap();
        let connection = connector::connect(NodeId(0), NodeId(1), address, timeout).await.unwrap();
        let outcome = caller.synchronize(Arc::new(connection)).await.unwrap();
        assert_eq!(outcome, SyncOutcome::Rejected);
        drop(held);
    }
}
