#[cfg(feature = "integration_tests")]
mod integration_test {
    use crate::event::emitter::EventEmitter;
    use crate::event::AncientMode;
    use crate::intake::{ChannelIntake, IntakeEventCounter};
    use crate::p2p::connector;
    use crate::server::node::{self, consume_intake};
    use crate::server::{Overrides, Server, Settings};
    use crate::shadowgraph::Shadowgraph;
    use crate::sync::{
        DefaultFallenBehindManager, ShadowgraphSynchronizer, SimultaneousSyncThrottle, SyncConfig,
        SyncOutcome,
    };
    use crate::{NodeId, Result};

    use tokio::time::{sleep, Duration, Instant};
    use tracing::info;

    use std::collections::HashSet;
    use std::sync::Arc;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_level(false)
            .with_target(true)
            .with_max_level(tracing::Level::DEBUG)
            .try_init();
    }

    fn synchronizer(
        id: NodeId,
        graph: Arc<Shadowgraph>,
        intake: ChannelIntake,
        counter: Arc<IntakeEventCounter>,
    ) -> ShadowgraphSynchronizer {
        ShadowgraphSynchronizer::new(
            id,
            graph,
            Arc::new(intake),
            counter,
            Arc::new(DefaultFallenBehindManager::new(1, 0.5)),
            SyncConfig { keepalive_interval_ms: 50, ..SyncConfig::default() },
        )
    }

    /// One outbound sync over TCP brings an empty listener up to date.
    #[actix_rt::test]
    async fn run_tcp_sync_test() -> Result<()> {
        init_tracing();
        let mut emitter = EventEmitter::new(1, 4);
        let events = emitter.emit_events(500);

        let caller_graph = Arc::new(Shadowgraph::new(AncientMode::Generation));
        for event in events.iter() {
            caller_graph.insert(event.clone())?;
        }
        let (caller_intake, _caller_received) = ChannelIntake::new(1024);
        let caller_counter = Arc::new(IntakeEventCounter::default());
        let caller = synchronizer(NodeId(0), caller_graph, caller_intake, caller_counter);

        let listener_graph = Arc::new(Shadowgraph::new(AncientMode::Generation));
        let listener_counter = Arc::new(IntakeEventCounter::default());
        let (listener_intake, listener_received) = ChannelIntake::new(1024);
        let listener =
            synchronizer(NodeId(1), listener_graph.clone(), listener_intake, listener_counter.clone());
        let _ = actix::spawn(consume_intake(listener_graph.clone(), listener_counter, listener_received));

        let throttle = Arc::new(SimultaneousSyncThrottle::new(2));
        let ip = "127.0.0.1:0".parse().unwrap();
        let server = Server::bind(NodeId(1), ip, listener, throttle.clone()).await?;
        let address = server.local_addr()?;
        let _ = actix::spawn(server.listen());

        let connection = connector::connect(NodeId(0), NodeId(1), address, Duration::from_secs(5)).await?;
        let outcome = caller.synchronize(Arc::new(connection)).await?;
        assert_eq!(outcome, SyncOutcome::Completed { sent: 500, received: 0 });

        let deadline = Instant::now() + Duration::from_secs(5);
        while listener_graph.len() < events.len() && Instant::now() < deadline {
            sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(listener_graph.len(), events.len());
        assert!(events.iter().all(|e| listener_graph.is_hash_in_graph(&e.hash())));
        throttle.wait_for_all_syncs_to_finish().await;
        Ok(())
    }

    /// Three nodes creating and gossiping events end up with each other's events.
    #[actix_rt::test]
    async fn run_gossip_network_test() -> Result<()> {
        init_tracing();
        let addresses = ["127.0.0.1:23451", "127.0.0.1:23452", "127.0.0.1:23453"];
        let mut nodes = vec![];
        for (i, address) in addresses.iter().enumerate() {
            let peers = addresses
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(j, peer)| format!("{}@{}", j, peer))
                .collect();
            let overrides = Overrides {
                node_id: Some(i.to_string()),
                listener_ip: Some(address.to_string()),
                peers,
            };
            let mut settings = Settings::new(None, overrides)?;
            settings.event_creation_interval_ms = 50;
            settings.sync_interval_ms = 50;
            nodes.push(node::run(settings).await?);
        }

        sleep(Duration::from_secs(3)).await;

        for node in nodes.iter() {
            let creators: HashSet<NodeId> =
                node.shadowgraph.tips().iter().map(|t| t.event().creator()).collect();
            info!("{} knows {} events from {:?}", node.id, node.shadowgraph.len(), creators);
            assert_eq!(creators.len(), addresses.len());
            assert!(node.metrics.completed() > 0);
        }
        for node in nodes.iter() {
            node.shutdown().await;
        }
        Ok(())
    }
}
