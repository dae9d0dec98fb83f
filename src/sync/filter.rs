//! Trims send lists of events the peer is likely to receive from someone else anyway.

use crate::event::{AncientMode, Event};
use crate::event_window::EventWindow;
use crate::shadowgraph::Shadowgraph;
use crate::NodeId;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// For each creator, the highest ancient indicator among the non-ancient events reachable from
/// our latest self event, that event included.
pub fn self_ancestry(
    shadowgraph: &Shadowgraph,
    self_id: NodeId,
    window: &EventWindow,
) -> HashMap<NodeId, u64> {
    let mode = shadowgraph.ancient_mode();
    let mut ancestry = HashMap::default();
    let latest = shadowgraph
        .tips()
        .into_iter()
        .filter(|tip| tip.event().creator() == self_id)
        .max_by_key(|tip| tip.event().ancient_indicator(mode));
    let latest = match latest {
        Some(latest) => latest,
        None => return ancestry,
    };

    let ancestors = shadowgraph.find_ancestors(std::iter::once(&latest), |s| !window.is_ancient(s.event()));
    for event in ancestors.iter().map(|s| s.event()).chain(std::iter::once(latest.event())) {
        let indicator = event.ancient_indicator(mode);
        let highest = ancestry.entry(event.creator()).or_insert(indicator);
        if *highest < indicator {
            *highest = indicator;
        }
    }
    ancestry
}

/// Keeps an event if we created it, if it is an ancestor of our latest self event, or if we have
/// held it for longer than `threshold`.
pub fn filter_likely_duplicates(
    self_id: NodeId,
    mode: AncientMode,
    threshold: Duration,
    now: Instant,
    send_list: Vec<Arc<Event>>,
    ancestry: &HashMap<NodeId, u64>,
) -> Vec<Arc<Event>> {
    send_list
        .into_iter()
        .filter(|event| {
            if event.creator() == self_id {
                return true;
            }
            let is_ancestor = ancestry
                .get(&event.creator())
                .map_or(false, |highest| event.ancient_indicator(mode) <= *highest);
            is_ancestor || now.saturating_duration_since(event.time_received()) > threshold
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::event::emitter::build_event;
    use crate::event::Hash;

    struct Fixture {
        graph: Shadowgraph,
        a0: Arc<Event>,
        a1: Arc<Event>,
        b0: Arc<Event>,
        b1: Arc<Event>,
        c0: Arc<Event>,
    }

    /// Node 0 is the local node. Its latest event `a1` has `b0` as other parent.
    fn fixture() -> Fixture {
        let a0 = build_event(NodeId(0), None, None, 1);
        let b0 = build_event(NodeId(1), None, None, 1);
        let b1 = build_event(NodeId(1), Some(&b0), None, 1);
        let a1 = build_event(NodeId(0), Some(&a0), Some(&b0), 1);
        let c0 = build_event(NodeId(2), None, None, 1);
        let graph = Shadowgraph::new(AncientMode::Generation);
        for event in [&a0, &b0, &b1, &a1, &c0].iter() {
            graph.insert((*event).clone()).unwrap();
        }
        Fixture { graph, a0, a1, b0, b1, c0 }
    }

    fn hashes(events: &[Arc<Event>]) -> Vec<Hash> {
        events.iter().map(|e| e.hash()).collect()
    }

    #[test]
    fn test_self_ancestry() {
        let f = fixture();
        let window = EventWindow::genesis(AncientMode::Generation);
        let ancestry = self_ancestry(&f.graph, NodeId(0), &window);
        assert_eq!(ancestry.get(&NodeId(0)), Some(&f.a1.generation()));
        assert_eq!(ancestry.get(&NodeId(1)), Some(&f.b0.generation()));
        assert_eq!(ancestry.get(&NodeId(2)), None);

        assert!(self_ancestry(&f.graph, NodeId(7), &window).is_empty());
    }

    #[test]
    fn test_fresh_non_ancestors_are_held_back() {
        let f = fixture();
        let window = EventWindow::genesis(AncientMode::Generation);
        let ancestry = self_ancestry(&f.graph, NodeId(0), &window);
        let send_list = vec![f.a0.clone(), f.b0.clone(), f.b1.clone(), f.c0.clone(), f.a1.clone()];

        let kept = filter_likely_duplicates(
            NodeId(0),
            AncientMode::Generation,
            Duration::from_secs(3600),
            Instant::now(),
            send_list,
            &ancestry,
        );
        assert_eq!(hashes(&kept), hashes(&[f.a0.clone(), f.b0.clone(), f.a1.clone()]));
    }

    #[test]
    fn test_old_events_are_sent() {
        let f = fixture();
        let send_list = vec![f.b1.clone(), f.c0.clone()];
        let kept = filter_likely_duplicates(
            NodeId(0),
            AncientMode::Generation,
            Duration::from_secs(5),
            Instant::now() + Duration::from_secs(10),
            send_list,
            &HashMap::default(),
        );
        assert_eq!(kept.len(), 2);
    }
}
