use super::*;
use crate::event::emitter::{build_event, EventEmitter};
use crate::event::{AncientMode, Event, Hash};
use crate::event_window::EventWindow;
use crate::NodeId;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn generation_window(threshold: u64) -> EventWindow {
    EventWindow::new(threshold, threshold, threshold, AncientMode::Generation)
}

fn populated(seed: u64, creators: u64, n: usize) -> (Shadowgraph, Vec<Arc<Event>>) {
    let graph = Shadowgraph::new(AncientMode::Generation);
    let mut emitter = EventEmitter::new(seed, creators);
    let events = emitter.emit_events(n);
    for event in events.iter() {
        graph.insert(event.clone()).unwrap();
    }
    (graph, events)
}

fn tip_hashes(graph: &Shadowgraph) -> HashSet<Hash> {
    graph.tips().iter().map(|s| s.hash()).collect()
}

/// Hashes reachable from `start` through parent references, among the given events.
fn reachable(start: &Event, events: &[Arc<Event>]) -> HashSet<Hash> {
    let by_hash: HashMap<Hash, &Arc<Event>> = events.iter().map(|e| (e.hash(), e)).collect();
    let mut seen = HashSet::new();
    let mut stack = vec![start.hash()];
    while let Some(hash) = stack.pop() {
        let event = match by_hash.get(&hash) {
            Some(e) => e,
            None => continue,
        };
        for parent in event.self_parent().into_iter().chain(event.other_parent()) {
            if by_hash.contains_key(&parent.hash) && seen.insert(parent.hash) {
                stack.push(parent.hash);
            }
        }
    }
    seen
}

#[test]
fn test_self_child_replaces_parent_as_tip() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    let a = build_event(NodeId(0), None, None, 1);
    let b = build_event(NodeId(0), Some(&a), None, 1);

    graph.insert(a.clone()).unwrap();
    assert_eq!(tip_hashes(&graph), vec![a.hash()].into_iter().collect());

    graph.insert(b.clone()).unwrap();
    assert_eq!(tip_hashes(&graph), vec![b.hash()].into_iter().collect());
    assert!(graph.shadow(&a.hash()).is_some());
    assert!(graph.is_hash_in_graph(&a.hash()));
}

#[test]
fn test_tips_are_latest_event_of_each_creator() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    let mut emitter = EventEmitter::new(11, 5);
    for _ in 0..300 {
        graph.insert(emitter.emit()).unwrap();
        let expected: HashSet<Hash> = emitter
            .creators()
            .iter()
            .filter_map(|c| emitter.latest(c))
            .map(|e| e.hash())
            .collect();
        assert_eq!(tip_hashes(&graph), expected);
    }
}

#[test]
fn test_other_child_does_not_remove_tip() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    let a = build_event(NodeId(0), None, None, 1);
    let b = build_event(NodeId(1), None, Some(&a), 1);
    graph.insert(a.clone()).unwrap();
    graph.insert(b.clone()).unwrap();
    assert_eq!(tip_hashes(&graph), vec![a.hash(), b.hash()].into_iter().collect());
}

#[test]
fn test_duplicate_insert_changes_nothing() {
    let (graph, events) = populated(3, 4, 50);
    let tips_before = tip_hashes(&graph);
    let len_before = graph.len();

    let err = graph.insert(events[10].clone()).unwrap_err();
    assert_eq!(err.status(), Some(InsertableStatus::DuplicateShadowEvent));
    assert_eq!(graph.insertable_status(Some(events[10].as_ref())), InsertableStatus::DuplicateShadowEvent);
    assert_eq!(tip_hashes(&graph), tips_before);
    assert_eq!(graph.len(), len_before);
}

#[test]
fn test_null_event_status() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    assert_eq!(graph.insertable_status(None), InsertableStatus::NullEvent);
}

#[test]
fn test_missing_parent_still_inserted() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    let a = build_event(NodeId(0), None, None, 1);
    let b = build_event(NodeId(0), Some(&a), None, 1);

    graph.insert(b.clone()).unwrap();
    assert!(graph.is_hash_in_graph(&b.hash()));
    assert_eq!(tip_hashes(&graph), vec![b.hash()].into_iter().collect());
    let ancestors = graph.find_ancestors(graph.tips().iter(), |_| true);
    assert!(ancestors.is_empty());
}

#[test]
fn test_find_ancestors_is_reachability() {
    let (graph, events) = populated(5, 4, 120);
    for event in events.iter().step_by(7) {
        let start = graph.shadow(&event.hash()).unwrap();
        let found: HashSet<Hash> =
            graph.find_ancestors(vec![&start], |_| true).iter().map(|s| s.hash()).collect();
        assert!(!found.contains(&event.hash()));
        assert_eq!(found, reachable(event, &events));
    }
}

#[test]
fn test_find_ancestors_respects_predicate() {
    let (graph, events) = populated(9, 3, 90);
    let last = graph.shadow(&events[89].hash()).unwrap();
    let floor = events[89].generation() / 2;

    let found = graph.find_ancestors(vec![&last], |s| s.event().generation() >= floor);
    assert!(!found.is_empty());
    assert!(found.iter().all(|s| s.event().generation() >= floor));

    let closure = reachable(&events[89], &events);
    assert!(found.iter().all(|s| closure.contains(&s.hash())));

    // Direct parents above the floor are always found.
    let direct = events[89].self_parent().into_iter().chain(events[89].other_parent());
    for parent in direct.filter(|p| p.generation >= floor) {
        assert!(found.iter().any(|s| s.hash() == parent.hash));
    }
}

#[test]
fn test_find_ancestors_excludes_start_vertices() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    let a = build_event(NodeId(0), None, None, 1);
    let b = build_event(NodeId(0), Some(&a), None, 1);
    let c = build_event(NodeId(1), None, Some(&b), 1);
    for event in [&a, &b, &c].iter() {
        graph.insert((*event).clone()).unwrap();
    }
    let b_shadow = graph.shadow(&b.hash()).unwrap();
    let c_shadow = graph.shadow(&c.hash()).unwrap();

    let found: HashSet<Hash> =
        graph.find_ancestors(vec![&c_shadow, &b_shadow], |_| true).iter().map(|s| s.hash()).collect();
    assert_eq!(found, vec![a.hash()].into_iter().collect());
}

#[test]
fn test_shadows_keeps_order() {
    let (graph, events) = populated(1, 3, 10);
    let unknown = Hash([7; 32]);
    let looked_up = graph.shadows(&[events[2].hash(), unknown, events[0].hash()]);
    assert_eq!(looked_up.len(), 3);
    assert_eq!(looked_up[0].as_ref().map(|s| s.hash()), Some(events[2].hash()));
    assert!(looked_up[1].is_none());
    assert_eq!(looked_up[2].as_ref().map(|s| s.hash()), Some(events[0].hash()));
    assert!(graph.event(&unknown).is_none());
}

#[test]
fn test_expire_below_window() {
    let (graph, events) = populated(21, 4, 100);
    graph.update_event_window(generation_window(10));

    for event in events.iter() {
        assert_eq!(graph.is_hash_in_graph(&event.hash()), event.generation() >= 10);
    }
    assert!(graph.tips().iter().all(|s| s.event().generation() >= 10));
    assert_eq!(graph.oldest_unexpired_indicator(), 10);

    let expired = events.iter().find(|e| e.generation() < 10).unwrap();
    let err = graph.insert(expired.clone()).unwrap_err();
    assert_eq!(err.status(), Some(InsertableStatus::ExpiredEvent));
}

#[test]
fn test_reservation_holds_expiry() {
    let (graph, events) = populated(4, 4, 100);
    graph.update_event_window(generation_window(5));

    let reserved = graph.reserve();
    assert_eq!(reserved.reserved_indicator(), 5);
    assert_eq!(reserved.window().expired_threshold(), 5);

    graph.update_event_window(generation_window(10));
    for event in events.iter() {
        assert_eq!(graph.is_hash_in_graph(&event.hash()), event.generation() >= 5);
    }
    assert_eq!(graph.event_window().expired_threshold(), 10);

    drop(reserved);
    graph.update_event_window(generation_window(10));
    for event in events.iter() {
        assert_eq!(graph.is_hash_in_graph(&event.hash()), event.generation() >= 10);
    }
    assert_eq!(graph.reservation_count(), 0);
}

#[test]
fn test_reservations_share_threshold() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    let first = graph.reserve();
    let second = graph.reserve();
    assert_eq!(graph.reservation_count(), 1);
    assert_eq!(first.reservation_count(), 2);

    graph.update_event_window(generation_window(3));
    let third = graph.reserve();
    assert_eq!(graph.reservation_count(), 2);
    assert_eq!(third.reserved_indicator(), 3);
    assert_eq!(third.reservation_count(), 1);

    drop(first);
    assert_eq!(second.reservation_count(), 1);
}

#[test]
fn test_oldest_live_reservation_sets_floor() {
    let (graph, events) = populated(8, 4, 120);
    graph.update_event_window(generation_window(4));
    let low = graph.reserve();
    graph.update_event_window(generation_window(8));
    let high = graph.reserve();

    drop(high);
    graph.update_event_window(generation_window(12));
    for event in events.iter() {
        assert_eq!(graph.is_hash_in_graph(&event.hash()), event.generation() >= 4);
    }

    drop(low);
    graph.update_event_window(generation_window(12));
    for event in events.iter() {
        assert_eq!(graph.is_hash_in_graph(&event.hash()), event.generation() >= 12);
    }
}

#[test]
fn test_released_newest_reservation_is_kept() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    graph.update_event_window(generation_window(6));
    drop(graph.reserve());
    graph.update_event_window(generation_window(6));
    assert_eq!(graph.reservation_count(), 1);

    // Reserving again reuses the released reservation.
    let again = graph.reserve();
    assert_eq!(again.reservation_count(), 1);
    assert_eq!(graph.reservation_count(), 1);
}

#[test]
fn test_window_never_regresses() {
    let (graph, _) = populated(12, 4, 80);
    graph.update_event_window(generation_window(10));
    let len = graph.len();
    let tips = tip_hashes(&graph);

    graph.update_event_window(generation_window(5));
    assert_eq!(graph.event_window().expired_threshold(), 10);
    assert_eq!(graph.len(), len);
    assert_eq!(tip_hashes(&graph), tips);
}

#[test]
fn test_expiry_by_birth_round() {
    let graph = Shadowgraph::new(AncientMode::BirthRound);
    let mut emitter = EventEmitter::new(2, 4);
    let events = emitter.emit_events(40);
    for event in events.iter() {
        graph.insert(event.clone()).unwrap();
    }
    graph.update_event_window(EventWindow::new(5, 4, 4, AncientMode::BirthRound));
    for event in events.iter() {
        assert_eq!(graph.is_hash_in_graph(&event.hash()), event.birth_round() >= 4);
    }
}

#[test]
fn test_clear_resets_to_genesis() {
    let (graph, events) = populated(13, 4, 60);
    graph.update_event_window(generation_window(7));
    let _held = graph.reserve();

    graph.clear();
    assert!(graph.is_empty());
    assert!(graph.tips().is_empty());
    assert_eq!(graph.event_window(), EventWindow::genesis(AncientMode::Generation));
    assert_eq!(graph.reservation_count(), 0);
    assert_eq!(graph.oldest_unexpired_indicator(), 0);

    // Previously expired events can be inserted again.
    for event in events.iter() {
        graph.insert(event.clone()).unwrap();
    }
    assert_eq!(graph.len(), events.len());
}

#[test]
fn test_init_from_events() {
    let graph = Shadowgraph::new(AncientMode::Generation);
    assert!(matches!(
        graph.init_from_events(vec![], generation_window(3)),
        Err(Error::EmptyEventList)
    ));

    let mut emitter = EventEmitter::new(17, 4);
    let events = emitter.emit_events(60);
    let window = generation_window(6);
    graph.init_from_events(events.clone(), window).unwrap();

    assert_eq!(graph.event_window(), window);
    for event in events.iter() {
        assert_eq!(graph.is_hash_in_graph(&event.hash()), event.generation() >= 6);
    }
}

#[test]
fn test_concurrent_search_and_expiry() {
    let (graph, _) = populated(30, 6, 600);
    let graph = Arc::new(graph);

    let searcher = {
        let graph = graph.clone();
        std::thread::spawn(move || {
            for _ in 0..50 {
                let reserved = graph.reserve();
                let threshold = reserved.reserved_indicator();
                let tips = graph.tips();
                let ancestors = graph.find_ancestors(tips.iter(), |_| true);
                // Everything at or above the reserved threshold must still resolve.
                for shadow in ancestors.iter() {
                    if shadow.event().generation() >= threshold {
                        assert!(graph.is_hash_in_graph(&shadow.hash()));
                    }
                }
            }
        })
    };

    for threshold in 1..60 {
        graph.update_event_window(generation_window(threshold));
    }
    searcher.join().unwrap();
    graph.update_event_window(generation_window(59));
    assert!(graph.tips().iter().all(|s| s.event().generation() >= 59));
}
