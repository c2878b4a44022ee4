// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ak_core::{AgentId, Event, FakeClock};
use ak_storage::Store;
use serde_json::json;

fn spawned(agent_id: AgentId) -> Event {
    Event::AgentSpawned {
        agent_id,
        role: "writer".into(),
        task: "draft".into(),
        depth_level: 0,
        parent_id: None,
        at_ms: 1,
    }
}

fn setup() -> (Store, tempfile::TempDir, AgentId) {
    let (store, dir) = Store::open_temp().unwrap();
    let recipient = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(recipient)], ()))).unwrap();
    (store, dir, recipient)
}

#[test]
fn send_fails_for_unknown_recipient() {
    let (store, _dir) = Store::open_temp().unwrap();
    let queue = MessageQueue::new(FakeClock::new());
    let result = queue.send(&store, None, AgentId::new(), json!("hi"), 5, None);
    assert!(matches!(result, Err(ak_core::Error::NotFound(_))));
}

#[test]
fn receive_orders_by_priority_then_created_at_then_id() {
    let (store, _dir, recipient) = setup();
    let clock = FakeClock::new();
    let queue = MessageQueue::new(clock.clone());

    let low = queue.send(&store, None, recipient, json!("low"), 1, None).unwrap();
    clock.advance(std::time::Duration::from_millis(1));
    let high = queue.send(&store, None, recipient, json!("high"), 9, None).unwrap();
    clock.advance(std::time::Duration::from_millis(1));
    let mid = queue.send(&store, None, recipient, json!("mid"), 5, None).unwrap();

    let batch = queue.receive(&store, recipient, 10);
    let ids: Vec<_> = batch.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![high.id, mid.id, low.id]);
}

#[test]
fn receive_does_not_return_the_same_message_twice_while_leased() {
    let (store, _dir, recipient) = setup();
    let queue = MessageQueue::new(FakeClock::new());
    queue.send(&store, None, recipient, json!("m"), 5, None).unwrap();

    let first_batch = queue.receive(&store, recipient, 10);
    assert_eq!(first_batch.len(), 1);
    let second_batch = queue.receive(&store, recipient, 10);
    assert!(second_batch.is_empty());
}

#[test]
fn mark_processed_releases_lease_and_is_terminal() {
    let (store, _dir, recipient) = setup();
    let queue = MessageQueue::new(FakeClock::new());
    let message = queue.send(&store, None, recipient, json!("m"), 5, None).unwrap();

    queue.receive(&store, recipient, 10);
    queue.mark_processed(&store, message.id).unwrap();

    store.view(|state| {
        assert_eq!(state.messages[&message.id].status, ak_core::MessageStatus::Processed);
    });
}

#[test]
fn mark_failed_moves_to_dead_letter_state() {
    let (store, _dir, recipient) = setup();
    let queue = MessageQueue::new(FakeClock::new());
    let message = queue.send(&store, None, recipient, json!("m"), 5, None).unwrap();

    queue.mark_failed(&store, message.id, "recipient unreachable").unwrap();

    store.view(|state| {
        assert_eq!(state.messages[&message.id].status, ak_core::MessageStatus::Failed);
    });
}
