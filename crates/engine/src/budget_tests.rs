// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ak_core::{AgentId, Event, FakeClock};
use ak_storage::Store;

fn spawned(agent_id: AgentId, parent_id: Option<AgentId>) -> Event {
    Event::AgentSpawned {
        agent_id,
        role: "writer".into(),
        task: "draft".into(),
        depth_level: if parent_id.is_some() { 1 } else { 0 },
        parent_id,
        at_ms: 1,
    }
}

#[test]
fn root_allocation_has_no_reservation() {
    let (store, _dir) = Store::open_temp().unwrap();
    let manager = BudgetManager::new(FakeClock::new());
    let agent_id = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(agent_id, None)], ()))).unwrap();

    let budget = manager.allocate(&store, agent_id, None, 10_000).unwrap();
    assert_eq!(budget.allocated, 10_000);
    assert_eq!(budget.reserved, 0);
}

#[test]
fn child_allocation_reserves_from_parent() {
    let (store, _dir) = Store::open_temp().unwrap();
    let manager = BudgetManager::new(FakeClock::new());
    let parent = AgentId::new();
    let child = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(parent, None)], ()))).unwrap();
    manager.allocate(&store, parent, None, 10_000).unwrap();
    store.with_transaction(|_| Ok((vec![spawned(child, Some(parent))], ()))).unwrap();

    manager.allocate(&store, child, Some(parent), 3_000).unwrap();

    store.view(|state| {
        assert_eq!(state.budgets[&parent].reserved, 3_000);
        assert_eq!(state.budgets[&child].allocated, 3_000);
    });
}

#[test]
fn child_allocation_fails_when_parent_cannot_cover() {
    let (store, _dir) = Store::open_temp().unwrap();
    let manager = BudgetManager::new(FakeClock::new());
    let parent = AgentId::new();
    let child = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(parent, None)], ()))).unwrap();
    manager.allocate(&store, parent, None, 1_000).unwrap();
    store.with_transaction(|_| Ok((vec![spawned(child, Some(parent))], ()))).unwrap();

    let result = manager.allocate(&store, child, Some(parent), 5_000);
    assert!(matches!(result, Err(ak_core::Error::InsufficientBudget { .. })));
}

#[test]
fn consume_fails_on_overrun() {
    let (store, _dir) = Store::open_temp().unwrap();
    let manager = BudgetManager::new(FakeClock::new());
    let agent_id = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(agent_id, None)], ()))).unwrap();
    manager.allocate(&store, agent_id, None, 1_000).unwrap();

    let result = manager.consume(&store, agent_id, 2_000);
    assert!(matches!(result, Err(ak_core::Error::Overrun { .. })));
}

#[test]
fn reclaim_is_idempotent_and_restores_parent_reservation() {
    let (store, _dir) = Store::open_temp().unwrap();
    let manager = BudgetManager::new(FakeClock::new());
    let parent = AgentId::new();
    let child = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(parent, None)], ()))).unwrap();
    manager.allocate(&store, parent, None, 10_000).unwrap();
    store.with_transaction(|_| Ok((vec![spawned(child, Some(parent))], ()))).unwrap();
    manager.allocate(&store, child, Some(parent), 4_000).unwrap();
    manager.consume(&store, child, 1_000).unwrap();
    store.view(|state| assert_eq!(state.budgets[&parent].reserved, 3_000));

    let first = manager.reclaim(&store, child).unwrap();
    let second = manager.reclaim(&store, child).unwrap();

    assert_eq!(first, 3_000);
    assert_eq!(second, 0);
    store.view(|state| assert_eq!(state.budgets[&parent].reserved, 0));
}

#[test]
fn remaining_accounts_for_used_and_reserved() {
    let (store, _dir) = Store::open_temp().unwrap();
    let manager = BudgetManager::new(FakeClock::new());
    let agent_id = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(agent_id, None)], ()))).unwrap();
    manager.allocate(&store, agent_id, None, 1_000).unwrap();
    manager.consume(&store, agent_id, 200).unwrap();

    store.view(|state| assert_eq!(manager.remaining(state, agent_id).unwrap(), 800));
}
