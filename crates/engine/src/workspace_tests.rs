// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ak_adapters::FakeWorkspaceAdapter;
use ak_core::{Event, FakeClock};
use ak_storage::Store;

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

fn manager() -> WorkspaceManager<FakeClock> {
    WorkspaceManager::new(
        FakeClock::new(),
        Arc::new(FakeWorkspaceAdapter::new()),
        PathBuf::from("/tmp/ak-root"),
        PathBuf::from("/tmp/ak-repo"),
    )
}

#[tokio::test]
async fn create_records_row_immediately_with_active_status() {
    let (store, _dir) = Store::open_temp().unwrap();
    let agent_id = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(agent_id)], ()))).unwrap();

    let workspace = manager().create(&store, agent_id).await.unwrap();
    assert_eq!(workspace.isolation_status, WorkspaceStatus::Active);
    assert_eq!(workspace.agent_id, agent_id);
}

#[tokio::test]
async fn create_twice_for_same_agent_conflicts() {
    let (store, _dir) = Store::open_temp().unwrap();
    let agent_id = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(agent_id)], ()))).unwrap();
    let mgr = manager();

    mgr.create(&store, agent_id).await.unwrap();
    let result = mgr.create(&store, agent_id).await;
    assert!(matches!(result, Err(ak_core::Error::Conflict(_))));
}

#[tokio::test]
async fn destroy_marks_cleaned_up() {
    let (store, _dir) = Store::open_temp().unwrap();
    let agent_id = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(agent_id)], ()))).unwrap();
    let mgr = manager();
    mgr.create(&store, agent_id).await.unwrap();

    mgr.destroy(&store, agent_id).await.unwrap();

    store.view(|state| {
        assert_eq!(state.workspaces[&agent_id].isolation_status, WorkspaceStatus::CleanedUp);
    });
}

#[tokio::test]
async fn destroy_on_missing_workspace_is_a_no_op() {
    let (store, _dir) = Store::open_temp().unwrap();
    assert!(manager().destroy(&store, AgentId::new()).await.is_ok());
}

#[tokio::test]
async fn sweep_destroys_only_sweepable_workspaces_past_retention() {
    let (store, _dir) = Store::open_temp().unwrap();
    let agent_id = AgentId::new();
    store.with_transaction(|_| Ok((vec![spawned(agent_id)], ()))).unwrap();
    let clock = FakeClock::new();
    let mgr = WorkspaceManager::new(
        clock.clone(),
        Arc::new(FakeWorkspaceAdapter::new()),
        PathBuf::from("/tmp/ak-root"),
        PathBuf::from("/tmp/ak-repo"),
    )
    .with_retention(Duration::from_millis(1));
    mgr.create(&store, agent_id).await.unwrap();
    mgr.mark_status(&store, agent_id, WorkspaceStatus::Merged).unwrap();
    clock.advance(Duration::from_millis(10));

    mgr.sweep(&store).await;

    store.view(|state| {
        assert_eq!(state.workspaces[&agent_id].isolation_status, WorkspaceStatus::CleanedUp);
    });
}
