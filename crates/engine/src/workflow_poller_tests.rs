// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::budget::BudgetManager;
use crate::hierarchy::HierarchyManager;
use crate::workspace::WorkspaceManager;
use ak_adapters::{FakeOutcome, FakeTaskRunner, FakeWorkspaceAdapter};
use ak_core::{FakeClock, NodeTemplate};
use std::path::PathBuf;

fn build() -> (Arc<AgentService<FakeClock>>, Arc<WorkflowEngine<FakeClock>>, Arc<FakeTaskRunner>, Store, tempfile::TempDir) {
    let clock = FakeClock::new();
    let (store, dir) = Store::open_temp().unwrap();
    let hierarchy = Arc::new(HierarchyManager::new(5));
    let budget = Arc::new(BudgetManager::new(clock.clone()));
    let workspace = Arc::new(WorkspaceManager::new(
        clock.clone(),
        Arc::new(FakeWorkspaceAdapter::new()),
        PathBuf::from("/tmp/ak-root"),
        PathBuf::from("/tmp/ak-repo"),
    ));
    let runner = Arc::new(FakeTaskRunner::new());
    let agent_service = Arc::new(AgentService::new(clock.clone(), hierarchy, budget, workspace, runner.clone(), Duration::from_secs(1)));
    let engine = Arc::new(WorkflowEngine::new(clock, store.clone(), agent_service.clone()));
    (agent_service, engine, runner, store, dir)
}

fn single_node_template() -> Vec<NodeTemplate> {
    vec![NodeTemplate { node_id: "a".into(), role: "writer".into(), task_template: "{{task}}".into(), budget_percentage: 100, dependencies: Vec::new() }]
}

#[tokio::test]
async fn tick_advances_graph_for_a_completed_node_not_wired_through_the_notifier() {
    let (svc, engine, runner, store, _dir) = build();
    let template_id = engine.create_template("solo", single_node_template(), Vec::new(), 10).unwrap();
    let graph_id = engine.instantiate_template(template_id, "write a haiku", 1_000).unwrap();
    engine.validate(graph_id).unwrap();
    engine.execute(graph_id).await.unwrap();

    let agent_id = store.view(|state| state.nodes_of(graph_id)[0].agent_id.unwrap());
    runner.push(FakeOutcome::Succeed { output: "done".into(), tokens_used: 5 });
    svc.run(&store, agent_id).await.unwrap();

    let last_seen = Arc::new(Mutex::new(HashMap::new()));
    tick(store.clone(), svc, engine, last_seen).await;

    store.view(|state| {
        assert_eq!(state.workflow_graphs[&graph_id].status, WorkflowStatus::Completed);
    });
}

#[tokio::test]
async fn tick_does_not_dispatch_the_same_agent_twice() {
    let (svc, engine, runner, store, _dir) = build();
    let template_id = engine.create_template("solo", single_node_template(), Vec::new(), 10).unwrap();
    let graph_id = engine.instantiate_template(template_id, "write a haiku", 1_000).unwrap();
    engine.validate(graph_id).unwrap();
    engine.execute(graph_id).await.unwrap();

    let agent_id = store.view(|state| state.nodes_of(graph_id)[0].agent_id.unwrap());
    runner.push(FakeOutcome::Succeed { output: "done".into(), tokens_used: 5 });
    svc.run(&store, agent_id).await.unwrap();

    let last_seen = Arc::new(Mutex::new(HashMap::new()));
    tick(store.clone(), svc.clone(), engine.clone(), last_seen.clone()).await;
    assert!(last_seen.lock().contains_key(&agent_id));

    tick(store.clone(), svc, engine, last_seen.clone()).await;
    assert_eq!(last_seen.lock().len(), 1);
}
