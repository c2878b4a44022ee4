// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::budget::BudgetManager;
use crate::hierarchy::HierarchyManager;
use crate::workspace::WorkspaceManager;
use ak_adapters::{FakeOutcome, FakeTaskRunner, FakeWorkspaceAdapter};
use ak_core::FakeClock;
use std::path::PathBuf;
use std::time::Duration;

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
    agent_service.set_notifier(Arc::clone(&engine) as Arc<dyn WorkflowNotifier>);
    (agent_service, engine, runner, store, dir)
}

fn two_node_nodes() -> Vec<NodeTemplate> {
    vec![
        NodeTemplate {
            node_id: "a".into(),
            role: "writer".into(),
            task_template: "Write: {{task}}".into(),
            budget_percentage: 60,
            dependencies: Vec::new(),
        },
        NodeTemplate {
            node_id: "b".into(),
            role: "reviewer".into(),
            task_template: "Review: {{task}}".into(),
            budget_percentage: 40,
            dependencies: vec!["a".into()],
        },
    ]
}

#[test]
fn create_template_rejects_percentages_not_summing_to_100() {
    let (_svc, engine, _runner, _store, _dir) = build();
    let mut nodes = two_node_nodes();
    nodes[1].budget_percentage = 30;
    let result = engine.create_template("broken", nodes, Vec::new(), 100);
    assert!(matches!(result, Err(ak_core::Error::Invariant(_))));
}

#[test]
fn create_template_rejects_cycles() {
    let (_svc, engine, _runner, _store, _dir) = build();
    let nodes = vec![
        NodeTemplate { node_id: "a".into(), role: "x".into(), task_template: "t".into(), budget_percentage: 50, dependencies: vec!["b".into()] },
        NodeTemplate { node_id: "b".into(), role: "x".into(), task_template: "t".into(), budget_percentage: 50, dependencies: vec!["a".into()] },
    ];
    let result = engine.create_template("cyclic", nodes, Vec::new(), 100);
    assert!(matches!(result, Err(ak_core::Error::Cycle(_))));
}

#[test]
fn instantiate_template_splits_budget_and_wires_dependencies() {
    let (_svc, engine, _runner, store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();

    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();

    store.view(|state| {
        let nodes = state.nodes_of(graph_id);
        assert_eq!(nodes.len(), 2);
        let a = nodes.iter().find(|n| n.role == "writer").unwrap();
        let b = nodes.iter().find(|n| n.role == "reviewer").unwrap();
        assert_eq!(a.budget_allocation, 600);
        assert_eq!(b.budget_allocation, 400);
        assert_eq!(b.dependencies, vec![a.id]);
        assert!(a.task_description.contains("design doc"));
    });
}

#[test]
fn instantiate_template_rejects_budget_below_minimum() {
    let (_svc, engine, _runner, _store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 5_000).unwrap();
    let result = engine.instantiate_template(template_id, "design doc", 1_000);
    assert!(matches!(result, Err(ak_core::Error::Invariant(_))));
}

#[test]
fn validate_rejects_empty_graph() {
    let (_svc, engine, _runner, store, _dir) = build();
    let now = 1;
    let graph_id = ak_core::WorkflowGraphId::new();
    store.with_transaction(|_| Ok((vec![Event::WorkflowGraphCreated { graph_id, template_id: None, at_ms: now }], ()))).unwrap();

    let status = engine.validate(graph_id).unwrap();
    assert_eq!(status, ValidationStatus::Invalid);
}

#[test]
fn validate_accepts_acyclic_graph() {
    let (_svc, engine, _runner, _store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();
    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();

    let status = engine.validate(graph_id).unwrap();
    assert_eq!(status, ValidationStatus::Validated);
}

#[tokio::test]
async fn execute_spawns_only_dependency_free_nodes() {
    let (_svc, engine, _runner, store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();
    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();
    engine.validate(graph_id).unwrap();

    engine.execute(graph_id).await.unwrap();

    store.view(|state| {
        let nodes = state.nodes_of(graph_id);
        let a = nodes.iter().find(|n| n.role == "writer").unwrap();
        let b = nodes.iter().find(|n| n.role == "reviewer").unwrap();
        assert_eq!(a.execution_status, NodeExecutionStatus::Executing);
        assert!(a.agent_id.is_some());
        assert_eq!(b.execution_status, NodeExecutionStatus::Pending);
        assert!(b.agent_id.is_none());
    });
}

#[tokio::test]
async fn on_agent_completed_releases_dependent_node_with_enriched_task() {
    let (svc, engine, runner, store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();
    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();
    engine.validate(graph_id).unwrap();
    engine.execute(graph_id).await.unwrap();

    let agent_a = store.view(|state| state.nodes_of(graph_id).iter().find(|n| n.role == "writer").unwrap().agent_id.unwrap());
    runner.push(FakeOutcome::Succeed { output: "draft text".into(), tokens_used: 100 });
    svc.run(&store, agent_a).await.unwrap();
    engine.on_agent_completed(agent_a).await.unwrap();

    store.view(|state| {
        let nodes = state.nodes_of(graph_id);
        let a = nodes.iter().find(|n| n.role == "writer").unwrap();
        let b = nodes.iter().find(|n| n.role == "reviewer").unwrap();
        assert_eq!(a.execution_status, NodeExecutionStatus::Completed);
        assert_eq!(a.result.as_deref(), Some("draft text"));
        assert_eq!(b.execution_status, NodeExecutionStatus::Executing);
        assert!(b.task_description.contains("draft text"));
    });
}

#[tokio::test]
async fn graph_completes_once_every_node_is_completed() {
    let (svc, engine, runner, store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();
    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();
    engine.validate(graph_id).unwrap();
    engine.execute(graph_id).await.unwrap();

    let agent_a = store.view(|state| state.nodes_of(graph_id).iter().find(|n| n.role == "writer").unwrap().agent_id.unwrap());
    runner.push(FakeOutcome::Succeed { output: "draft".into(), tokens_used: 100 });
    svc.run(&store, agent_a).await.unwrap();
    engine.on_agent_completed(agent_a).await.unwrap();

    let agent_b = store.view(|state| state.nodes_of(graph_id).iter().find(|n| n.role == "reviewer").unwrap().agent_id.unwrap());
    runner.push(FakeOutcome::Succeed { output: "looks good".into(), tokens_used: 50 });
    svc.run(&store, agent_b).await.unwrap();
    engine.on_agent_completed(agent_b).await.unwrap();

    store.view(|state| {
        assert_eq!(state.workflow_graphs[&graph_id].status, WorkflowStatus::Completed);
    });
}

#[tokio::test]
async fn on_agent_failed_fails_graph_and_cascades_termination() {
    let (svc, engine, runner, store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();
    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();
    engine.validate(graph_id).unwrap();
    engine.execute(graph_id).await.unwrap();

    let agent_a = store.view(|state| state.nodes_of(graph_id).iter().find(|n| n.role == "writer").unwrap().agent_id.unwrap());
    runner.push(FakeOutcome::Fail { error: "tool crashed".into() });
    svc.run(&store, agent_a).await.unwrap();
    engine.on_agent_failed(agent_a).await.unwrap();

    store.view(|state| {
        assert_eq!(state.workflow_graphs[&graph_id].status, WorkflowStatus::Failed);
        let a = state.nodes_of(graph_id).into_iter().find(|n| n.role == "writer").unwrap();
        assert_eq!(a.execution_status, NodeExecutionStatus::Failed);
    });
}

#[test]
fn progress_reports_counts_and_percentage() {
    let (_svc, engine, _runner, _store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();
    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();

    let progress = engine.progress(graph_id);
    assert_eq!(progress.total, 2);
    assert_eq!(progress.pending, 2);
    assert_eq!(progress.percent_complete, 0.0);
}

#[tokio::test]
async fn notifier_wiring_advances_the_graph_without_a_direct_engine_call() {
    let (svc, engine, runner, store, _dir) = build();
    let template_id = engine.create_template("draft-review", two_node_nodes(), Vec::new(), 100).unwrap();
    let graph_id = engine.instantiate_template(template_id, "design doc", 1_000).unwrap();
    engine.validate(graph_id).unwrap();
    engine.execute(graph_id).await.unwrap();

    let agent_a = store.view(|state| state.nodes_of(graph_id).iter().find(|n| n.role == "writer").unwrap().agent_id.unwrap());
    runner.push(FakeOutcome::Succeed { output: "draft".into(), tokens_used: 100 });
    svc.run(&store, agent_a).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;

    store.view(|state| {
        let b = state.nodes_of(graph_id).into_iter().find(|n| n.role == "reviewer").unwrap();
        assert_eq!(b.execution_status, NodeExecutionStatus::Executing);
    });
}
