// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! DAG validation, event-driven spawning, and the workflow template registry.
//!
//! Execution is event-driven rather than spawn-all-up-front: `execute`
//! starts only the dependency-free nodes, and successors are released by
//! `on_agent_completed` as their dependencies finish. This is the only way
//! to gate on dependency *completion* when `AgentService::spawn` returns
//! before the spawned agent has actually run.

use crate::agent_service::{AgentService, WorkflowNotifier};
use ak_core::{
    AgentId, Clock, EdgePattern, Error, Event, NodeExecutionStatus, NodeTemplate, Result,
    ValidationStatus, WorkflowGraphId, WorkflowNode, WorkflowNodeId, WorkflowStatus,
    WorkflowTemplateId,
};
use ak_storage::Store;
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use tracing::{instrument, warn};

pub struct WorkflowEngine<C: Clock> {
    clock: C,
    store: Store,
    agent_service: Arc<AgentService<C>>,
}

/// Status counts for a graph, plus a derived completion percentage.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct WorkflowProgress {
    pub total: usize,
    pub pending: usize,
    pub ready: usize,
    pub spawning: usize,
    pub executing: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    pub percent_complete: f64,
}

impl<C: Clock + 'static> WorkflowEngine<C> {
    pub fn new(clock: C, store: Store, agent_service: Arc<AgentService<C>>) -> Self {
        Self { clock, store, agent_service }
    }

    /// Validates the template's node graph (percentages sum to 100,
    /// dependencies resolve, acyclic) and persists it for later
    /// instantiation. Does not touch any `WorkflowGraph`.
    pub fn create_template(
        &self,
        name: &str,
        node_templates: Vec<NodeTemplate>,
        edge_patterns: Vec<EdgePattern>,
        min_budget: i64,
    ) -> Result<WorkflowTemplateId> {
        validate_template_dag(&node_templates)?;
        let now = self.clock.epoch_ms();
        let template_id = WorkflowTemplateId::new();
        self.store.with_transaction(|state| {
            if state.workflow_templates.values().any(|t| t.name == name) {
                return Err(Error::Conflict(format!("workflow template name {name} already in use")));
            }
            let event = Event::WorkflowTemplateCreated {
                template_id,
                name: name.to_string(),
                node_templates: node_templates.clone(),
                edge_patterns: edge_patterns.clone(),
                min_budget,
                at_ms: now,
            };
            Ok((vec![event], ()))
        })?;
        Ok(template_id)
    }

    /// Instantiates `template_id` into a fresh graph with `budget` split
    /// across nodes per `budget_percentage`, rendering each node's
    /// `task_template` against `task`.
    pub fn instantiate_template(&self, template_id: WorkflowTemplateId, task: &str, budget: i64) -> Result<WorkflowGraphId> {
        let now = self.clock.epoch_ms();
        let graph_id = WorkflowGraphId::new();
        self.store.with_transaction(|state| {
            let template = state
                .workflow_templates
                .get(&template_id)
                .ok_or_else(|| Error::NotFound(format!("workflow template {template_id}")))?;
            if budget < template.min_budget {
                return Err(Error::Invariant(format!(
                    "budget {budget} is below template minimum {}",
                    template.min_budget
                )));
            }

            let id_map: HashMap<&str, WorkflowNodeId> =
                template.node_templates.iter().map(|nt| (nt.node_id.as_str(), WorkflowNodeId::new())).collect();

            let mut events = vec![Event::WorkflowGraphCreated { graph_id, template_id: Some(template_id), at_ms: now }];
            for (position, nt) in template.node_templates.iter().enumerate() {
                let node_id = id_map[nt.node_id.as_str()];
                let dependencies = nt
                    .dependencies
                    .iter()
                    .map(|dep| {
                        id_map
                            .get(dep.as_str())
                            .copied()
                            .ok_or_else(|| Error::Invariant(format!("template dependency {dep} does not resolve")))
                    })
                    .collect::<Result<Vec<_>>>()?;
                let budget_allocation = budget * nt.budget_percentage as i64 / 100;
                events.push(Event::WorkflowNodeCreated {
                    node_id,
                    workflow_graph_id: graph_id,
                    role: nt.role.clone(),
                    task_description: render_task(&nt.task_template, task),
                    budget_allocation,
                    dependencies,
                    position: position as u32,
                    at_ms: now,
                });
            }
            events.push(Event::WorkflowTemplateInstantiated { template_id, graph_id, usage_count: template.usage_count + 1, at_ms: now });
            Ok((events, ()))
        })?;
        Ok(graph_id)
    }

    /// Empty-graph check, dependency-reference check, cycle detection, and
    /// Kahn's-algorithm topological sort. Records `validation_status` and
    /// `validation_errors` regardless of outcome.
    pub fn validate(&self, graph_id: WorkflowGraphId) -> Result<ValidationStatus> {
        let now = self.clock.epoch_ms();
        self.store.with_transaction(|state| {
            let nodes = state.nodes_of(graph_id);
            let mut errors = Vec::new();

            if nodes.is_empty() {
                errors.push("workflow graph has no nodes".to_string());
            }

            let ids: HashSet<WorkflowNodeId> = nodes.iter().map(|n| n.id).collect();
            for node in &nodes {
                for dep in &node.dependencies {
                    if !ids.contains(dep) {
                        errors.push(format!("node {} depends on unknown node {dep}", node.id));
                    }
                }
            }

            if errors.is_empty() {
                if let Err(cycle) = topo_order(&nodes) {
                    errors.push(cycle);
                }
            }

            let status = if errors.is_empty() { ValidationStatus::Validated } else { ValidationStatus::Invalid };
            let event = Event::WorkflowGraphValidated { graph_id, status, errors: errors.clone(), at_ms: now };
            Ok((vec![event], status))
        })
    }

    /// Spawns only the dependency-free nodes; returns without waiting for
    /// them to finish. Requires a prior successful `validate`.
    #[instrument(skip(self))]
    pub async fn execute(&self, graph_id: WorkflowGraphId) -> Result<()> {
        let graph = self
            .store
            .view(|state| state.workflow_graphs.get(&graph_id).cloned())
            .ok_or_else(|| Error::NotFound(format!("workflow graph {graph_id}")))?;
        if graph.validation_status != ValidationStatus::Validated {
            return Err(Error::Invariant(format!("workflow graph {graph_id} must be validated before execution")));
        }

        let roots: Vec<WorkflowNodeId> = self.store.view(|state| {
            state.nodes_of(graph_id).into_iter().filter(|n| n.dependencies.is_empty()).map(|n| n.id).collect()
        });
        for node_id in roots {
            self.spawn_node(node_id, None).await?;
        }
        Ok(())
    }

    /// Reacts to a dependency finishing: marks its node `completed`,
    /// releases every sibling whose dependencies are now all satisfied
    /// (enriching its task with dependency results), and marks the graph
    /// `completed` once every node has finished.
    pub async fn on_agent_completed(&self, agent_id: AgentId) -> Result<()> {
        let Some((graph_id, node_id)) = self.locate_node(agent_id) else { return Ok(()) };
        let result = self.agent_service.get_agent(&self.store, &agent_id.to_string()).and_then(|a| a.result);
        let now = self.clock.epoch_ms();
        self.store.with_transaction(|_| {
            Ok((
                vec![Event::WorkflowNodeStatusChanged {
                    node_id,
                    status: NodeExecutionStatus::Completed,
                    agent_id: Some(agent_id),
                    result: result.clone(),
                    error_message: None,
                    at_ms: now,
                }],
                (),
            ))
        })?;

        let ready: Vec<(WorkflowNodeId, String)> = self.store.view(|state| newly_ready_nodes(&state.nodes_of(graph_id)));
        for (node_id, task) in ready {
            self.spawn_node(node_id, Some(task)).await?;
        }

        self.maybe_complete_graph(graph_id)?;
        Ok(())
    }

    /// Reacts to a node's agent failing: marks the node `failed`, cascades
    /// termination to every other non-terminal node in the graph (strict
    /// fail-fast), and marks the graph `failed`.
    pub async fn on_agent_failed(&self, agent_id: AgentId) -> Result<()> {
        let Some((graph_id, node_id)) = self.locate_node(agent_id) else { return Ok(()) };
        let error_message = self.agent_service.get_agent(&self.store, &agent_id.to_string()).and_then(|a| a.error_message);
        let now = self.clock.epoch_ms();
        self.store.with_transaction(|_| {
            Ok((
                vec![Event::WorkflowNodeStatusChanged {
                    node_id,
                    status: NodeExecutionStatus::Failed,
                    agent_id: Some(agent_id),
                    result: None,
                    error_message: error_message.clone(),
                    at_ms: now,
                }],
                (),
            ))
        })?;

        self.cascade_terminate(graph_id, "a sibling workflow node failed")?;
        let now = self.clock.epoch_ms();
        self.store
            .with_transaction(|_| Ok((vec![Event::WorkflowGraphStatusChanged { graph_id, status: WorkflowStatus::Failed, at_ms: now }], ())))?;
        Ok(())
    }

    /// Cascades `AgentService::terminate` to every non-terminal node's
    /// agent, then marks the graph `terminated`.
    pub fn terminate(&self, graph_id: WorkflowGraphId, reason: &str) -> Result<()> {
        self.cascade_terminate(graph_id, reason)?;
        let now = self.clock.epoch_ms();
        self.store
            .with_transaction(|_| Ok((vec![Event::WorkflowGraphStatusChanged { graph_id, status: WorkflowStatus::Terminated, at_ms: now }], ())))
    }

    pub fn progress(&self, graph_id: WorkflowGraphId) -> WorkflowProgress {
        self.store.view(|state| {
            let nodes = state.nodes_of(graph_id);
            let mut progress = WorkflowProgress { total: nodes.len(), ..Default::default() };
            for node in &nodes {
                match node.execution_status {
                    NodeExecutionStatus::Pending => progress.pending += 1,
                    NodeExecutionStatus::Ready => progress.ready += 1,
                    NodeExecutionStatus::Spawning => progress.spawning += 1,
                    NodeExecutionStatus::Executing => progress.executing += 1,
                    NodeExecutionStatus::Completed => progress.completed += 1,
                    NodeExecutionStatus::Failed => progress.failed += 1,
                    NodeExecutionStatus::Skipped => progress.skipped += 1,
                }
            }
            progress.percent_complete = if progress.total == 0 { 0.0 } else { progress.completed as f64 / progress.total as f64 * 100.0 };
            progress
        })
    }

    /// Claims `node_id` for spawning. `on_agent_completed` is dispatched
    /// from both the direct notifier and `WorkflowPoller`, so two concurrent
    /// callers can observe the same successor as `Pending` at once; the
    /// claim is a compare-and-set on `execution_status` inside the
    /// `Spawning` transaction, so only the first caller proceeds.
    async fn spawn_node(&self, node_id: WorkflowNodeId, task_override: Option<String>) -> Result<()> {
        let node = self
            .store
            .view(|state| state.workflow_nodes.get(&node_id).cloned())
            .ok_or_else(|| Error::NotFound(format!("workflow node {node_id}")))?;

        let now = self.clock.epoch_ms();
        let claimed = self.store.with_transaction(|state| {
            let current = state
                .workflow_nodes
                .get(&node_id)
                .ok_or_else(|| Error::NotFound(format!("workflow node {node_id}")))?;
            if current.execution_status != NodeExecutionStatus::Pending {
                return Ok((Vec::new(), false));
            }
            Ok((
                vec![Event::WorkflowNodeStatusChanged {
                    node_id,
                    status: NodeExecutionStatus::Spawning,
                    agent_id: None,
                    result: None,
                    error_message: None,
                    at_ms: now,
                }],
                true,
            ))
        })?;
        if !claimed {
            return Ok(());
        }

        let task = task_override.unwrap_or_else(|| node.task_description.clone());
        let agent_id = self.agent_service.spawn(&self.store, &node.role, &task, node.budget_allocation, None).await?;

        let now = self.clock.epoch_ms();
        self.store.with_transaction(|_| {
            Ok((
                vec![Event::WorkflowNodeStatusChanged {
                    node_id,
                    status: NodeExecutionStatus::Executing,
                    agent_id: Some(agent_id),
                    result: None,
                    error_message: None,
                    at_ms: now,
                }],
                (),
            ))
        })
    }

    fn locate_node(&self, agent_id: AgentId) -> Option<(WorkflowGraphId, WorkflowNodeId)> {
        self.store
            .view(|state| state.workflow_nodes.values().find(|n| n.agent_id == Some(agent_id)).map(|n| (n.workflow_graph_id, n.id)))
    }

    fn cascade_terminate(&self, graph_id: WorkflowGraphId, reason: &str) -> Result<()> {
        let agents: Vec<AgentId> = self
            .store
            .view(|state| state.nodes_of(graph_id).iter().filter(|n| !n.execution_status.is_terminal()).filter_map(|n| n.agent_id).collect());
        for agent_id in agents {
            self.agent_service.terminate(&self.store, agent_id, reason)?;
        }
        Ok(())
    }

    fn maybe_complete_graph(&self, graph_id: WorkflowGraphId) -> Result<()> {
        let all_completed = self.store.view(|state| {
            let nodes = state.nodes_of(graph_id);
            !nodes.is_empty() && nodes.iter().all(|n| n.execution_status == NodeExecutionStatus::Completed)
        });
        if all_completed {
            let now = self.clock.epoch_ms();
            self.store.with_transaction(|_| {
                Ok((vec![Event::WorkflowGraphStatusChanged { graph_id, status: WorkflowStatus::Completed, at_ms: now }], ()))
            })?;
        }
        Ok(())
    }
}

/// Bridges the synchronous `WorkflowNotifier` callback to the async
/// continuation logic above. Implemented on `Arc<WorkflowEngine<C>>` (not
/// `WorkflowEngine<C>` directly) so the callback can clone an owned,
/// `'static` handle into the spawned task.
impl<C: Clock + 'static> WorkflowNotifier for Arc<WorkflowEngine<C>> {
    fn on_agent_completed(&self, agent_id: AgentId) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(reason) = engine.on_agent_completed(agent_id).await {
                warn!(%agent_id, %reason, "workflow engine failed to advance on agent completion");
            }
        });
    }

    fn on_agent_failed(&self, agent_id: AgentId) {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(reason) = engine.on_agent_failed(agent_id).await {
                warn!(%agent_id, %reason, "workflow engine failed to advance on agent failure");
            }
        });
    }
}

fn render_task(task_template: &str, task: &str) -> String {
    if task_template.contains("{{task}}") {
        task_template.replace("{{task}}", task)
    } else {
        format!("{task_template}\n\n{task}")
    }
}

fn newly_ready_nodes(nodes: &[&WorkflowNode]) -> Vec<(WorkflowNodeId, String)> {
    let completed: HashMap<WorkflowNodeId, Option<String>> = nodes
        .iter()
        .filter(|n| n.execution_status == NodeExecutionStatus::Completed)
        .map(|n| (n.id, n.result.clone()))
        .collect();

    nodes
        .iter()
        .filter(|n| n.execution_status == NodeExecutionStatus::Pending)
        .filter(|n| n.dependencies.iter().all(|dep| completed.contains_key(dep)))
        .map(|n| {
            let context: Vec<String> = n
                .dependencies
                .iter()
                .filter_map(|dep| completed.get(dep).and_then(|r| r.clone()).map(|r| format!("- {dep}: {r}")))
                .collect();
            let task = if context.is_empty() {
                n.task_description.clone()
            } else {
                format!("Context from dependencies:\n{}\n\n{}", context.join("\n"), n.task_description)
            };
            (n.id, task)
        })
        .collect()
}

fn validate_template_dag(nodes: &[NodeTemplate]) -> Result<()> {
    let total: u32 = nodes.iter().map(|n| n.budget_percentage as u32).sum();
    if total != 100 {
        return Err(Error::Invariant(format!("node budget percentages sum to {total}, expected 100")));
    }

    let ids: HashSet<&str> = nodes.iter().map(|n| n.node_id.as_str()).collect();
    for node in nodes {
        for dep in &node.dependencies {
            if !ids.contains(dep.as_str()) {
                return Err(Error::Invariant(format!("node {} depends on unknown node {dep}", node.node_id)));
            }
        }
    }

    detect_template_cycle(nodes)
}

fn detect_template_cycle(nodes: &[NodeTemplate]) -> Result<()> {
    let by_id: HashMap<&str, &NodeTemplate> = nodes.iter().map(|n| (n.node_id.as_str(), n)).collect();
    let mut visited: HashSet<&str> = HashSet::new();
    let mut stack: HashSet<&str> = HashSet::new();

    fn visit<'a>(
        id: &'a str,
        by_id: &HashMap<&'a str, &'a NodeTemplate>,
        visited: &mut HashSet<&'a str>,
        stack: &mut HashSet<&'a str>,
    ) -> Result<()> {
        if stack.contains(id) {
            return Err(Error::Cycle(format!("workflow template cycle through node {id}")));
        }
        if visited.contains(id) {
            return Ok(());
        }
        visited.insert(id);
        stack.insert(id);
        if let Some(node) = by_id.get(id) {
            for dep in &node.dependencies {
                visit(dep.as_str(), by_id, visited, stack)?;
            }
        }
        stack.remove(id);
        Ok(())
    }

    for node in nodes {
        visit(node.node_id.as_str(), &by_id, &mut visited, &mut stack)?;
    }
    Ok(())
}

/// Kahn's algorithm; returns the offending-graph error message if the
/// produced order is shorter than the node count (i.e. a cycle remains).
fn topo_order(nodes: &[&WorkflowNode]) -> std::result::Result<Vec<WorkflowNodeId>, String> {
    let mut indegree: HashMap<WorkflowNodeId, usize> = nodes.iter().map(|n| (n.id, n.dependencies.len())).collect();
    let mut dependents: HashMap<WorkflowNodeId, Vec<WorkflowNodeId>> = HashMap::new();
    for node in nodes {
        for dep in &node.dependencies {
            dependents.entry(*dep).or_default().push(node.id);
        }
    }

    let mut queue: VecDeque<WorkflowNodeId> = indegree.iter().filter(|(_, degree)| **degree == 0).map(|(id, _)| *id).collect();
    let mut order = Vec::new();
    while let Some(id) = queue.pop_front() {
        order.push(id);
        if let Some(dependents) = dependents.get(&id) {
            for &dependent in dependents {
                if let Some(degree) = indegree.get_mut(&dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        queue.push_back(dependent);
                    }
                }
            }
        }
    }

    if order.len() < nodes.len() {
        Err("workflow graph contains a cycle".to_string())
    } else {
        Ok(order)
    }
}

#[cfg(test)]
#[path = "workflow_engine_tests.rs"]
mod tests;
