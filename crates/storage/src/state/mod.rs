// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state derived from write-ahead log replay.
//!
//! State is never mutated directly by callers; it only changes in response
//! to `apply_event`. This is what makes the store restart-safe: replaying
//! the log from empty state reproduces the same `MaterializedState`.

mod agents;
mod budgets;
mod helpers;
mod messages;
mod workflows;
mod workspaces;

pub use helpers::find_by_prefix;

use ak_core::{
    Agent, AgentId, Budget, Event, HierarchyEdge, HierarchyEdgeId, Message, MessageId,
    Workspace, WorkflowGraph, WorkflowGraphId, WorkflowNode, WorkflowNodeId, WorkflowTemplate,
    WorkflowTemplateId,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    pub agents: HashMap<AgentId, Agent>,
    pub budgets: HashMap<AgentId, Budget>,
    pub hierarchy_edges: HashMap<HierarchyEdgeId, HierarchyEdge>,
    /// Derived index: parent -> children, rebuilt incrementally as edges land.
    #[serde(default)]
    pub children_index: HashMap<AgentId, Vec<AgentId>>,
    pub messages: HashMap<MessageId, Message>,
    pub workspaces: HashMap<AgentId, Workspace>,
    #[serde(default)]
    pub workflow_templates: HashMap<WorkflowTemplateId, WorkflowTemplate>,
    #[serde(default)]
    pub workflow_graphs: HashMap<WorkflowGraphId, WorkflowGraph>,
    #[serde(default)]
    pub workflow_nodes: HashMap<WorkflowNodeId, WorkflowNode>,
    /// Derived index: graph -> its node ids, in insertion order.
    #[serde(default)]
    pub graph_nodes_index: HashMap<WorkflowGraphId, Vec<WorkflowNodeId>>,
}

impl MaterializedState {
    pub fn get_agent(&self, id: &str) -> Option<&Agent> {
        find_by_prefix(&self.agents, id)
    }

    pub fn get_workflow_graph(&self, id: &str) -> Option<&WorkflowGraph> {
        find_by_prefix(&self.workflow_graphs, id)
    }

    pub fn children(&self, parent: AgentId) -> Vec<AgentId> {
        self.children_index.get(&parent).cloned().unwrap_or_default()
    }

    pub fn nodes_of(&self, graph: WorkflowGraphId) -> Vec<&WorkflowNode> {
        self.graph_nodes_index
            .get(&graph)
            .into_iter()
            .flatten()
            .filter_map(|id| self.workflow_nodes.get(id))
            .collect()
    }

    /// Fold one persisted fact into state. MUST be idempotent: applying the
    /// same event twice yields the same state as applying it once, since
    /// events may be applied both for immediate in-process visibility and
    /// again during WAL replay after a restart.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::AgentSpawned { .. } | Event::AgentStatusChanged { .. } => {
                agents::apply(self, event)
            }
            Event::HierarchyEdgeCreated { .. } => agents::apply(self, event),
            Event::BudgetAllocated { .. }
            | Event::BudgetReserved { .. }
            | Event::BudgetConsumed { .. }
            | Event::BudgetReclaimed { .. } => budgets::apply(self, event),
            Event::MessageSent { .. } | Event::MessageStatusChanged { .. } => {
                messages::apply(self, event)
            }
            Event::WorkspaceCreated { .. } | Event::WorkspaceStatusChanged { .. } => {
                workspaces::apply(self, event)
            }
            Event::WorkflowTemplateCreated { .. }
            | Event::WorkflowTemplateInstantiated { .. }
            | Event::WorkflowGraphCreated { .. }
            | Event::WorkflowNodeCreated { .. }
            | Event::WorkflowGraphValidated { .. }
            | Event::WorkflowGraphStatusChanged { .. }
            | Event::WorkflowNodeStatusChanged { .. } => workflows::apply(self, event),
        }
    }
}

#[cfg(test)]
#[path = "../state_tests.rs"]
mod tests;
