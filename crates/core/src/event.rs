// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted facts that the store's write-ahead log records.
//!
//! Every cross-row mutation is represented by one or more `Event`s appended
//! to the log and folded into `MaterializedState` by `apply_event`. Replaying
//! the full log from empty state reproduces the materialized state exactly,
//! which is what makes the store restart-safe.

use crate::agent::{AgentId, AgentStatus};
use crate::budget::Budget;
use crate::hierarchy::HierarchyEdgeId;
use crate::message::{MessageId, MessageStatus};
use crate::workflow::{
    EdgePattern, NodeExecutionStatus, NodeTemplate, ValidationStatus, WorkflowGraphId,
    WorkflowNodeId, WorkflowStatus, WorkflowTemplateId,
};
use crate::workspace::{WorkspaceId, WorkspaceStatus};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Serializes with `{"type": "category:name", ...fields}`. Unknown tags are
/// rejected at deserialization rather than silently dropped, since the log
/// is the source of truth and a misread event would corrupt state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    #[serde(rename = "agent:spawned")]
    AgentSpawned {
        agent_id: AgentId,
        role: String,
        task: String,
        depth_level: u32,
        parent_id: Option<AgentId>,
        at_ms: u64,
    },

    #[serde(rename = "agent:status_changed")]
    AgentStatusChanged {
        agent_id: AgentId,
        status: AgentStatus,
        result: Option<String>,
        error_message: Option<String>,
        at_ms: u64,
    },

    #[serde(rename = "hierarchy:edge_created")]
    HierarchyEdgeCreated {
        edge_id: HierarchyEdgeId,
        parent_id: AgentId,
        child_id: AgentId,
        at_ms: u64,
    },

    #[serde(rename = "budget:allocated")]
    BudgetAllocated { budget: Budget },

    /// Carries the parent's *resulting* `reserved` value (not a delta) so
    /// replaying this event twice is a no-op the second time.
    #[serde(rename = "budget:reserved")]
    BudgetReserved { parent_id: AgentId, new_reserved: i64, at_ms: u64 },

    /// Carries the agent's *resulting* `used` value (not a delta), for the
    /// same idempotency reason as `BudgetReserved`.
    #[serde(rename = "budget:consumed")]
    BudgetConsumed { agent_id: AgentId, new_used: i64, at_ms: u64 },

    #[serde(rename = "budget:reclaimed")]
    BudgetReclaimed {
        agent_id: AgentId,
        parent_id: Option<AgentId>,
        parent_new_reserved: Option<i64>,
        unused: i64,
        at_ms: u64,
    },

    #[serde(rename = "message:sent")]
    MessageSent {
        message_id: MessageId,
        sender_id: Option<AgentId>,
        recipient_id: AgentId,
        payload: serde_json::Value,
        priority: u8,
        thread_id: Option<String>,
        at_ms: u64,
    },

    #[serde(rename = "message:status_changed")]
    MessageStatusChanged { message_id: MessageId, status: MessageStatus, at_ms: u64 },

    #[serde(rename = "workspace:created")]
    WorkspaceCreated {
        workspace_id: WorkspaceId,
        agent_id: AgentId,
        path: PathBuf,
        branch_name: String,
        at_ms: u64,
    },

    #[serde(rename = "workspace:status_changed")]
    WorkspaceStatusChanged { agent_id: AgentId, status: WorkspaceStatus, at_ms: u64 },

    #[serde(rename = "workflow_template:created")]
    WorkflowTemplateCreated {
        template_id: WorkflowTemplateId,
        name: String,
        node_templates: Vec<NodeTemplate>,
        edge_patterns: Vec<EdgePattern>,
        min_budget: i64,
        at_ms: u64,
    },

    #[serde(rename = "workflow_template:instantiated")]
    WorkflowTemplateInstantiated {
        template_id: WorkflowTemplateId,
        graph_id: WorkflowGraphId,
        usage_count: u64,
        at_ms: u64,
    },

    #[serde(rename = "workflow_graph:created")]
    WorkflowGraphCreated {
        graph_id: WorkflowGraphId,
        template_id: Option<WorkflowTemplateId>,
        at_ms: u64,
    },

    /// One event per node in an instantiated (or hand-built) graph. Carries
    /// the node's full definition so WAL replay reconstructs it without
    /// consulting the originating template.
    #[serde(rename = "workflow_node:created")]
    WorkflowNodeCreated {
        node_id: WorkflowNodeId,
        workflow_graph_id: WorkflowGraphId,
        role: String,
        task_description: String,
        budget_allocation: i64,
        dependencies: Vec<WorkflowNodeId>,
        position: u32,
        at_ms: u64,
    },

    #[serde(rename = "workflow_graph:validated")]
    WorkflowGraphValidated {
        graph_id: WorkflowGraphId,
        status: ValidationStatus,
        errors: Vec<String>,
        at_ms: u64,
    },

    #[serde(rename = "workflow_graph:status_changed")]
    WorkflowGraphStatusChanged { graph_id: WorkflowGraphId, status: WorkflowStatus, at_ms: u64 },

    #[serde(rename = "workflow_node:status_changed")]
    WorkflowNodeStatusChanged {
        node_id: WorkflowNodeId,
        status: NodeExecutionStatus,
        agent_id: Option<AgentId>,
        result: Option<String>,
        error_message: Option<String>,
        at_ms: u64,
    },
}

impl Event {
    /// A short tag for log lines, matching the `type` discriminant.
    pub fn kind(&self) -> &'static str {
        match self {
            Event::AgentSpawned { .. } => "agent:spawned",
            Event::AgentStatusChanged { .. } => "agent:status_changed",
            Event::HierarchyEdgeCreated { .. } => "hierarchy:edge_created",
            Event::BudgetAllocated { .. } => "budget:allocated",
            Event::BudgetReserved { .. } => "budget:reserved",
            Event::BudgetConsumed { .. } => "budget:consumed",
            Event::BudgetReclaimed { .. } => "budget:reclaimed",
            Event::MessageSent { .. } => "message:sent",
            Event::MessageStatusChanged { .. } => "message:status_changed",
            Event::WorkspaceCreated { .. } => "workspace:created",
            Event::WorkspaceStatusChanged { .. } => "workspace:status_changed",
            Event::WorkflowTemplateCreated { .. } => "workflow_template:created",
            Event::WorkflowTemplateInstantiated { .. } => "workflow_template:instantiated",
            Event::WorkflowGraphCreated { .. } => "workflow_graph:created",
            Event::WorkflowNodeCreated { .. } => "workflow_node:created",
            Event::WorkflowGraphValidated { .. } => "workflow_graph:validated",
            Event::WorkflowGraphStatusChanged { .. } => "workflow_graph:status_changed",
            Event::WorkflowNodeStatusChanged { .. } => "workflow_node:status_changed",
        }
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
