// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow templates, instantiated DAG graphs, and their nodes.
//!
//! A `WorkflowTemplate` is a reusable DAG definition. `instantiate_template`
//! produces a `WorkflowGraph` of `WorkflowNode`s, each of which spawns an
//! `Agent` once its dependencies are satisfied.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a workflow template.
    pub struct WorkflowTemplateId("wft-");
}

crate::define_id! {
    /// Unique identifier for an instantiated workflow graph.
    pub struct WorkflowGraphId("wfg-");
}

crate::define_id! {
    /// Unique identifier for a node within a workflow graph.
    pub struct WorkflowNodeId("wfn-");
}

/// A single node definition within a [`WorkflowTemplate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeTemplate {
    /// Identifier unique within the owning template, referenced by
    /// `dependencies` on sibling node templates.
    pub node_id: String,
    pub role: String,
    pub task_template: String,
    /// Percentage of the instantiated graph's budget allocated to this node.
    /// The sum across all node templates in a template MUST equal 100.
    pub budget_percentage: u8,
    pub dependencies: Vec<String>,
}

/// An edge pattern recorded alongside node templates for documentation and
/// validation tooling; derivable from `NodeTemplate::dependencies` but kept
/// as an explicit, named artifact for external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgePattern {
    pub from: String,
    pub to: String,
}

/// A reusable DAG definition, instantiated by `instantiate_template`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowTemplate {
    pub id: WorkflowTemplateId,
    pub name: String,
    pub node_templates: Vec<NodeTemplate>,
    pub edge_patterns: Vec<EdgePattern>,
    pub min_budget: i64,
    pub usage_count: u64,
    pub created_at_ms: u64,
}

crate::builder! {
    pub struct WorkflowTemplateBuilder => WorkflowTemplate {
        into {
            name: String = "default-template",
        }
        set {
            node_templates: Vec<NodeTemplate> = Vec::new(),
            edge_patterns: Vec<EdgePattern> = Vec::new(),
            min_budget: i64 = 1_000,
            usage_count: u64 = 0,
            created_at_ms: u64 = 0,
        }
        computed {
            id: WorkflowTemplateId = WorkflowTemplateId::new(),
        }
    }
}

/// Status of an instantiated workflow graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Active,
    Paused,
    Completed,
    Failed,
    Terminated,
}

impl WorkflowStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed | WorkflowStatus::Terminated)
    }
}

crate::simple_display! {
    WorkflowStatus {
        Active => "active",
        Paused => "paused",
        Completed => "completed",
        Failed => "failed",
        Terminated => "terminated",
    }
}

/// Outcome of `WorkflowEngine::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Pending,
    Validated,
    Invalid,
}

crate::simple_display! {
    ValidationStatus {
        Pending => "pending",
        Validated => "validated",
        Invalid => "invalid",
    }
}

/// An instantiated DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowGraph {
    pub id: WorkflowGraphId,
    pub template_id: Option<WorkflowTemplateId>,
    pub status: WorkflowStatus,
    pub validation_status: ValidationStatus,
    pub validation_errors: Vec<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

crate::builder! {
    pub struct WorkflowGraphBuilder => WorkflowGraph {
        option {
            template_id: WorkflowTemplateId = None,
        }
        set {
            status: WorkflowStatus = WorkflowStatus::Active,
            validation_status: ValidationStatus = ValidationStatus::Pending,
            validation_errors: Vec<String> = Vec::new(),
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
        computed {
            id: WorkflowGraphId = WorkflowGraphId::new(),
        }
    }
}

/// Execution status of a single node within a graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeExecutionStatus {
    Pending,
    Ready,
    Spawning,
    Executing,
    Completed,
    Failed,
    Skipped,
}

impl NodeExecutionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeExecutionStatus::Completed | NodeExecutionStatus::Failed | NodeExecutionStatus::Skipped
        )
    }
}

crate::simple_display! {
    NodeExecutionStatus {
        Pending => "pending",
        Ready => "ready",
        Spawning => "spawning",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
        Skipped => "skipped",
    }
}

/// A node's position within an instantiated graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowNode {
    pub id: WorkflowNodeId,
    pub workflow_graph_id: WorkflowGraphId,
    pub role: String,
    pub task_description: String,
    pub budget_allocation: i64,
    pub dependencies: Vec<WorkflowNodeId>,
    pub execution_status: NodeExecutionStatus,
    pub agent_id: Option<AgentId>,
    pub result: Option<String>,
    pub position: u32,
    pub error_message: Option<String>,
}

crate::builder! {
    pub struct WorkflowNodeBuilder => WorkflowNode {
        into {
            role: String = "writer",
            task_description: String = "do the thing",
        }
        set {
            workflow_graph_id: WorkflowGraphId = WorkflowGraphId::new(),
            budget_allocation: i64 = 1_000,
            dependencies: Vec<WorkflowNodeId> = Vec::new(),
            execution_status: NodeExecutionStatus = NodeExecutionStatus::Pending,
            position: u32 = 0,
        }
        option {
            agent_id: AgentId = None,
            result: String = None,
            error_message: String = None,
        }
        computed {
            id: WorkflowNodeId = WorkflowNodeId::new(),
        }
    }
}

#[cfg(test)]
#[path = "workflow_tests.rs"]
mod tests;
