// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workflow template, graph, and node event handlers.

use super::MaterializedState;
use ak_core::{
    Event, NodeExecutionStatus, ValidationStatus, WorkflowGraph, WorkflowNode, WorkflowStatus,
    WorkflowTemplate,
};

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::WorkflowTemplateCreated {
            template_id,
            name,
            node_templates,
            edge_patterns,
            min_budget,
            at_ms,
        } => {
            state.workflow_templates.entry(*template_id).or_insert_with(|| WorkflowTemplate {
                id: *template_id,
                name: name.clone(),
                node_templates: node_templates.clone(),
                edge_patterns: edge_patterns.clone(),
                min_budget: *min_budget,
                usage_count: 0,
                created_at_ms: *at_ms,
            });
        }

        Event::WorkflowTemplateInstantiated { template_id, usage_count, .. } => {
            if let Some(template) = state.workflow_templates.get_mut(template_id) {
                template.usage_count = *usage_count;
            }
        }

        Event::WorkflowGraphCreated { graph_id, template_id, at_ms } => {
            state.workflow_graphs.entry(*graph_id).or_insert_with(|| WorkflowGraph {
                id: *graph_id,
                template_id: *template_id,
                status: WorkflowStatus::Active,
                validation_status: ValidationStatus::Pending,
                validation_errors: Vec::new(),
                created_at_ms: *at_ms,
                updated_at_ms: *at_ms,
            });
            state.graph_nodes_index.entry(*graph_id).or_default();
        }

        Event::WorkflowNodeCreated {
            node_id,
            workflow_graph_id,
            role,
            task_description,
            budget_allocation,
            dependencies,
            position,
            ..
        } => {
            if !state.workflow_nodes.contains_key(node_id) {
                state.workflow_nodes.insert(
                    *node_id,
                    WorkflowNode {
                        id: *node_id,
                        workflow_graph_id: *workflow_graph_id,
                        role: role.clone(),
                        task_description: task_description.clone(),
                        budget_allocation: *budget_allocation,
                        dependencies: dependencies.clone(),
                        execution_status: NodeExecutionStatus::Pending,
                        agent_id: None,
                        result: None,
                        position: *position,
                        error_message: None,
                    },
                );
                state.graph_nodes_index.entry(*workflow_graph_id).or_default().push(*node_id);
            }
        }

        Event::WorkflowGraphValidated { graph_id, status, errors, at_ms } => {
            if let Some(graph) = state.workflow_graphs.get_mut(graph_id) {
                graph.validation_status = *status;
                graph.validation_errors = errors.clone();
                graph.updated_at_ms = *at_ms;
            }
        }

        Event::WorkflowGraphStatusChanged { graph_id, status, at_ms } => {
            if let Some(graph) = state.workflow_graphs.get_mut(graph_id) {
                graph.status = *status;
                graph.updated_at_ms = *at_ms;
            }
        }

        Event::WorkflowNodeStatusChanged { node_id, status, agent_id, result, error_message, .. } => {
            if let Some(node) = state.workflow_nodes.get_mut(node_id) {
                node.execution_status = *status;
                if agent_id.is_some() {
                    node.agent_id = *agent_id;
                }
                if result.is_some() {
                    node.result = result.clone();
                }
                if error_message.is_some() {
                    node.error_message = error_message.clone();
                }
            }
        }

        _ => {}
    }
}
