// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent and hierarchy-edge event handlers.

use super::MaterializedState;
use ak_core::{Agent, AgentStatus, Event, HierarchyEdge};

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::AgentSpawned { agent_id, role, task, depth_level, parent_id, at_ms } => {
            // Guard: a replay must not reset an agent that has since
            // progressed past `pending`.
            state.agents.entry(*agent_id).or_insert_with(|| Agent {
                id: *agent_id,
                role: role.clone(),
                task: task.clone(),
                status: AgentStatus::Pending,
                depth_level: *depth_level,
                parent_id: *parent_id,
                result: None,
                error_message: None,
                created_at_ms: *at_ms,
                updated_at_ms: *at_ms,
                completed_at_ms: None,
            });
        }

        Event::AgentStatusChanged { agent_id, status, result, error_message, at_ms } => {
            if let Some(agent) = state.agents.get_mut(agent_id) {
                agent.status = *status;
                if result.is_some() {
                    agent.result = result.clone();
                }
                if error_message.is_some() {
                    agent.error_message = error_message.clone();
                }
                agent.updated_at_ms = *at_ms;
                if status.is_terminal() {
                    agent.completed_at_ms = Some(*at_ms);
                }
            }
        }

        Event::HierarchyEdgeCreated { edge_id, parent_id, child_id, at_ms } => {
            state.hierarchy_edges.entry(*edge_id).or_insert_with(|| HierarchyEdge {
                id: *edge_id,
                parent_id: *parent_id,
                child_id: *child_id,
                created_at_ms: *at_ms,
            });
            let children = state.children_index.entry(*parent_id).or_default();
            if !children.contains(child_id) {
                children.push(*child_id);
            }
        }

        _ => {}
    }
}
