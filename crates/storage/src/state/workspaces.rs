// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace event handlers.

use super::MaterializedState;
use ak_core::{Event, Workspace, WorkspaceStatus};

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::WorkspaceCreated { workspace_id, agent_id, path, branch_name, at_ms } => {
            state.workspaces.entry(*agent_id).or_insert_with(|| Workspace {
                id: *workspace_id,
                agent_id: *agent_id,
                path: path.clone(),
                branch_name: branch_name.clone(),
                isolation_status: WorkspaceStatus::Active,
                created_at_ms: *at_ms,
                updated_at_ms: *at_ms,
            });
        }

        Event::WorkspaceStatusChanged { agent_id, status, at_ms } => {
            if let Some(workspace) = state.workspaces.get_mut(agent_id) {
                workspace.isolation_status = *status;
                workspace.updated_at_ms = *at_ms;
            }
        }

        _ => {}
    }
}
