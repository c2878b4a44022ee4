// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace identifier and isolation lifecycle.
//!
//! A workspace is a per-agent git worktree rooted at its own branch. It is
//! one-to-one with an agent and has its own lifecycle independent of the
//! agent's status: an agent can complete while its workspace lingers for
//! inspection until the cleanup sweeper reclaims it.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

crate::define_id! {
    /// Unique identifier for a workspace instance.
    pub struct WorkspaceId("wks-");
}

/// Isolation status of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceStatus {
    /// Worktree and branch exist; the agent may read/write within it.
    Active,
    /// Agent completed and its branch was merged; worktree retained for diff.
    Merged,
    /// Agent failed or was terminated; worktree retained for inspection.
    Abandoned,
    /// Worktree and branch removed by `destroy` or the cleanup sweeper.
    CleanedUp,
}

impl WorkspaceStatus {
    /// Statuses eligible for the cleanup sweeper once past the retention
    /// window.
    pub fn is_sweepable(&self) -> bool {
        matches!(self, WorkspaceStatus::Merged | WorkspaceStatus::Abandoned)
    }
}

crate::simple_display! {
    WorkspaceStatus {
        Active => "active",
        Merged => "merged",
        Abandoned => "abandoned",
        CleanedUp => "cleaned_up",
    }
}

/// A workspace row. Unique on `agent_id`, on `path`, and on `branch_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub agent_id: AgentId,
    pub path: PathBuf,
    pub branch_name: String,
    pub isolation_status: WorkspaceStatus,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

crate::builder! {
    pub struct WorkspaceBuilder => Workspace {
        into {
            branch_name: String = "agent-test",
        }
        set {
            agent_id: AgentId = AgentId::new(),
            path: PathBuf = PathBuf::from("/tmp/workspace"),
            isolation_status: WorkspaceStatus = WorkspaceStatus::Active,
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
        computed {
            id: WorkspaceId = WorkspaceId::new(),
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
