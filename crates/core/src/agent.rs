// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Agent identifier and lifecycle state machine.
//!
//! An agent is the unit of work: a single delegated invocation of the
//! external task runtime, optionally parented by another agent to form a
//! hierarchy.

use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for an agent instance.
    pub struct AgentId("agt-");
}

/// Lifecycle status of an agent.
///
/// Transitions: `pending -> executing -> {completed, failed}`, and
/// `{pending, executing} -> terminated`. Terminal statuses never transition
/// further.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Pending,
    Executing,
    Completed,
    Failed,
    Terminated,
}

impl AgentStatus {
    /// Whether this status is terminal (no further transitions permitted).
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentStatus::Completed | AgentStatus::Failed | AgentStatus::Terminated)
    }

    /// Whether `self -> next` is a legal transition per the state machine in
    /// `AgentService::set_status`.
    pub fn can_transition_to(&self, next: AgentStatus) -> bool {
        use AgentStatus::*;
        match (*self, next) {
            (Pending, Executing) | (Pending, Terminated) => true,
            (Executing, Completed) | (Executing, Failed) | (Executing, Terminated) => true,
            _ => false,
        }
    }
}

crate::simple_display! {
    AgentStatus {
        Pending => "pending",
        Executing => "executing",
        Completed => "completed",
        Failed => "failed",
        Terminated => "terminated",
    }
}

/// An agent row as persisted by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub role: String,
    pub task: String,
    pub status: AgentStatus,
    pub depth_level: u32,
    pub parent_id: Option<AgentId>,
    pub result: Option<String>,
    pub error_message: Option<String>,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub completed_at_ms: Option<u64>,
}

impl Agent {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

crate::builder! {
    pub struct AgentBuilder => Agent {
        into {
            role: String = "writer",
            task: String = "do the thing",
        }
        set {
            status: AgentStatus = AgentStatus::Pending,
            depth_level: u32 = 0,
            parent_id: Option<AgentId> = None,
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
            completed_at_ms: Option<u64> = None,
        }
        option {
            result: String = None,
            error_message: String = None,
        }
        computed {
            id: AgentId = AgentId::new(),
        }
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
