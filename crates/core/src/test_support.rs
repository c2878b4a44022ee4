// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::agent::AgentId;
use crate::event::Event;

/// Proptest strategies for core state machine types, used by property tests
/// that cover the quantified invariants (budget conservation, depth bounds,
/// message ordering).
pub mod strategies {
    use crate::agent::AgentStatus;
    use crate::message::MessageStatus;
    use crate::workflow::NodeExecutionStatus;
    use proptest::prelude::*;

    pub fn arb_agent_status() -> impl Strategy<Value = AgentStatus> {
        prop_oneof![
            Just(AgentStatus::Pending),
            Just(AgentStatus::Executing),
            Just(AgentStatus::Completed),
            Just(AgentStatus::Failed),
            Just(AgentStatus::Terminated),
        ]
    }

    pub fn arb_message_status() -> impl Strategy<Value = MessageStatus> {
        prop_oneof![
            Just(MessageStatus::Pending),
            Just(MessageStatus::Delivered),
            Just(MessageStatus::Processed),
            Just(MessageStatus::Failed),
        ]
    }

    pub fn arb_node_execution_status() -> impl Strategy<Value = NodeExecutionStatus> {
        prop_oneof![
            Just(NodeExecutionStatus::Pending),
            Just(NodeExecutionStatus::Ready),
            Just(NodeExecutionStatus::Spawning),
            Just(NodeExecutionStatus::Executing),
            Just(NodeExecutionStatus::Completed),
            Just(NodeExecutionStatus::Failed),
            Just(NodeExecutionStatus::Skipped),
        ]
    }

    /// A non-negative budget triple respecting `used + reserved <= allocated`.
    pub fn arb_consistent_budget_triple() -> impl Strategy<Value = (i64, i64, i64)> {
        (0i64..1_000_000).prop_flat_map(|allocated| {
            (0..=allocated, 0..=allocated).prop_filter_map(
                "used + reserved <= allocated",
                move |(used, reserved)| {
                    if used + reserved <= allocated {
                        Some((allocated, used, reserved))
                    } else {
                        None
                    }
                },
            )
        })
    }
}

pub fn agent_spawned_event(agent_id: AgentId, role: &str, task: &str) -> Event {
    Event::AgentSpawned {
        agent_id,
        role: role.to_string(),
        task: task.to_string(),
        depth_level: 0,
        parent_id: None,
        at_ms: 1_000_000,
    }
}

pub fn agent_status_changed_event(agent_id: AgentId, status: crate::agent::AgentStatus) -> Event {
    Event::AgentStatusChanged {
        agent_id,
        status,
        result: None,
        error_message: None,
        at_ms: 1_000_000,
    }
}
