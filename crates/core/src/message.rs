// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Inter-agent message envelope and delivery state machine.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a message.
    pub struct MessageId("msg-");
}

/// Delivery status of a message. Transitions are monotonic through the
/// listed order; `Failed` is reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Pending,
    Delivered,
    Processed,
    Failed,
}

impl MessageStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, MessageStatus::Processed | MessageStatus::Failed)
    }
}

crate::simple_display! {
    MessageStatus {
        Pending => "pending",
        Delivered => "delivered",
        Processed => "processed",
        Failed => "failed",
    }
}

/// An inter-agent message. `priority` is clamped to `[0, 10]` by callers at
/// the `MessageQueue::send` boundary; `payload` is opaque JSON, unbounded in
/// size at this layer (see Open Questions in the design notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: Option<AgentId>,
    pub recipient_id: AgentId,
    pub payload: serde_json::Value,
    pub priority: u8,
    pub status: MessageStatus,
    pub thread_id: Option<String>,
    pub created_at_ms: u64,
}

crate::builder! {
    pub struct MessageBuilder => Message {
        option {
            sender_id: AgentId = None,
            thread_id: String = None,
        }
        set {
            recipient_id: AgentId = AgentId::new(),
            payload: serde_json::Value = serde_json::Value::Null,
            priority: u8 = 5,
            status: MessageStatus = MessageStatus::Pending,
            created_at_ms: u64 = 0,
        }
        computed {
            id: MessageId = MessageId::new(),
        }
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
