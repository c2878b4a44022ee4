// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Message event handlers.

use super::MaterializedState;
use ak_core::{Event, Message, MessageStatus};

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::MessageSent {
            message_id,
            sender_id,
            recipient_id,
            payload,
            priority,
            thread_id,
            at_ms,
        } => {
            state.messages.entry(*message_id).or_insert_with(|| Message {
                id: *message_id,
                sender_id: *sender_id,
                recipient_id: *recipient_id,
                payload: payload.clone(),
                priority: *priority,
                status: MessageStatus::Pending,
                thread_id: thread_id.clone(),
                created_at_ms: *at_ms,
            });
        }

        Event::MessageStatusChanged { message_id, status, .. } => {
            if let Some(message) = state.messages.get_mut(message_id) {
                message.status = *status;
            }
        }

        _ => {}
    }
}
