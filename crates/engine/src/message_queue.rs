// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Priority + FIFO inter-agent message queue.
//!
//! Ordering is `priority DESC, created_at ASC, id ASC`; the `id` tiebreaker
//! is mandatory since two messages enqueued in the same millisecond would
//! otherwise sort nondeterministically.

use ak_core::{AgentId, Clock, Error, Event, Message, MessageId, MessageStatus, Result};
use ak_storage::{MaterializedState, Store};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Tracks message ids currently leased to a `receive` caller so two
/// concurrent consumers on the same recipient never observe the same
/// pending message twice. Cleared on `mark_delivered` / `mark_processed` /
/// `mark_failed`.
#[derive(Default)]
struct Leases {
    held: HashSet<MessageId>,
}

pub struct MessageQueue<C: Clock> {
    clock: C,
    leases: Arc<Mutex<Leases>>,
}

impl<C: Clock> MessageQueue<C> {
    pub fn new(clock: C) -> Self {
        Self { clock, leases: Arc::new(Mutex::new(Leases::default())) }
    }

    pub fn send(
        &self,
        store: &Store,
        sender_id: Option<AgentId>,
        recipient_id: AgentId,
        payload: serde_json::Value,
        priority: u8,
        thread_id: Option<String>,
    ) -> Result<Message> {
        let now = self.clock.epoch_ms();
        let message_id = MessageId::new();
        store.with_transaction(|state| {
            if !state.agents.contains_key(&recipient_id) {
                return Err(Error::NotFound(format!("agent {recipient_id}")));
            }
            let event = Event::MessageSent {
                message_id,
                sender_id,
                recipient_id,
                payload: payload.clone(),
                priority,
                thread_id: thread_id.clone(),
                at_ms: now,
            };
            let message = Message {
                id: message_id,
                sender_id,
                recipient_id,
                payload,
                priority,
                status: MessageStatus::Pending,
                thread_id,
                created_at_ms: now,
            };
            Ok((vec![event], message))
        })
    }

    /// Returns up to `limit` pending, unleased messages for `recipient`, in
    /// `(priority DESC, created_at ASC, id ASC)` order, and leases them.
    /// Does not advance their status; the caller must `mark_delivered` or
    /// `mark_processed`.
    pub fn receive(&self, store: &Store, recipient: AgentId, limit: usize) -> Vec<Message> {
        let mut leases = self.leases.lock();
        store.view(|state| {
            let mut candidates: Vec<&Message> = state
                .messages
                .values()
                .filter(|m| m.recipient_id == recipient)
                .filter(|m| m.status == MessageStatus::Pending)
                .filter(|m| !leases.held.contains(&m.id))
                .collect();

            candidates.sort_by(|a, b| {
                b.priority
                    .cmp(&a.priority)
                    .then(a.created_at_ms.cmp(&b.created_at_ms))
                    .then(a.id.as_str().cmp(b.id.as_str()))
            });

            candidates
                .into_iter()
                .take(limit)
                .map(|m| {
                    leases.held.insert(m.id);
                    m.clone()
                })
                .collect()
        })
    }

    pub fn mark_delivered(&self, store: &Store, message_id: MessageId) -> Result<()> {
        self.transition(store, message_id, MessageStatus::Delivered)
    }

    pub fn mark_processed(&self, store: &Store, message_id: MessageId) -> Result<()> {
        self.transition(store, message_id, MessageStatus::Processed)
    }

    /// Moves the message to the dead-letter (`failed`) terminal state.
    /// Retry policy, if any, is the caller's responsibility.
    pub fn mark_failed(&self, store: &Store, message_id: MessageId, _reason: &str) -> Result<()> {
        self.transition(store, message_id, MessageStatus::Failed)
    }

    fn transition(&self, store: &Store, message_id: MessageId, status: MessageStatus) -> Result<()> {
        let now = self.clock.epoch_ms();
        let released = store.with_transaction(|state| {
            if !state.messages.contains_key(&message_id) {
                return Err(Error::NotFound(format!("message {message_id}")));
            }
            let event = Event::MessageStatusChanged { message_id, status, at_ms: now };
            Ok((vec![event], ()))
        });
        self.leases.lock().held.remove(&message_id);
        released
    }

    pub fn view<T>(&self, store: &Store, f: impl FnOnce(&MaterializedState) -> T) -> T {
        store.view(f)
    }
}

#[cfg(test)]
#[path = "message_queue_tests.rs"]
mod tests;
