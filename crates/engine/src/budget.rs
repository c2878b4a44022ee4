// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchical token-budget accounting.
//!
//! Every operation here runs inside a single `Store::with_transaction` call
//! so the parent-reserve / child-insert pair (and the reclaim-then-parent-
//! adjust pair) are atomic and observe a consistent lock order: the parent
//! budget row is always read and mutated before the child's.

use ak_core::{AgentId, Budget, Clock, Error, Event, Result};
use ak_storage::{MaterializedState, Store};

pub struct BudgetManager<C: Clock> {
    clock: C,
}

impl<C: Clock> BudgetManager<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    /// Allocates a budget row for `agent`. If `parent_id` is set, reserves
    /// `amount` out of the parent's remaining capacity in the same
    /// transaction; fails with `Error::InsufficientBudget` if the parent
    /// cannot cover it.
    pub fn allocate(&self, store: &Store, agent_id: AgentId, parent_id: Option<AgentId>, amount: i64) -> Result<Budget> {
        let now = self.clock.epoch_ms();
        store.with_transaction(|state| {
            let mut events = Vec::new();

            if let Some(parent_id) = parent_id {
                let parent = state
                    .budgets
                    .get(&parent_id)
                    .ok_or_else(|| Error::NotFound(format!("budget for parent {parent_id}")))?;
                let available = parent.remaining();
                if available < amount {
                    return Err(Error::InsufficientBudget { available, requested: amount });
                }
                let new_reserved = parent.reserved + amount;
                events.push(Event::BudgetReserved { parent_id, new_reserved, at_ms: now });
            }

            let budget = Budget {
                agent_id,
                allocated: amount,
                used: 0,
                reserved: 0,
                reclaimed: false,
                created_at_ms: now,
                updated_at_ms: now,
            };
            events.push(Event::BudgetAllocated { budget: budget.clone() });
            Ok((events, budget))
        })
    }

    /// Commits `amount` tokens of usage. Fails with `Error::Overrun` if it
    /// would push `used + reserved` past `allocated`. Releases the consumed
    /// amount from the parent's `reserved` pool in the same transaction, so
    /// `parent.reserved` always equals the live (non-terminal) children's
    /// outstanding `allocated - used`, not their original allocation.
    pub fn consume(&self, store: &Store, agent_id: AgentId, amount: i64) -> Result<i64> {
        let now = self.clock.epoch_ms();
        store.with_transaction(|state| {
            let budget = state
                .budgets
                .get(&agent_id)
                .ok_or_else(|| Error::NotFound(format!("budget for agent {agent_id}")))?;
            let new_used = budget.used + amount;
            let remaining_after = budget.allocated - new_used - budget.reserved;
            if remaining_after < 0 {
                return Err(Error::Overrun { amount, remaining: budget.remaining() });
            }

            let mut events = vec![Event::BudgetConsumed { agent_id, new_used, at_ms: now }];

            let parent_id = state.agents.get(&agent_id).and_then(|a| a.parent_id);
            if let Some(parent_id) = parent_id {
                if let Some(parent) = state.budgets.get(&parent_id) {
                    let new_reserved = (parent.reserved - amount).max(0);
                    events.push(Event::BudgetReserved { parent_id, new_reserved, at_ms: now });
                }
            }

            Ok((events, new_used))
        })
    }

    /// Reclaims `child`'s unused allocation into its parent's `reserved`
    /// pool. Idempotent: a second call on an already-reclaimed budget is a
    /// no-op that returns `0`.
    pub fn reclaim(&self, store: &Store, child: AgentId) -> Result<i64> {
        let now = self.clock.epoch_ms();
        store.with_transaction(|state| {
            let budget = state
                .budgets
                .get(&child)
                .ok_or_else(|| Error::NotFound(format!("budget for agent {child}")))?;

            if budget.reclaimed {
                return Ok((Vec::new(), 0));
            }

            let unused = budget.allocated - budget.used;
            let parent_id = state.agents.get(&child).and_then(|a| a.parent_id);
            let parent_new_reserved = parent_id.and_then(|p| {
                state.budgets.get(&p).map(|parent| (parent.reserved - unused).max(0))
            });

            let event = Event::BudgetReclaimed { agent_id: child, parent_id, parent_new_reserved, unused, at_ms: now };
            Ok((vec![event], unused))
        })
    }

    pub fn remaining(&self, state: &MaterializedState, agent_id: AgentId) -> Result<i64> {
        state
            .budgets
            .get(&agent_id)
            .map(Budget::remaining)
            .ok_or_else(|| Error::NotFound(format!("budget for agent {agent_id}")))
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
