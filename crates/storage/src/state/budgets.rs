// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget event handlers.
//!
//! Reservation/consumption/reclamation events all carry the *resulting*
//! absolute value rather than a delta, so re-applying an event during WAL
//! replay is idempotent.

use super::MaterializedState;
use ak_core::Event;

pub(crate) fn apply(state: &mut MaterializedState, event: &Event) {
    match event {
        Event::BudgetAllocated { budget } => {
            state.budgets.entry(budget.agent_id).or_insert_with(|| budget.clone());
        }

        Event::BudgetReserved { parent_id, new_reserved, at_ms } => {
            if let Some(budget) = state.budgets.get_mut(parent_id) {
                budget.reserved = *new_reserved;
                budget.updated_at_ms = *at_ms;
            }
        }

        Event::BudgetConsumed { agent_id, new_used, at_ms } => {
            if let Some(budget) = state.budgets.get_mut(agent_id) {
                budget.used = *new_used;
                budget.updated_at_ms = *at_ms;
            }
        }

        Event::BudgetReclaimed { agent_id, parent_id, parent_new_reserved, at_ms, .. } => {
            if let Some(budget) = state.budgets.get_mut(agent_id) {
                budget.reclaimed = true;
                budget.updated_at_ms = *at_ms;
            }
            if let (Some(parent_id), Some(new_reserved)) = (parent_id, parent_new_reserved) {
                if let Some(parent_budget) = state.budgets.get_mut(parent_id) {
                    parent_budget.reserved = *new_reserved;
                    parent_budget.updated_at_ms = *at_ms;
                }
            }
        }

        _ => {}
    }
}
