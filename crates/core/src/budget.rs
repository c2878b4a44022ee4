// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Budget entity: hierarchical token accounting, one row per agent.
//!
//! `reserved` isolates capacity loaned to children so a parent cannot
//! double-spend what it has already promised downstream. See
//! `ak-engine::budget` for the allocate/consume/reclaim operations that
//! maintain the invariants below.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

/// A budget row. Invariant: `0 <= used`, `0 <= reserved`,
/// `used + reserved <= allocated`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub agent_id: AgentId,
    pub allocated: i64,
    pub used: i64,
    pub reserved: i64,
    pub reclaimed: bool,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
}

impl Budget {
    /// Tokens neither spent nor promised to children.
    pub fn remaining(&self) -> i64 {
        self.allocated - self.used - self.reserved
    }

    /// Whether the accounting invariant holds. Used defensively at the
    /// boundary of every mutating operation.
    pub fn is_consistent(&self) -> bool {
        self.used >= 0
            && self.reserved >= 0
            && self.allocated >= 0
            && self.used + self.reserved <= self.allocated
    }
}

crate::builder! {
    pub struct BudgetBuilder => Budget {
        set {
            agent_id: AgentId = AgentId::new(),
            allocated: i64 = 10_000,
            used: i64 = 0,
            reserved: i64 = 0,
            reclaimed: bool = false,
            created_at_ms: u64 = 0,
            updated_at_ms: u64 = 0,
        }
    }
}

#[cfg(test)]
#[path = "budget_tests.rs"]
mod tests;
