// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchy edge: a denormalized parent -> child relation used for
//! efficient traversal without an in-process pointer graph.

use crate::agent::AgentId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Unique identifier for a hierarchy edge.
    pub struct HierarchyEdgeId("hed-");
}

/// A directed parent -> child edge. Unique on `(parent_id, child_id)`;
/// `parent_id != child_id` is enforced by `HierarchyManager::create_relation`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub id: HierarchyEdgeId,
    pub parent_id: AgentId,
    pub child_id: AgentId,
    pub created_at_ms: u64,
}

crate::builder! {
    pub struct HierarchyEdgeBuilder => HierarchyEdge {
        set {
            parent_id: AgentId = AgentId::new(),
            child_id: AgentId = AgentId::new(),
            created_at_ms: u64 = 0,
        }
        computed {
            id: HierarchyEdgeId = HierarchyEdgeId::new(),
        }
    }
}

/// A rooted, nested view of the hierarchy, computed by
/// `HierarchyManager::hierarchy_tree` for presentation layers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HierarchyTree {
    pub agent_id: AgentId,
    pub children: Vec<HierarchyTree>,
}

#[cfg(test)]
#[path = "hierarchy_tests.rs"]
mod tests;
