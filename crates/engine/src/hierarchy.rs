// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hierarchy queries and cycle-checked edge creation.
//!
//! `create_relation` is only ever called from inside `AgentService::spawn`'s
//! transaction; this module exposes the read-only traversal helpers plus the
//! pure cycle/depth checks that transaction relies on.

use ak_core::{AgentId, Error, HierarchyTree, Result};
use ak_storage::MaterializedState;

pub struct HierarchyManager {
    max_depth: u32,
}

impl HierarchyManager {
    pub fn new(max_depth: u32) -> Self {
        Self { max_depth }
    }

    /// Checked before a hierarchy edge is written. `child` must not already
    /// be an ancestor of `parent` (which would close a cycle) and must not
    /// equal `parent`.
    pub fn check_cycle(&self, state: &MaterializedState, parent: AgentId, child: AgentId) -> Result<()> {
        if parent == child {
            return Err(Error::Cycle(format!("{parent} cannot be its own parent")));
        }
        for ancestor in self.ancestors(state, parent) {
            if ancestor == child {
                return Err(Error::Cycle(format!("{child} is already an ancestor of {parent}")));
            }
        }
        Ok(())
    }

    /// Validates the depth a new child would sit at, given its parent.
    pub fn check_depth(&self, parent_depth: u32) -> Result<u32> {
        let child_depth = parent_depth + 1;
        if child_depth > self.max_depth {
            return Err(Error::DepthExceeded { depth: child_depth, max_depth: self.max_depth });
        }
        Ok(child_depth)
    }

    pub fn children(&self, state: &MaterializedState, parent: AgentId) -> Vec<AgentId> {
        state.children(parent)
    }

    pub fn ancestors(&self, state: &MaterializedState, start: AgentId) -> Vec<AgentId> {
        let mut chain = Vec::new();
        let mut current = state.agents.get(&start).and_then(|a| a.parent_id);
        while let Some(id) = current {
            chain.push(id);
            current = state.agents.get(&id).and_then(|a| a.parent_id);
        }
        chain
    }

    pub fn descendants(&self, state: &MaterializedState, root: AgentId, max_depth: Option<u32>) -> Vec<AgentId> {
        let mut out = Vec::new();
        let mut frontier = vec![(root, 0u32)];
        while let Some((node, depth)) = frontier.pop() {
            if let Some(limit) = max_depth {
                if depth >= limit {
                    continue;
                }
            }
            for child in state.children(node) {
                out.push(child);
                frontier.push((child, depth + 1));
            }
        }
        out
    }

    pub fn siblings(&self, state: &MaterializedState, child: AgentId) -> Vec<AgentId> {
        match state.agents.get(&child).and_then(|a| a.parent_id) {
            Some(parent) => state.children(parent).into_iter().filter(|id| *id != child).collect(),
            None => Vec::new(),
        }
    }

    pub fn hierarchy_tree(&self, state: &MaterializedState, root: AgentId, max_depth: Option<u32>) -> HierarchyTree {
        self.build_tree(state, root, max_depth, 0)
    }

    fn build_tree(&self, state: &MaterializedState, node: AgentId, max_depth: Option<u32>, depth: u32) -> HierarchyTree {
        let children = if max_depth.is_some_and(|limit| depth >= limit) {
            Vec::new()
        } else {
            state.children(node).into_iter().map(|c| self.build_tree(state, c, max_depth, depth + 1)).collect()
        };
        HierarchyTree { agent_id: node, children }
    }
}

#[cfg(test)]
#[path = "hierarchy_tests.rs"]
mod tests;
