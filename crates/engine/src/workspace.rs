// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-agent git-worktree workspace lifecycle.
//!
//! `create` records the workspace row immediately (so the caller has the
//! assigned path without blocking) and kicks off filesystem provisioning in
//! a background task; failure there is logged and leaves the agent running
//! with `workspace = None` rather than failing the spawn.

use ak_adapters::{ProvisionRequest, WorkspaceAdapter};
use ak_core::{AgentId, Clock, Error, Event, Result, Workspace, WorkspaceStatus};
use ak_storage::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, warn};

/// Age beyond which a `merged`/`abandoned` workspace is purged by the
/// cleanup sweeper, expressed in whole days for config-file friendliness.
const DEFAULT_RETENTION_DAYS: u64 = 7;

pub struct WorkspaceManager<C: Clock> {
    clock: C,
    adapter: Arc<dyn WorkspaceAdapter>,
    root: PathBuf,
    repo_root: PathBuf,
    retention: Duration,
}

impl<C: Clock> WorkspaceManager<C> {
    pub fn new(clock: C, adapter: Arc<dyn WorkspaceAdapter>, root: PathBuf, repo_root: PathBuf) -> Self {
        Self { clock, adapter, root, repo_root, retention: Duration::from_secs(DEFAULT_RETENTION_DAYS * 86_400) }
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Records the workspace row and spawns provisioning; returns
    /// immediately. Call sites must treat a provisioning failure (logged,
    /// not surfaced here) as "no workspace available" for this agent.
    pub async fn create(&self, store: &Store, agent_id: AgentId) -> Result<Workspace> {
        let branch_name = format!("agent-{agent_id}");
        let path = self.root.join(".worktrees").join(agent_id.as_str());
        let now = self.clock.epoch_ms();

        let workspace_id = ak_core::WorkspaceId::new();
        let workspace = store.with_transaction(|state| {
            if state.workspaces.contains_key(&agent_id) {
                return Err(Error::Conflict(format!("workspace already exists for {agent_id}")));
            }
            let event = Event::WorkspaceCreated {
                workspace_id,
                agent_id,
                path: path.clone(),
                branch_name: branch_name.clone(),
                at_ms: now,
            };
            let workspace = Workspace {
                id: workspace_id,
                agent_id,
                path: path.clone(),
                branch_name: branch_name.clone(),
                isolation_status: WorkspaceStatus::Active,
                created_at_ms: now,
                updated_at_ms: now,
            };
            Ok((vec![event], workspace))
        })?;

        let adapter = self.adapter.clone();
        let req = ProvisionRequest {
            path: path.clone(),
            repo_root: self.repo_root.clone(),
            branch_name: branch_name.clone(),
            start_point: "HEAD".into(),
        };
        tokio::spawn(async move {
            if let Err(reason) = adapter.provision(req).await {
                warn!(%agent_id, %reason, "workspace provisioning failed; agent continues without one");
            }
        });

        Ok(workspace)
    }

    /// Transitions the workspace's status without touching the filesystem;
    /// used when an agent completes/fails/terminates.
    pub fn mark_status(&self, store: &Store, agent_id: AgentId, status: WorkspaceStatus) -> Result<()> {
        let now = self.clock.epoch_ms();
        store.with_transaction(|state| {
            if !state.workspaces.contains_key(&agent_id) {
                return Ok((Vec::new(), ()));
            }
            let event = Event::WorkspaceStatusChanged { agent_id, status, at_ms: now };
            Ok((vec![event], ()))
        })
    }

    /// Removes the worktree/branch and sets `isolation_status = cleaned_up`.
    pub async fn destroy(&self, store: &Store, agent_id: AgentId) -> Result<()> {
        let workspace = store.view(|state| state.workspaces.get(&agent_id).cloned());
        let Some(workspace) = workspace else {
            return Ok(());
        };

        if let Err(reason) = self.adapter.destroy(&workspace.path, &workspace.branch_name, &self.repo_root).await {
            error!(%agent_id, %reason, "workspace destroy failed");
        }

        self.mark_status(store, agent_id, WorkspaceStatus::CleanedUp)
    }

    pub async fn diff(&self, store: &Store, agent_id: AgentId) -> Result<String> {
        let workspace = store
            .view(|state| state.workspaces.get(&agent_id).cloned())
            .ok_or_else(|| Error::NotFound(format!("workspace for agent {agent_id}")))?;
        self.adapter
            .diff(&self.repo_root, &workspace.branch_name, "HEAD")
            .await
            .map_err(Error::External)
    }

    /// One sweep: destroys every workspace past retention whose status is
    /// sweepable. Intended to run on a timer alongside `ExecutionWorker`.
    pub async fn sweep(&self, store: &Store) {
        let now = self.clock.epoch_ms();
        let retention_ms = self.retention.as_millis() as u64;
        let candidates: Vec<AgentId> = store.view(|state| {
            state
                .workspaces
                .values()
                .filter(|w| w.isolation_status.is_sweepable())
                .filter(|w| now.saturating_sub(w.updated_at_ms) > retention_ms)
                .map(|w| w.agent_id)
                .collect()
        });

        for agent_id in candidates {
            if let Err(reason) = self.destroy(store, agent_id).await {
                warn!(%agent_id, %reason, "cleanup sweep failed to destroy workspace");
            }
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
