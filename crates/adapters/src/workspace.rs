// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace filesystem adapter.
//!
//! `WorkspaceManager` (in `ak-engine`) owns the workspace row's lifecycle
//! and transitions; this adapter only does filesystem/git work in a
//! background task and reports back success or failure. Kept separate so
//! engine tests can swap in `FakeWorkspaceAdapter` and never touch disk.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

/// Timeout for `git worktree` subprocess calls; generous because `add` may
/// need to fetch objects on a cold clone.
const GIT_WORKTREE_TIMEOUT: Duration = Duration::from_secs(60);

/// Parameters for provisioning one agent's workspace.
pub struct ProvisionRequest {
    pub path: PathBuf,
    pub repo_root: PathBuf,
    pub branch_name: String,
    pub start_point: String,
}

#[async_trait]
pub trait WorkspaceAdapter: Send + Sync {
    /// Creates a branch + worktree at `req.path`. Errors are returned, not
    /// panicked on: `WorkspaceManager::create` treats them as non-fatal and
    /// leaves the agent running without a workspace.
    async fn provision(&self, req: ProvisionRequest) -> Result<(), String>;

    /// Removes the worktree and its branch. Best-effort; called from the
    /// cleanup sweeper as well as `destroy`, so repeated calls on an
    /// already-removed path must not error.
    async fn destroy(&self, path: &Path, branch_name: &str, repo_root: &Path) -> Result<(), String>;

    /// `git diff <start_point>..<branch_name>`, run from `repo_root`.
    async fn diff(&self, repo_root: &Path, branch_name: &str, start_point: &str) -> Result<String, String>;
}

/// Real git-backed adapter: one worktree per agent, rooted at a fresh
/// branch off `start_point`.
pub struct LocalWorkspaceAdapter;

#[async_trait]
impl WorkspaceAdapter for LocalWorkspaceAdapter {
    async fn provision(&self, req: ProvisionRequest) -> Result<(), String> {
        if let Some(parent) = req.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| format!("failed to create workspace parent dir: {e}"))?;
        }

        let path_str = req.path.display().to_string();
        let mut cmd = Command::new("git");
        cmd.args([
            "-C",
            &req.repo_root.display().to_string(),
            "worktree",
            "add",
            "-b",
            &req.branch_name,
            &path_str,
            &req.start_point,
        ])
        .env_remove("GIT_DIR")
        .env_remove("GIT_WORK_TREE");

        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git worktree add failed: {}", stderr.trim()));
        }
        Ok(())
    }

    async fn destroy(&self, path: &Path, branch_name: &str, repo_root: &Path) -> Result<(), String> {
        if path.exists() {
            let mut cmd = Command::new("git");
            cmd.args(["-C", &repo_root.display().to_string(), "worktree", "remove", "--force"])
                .arg(path);
            let _ = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT).await;
        }

        let mut cmd = Command::new("git");
        cmd.args(["-C", &repo_root.display().to_string(), "branch", "-D", branch_name]);
        let _ = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT).await;

        Ok(())
    }

    async fn diff(&self, repo_root: &Path, branch_name: &str, start_point: &str) -> Result<String, String> {
        let mut cmd = Command::new("git");
        cmd.args([
            "-C",
            &repo_root.display().to_string(),
            "diff",
            &format!("{start_point}..{branch_name}"),
        ]);
        let output = run_with_timeout(cmd, GIT_WORKTREE_TIMEOUT).await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git diff failed: {}", stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

async fn run_with_timeout(mut cmd: Command, timeout: Duration) -> Result<std::process::Output, String> {
    tokio::time::timeout(timeout, cmd.output())
        .await
        .map_err(|_| "git subprocess timed out".to_string())?
        .map_err(|e| format!("failed to spawn git subprocess: {e}"))
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeWorkspaceAdapter;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory adapter for engine/kernel tests: `provision`/`destroy`
    /// succeed without touching disk. `fail_provision` lets a test exercise
    /// the non-blocking-failure path in `WorkspaceManager::create`.
    #[derive(Default)]
    pub struct FakeWorkspaceAdapter {
        fail_provision: AtomicBool,
    }

    impl FakeWorkspaceAdapter {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn set_fail_provision(&self, fail: bool) {
            self.fail_provision.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl WorkspaceAdapter for FakeWorkspaceAdapter {
        async fn provision(&self, _req: ProvisionRequest) -> Result<(), String> {
            if self.fail_provision.load(Ordering::SeqCst) {
                Err("simulated provision failure".into())
            } else {
                Ok(())
            }
        }

        async fn destroy(&self, _path: &Path, _branch_name: &str, _repo_root: &Path) -> Result<(), String> {
            Ok(())
        }

        async fn diff(&self, _repo_root: &Path, _branch_name: &str, _start_point: &str) -> Result<String, String> {
            Ok(String::new())
        }
    }
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
