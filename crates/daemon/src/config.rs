// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.
//!
//! Precedence is explicit builder overrides > `AK_*` environment variables >
//! built-in defaults. Nothing outside this module reads `std::env` for a
//! kernel tunable.

use ak_engine::KernelConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Resolve state directory: `AK_STATE_DIR` > `XDG_STATE_HOME/ak` > `~/.local/state/ak`.
pub fn state_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("AK_STATE_DIR") {
        return PathBuf::from(dir);
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return PathBuf::from(xdg).join("ak");
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".local/state/ak")
}

/// Repository root agents operate against; defaults to the current directory.
pub fn repo_root() -> PathBuf {
    std::env::var("AK_REPO_ROOT").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("."))
}

/// `tracing_subscriber::EnvFilter` directive string.
pub fn log_filter() -> String {
    std::env::var("AK_LOG").unwrap_or_else(|_| "info".to_string())
}

fn env_u32(key: &str) -> Option<u32> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_usize(key: &str) -> Option<usize> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_i64(key: &str) -> Option<i64> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

fn env_duration_secs(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs)
}

fn env_duration_days(key: &str) -> Option<Duration> {
    std::env::var(key).ok().and_then(|s| s.parse::<u64>().ok()).map(|d| Duration::from_secs(d * 86_400))
}

/// Builds a `KernelConfig` from `AK_*` environment variables, falling back to
/// `KernelConfig::default()` for anything unset. `workspace_root`/`repo_root`
/// are resolved against the state directory unless explicitly overridden.
pub fn kernel_config_from_env() -> KernelConfig {
    let defaults = KernelConfig::default();
    let state_dir = state_dir();

    KernelConfig {
        max_depth: env_u32("AK_MAX_DEPTH").unwrap_or(defaults.max_depth),
        poll_interval: env_duration_secs("AK_POLL_INTERVAL_SECS").unwrap_or(defaults.poll_interval),
        max_concurrent_executions: env_usize("AK_MAX_CONCURRENT_EXECUTIONS")
            .unwrap_or(defaults.max_concurrent_executions),
        agent_timeout: env_duration_secs("AK_AGENT_TIMEOUT_SECS").unwrap_or(defaults.agent_timeout),
        workspace_retention: env_duration_days("AK_WORKSPACE_RETENTION_DAYS")
            .unwrap_or(defaults.workspace_retention),
        default_budget: env_i64("AK_DEFAULT_BUDGET").unwrap_or(defaults.default_budget),
        workspace_root: std::env::var("AK_WORKSPACE_ROOT")
            .map(PathBuf::from)
            .unwrap_or_else(|_| state_dir.join("workspaces")),
        repo_root: repo_root(),
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
