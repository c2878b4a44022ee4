// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ak-daemon: process wiring for `ak-engine`'s `Kernel` — environment-driven
//! configuration, tracing setup, and the production `TaskRunner`/
//! `WorkspaceAdapter` choices. The binary entry point (`akd`) is a thin
//! shell around [`build_kernel`].

pub mod config;

use ak_adapters::{LocalWorkspaceAdapter, ProcessTaskRunner};
use ak_core::{Result, SystemClock};
use ak_engine::Kernel;
use std::sync::Arc;

/// Opens the store at `config::state_dir()` and wires a production
/// `Kernel<SystemClock>` using `ProcessTaskRunner` and `LocalWorkspaceAdapter`.
///
/// `task_runner_program`/`task_runner_args` select the subprocess each
/// spawned agent's task is piped to; callers running under a different
/// execution backend should construct `Kernel::open` directly instead.
pub fn build_kernel(task_runner_program: &str, task_runner_args: Vec<String>) -> Result<Kernel<SystemClock>> {
    let state_dir = config::state_dir();
    let kernel_config = config::kernel_config_from_env();
    let task_runner = Arc::new(ProcessTaskRunner::new(task_runner_program, task_runner_args));
    let workspace_adapter = Arc::new(LocalWorkspaceAdapter);

    Kernel::open(state_dir.join("store"), task_runner, workspace_adapter, kernel_config)
}
