// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `TaskRunner`: the boundary between the kernel and whatever actually
//! executes an agent's task (an LLM-backed coding agent, a shell script, a
//! remote worker). The kernel only ever sees this trait; prompting, tool
//! use, and streaming live on the other side of it.

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Per-agent execution parameters the runner needs but the kernel otherwise
/// treats as opaque.
#[derive(Debug, Clone, Default)]
pub struct RoleConfig {
    pub role: String,
    pub system_prompt: Option<String>,
}

/// Outcome of one `TaskRunner::execute` call.
#[derive(Debug, Clone)]
pub struct TaskOutcome {
    pub output: String,
    pub tokens_used: u64,
    pub cost_usd: f64,
    pub duration_ms: u64,
    pub is_error: bool,
    pub error: Option<String>,
}

impl TaskOutcome {
    pub fn success(output: impl Into<String>, tokens_used: u64) -> Self {
        Self {
            output: output.into(),
            tokens_used,
            cost_usd: 0.0,
            duration_ms: 0,
            is_error: false,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        let error = error.into();
        Self {
            output: String::new(),
            tokens_used: 0,
            cost_usd: 0.0,
            duration_ms: 0,
            is_error: true,
            error: Some(error),
        }
    }
}

/// Executes one agent's task to completion (or failure). Implementations
/// MUST honor `cancel` promptly; `ExecutionWorker` cancels it when an
/// agent's `AGENT_TIMEOUT` elapses, and a runner that ignores the token
/// wedges the worker's concurrency slot indefinitely.
#[async_trait]
pub trait TaskRunner: Send + Sync {
    async fn execute(
        &self,
        task: &str,
        workspace_path: Option<&PathBuf>,
        role_config: &RoleConfig,
        cancel: CancellationToken,
    ) -> TaskOutcome;
}

/// Runs the task by piping it to a subprocess's stdin and treating stdout
/// as `output`; token/cost accounting is left at zero since a plain
/// subprocess has no notion of them. Prompting, tool use, and streaming —
/// anything specific to an LLM-backed executor — are entirely the
/// subprocess's concern, not this adapter's.
pub struct ProcessTaskRunner {
    program: String,
    args: Vec<String>,
}

impl ProcessTaskRunner {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }
}

#[async_trait]
impl TaskRunner for ProcessTaskRunner {
    async fn execute(
        &self,
        task: &str,
        workspace_path: Option<&PathBuf>,
        role_config: &RoleConfig,
        cancel: CancellationToken,
    ) -> TaskOutcome {
        let started = Instant::now();
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("AK_AGENT_ROLE", &role_config.role)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(prompt) = &role_config.system_prompt {
            cmd.env("AK_SYSTEM_PROMPT", prompt);
        }
        if let Some(path) = workspace_path {
            cmd.current_dir(path);
        }

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return TaskOutcome::failure(format!("failed to spawn task runner process: {e}")),
        };

        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(task.as_bytes()).await {
                return TaskOutcome::failure(format!("failed to write task to subprocess stdin: {e}"));
            }
        }

        let mut outcome = tokio::select! {
            _ = cancel.cancelled() => {
                let _ = child.kill().await;
                TaskOutcome::failure("task execution cancelled")
            }
            output = child.wait_with_output() => match output {
                Ok(output) if output.status.success() => {
                    TaskOutcome::success(String::from_utf8_lossy(&output.stdout).into_owned(), 0)
                }
                Ok(output) => TaskOutcome::failure(format!(
                    "process exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                )),
                Err(e) => TaskOutcome::failure(format!("subprocess execution failed: {e}")),
            },
        };
        outcome.duration_ms = started.elapsed().as_millis() as u64;
        outcome
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeOutcome, FakeTaskRunner};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Scripted response `FakeTaskRunner` hands back for one `execute` call.
    #[derive(Debug, Clone)]
    pub enum FakeOutcome {
        Succeed { output: String, tokens_used: u64 },
        Fail { error: String },
        /// Sleeps until `cancel` fires (or forever, if nothing cancels it)
        /// to exercise `ExecutionWorker`'s timeout path deterministically.
        Hang,
    }

    /// In-memory `TaskRunner` for engine and kernel tests. Responses are
    /// consumed in FIFO order; once exhausted, falls back to
    /// `FakeOutcome::Succeed` with zero tokens so unconfigured tests don't
    /// panic on an empty queue.
    pub struct FakeTaskRunner {
        responses: Mutex<VecDeque<FakeOutcome>>,
    }

    impl FakeTaskRunner {
        pub fn new() -> Self {
            Self { responses: Mutex::new(VecDeque::new()) }
        }

        /// Queues a response; the first `execute` call consumes the first
        /// one queued.
        pub fn push(&self, outcome: FakeOutcome) {
            self.responses.lock().push_back(outcome);
        }
    }

    impl Default for FakeTaskRunner {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl TaskRunner for FakeTaskRunner {
        async fn execute(
            &self,
            _task: &str,
            _workspace_path: Option<&PathBuf>,
            _role_config: &RoleConfig,
            cancel: CancellationToken,
        ) -> TaskOutcome {
            let next = self.responses.lock().pop_front();
            match next {
                Some(FakeOutcome::Succeed { output, tokens_used }) => {
                    TaskOutcome::success(output, tokens_used)
                }
                Some(FakeOutcome::Fail { error }) => TaskOutcome::failure(error),
                Some(FakeOutcome::Hang) => {
                    tokio::select! {
                        _ = cancel.cancelled() => TaskOutcome::failure("cancelled"),
                        _ = tokio::time::sleep(Duration::from_secs(3600)) => TaskOutcome::failure("hang exhausted"),
                    }
                }
                None => TaskOutcome::success("", 0),
            }
        }
    }
}

#[cfg(test)]
#[path = "task_runner_tests.rs"]
mod tests;
