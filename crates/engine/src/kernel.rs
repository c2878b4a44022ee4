// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `Kernel`: the composition root. Wires every manager together, starts the
//! background loops, and exposes the single programmatic API surface
//! callers (a CLI, an HTTP layer, tests) use instead of touching the
//! managers directly.

use crate::agent_service::AgentService;
use crate::budget::BudgetManager;
use crate::execution_worker::ExecutionWorker;
use crate::hierarchy::HierarchyManager;
use crate::message_queue::MessageQueue;
use crate::workflow::{WorkflowEngine, WorkflowProgress};
use crate::workflow_poller::WorkflowPoller;
use crate::workspace::WorkspaceManager;
use ak_adapters::{TaskRunner, WorkspaceAdapter};
use ak_core::{
    Agent, AgentId, AgentStatus, Budget, Clock, EdgePattern, HierarchyTree, Message, NodeTemplate,
    Result, SystemClock, ValidationStatus, WorkflowGraphId, WorkflowTemplateId, DEFAULT_BUDGET,
    DEFAULT_MAX_DEPTH,
};
use ak_storage::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_MAX_CONCURRENT_EXECUTIONS: usize = 16;
const DEFAULT_AGENT_TIMEOUT: Duration = Duration::from_secs(30 * 60);
const DEFAULT_WORKSPACE_RETENTION: Duration = Duration::from_secs(7 * 86_400);

/// The recognized, enumerated configuration surface. Field names mirror the
/// `AK_*` environment variables `ak-daemon` binds them to.
#[derive(Debug, Clone)]
pub struct KernelConfig {
    pub max_depth: u32,
    pub poll_interval: Duration,
    pub max_concurrent_executions: usize,
    pub agent_timeout: Duration,
    pub workspace_retention: Duration,
    pub default_budget: i64,
    pub workspace_root: PathBuf,
    pub repo_root: PathBuf,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_concurrent_executions: DEFAULT_MAX_CONCURRENT_EXECUTIONS,
            agent_timeout: DEFAULT_AGENT_TIMEOUT,
            workspace_retention: DEFAULT_WORKSPACE_RETENTION,
            default_budget: DEFAULT_BUDGET,
            workspace_root: PathBuf::from("."),
            repo_root: PathBuf::from("."),
        }
    }
}

pub struct Kernel<C: Clock = SystemClock> {
    store: Store,
    hierarchy: Arc<HierarchyManager>,
    budget: Arc<BudgetManager<C>>,
    messages: Arc<MessageQueue<C>>,
    agent_service: Arc<AgentService<C>>,
    workflow_engine: Arc<WorkflowEngine<C>>,
    execution_worker: Arc<ExecutionWorker<C>>,
    workflow_poller: Arc<WorkflowPoller<C>>,
    workspace: Arc<WorkspaceManager<C>>,
    sweep_interval: Duration,
    sweep_cancel: CancellationToken,
    background: parking_lot::Mutex<Vec<JoinHandle<()>>>,
}

impl Kernel<SystemClock> {
    /// Opens (or creates) the store at `dir` and wires every component with
    /// the real system clock.
    pub fn open(
        dir: impl AsRef<std::path::Path>,
        task_runner: Arc<dyn TaskRunner>,
        workspace_adapter: Arc<dyn WorkspaceAdapter>,
        config: KernelConfig,
    ) -> Result<Self> {
        let store = Store::open(dir)?;
        Ok(Self::with_clock(SystemClock, store, task_runner, workspace_adapter, config))
    }
}

impl<C: Clock + 'static> Kernel<C> {
    pub fn with_clock(clock: C, store: Store, task_runner: Arc<dyn TaskRunner>, workspace_adapter: Arc<dyn WorkspaceAdapter>, config: KernelConfig) -> Self {
        let hierarchy = Arc::new(HierarchyManager::new(config.max_depth));
        let budget = Arc::new(BudgetManager::new(clock.clone()));
        let messages = Arc::new(MessageQueue::new(clock.clone()));
        let workspace = Arc::new(WorkspaceManager::new(clock.clone(), workspace_adapter, config.workspace_root.clone(), config.repo_root.clone()).with_retention(config.workspace_retention));

        let agent_service = Arc::new(AgentService::new(
            clock.clone(),
            hierarchy.clone(),
            budget.clone(),
            workspace.clone(),
            task_runner,
            config.agent_timeout,
        ));

        let workflow_engine = Arc::new(WorkflowEngine::new(clock.clone(), store.clone(), agent_service.clone()));
        agent_service.set_notifier(Arc::clone(&workflow_engine) as Arc<dyn crate::agent_service::WorkflowNotifier>);

        let execution_worker = Arc::new(ExecutionWorker::with_config(
            store.clone(),
            agent_service.clone(),
            config.max_concurrent_executions,
            config.poll_interval,
        ));
        let workflow_poller = Arc::new(WorkflowPoller::with_poll_interval(store.clone(), agent_service.clone(), workflow_engine.clone(), config.poll_interval));

        Self {
            store,
            hierarchy,
            budget,
            messages,
            agent_service,
            workflow_engine,
            execution_worker,
            workflow_poller,
            workspace,
            sweep_interval: config.poll_interval,
            sweep_cancel: CancellationToken::new(),
            background: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Starts `ExecutionWorker`, `WorkflowPoller`, and the workspace cleanup
    /// sweeper as background tasks. Idempotent is NOT guaranteed: call once.
    pub fn start(self: &Arc<Self>) {
        let execution_worker = self.execution_worker.clone();
        self.background.lock().push(tokio::spawn(async move { execution_worker.run().await }));

        let workflow_poller = self.workflow_poller.clone();
        self.background.lock().push(tokio::spawn(async move { workflow_poller.run().await }));

        let workspace = self.workspace.clone();
        let store = self.store.clone();
        let interval = self.sweep_interval;
        let cancel = self.sweep_cancel.clone();
        self.background.lock().push(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
                workspace.sweep(&store).await;
            }
        }));

        info!("kernel started");
    }

    /// Signals every background loop to stop and waits for them to drain,
    /// up to `deadline`. Flushes the store before returning.
    pub async fn stop(&self, deadline: Duration) -> Result<()> {
        self.execution_worker.shutdown();
        self.workflow_poller.shutdown();
        self.sweep_cancel.cancel();

        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut self.background.lock());
        for handle in handles {
            if tokio::time::timeout(deadline, handle).await.is_err() {
                tracing::warn!("kernel background task did not drain before the shutdown deadline");
            }
        }

        self.store.flush()
    }

    // -- Agents -----------------------------------------------------------

    pub async fn spawn(&self, role: &str, task: &str, budget: i64, parent_id: Option<AgentId>) -> Result<AgentId> {
        self.agent_service.spawn(&self.store, role, task, budget, parent_id).await
    }

    pub fn get_agent(&self, id: &str) -> Option<Agent> {
        self.agent_service.get_agent(&self.store, id)
    }

    pub fn list_children(&self, parent: AgentId) -> Vec<AgentId> {
        self.store.view(|state| self.hierarchy.children(state, parent))
    }

    pub fn list_ancestors(&self, agent_id: AgentId) -> Vec<AgentId> {
        self.store.view(|state| self.hierarchy.ancestors(state, agent_id))
    }

    pub fn hierarchy_tree(&self, root: AgentId, max_depth: Option<u32>) -> HierarchyTree {
        self.store.view(|state| self.hierarchy.hierarchy_tree(state, root, max_depth))
    }

    pub fn set_status(&self, agent_id: AgentId, status: AgentStatus) -> Result<()> {
        self.agent_service.set_status(&self.store, agent_id, status, None, None)
    }

    pub fn terminate(&self, agent_id: AgentId, reason: &str) -> Result<()> {
        self.agent_service.terminate(&self.store, agent_id, reason)
    }

    // -- Budgets ------------------------------------------------------------

    pub fn get_budget(&self, agent_id: AgentId) -> Option<Budget> {
        self.store.view(|state| state.budgets.get(&agent_id).cloned())
    }

    pub fn consume_tokens(&self, agent_id: AgentId, amount: i64) -> Result<i64> {
        self.budget.consume(&self.store, agent_id, amount)
    }

    pub fn remaining(&self, agent_id: AgentId) -> Result<i64> {
        self.store.view(|state| self.budget.remaining(state, agent_id))
    }

    // -- Messages -----------------------------------------------------------

    pub fn send_message(&self, from: Option<AgentId>, to: AgentId, payload: serde_json::Value, priority: u8, thread: Option<String>) -> Result<Message> {
        self.messages.send(&self.store, from, to, payload, priority, thread)
    }

    pub fn receive_messages(&self, recipient: AgentId, limit: usize) -> Vec<Message> {
        self.messages.receive(&self.store, recipient, limit)
    }

    pub fn mark_delivered(&self, message_id: ak_core::MessageId) -> Result<()> {
        self.messages.mark_delivered(&self.store, message_id)
    }

    pub fn mark_processed(&self, message_id: ak_core::MessageId) -> Result<()> {
        self.messages.mark_processed(&self.store, message_id)
    }

    // -- Workflows ------------------------------------------------------------

    pub fn create_template(&self, name: &str, node_templates: Vec<NodeTemplate>, edge_patterns: Vec<EdgePattern>, min_budget: i64) -> Result<WorkflowTemplateId> {
        self.workflow_engine.create_template(name, node_templates, edge_patterns, min_budget)
    }

    pub fn instantiate_template(&self, template_id: WorkflowTemplateId, task: &str, budget: i64) -> Result<WorkflowGraphId> {
        self.workflow_engine.instantiate_template(template_id, task, budget)
    }

    pub fn validate_graph(&self, graph_id: WorkflowGraphId) -> Result<ValidationStatus> {
        self.workflow_engine.validate(graph_id)
    }

    pub async fn execute_workflow(&self, graph_id: WorkflowGraphId) -> Result<()> {
        self.workflow_engine.execute(graph_id).await
    }

    pub fn workflow_progress(&self, graph_id: WorkflowGraphId) -> WorkflowProgress {
        self.workflow_engine.progress(graph_id)
    }

    pub fn terminate_workflow(&self, graph_id: WorkflowGraphId, reason: &str) -> Result<()> {
        self.workflow_engine.terminate(graph_id, reason)
    }

    /// White-box access to the underlying store for tests that need to
    /// assert on rows the programmatic API doesn't surface directly (e.g.
    /// a workflow node's `execution_status`).
    #[cfg(any(test, feature = "test-support"))]
    pub fn store(&self) -> &Store {
        &self.store
    }
}

#[cfg(test)]
#[path = "kernel_tests.rs"]
mod tests;
