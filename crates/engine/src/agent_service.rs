// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `AgentService`: the façade `ExecutionWorker`, `WorkflowEngine`, and outer
//! callers all spawn/drive/terminate agents through.

use crate::budget::BudgetManager;
use crate::hierarchy::HierarchyManager;
use crate::workspace::WorkspaceManager;
use ak_adapters::{RoleConfig, TaskRunner};
use ak_core::{Agent, AgentId, AgentStatus, Clock, Error, Event, Result};
use ak_storage::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Notified when a spawned agent reaches a terminal status, so
/// `WorkflowEngine` can advance dependent nodes without waiting for the
/// next `WorkflowPoller` tick. Purely a latency optimization: the poller
/// achieves the same thing, more slowly, from durable state alone.
pub trait WorkflowNotifier: Send + Sync {
    fn on_agent_completed(&self, agent_id: AgentId);
    fn on_agent_failed(&self, agent_id: AgentId);
}

pub struct AgentService<C: Clock> {
    clock: C,
    hierarchy: Arc<HierarchyManager>,
    budget: Arc<BudgetManager<C>>,
    workspace: Arc<WorkspaceManager<C>>,
    task_runner: Arc<dyn TaskRunner>,
    agent_timeout: Duration,
    notifier: parking_lot::RwLock<Option<Arc<dyn WorkflowNotifier>>>,
    cancel_handles: Mutex<HashMap<AgentId, CancellationToken>>,
}

impl<C: Clock + 'static> AgentService<C> {
    pub fn new(
        clock: C,
        hierarchy: Arc<HierarchyManager>,
        budget: Arc<BudgetManager<C>>,
        workspace: Arc<WorkspaceManager<C>>,
        task_runner: Arc<dyn TaskRunner>,
        agent_timeout: Duration,
    ) -> Self {
        Self {
            clock,
            hierarchy,
            budget,
            workspace,
            task_runner,
            agent_timeout,
            notifier: parking_lot::RwLock::new(None),
            cancel_handles: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_notifier(&self, notifier: Arc<dyn WorkflowNotifier>) {
        *self.notifier.write() = Some(notifier);
    }

    /// Inserts the agent + budget (+ hierarchy edge and reservation, if
    /// `parent_id` is set) atomically, then best-effort provisions a
    /// workspace outside that transaction.
    #[instrument(skip(self), fields(role = %role))]
    pub async fn spawn(&self, store: &Store, role: &str, task: &str, budget: i64, parent_id: Option<AgentId>) -> Result<AgentId> {
        if budget <= 0 {
            return Err(Error::Invariant("budget must be positive".into()));
        }

        let agent_id = AgentId::new();
        let now = self.clock.epoch_ms();
        let hierarchy = self.hierarchy.clone();

        store.with_transaction(|state| {
            let depth_level = match parent_id {
                None => 0,
                Some(parent_id) => {
                    let parent = state
                        .agents
                        .get(&parent_id)
                        .ok_or_else(|| Error::NotFound(format!("agent {parent_id}")))?;
                    hierarchy.check_cycle(state, parent_id, agent_id)?;
                    hierarchy.check_depth(parent.depth_level)?
                }
            };

            let mut events = vec![Event::AgentSpawned {
                agent_id,
                role: role.to_string(),
                task: task.to_string(),
                depth_level,
                parent_id,
                at_ms: now,
            }];

            if let Some(parent_id) = parent_id {
                let parent_budget = state
                    .budgets
                    .get(&parent_id)
                    .ok_or_else(|| Error::NotFound(format!("budget for parent {parent_id}")))?;
                let available = parent_budget.remaining();
                if available < budget {
                    return Err(Error::InsufficientBudget { available, requested: budget });
                }
                events.push(Event::BudgetReserved {
                    parent_id,
                    new_reserved: parent_budget.reserved + budget,
                    at_ms: now,
                });
                events.push(Event::HierarchyEdgeCreated {
                    edge_id: ak_core::HierarchyEdgeId::new(),
                    parent_id,
                    child_id: agent_id,
                    at_ms: now,
                });
            }

            events.push(Event::BudgetAllocated {
                budget: ak_core::Budget {
                    agent_id,
                    allocated: budget,
                    used: 0,
                    reserved: 0,
                    reclaimed: false,
                    created_at_ms: now,
                    updated_at_ms: now,
                },
            });

            Ok((events, ()))
        })?;

        if let Err(reason) = self.workspace.create(store, agent_id).await {
            warn!(%agent_id, %reason, "workspace creation failed; agent has no workspace");
        }

        Ok(agent_id)
    }

    /// Enforces the agent state machine; triggers `BudgetManager::reclaim`
    /// exactly once on first entry into a terminal status.
    pub fn set_status(&self, store: &Store, agent_id: AgentId, status: AgentStatus, result: Option<String>, error_message: Option<String>) -> Result<()> {
        let now = self.clock.epoch_ms();
        let was_already_terminal = store.with_transaction(|state| {
            let agent = state
                .agents
                .get(&agent_id)
                .ok_or_else(|| Error::NotFound(format!("agent {agent_id}")))?;
            if !agent.status.can_transition_to(status) {
                return Err(Error::InvalidTransition {
                    entity: agent_id.to_string(),
                    from: agent.status.to_string(),
                    to: status.to_string(),
                });
            }
            let was_terminal = agent.status.is_terminal();
            let event = Event::AgentStatusChanged { agent_id, status, result, error_message, at_ms: now };
            Ok((vec![event], was_terminal))
        })?;

        if status.is_terminal() && !was_already_terminal {
            self.budget.reclaim(store, agent_id)?;
            self.workspace.mark_status(store, agent_id, terminal_workspace_status(status))?;
        }
        Ok(())
    }

    /// Drives one agent through `executing -> {completed, failed}`, bounded
    /// by `agent_timeout`. Idempotent against double-invocation is NOT
    /// guaranteed here; `ExecutionWorker` is responsible for leasing so a
    /// given agent is only ever `run` once concurrently.
    #[instrument(skip(self, store))]
    pub async fn run(&self, store: &Store, agent_id: AgentId) -> Result<()> {
        self.set_status(store, agent_id, AgentStatus::Executing, None, None)?;

        let agent = store
            .view(|state| state.agents.get(&agent_id).cloned())
            .ok_or_else(|| Error::NotFound(format!("agent {agent_id}")))?;
        let workspace_path = store.view(|state| state.workspaces.get(&agent_id).map(|w| w.path.clone()));

        let cancel = CancellationToken::new();
        self.cancel_handles.lock().insert(agent_id, cancel.clone());

        let role_config = RoleConfig { role: agent.role.clone(), system_prompt: None };
        let outcome = tokio::select! {
            outcome = self.task_runner.execute(&agent.task, workspace_path.as_ref(), &role_config, cancel.clone()) => outcome,
            _ = tokio::time::sleep(self.agent_timeout) => {
                cancel.cancel();
                ak_adapters::TaskOutcome::failure("agent execution timed out")
            }
        };
        self.cancel_handles.lock().remove(&agent_id);

        if outcome.is_error {
            let error_message = outcome.error.unwrap_or_else(|| "task runner reported failure".into());
            self.set_status(store, agent_id, AgentStatus::Failed, None, Some(error_message))?;
            if let Some(notifier) = self.notifier.read().clone() {
                notifier.on_agent_failed(agent_id);
            }
        } else {
            let clamped = store.view(|state| self.budget.remaining(state, agent_id)).unwrap_or(0).max(0);
            let to_consume = outcome.tokens_used.min(clamped as u64) as i64;
            self.budget.consume(store, agent_id, to_consume)?;
            self.set_status(store, agent_id, AgentStatus::Completed, Some(outcome.output), None)?;
            if let Some(notifier) = self.notifier.read().clone() {
                notifier.on_agent_completed(agent_id);
            }
        }

        Ok(())
    }

    /// Force-transitions `agent_id` to `terminated`, cancelling an in-flight
    /// `run` if one holds this agent's cancel handle, then cascades to
    /// every non-terminal descendant.
    pub fn terminate(&self, store: &Store, agent_id: AgentId, reason: &str) -> Result<()> {
        if let Some(cancel) = self.cancel_handles.lock().get(&agent_id) {
            cancel.cancel();
        }
        self.set_status(store, agent_id, AgentStatus::Terminated, None, Some(reason.to_string()))?;

        let descendants = store.view(|state| self.hierarchy.descendants(state, agent_id, None));
        for descendant in descendants {
            let still_active = store.view(|state| {
                state.agents.get(&descendant).map(|a| !a.status.is_terminal()).unwrap_or(false)
            });
            if still_active {
                if let Some(cancel) = self.cancel_handles.lock().get(&descendant) {
                    cancel.cancel();
                }
                self.set_status(store, descendant, AgentStatus::Terminated, None, Some(reason.to_string()))?;
            }
        }

        info!(%agent_id, "agent terminated");
        Ok(())
    }

    pub fn get_agent(&self, store: &Store, id: &str) -> Option<Agent> {
        store.view(|state| state.get_agent(id).cloned())
    }
}

fn terminal_workspace_status(status: AgentStatus) -> ak_core::WorkspaceStatus {
    match status {
        AgentStatus::Completed => ak_core::WorkspaceStatus::Merged,
        _ => ak_core::WorkspaceStatus::Abandoned,
    }
}

#[cfg(test)]
#[path = "agent_service_tests.rs"]
mod tests;
