// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background loop that notices agents finishing and advances their
//! workflow graphs.
//!
//! Polling, rather than push pub/sub, is chosen for simplicity: the
//! contract is eventual (bounded by `poll_interval`) and resumable across
//! process restarts because all state lives in the store. `AgentService`'s
//! `WorkflowNotifier` callback already advances graphs with lower latency
//! in the common case; this loop is the correctness backstop for callbacks
//! lost to a crash or a notifier that was never wired up.

use crate::agent_service::AgentService;
use crate::workflow::WorkflowEngine;
use ak_core::{AgentId, Clock, NodeExecutionStatus, WorkflowGraphId, WorkflowStatus};
use ak_storage::Store;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct WorkflowPoller<C: Clock> {
    store: Store,
    agent_service: Arc<AgentService<C>>,
    engine: Arc<WorkflowEngine<C>>,
    /// Last-observed terminal agent status per executing node, so a node's
    /// completion/failure is only dispatched to `WorkflowEngine` once even
    /// if two ticks both observe it before the node record updates.
    last_seen: Arc<Mutex<HashMap<AgentId, bool>>>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<C: Clock + 'static> WorkflowPoller<C> {
    pub fn new(store: Store, agent_service: Arc<AgentService<C>>, engine: Arc<WorkflowEngine<C>>) -> Self {
        Self::with_poll_interval(store, agent_service, engine, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_poll_interval(store: Store, agent_service: Arc<AgentService<C>>, engine: Arc<WorkflowEngine<C>>, poll_interval: Duration) -> Self {
        Self { store, agent_service, engine, last_seen: Arc::new(Mutex::new(HashMap::new())), poll_interval, cancel: CancellationToken::new() }
    }

    pub async fn run(&self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let engine = self.engine.clone();
            let agent_service = self.agent_service.clone();
            let store = self.store.clone();
            let last_seen = self.last_seen.clone();
            let tick = tokio::spawn(async move { tick(store, agent_service, engine, last_seen).await });
            if let Err(join_error) = tick.await {
                error!(%join_error, "workflow poller tick panicked");
            }
        }
    }

    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn tick<C: Clock + 'static>(
    store: Store,
    agent_service: Arc<AgentService<C>>,
    engine: Arc<WorkflowEngine<C>>,
    last_seen: Arc<Mutex<HashMap<AgentId, bool>>>,
) {
    let active_graphs: Vec<WorkflowGraphId> =
        store.view(|state| state.workflow_graphs.values().filter(|g| g.status == WorkflowStatus::Active).map(|g| g.id).collect());

    for graph_id in active_graphs {
        let executing: Vec<AgentId> = store.view(|state| {
            state
                .nodes_of(graph_id)
                .into_iter()
                .filter(|n| n.execution_status == NodeExecutionStatus::Executing)
                .filter_map(|n| n.agent_id)
                .collect()
        });

        for agent_id in executing {
            let Some(agent) = agent_service.get_agent(&store, agent_id.as_str()) else { continue };
            if !agent.status.is_terminal() {
                continue;
            }

            let already_dispatched = {
                let mut seen = last_seen.lock();
                seen.insert(agent_id, true).is_some()
            };
            if already_dispatched {
                continue;
            }

            let result = if agent.status == ak_core::AgentStatus::Completed {
                engine.on_agent_completed(agent_id).await
            } else {
                engine.on_agent_failed(agent_id).await
            };
            if let Err(reason) = result {
                warn!(%agent_id, %reason, "workflow poller failed to advance graph");
            }
        }
    }
}

#[cfg(test)]
#[path = "workflow_poller_tests.rs"]
mod tests;
