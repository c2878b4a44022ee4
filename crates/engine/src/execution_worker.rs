// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background loop that drives `pending` agents through `AgentService::run`.
//!
//! Agents are leased in-process (a `HashSet<AgentId>` under a lock) so a
//! single process never runs the same agent twice concurrently; the lease
//! is a local optimization, not a correctness requirement, since
//! `AgentStatus::can_transition_to` would reject a double-`executing`
//! transition anyway.

use crate::agent_service::AgentService;
use ak_core::{AgentId, AgentStatus, Clock};
use ak_storage::Store;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const DEFAULT_MAX_CONCURRENT: usize = 16;
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

pub struct ExecutionWorker<C: Clock> {
    store: Store,
    agent_service: Arc<AgentService<C>>,
    leased: Arc<Mutex<HashSet<AgentId>>>,
    semaphore: Arc<Semaphore>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl<C: Clock + 'static> ExecutionWorker<C> {
    pub fn new(store: Store, agent_service: Arc<AgentService<C>>) -> Self {
        Self::with_config(store, agent_service, DEFAULT_MAX_CONCURRENT, DEFAULT_POLL_INTERVAL)
    }

    pub fn with_config(store: Store, agent_service: Arc<AgentService<C>>, max_concurrent: usize, poll_interval: Duration) -> Self {
        Self {
            store,
            agent_service,
            leased: Arc::new(Mutex::new(HashSet::new())),
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Runs the poll loop until `shutdown` is called. Each tick runs as a
    /// separate spawned task so a panic inside it is caught by the
    /// `JoinHandle` rather than taking down the loop.
    pub async fn run(&self) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            let store = self.store.clone();
            let agent_service = self.agent_service.clone();
            let leased = self.leased.clone();
            let semaphore = self.semaphore.clone();
            let tick = tokio::spawn(async move { tick(store, agent_service, leased, semaphore).await });
            if let Err(join_error) = tick.await {
                error!(%join_error, "execution worker tick panicked");
            }
        }
    }

    /// Stops the poll loop. In-flight `run` tasks are not forcibly
    /// cancelled here; callers that need a hard deadline should race this
    /// against a timeout and fall back to `AgentService::terminate`.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

async fn tick<C: Clock + 'static>(
    store: Store,
    agent_service: Arc<AgentService<C>>,
    leased: Arc<Mutex<HashSet<AgentId>>>,
    semaphore: Arc<Semaphore>,
) {
    let available_permits = semaphore.available_permits();
    if available_permits == 0 {
        return;
    }

    let candidates: Vec<AgentId> = {
        let held = leased.lock();
        store.view(|state| {
            state
                .agents
                .values()
                .filter(|a| a.status == AgentStatus::Pending)
                .filter(|a| !held.contains(&a.id))
                .take(available_permits)
                .map(|a| a.id)
                .collect()
        })
    };

    for agent_id in candidates {
        if !leased.lock().insert(agent_id) {
            continue;
        }
        let Ok(permit) = semaphore.clone().try_acquire_owned() else {
            leased.lock().remove(&agent_id);
            continue;
        };

        let store = store.clone();
        let agent_service = agent_service.clone();
        let leased = leased.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(reason) = agent_service.run(&store, agent_id).await {
                warn!(%agent_id, %reason, "agent execution failed");
            }
            leased.lock().remove(&agent_id);
        });
    }
}

#[cfg(test)]
#[path = "execution_worker_tests.rs"]
mod tests;
