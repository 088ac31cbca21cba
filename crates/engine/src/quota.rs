// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global concurrency caps, checked on submit and released at terminal
//! status. Accounting must be exactly-once per job lifetime: retries reuse
//! the acquire taken on the first attempt.

use fd_core::{Dag, DagId, ExecutionStatus, JobNode};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Requesting user, read from the job spec config.
pub const FLOW_USER_KEY: &str = "flow.user";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QuotaError {
    #[error("user {user:?} is over quota: {running} running, cap {cap}")]
    UserExceeded { user: String, running: u32, cap: u32 },

    #[error("flow group {group:?} is over quota: {running} running, cap {cap}")]
    FlowGroupExceeded {
        group: String,
        running: u32,
        cap: u32,
    },
}

pub trait QuotaManager: Send + Sync {
    /// Seed counts by replaying persisted DAGs so quota survives failover.
    fn init(&self, dags: &[Dag]);

    /// Admit one node. Called on every submit attempt; a node that already
    /// holds quota (a retry) is admitted without double-counting.
    fn check_quota(&self, dag_id: &DagId, node: &JobNode) -> Result<(), QuotaError>;

    /// Release at terminal status. Returns true when the node actually held
    /// quota (at most once per job lifetime).
    fn release_quota(&self, dag_id: &DagId, node: &JobNode) -> bool;
}

/// Default quota manager: counts running jobs per requesting user and per
/// flow group against optional caps (`None` = unlimited).
pub struct CountingQuotaManager {
    user_cap: Option<u32>,
    flow_group_cap: Option<u32>,
    inner: Mutex<Counts>,
}

#[derive(Default)]
struct Counts {
    per_user: HashMap<String, u32>,
    per_group: HashMap<String, u32>,
    /// Nodes currently holding quota, keyed by (dag, job name).
    held: HashSet<(DagId, String)>,
}

impl CountingQuotaManager {
    pub fn new(user_cap: Option<u32>, flow_group_cap: Option<u32>) -> Self {
        Self {
            user_cap,
            flow_group_cap,
            inner: Mutex::new(Counts::default()),
        }
    }

    /// No caps; accounting only.
    pub fn unlimited() -> Self {
        Self::new(None, None)
    }

    fn user_of(node: &JobNode) -> Option<String> {
        node.plan.spec.config.get(FLOW_USER_KEY).cloned()
    }

    /// Running count currently held for a user (test observability).
    pub fn user_count(&self, user: &str) -> u32 {
        self.inner.lock().per_user.get(user).copied().unwrap_or(0)
    }

    /// Running count currently held for a flow group (test observability).
    pub fn flow_group_count(&self, group: &str) -> u32 {
        self.inner.lock().per_group.get(group).copied().unwrap_or(0)
    }
}

impl QuotaManager for CountingQuotaManager {
    fn init(&self, dags: &[Dag]) {
        let mut inner = self.inner.lock();
        inner.per_user.clear();
        inner.per_group.clear();
        inner.held.clear();
        for dag in dags {
            for node in dag.nodes() {
                let dispatched = matches!(
                    node.plan.status,
                    ExecutionStatus::Orchestrated | ExecutionStatus::Running
                );
                if !dispatched {
                    continue;
                }
                inner.held.insert((dag.id.clone(), node.name.clone()));
                if let Some(user) = Self::user_of(node) {
                    *inner.per_user.entry(user).or_insert(0) += 1;
                }
                *inner
                    .per_group
                    .entry(dag.id.flow_group.clone())
                    .or_insert(0) += 1;
            }
        }
    }

    fn check_quota(&self, dag_id: &DagId, node: &JobNode) -> Result<(), QuotaError> {
        let mut inner = self.inner.lock();
        let key = (dag_id.clone(), node.name.clone());
        if inner.held.contains(&key) {
            // Retry of a node that still holds its acquire.
            return Ok(());
        }

        let user = Self::user_of(node);
        if let (Some(cap), Some(user)) = (self.user_cap, user.as_deref()) {
            let running = inner.per_user.get(user).copied().unwrap_or(0);
            if running + 1 > cap {
                return Err(QuotaError::UserExceeded {
                    user: user.to_string(),
                    running,
                    cap,
                });
            }
        }
        if let Some(cap) = self.flow_group_cap {
            let running = inner
                .per_group
                .get(&dag_id.flow_group)
                .copied()
                .unwrap_or(0);
            if running + 1 > cap {
                return Err(QuotaError::FlowGroupExceeded {
                    group: dag_id.flow_group.clone(),
                    running,
                    cap,
                });
            }
        }

        inner.held.insert(key);
        if let Some(user) = user {
            *inner.per_user.entry(user).or_insert(0) += 1;
        }
        *inner
            .per_group
            .entry(dag_id.flow_group.clone())
            .or_insert(0) += 1;
        Ok(())
    }

    fn release_quota(&self, dag_id: &DagId, node: &JobNode) -> bool {
        let mut inner = self.inner.lock();
        if !inner.held.remove(&(dag_id.clone(), node.name.clone())) {
            return false;
        }
        if let Some(user) = Self::user_of(node) {
            if let Some(count) = inner.per_user.get_mut(&user) {
                *count = count.saturating_sub(1);
            }
        }
        if let Some(count) = inner.per_group.get_mut(&dag_id.flow_group) {
            *count = count.saturating_sub(1);
        }
        true
    }
}

#[cfg(test)]
#[path = "quota_tests.rs"]
mod tests;
