// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The DAG of job execution plans supervised by one worker shard.

use crate::event::FlowEvent;
use crate::id::DagId;
use crate::spec::{JobSpec, FLOW_SLA_SECONDS_KEY};
use crate::status::{ExecutionStatus, FailureOption};
use futures_util::future::{BoxFuture, Shared};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error carried inside a submission future. Cloneable so the shared handle
/// hands the same outcome to every observer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct SubmissionError(pub String);

/// What the executor acknowledged for an accepted submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionAck {
    /// Executor-side identifier, if the executor assigns one.
    pub external_id: Option<String>,
    /// Human-facing link to the remote execution.
    pub execution_link: Option<String>,
}

/// Completion of this future means *submission accepted*, not job finished.
pub type SubmissionFuture = Shared<BoxFuture<'static, Result<SubmissionAck, SubmissionError>>>;

/// Opaque handle to an in-flight job submission, attached to the node once
/// dispatched. Never serialized; a DAG recovered after a leader change has no
/// handle and cancellation falls back to best-effort.
#[derive(Clone)]
pub struct SubmissionHandle(pub SubmissionFuture);

impl SubmissionHandle {
    /// The acknowledgment, if submission has already been accepted.
    pub fn ack(&self) -> Option<SubmissionAck> {
        self.0.peek().and_then(|r| r.as_ref().ok().cloned())
    }
}

impl std::fmt::Debug for SubmissionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SubmissionHandle(..)")
    }
}

/// Mutable execution state of one job node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobExecutionPlan {
    pub spec: JobSpec,
    /// URI of the executor this job was matched to at orchestration time.
    pub executor_uri: String,
    pub status: ExecutionStatus,
    #[serde(skip)]
    pub submission: Option<SubmissionHandle>,
    pub current_attempts: u32,
    pub max_attempts: u32,
    /// Start of the flow execution; restarted by a resume so the flow SLA
    /// restarts with it.
    pub flow_start_time_ms: u64,
    /// Bumped on resume so status rows from prior generations are ignored.
    pub job_generation: u64,
}

impl JobExecutionPlan {
    pub fn new(spec: JobSpec, executor_uri: impl Into<String>, flow_start_time_ms: u64) -> Self {
        Self {
            spec,
            executor_uri: executor_uri.into(),
            status: ExecutionStatus::Pending,
            submission: None,
            current_attempts: 0,
            max_attempts: 1,
            flow_start_time_ms,
            job_generation: 1,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// One node of the DAG: a job plus its parent edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobNode {
    pub name: String,
    /// Names of parent nodes; empty for a start node.
    #[serde(default)]
    pub parents: Vec<String>,
    pub plan: JobExecutionPlan,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DagError {
    #[error("duplicate node {0:?}")]
    DuplicateNode(String),

    #[error("node {node:?} references unknown parent {parent:?}")]
    UnknownParent { node: String, parent: String },
}

/// A flow execution's DAG. Received fully built from the orchestrator;
/// node order is preserved for deterministic scheduling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dag {
    pub id: DagId,
    nodes: IndexMap<String, JobNode>,
    /// Per-flow failure option; the configured default applies when absent.
    #[serde(default)]
    pub failure_option: Option<FailureOption>,
    /// Pending terminal event, emitted at cleanup and re-emitted until the
    /// status store confirms.
    #[serde(default)]
    pub flow_event: Option<FlowEvent>,
    #[serde(default)]
    pub message: Option<String>,
    /// When `flow_event` was last emitted; drives re-emission.
    #[serde(default)]
    pub event_emitted_time_ms: u64,
}

impl Dag {
    pub fn new(id: DagId) -> Self {
        Self {
            id,
            nodes: IndexMap::new(),
            failure_option: None,
            flow_event: None,
            message: None,
            event_emitted_time_ms: 0,
        }
    }

    /// Append a node. Parents must already be present.
    pub fn add_node(&mut self, node: JobNode) -> Result<(), DagError> {
        if self.nodes.contains_key(&node.name) {
            return Err(DagError::DuplicateNode(node.name));
        }
        for parent in &node.parents {
            if !self.nodes.contains_key(parent) {
                return Err(DagError::UnknownParent {
                    node: node.name,
                    parent: parent.clone(),
                });
            }
        }
        self.nodes.insert(node.name.clone(), node);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn node(&self, name: &str) -> Option<&JobNode> {
        self.nodes.get(name)
    }

    pub fn node_mut(&mut self, name: &str) -> Option<&mut JobNode> {
        self.nodes.get_mut(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &JobNode> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> impl Iterator<Item = &mut JobNode> {
        self.nodes.values_mut()
    }

    /// Nodes ready for dispatch: in the pending family with every parent
    /// `COMPLETE`.
    pub fn ready_nodes(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.plan.status.is_pending())
            .filter(|n| {
                n.parents.iter().all(|p| {
                    self.nodes
                        .get(p)
                        .is_some_and(|parent| parent.plan.status == ExecutionStatus::Complete)
                })
            })
            .map(|n| n.name.clone())
            .collect()
    }

    /// Nodes currently in `RUNNING` (the leader-failover recovery set).
    pub fn running_nodes(&self) -> Vec<String> {
        self.nodes
            .values()
            .filter(|n| n.plan.status == ExecutionStatus::Running)
            .map(|n| n.name.clone())
            .collect()
    }

    /// Whether any node has been dispatched and is still running.
    pub fn is_running(&self) -> bool {
        self.nodes
            .values()
            .any(|n| n.plan.status == ExecutionStatus::Running)
    }

    pub fn flow_start_time_ms(&self) -> u64 {
        self.nodes
            .values()
            .next()
            .map(|n| n.plan.flow_start_time_ms)
            .unwrap_or(0)
    }

    /// Restart the flow clock (resume path); every plan carries the value.
    pub fn set_flow_start_time_ms(&mut self, now_ms: u64) {
        for node in self.nodes.values_mut() {
            node.plan.flow_start_time_ms = now_ms;
        }
    }

    /// Per-flow SLA override, read once from the spec config boundary.
    pub fn flow_sla_secs(&self) -> Option<u64> {
        self.nodes
            .values()
            .find_map(|n| n.plan.spec.config_u64(FLOW_SLA_SECONDS_KEY))
    }
}

#[cfg(test)]
#[path = "dag_tests.rs"]
mod tests;
