// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-through view of per-job and per-flow status events.

use fd_core::{DagId, ExecutionStatus, FlowId, NA_KEY};

/// One status row, as ingested from the executors' event stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobStatus {
    /// Job name, or [`NA_KEY`] for a flow-level row.
    pub job_name: String,
    /// Raw event name; mapped through [`ExecutionStatus::from_event_name`].
    pub event_name: String,
    /// Set when the job failed but has attempts left.
    pub should_retry: bool,
    /// Epoch millis the job entered ORCHESTRATED; 0 when unknown.
    pub orchestrated_time_ms: u64,
    /// Generation of the attempt that produced this row; 0 when the
    /// backend does not track generations.
    pub generation: u64,
}

impl JobStatus {
    pub fn flow_level(event_name: impl Into<String>) -> Self {
        Self {
            job_name: NA_KEY.to_string(),
            event_name: event_name.into(),
            should_retry: false,
            orchestrated_time_ms: 0,
            generation: 0,
        }
    }

    pub fn job_level(job_name: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            event_name: event_name.into(),
            should_retry: false,
            orchestrated_time_ms: 0,
            generation: 0,
        }
    }

    pub fn execution_status(&self) -> Option<ExecutionStatus> {
        ExecutionStatus::from_event_name(&self.event_name)
    }

    pub fn is_flow_level(&self) -> bool {
        self.job_name == NA_KEY
    }
}

/// Status-store seam. Eventually consistent: rows may lag the executors,
/// which is why resume is split into a begin and a confirm phase.
pub trait JobStatusRetriever: Send + Sync {
    /// Most recent execution ids of a flow, newest first, bounded by `limit`.
    fn latest_execution_ids(&self, flow: &FlowId, limit: usize) -> Vec<u64>;

    /// All rows for one flow execution, including the flow-level row.
    fn job_statuses(&self, dag_id: &DagId) -> Vec<JobStatus>;

    fn flow_status(&self, dag_id: &DagId) -> Option<JobStatus> {
        self.job_statuses(dag_id)
            .into_iter()
            .find(JobStatus::is_flow_level)
    }

    fn job_status(&self, dag_id: &DagId, job_name: &str) -> Option<JobStatus> {
        self.job_statuses(dag_id)
            .into_iter()
            .find(|s| s.job_name == job_name)
    }
}
