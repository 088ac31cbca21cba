// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flow- and job-level timing event names.
//!
//! These are the names that cross the observability boundary; keep them as
//! closed enums here and render the wire string at the edge.

use serde::{Deserialize, Serialize};

/// Flow-level lifecycle events. The terminal subset is what a DAG's pending
/// `flow_event` may hold while awaiting store confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowEvent {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    PendingResume,
    StartDeadlineExceeded,
    RunDeadlineExceeded,
}

impl FlowEvent {
    pub fn as_name(self) -> &'static str {
        match self {
            Self::Pending => "FLOW_PENDING",
            Self::Running => "FLOW_RUNNING",
            Self::Succeeded => "FLOW_SUCCEEDED",
            Self::Failed => "FLOW_FAILED",
            Self::Cancelled => "FLOW_CANCELLED",
            Self::PendingResume => "FLOW_PENDING_RESUME",
            Self::StartDeadlineExceeded => "FLOW_START_DEADLINE_EXCEEDED",
            Self::RunDeadlineExceeded => "FLOW_RUN_DEADLINE_EXCEEDED",
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl std::fmt::Display for FlowEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_name())
    }
}

/// Job-level timing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobEvent {
    Orchestrated,
    Cancel,
    PendingResume,
    Failed,
}

impl JobEvent {
    pub fn as_name(self) -> &'static str {
        match self {
            Self::Orchestrated => "JOB_ORCHESTRATED",
            Self::Cancel => "JOB_CANCEL",
            Self::PendingResume => "JOB_PENDING_RESUME",
            Self::Failed => "JOB_FAILED",
        }
    }
}

impl std::fmt::Display for JobEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_name())
    }
}
