// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job execution statuses and per-DAG failure options.

use serde::{Deserialize, Serialize};

/// Status of one job node, per attempt/generation.
///
/// Terminal statuses are absorbing within a generation; a resume bumps the
/// generation and re-opens the node via `PendingResume`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Pending,
    PendingRetry,
    PendingResume,
    Orchestrated,
    Running,
    Complete,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Terminal for a job: `COMPLETE | FAILED | CANCELLED`.
    pub fn is_job_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Cancelled)
    }

    /// Terminal for a flow-level status row (same closed set).
    pub fn is_flow_terminal(self) -> bool {
        self.is_job_terminal()
    }

    /// A node waiting to be dispatched (ready once its parents complete).
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending | Self::PendingRetry | Self::PendingResume)
    }

    /// Thin mapping layer from the status store's string event names.
    pub fn from_event_name(name: &str) -> Option<Self> {
        Some(match name {
            "PENDING" => Self::Pending,
            "PENDING_RETRY" => Self::PendingRetry,
            "PENDING_RESUME" => Self::PendingResume,
            "ORCHESTRATED" => Self::Orchestrated,
            "RUNNING" => Self::Running,
            "COMPLETE" => Self::Complete,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            _ => return None,
        })
    }

    pub fn as_event_name(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::PendingRetry => "PENDING_RETRY",
            Self::PendingResume => "PENDING_RESUME",
            Self::Orchestrated => "ORCHESTRATED",
            Self::Running => "RUNNING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_event_name())
    }
}

/// What the worker does with the rest of a DAG after its first job failure.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureOption {
    /// Stop driving everything that is not already running, then finalize.
    FinishRunning,
    /// Cancel everything immediately.
    Cancel,
    /// Keep scheduling any node all of whose ancestors succeeded.
    #[default]
    FinishAllPossible,
}

impl FailureOption {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "FINISH_RUNNING" => Self::FinishRunning,
            "CANCEL" => Self::Cancel,
            "FINISH_ALL_POSSIBLE" => Self::FinishAllPossible,
            _ => return None,
        })
    }

    pub fn as_name(self) -> &'static str {
        match self {
            Self::FinishRunning => "FINISH_RUNNING",
            Self::Cancel => "CANCEL",
            Self::FinishAllPossible => "FINISH_ALL_POSSIBLE",
        }
    }
}

impl std::fmt::Display for FailureOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_name())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
