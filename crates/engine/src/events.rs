// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Named timing events crossing the observability boundary.

use fd_core::{DagId, FlowEvent, JobEvent};
use tracing::info;

/// One emitted event. Flow-level events omit `job_name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingEvent {
    pub name: &'static str,
    pub dag_id: DagId,
    pub job_name: Option<String>,
    pub message: Option<String>,
    pub execution_link: Option<String>,
    pub timestamp_ms: u64,
}

impl TimingEvent {
    pub fn flow(event: FlowEvent, dag_id: &DagId, timestamp_ms: u64) -> Self {
        Self {
            name: event.as_name(),
            dag_id: dag_id.clone(),
            job_name: None,
            message: None,
            execution_link: None,
            timestamp_ms,
        }
    }

    pub fn job(event: JobEvent, dag_id: &DagId, job_name: &str, timestamp_ms: u64) -> Self {
        Self {
            name: event.as_name(),
            dag_id: dag_id.clone(),
            job_name: Some(job_name.to_string()),
            message: None,
            execution_link: None,
            timestamp_ms,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_execution_link(mut self, link: Option<String>) -> Self {
        self.execution_link = link;
        self
    }
}

/// Sink for timing events. In production this feeds the status pipeline;
/// notably, a JOB_FAILED emitted for a submission failure is how the
/// failure becomes visible to the next poll pass.
pub trait TimingEventEmitter: Send + Sync {
    fn emit(&self, event: TimingEvent);
}

/// Default emitter: a structured tracing record.
#[derive(Default)]
pub struct LogEmitter;

impl TimingEventEmitter for LogEmitter {
    fn emit(&self, event: TimingEvent) {
        info!(
            event = event.name,
            dag_id = %event.dag_id,
            job = event.job_name.as_deref().unwrap_or("-"),
            message = event.message.as_deref().unwrap_or(""),
            "timing event"
        );
    }
}
